//! Query and update evaluation for the in-memory backend.
//!
//! Covers the subset of the MongoDB query language the services use:
//! equality (with `null` matching a missing field), dotted paths, `$eq`,
//! `$ne`, `$in`, `$nin`, `$gt`, `$gte`, `$lt`, `$lte`, `$exists` and the
//! top-level `$and` / `$or` combinators.

use std::cmp::Ordering;

use bson::{Bson, Document};

use super::{StoreError, StoreResult};

pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = doc.get(first)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

pub fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => as_filters(condition).iter().all(|f| matches(doc, f)),
        "$or" => as_filters(condition).iter().any(|f| matches(doc, f)),
        path => field_matches(lookup(doc, path), condition),
    })
}

fn as_filters(value: &Bson) -> Vec<Document> {
    match value {
        Bson::Array(items) => items
            .iter()
            .filter_map(|item| item.as_document().cloned())
            .collect(),
        _ => Vec::new(),
    }
}

fn is_operator_doc(value: &Bson) -> bool {
    match value {
        Bson::Document(d) => !d.is_empty() && d.keys().all(|k| k.starts_with('$')),
        _ => false,
    }
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> bool {
    if let (true, Bson::Document(ops)) = (is_operator_doc(condition), condition) {
        return ops
            .iter()
            .all(|(op, operand)| operator_matches(value, op, operand));
    }
    equals(value, condition)
}

fn operator_matches(value: Option<&Bson>, op: &str, operand: &Bson) -> bool {
    match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$in" => match operand {
            Bson::Array(items) => items.iter().any(|item| equals(value, item)),
            _ => false,
        },
        "$nin" => match operand {
            Bson::Array(items) => !items.iter().any(|item| equals(value, item)),
            _ => true,
        },
        "$gt" => ordered(value, operand, |o| o == Ordering::Greater),
        "$gte" => ordered(value, operand, |o| o != Ordering::Less),
        "$lt" => ordered(value, operand, |o| o == Ordering::Less),
        "$lte" => ordered(value, operand, |o| o != Ordering::Greater),
        "$exists" => {
            let wanted = matches!(operand, Bson::Boolean(true))
                || matches!(operand, Bson::Int32(n) if *n != 0)
                || matches!(operand, Bson::Int64(n) if *n != 0);
            value.is_some() == wanted
        }
        _ => false,
    }
}

fn ordered(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(v) => compare(v, operand).map(accept).unwrap_or(false),
        None => false,
    }
}

fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match (value, expected) {
        (None, Bson::Null) => true,
        (None, _) => false,
        (Some(Bson::Array(items)), expected) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        (Some(v), expected) => values_equal(v, expected),
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

/// Ordering between two values of comparable types. Mixed types that MongoDB
/// would order by type bracket compare as `None` here.
pub fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::Null, Bson::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Sorts by each key of `sort` in order; `1` ascending, `-1` descending.
/// Missing fields sort before present ones, as in MongoDB.
pub fn sort_documents(docs: &mut [Document], sort: &Document) {
    docs.sort_by(|a, b| {
        for (key, direction) in sort.iter() {
            let descending = matches!(as_f64(direction), Some(d) if d < 0.0);
            let ord = match (lookup(a, key), lookup(b, key)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
            };
            let ord = if descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// Applies an update document (`$set`, `$unset`, `$inc`, and `$setOnInsert`
/// when `inserting`) to `doc` in place.
pub fn apply_update(doc: &mut Document, update: &Document, inserting: bool) -> StoreResult<()> {
    for (op, fields) in update.iter() {
        let fields = fields
            .as_document()
            .ok_or_else(|| StoreError::Unsupported(format!("{} expects a document", op)))?;
        match op.as_str() {
            "$set" => {
                for (k, v) in fields.iter() {
                    set_path(doc, k, v.clone());
                }
            }
            "$setOnInsert" => {
                if inserting {
                    for (k, v) in fields.iter() {
                        set_path(doc, k, v.clone());
                    }
                }
            }
            "$unset" => {
                for (k, _) in fields.iter() {
                    unset_path(doc, k);
                }
            }
            "$inc" => {
                for (k, v) in fields.iter() {
                    let current = lookup(doc, k).cloned().unwrap_or(Bson::Int32(0));
                    set_path(doc, k, add(&current, v)?);
                }
            }
            other => {
                return Err(StoreError::Unsupported(format!(
                    "update operator {}",
                    other
                )))
            }
        }
    }
    Ok(())
}

/// Seed document for an upsert: the plain equality fields of the filter.
pub fn upsert_seed(filter: &Document) -> Document {
    let mut seed = Document::new();
    for (key, value) in filter.iter() {
        if key.starts_with('$') {
            if key == "$and" {
                for sub in as_filters(value) {
                    for (k, v) in upsert_seed(&sub) {
                        set_path(&mut seed, &k, v);
                    }
                }
            }
            continue;
        }
        match value {
            v if is_operator_doc(v) => {
                if let Some(eq) = v.as_document().and_then(|d| d.get("$eq")) {
                    set_path(&mut seed, key, eq.clone());
                }
            }
            v => set_path(&mut seed, key, v.clone()),
        }
    }
    seed
}

fn add(current: &Bson, delta: &Bson) -> StoreResult<Bson> {
    Ok(match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Bson::Int32(a + b),
        (Bson::Int64(a), Bson::Int64(b)) => Bson::Int64(a + b),
        (Bson::Int32(a), Bson::Int64(b)) => Bson::Int64(*a as i64 + b),
        (Bson::Int64(a), Bson::Int32(b)) => Bson::Int64(a + *b as i64),
        (a, b) => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => Bson::Double(x + y),
            _ => return Err(StoreError::Unsupported("$inc on a non-numeric field".into())),
        },
    })
}

fn set_path(doc: &mut Document, path: &str, value: Bson) {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
        }
        Some((head, rest)) => {
            if !matches!(doc.get(head), Some(Bson::Document(_))) {
                doc.insert(head, Document::new());
            }
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                set_path(inner, rest, value);
            }
        }
    }
}

fn unset_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(inner)) = doc.get_mut(head) {
                unset_path(inner, rest);
            }
        }
    }
}
