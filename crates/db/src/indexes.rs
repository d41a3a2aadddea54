use bson::{Document, doc};
use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

/// A uniqueness constraint over one or more fields of a collection.
///
/// Only documents carrying every field are covered, so optional fields (a
/// notification's `task_id`) do not collide when absent.
#[derive(Debug, Clone, Copy)]
pub struct UniqueKey {
    pub collection: &'static str,
    pub fields: &'static [&'static str],
}

pub const UNIQUE_KEYS: &[UniqueKey] = &[
    UniqueKey { collection: "users", fields: &["email"] },
    UniqueKey { collection: "classrooms", fields: &["invitation_code"] },
    UniqueKey { collection: "classroom_members", fields: &["classroom_id", "student_id"] },
    UniqueKey { collection: "task_completions", fields: &["task_id", "student_id"] },
    UniqueKey { collection: "task_submissions", fields: &["task_id", "student_id"] },
    UniqueKey { collection: "notifications", fields: &["user_id", "task_id"] },
    UniqueKey {
        collection: "conversations",
        fields: &["student_id", "teacher_id", "classroom_id"],
    },
];

pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    for key in UNIQUE_KEYS {
        create_indexes(db, key.collection, vec![index_unique(key)]).await?;
    }

    create_indexes(db, "classrooms", vec![index(doc! { "teacher_id": 1, "created_at": -1 })]).await?;
    create_indexes(db, "classroom_members", vec![index(doc! { "student_id": 1 })]).await?;
    create_indexes(db, "tasks", vec![index(doc! { "classroom_id": 1, "due_date": 1 })]).await?;
    create_indexes(
        db,
        "notifications",
        vec![index(doc! { "user_id": 1, "created_at": -1 })],
    )
    .await?;
    create_indexes(
        db,
        "conversations",
        vec![index(doc! { "teacher_id": 1 }), index(doc! { "student_id": 1 })],
    )
    .await?;
    create_indexes(
        db,
        "messages",
        vec![index(doc! { "conversation_id": 1, "created_at": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(key: &UniqueKey) -> IndexModel {
    let mut keys = Document::new();
    let mut partial = Document::new();
    for field in key.fields {
        keys.insert(*field, 1);
        partial.insert(*field, doc! { "$exists": true });
    }
    IndexModel::builder()
        .keys(keys)
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(partial)
                .build(),
        )
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
