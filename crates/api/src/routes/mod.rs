pub mod auth;
pub mod calendar;
pub mod chat;
pub mod classroom;
pub mod files;
pub mod invite;
pub mod notification;
pub mod submission;
pub mod task;

use std::collections::HashMap;

use axum::{
    body::Body,
    extract::Multipart,
    http::header,
    response::Response,
};
use bson::{DateTime, oid::ObjectId};
use studyx_services::storage::StoredObject;

use crate::error::ApiError;

pub(crate) fn parse_id(raw: &str, what: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {}", what)))
}

pub(crate) fn fmt_time(t: DateTime) -> String {
    t.try_to_rfc3339_string().unwrap_or_default()
}

pub(crate) struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Text fields and the (single) file of a multipart request.
pub(crate) struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart, file_field: &str) -> Result<Self, ApiError> {
        let mut fields = HashMap::new();
        let mut file = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            if name == file_field {
                let file_name = field.file_name().unwrap_or("unnamed").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                if !bytes.is_empty() {
                    file = Some(UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?;
                fields.insert(name, text);
            }
        }

        Ok(Self { fields, file })
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    pub fn required(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing '{}' field", name)))
    }
}

pub(crate) fn file_response(object: StoredObject, file_name: &str, inline: bool) -> Result<Response, ApiError> {
    let disposition = if inline { "inline" } else { "attachment" };
    Response::builder()
        .header(header::CONTENT_TYPE, object.content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("{}; filename=\"{}\"", disposition, file_name.replace('"', "")),
        )
        .body(Body::from(object.bytes))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
