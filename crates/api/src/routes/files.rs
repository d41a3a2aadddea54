use axum::{
    extract::{Path, State},
    response::Response,
};

use super::file_response;
use crate::{error::ApiError, state::AppState};

/// Serves objects of public buckets without authentication.
pub async fn public_file(
    State(state): State<AppState>,
    Path((bucket, path)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    if !state.storage.is_public(&bucket) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }
    let object = state.storage.download(&bucket, &path).await?;
    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    file_response(object, &name, true)
}
