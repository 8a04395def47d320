use axum::http::HeaderMap;

use crate::error::AppError;

/// Workspace resolved from the presented bearer token
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub workspace_id: String,
}

/// Pull the bearer token out of the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get(http::header::AUTHORIZATION)
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?;
    let value = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Malformed Authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::unauthorized("Expected Bearer authorization"))?
        .trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Empty bearer token"));
    }
    Ok(token)
}
