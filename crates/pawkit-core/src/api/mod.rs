//! HTTP client for the Pawkit sync API
//!
//! Thin JSON client over the per-resource REST endpoints
//! (`GET /api/<resource>?since=`, `POST`, `PATCH /:id`, `DELETE /:id`) and
//! the session heartbeat endpoint. Errors are classified into the taxonomy
//! the queue drain relies on: transient failures keep the entry, rejections
//! drop it, 401 suspends sync entirely.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{DeviceSession, RecordId, RecordKind, SyncRecord};

/// Errors from the sync API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    /// Network-level failure (DNS, refused connection, timeout)
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// Session is no longer authenticated
    #[error("Unauthorized (401): re-authentication required")]
    Unauthorized,
    /// The server rejected the request as invalid; retrying cannot succeed
    #[error("Rejected by server: {message} ({status})")]
    Rejected { status: u16, message: String },
    /// Server-side failure, safe to retry later
    #[error("Server error: {message} ({status})")]
    Server { status: u16, message: String },
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

impl ApiError {
    /// Whether the failure may resolve on its own (retry on next trigger)
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Server { .. })
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// A record as it travels over the wire
///
/// The resource kind is implied by the URL path, so it is not part of the
/// body; conversions re-attach it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    pub id: RecordId,
    pub workspace_id: String,
    pub data: serde_json::Value,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub deleted_at: Option<i64>,
}

impl WireRecord {
    /// Attach the kind implied by the resource path
    #[must_use]
    pub fn into_record(self, kind: RecordKind) -> SyncRecord {
        SyncRecord {
            id: self.id,
            workspace_id: self.workspace_id,
            kind,
            data: self.data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted: self.deleted,
            deleted_at: self.deleted_at,
        }
    }
}

impl From<&SyncRecord> for WireRecord {
    fn from(record: &SyncRecord) -> Self {
        Self {
            id: record.id,
            workspace_id: record.workspace_id.clone(),
            data: record.data.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted: record.deleted,
            deleted_at: record.deleted_at,
        }
    }
}

/// Client for the Pawkit sync API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// Create a client for the given API base URL and bearer token
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_endpoint(base_url.into())?;
        Ok(Self {
            base_url,
            token: token.into(),
            client: reqwest::Client::builder().build()?,
        })
    }

    fn resource_url(&self, kind: RecordKind) -> String {
        format!("{}/api/{}", self.base_url, kind.resource())
    }

    /// Fetch all records of `kind` changed after `since` (unix ms),
    /// soft-deleted ones included
    ///
    /// `since = 0` requests the full history (initial sync / full resync).
    pub async fn pull_since(&self, kind: RecordKind, since: i64) -> ApiResult<Vec<SyncRecord>> {
        let mut request = self.client.get(self.resource_url(kind)).bearer_auth(&self.token);
        if since > 0 {
            request = request.query(&[("since", rfc3339_millis(since))]);
        }

        let response = request.send().await?;
        let wire: Vec<WireRecord> = json_body(response).await?;
        Ok(wire.into_iter().map(|w| w.into_record(kind)).collect())
    }

    /// Create a record; the server upserts, so resending is a no-op
    pub async fn create(&self, record: &SyncRecord) -> ApiResult<SyncRecord> {
        let response = self
            .client
            .post(self.resource_url(record.kind))
            .bearer_auth(&self.token)
            .json(&WireRecord::from(record))
            .send()
            .await?;
        let wire: WireRecord = json_body(response).await?;
        Ok(wire.into_record(record.kind))
    }

    /// Update a record; stale writes are ignored server-side (LWW)
    pub async fn update(&self, record: &SyncRecord) -> ApiResult<SyncRecord> {
        let response = self
            .client
            .patch(format!("{}/{}", self.resource_url(record.kind), record.id))
            .bearer_auth(&self.token)
            .json(&WireRecord::from(record))
            .send()
            .await?;
        let wire: WireRecord = json_body(response).await?;
        Ok(wire.into_record(record.kind))
    }

    /// Soft-delete a record; timestamps guard against clobbering newer edits
    pub async fn delete(
        &self,
        kind: RecordKind,
        id: RecordId,
        updated_at: i64,
        deleted_at: i64,
    ) -> ApiResult<SyncRecord> {
        let response = self
            .client
            .delete(format!("{}/{id}", self.resource_url(kind)))
            .bearer_auth(&self.token)
            .query(&[
                ("updatedAt", updated_at.to_string()),
                ("deletedAt", deleted_at.to_string()),
            ])
            .send()
            .await?;
        let wire: WireRecord = json_body(response).await?;
        Ok(wire.into_record(kind))
    }

    /// Report this session as alive
    pub async fn heartbeat(&self, session: &DeviceSession) -> ApiResult<()> {
        let response = self
            .client
            .post(format!("{}/api/sessions/heartbeat", self.base_url))
            .bearer_auth(&self.token)
            .json(session)
            .send()
            .await?;
        check_status(&response)?;
        Ok(())
    }

    /// Sessions that have heartbeaten recently
    pub async fn active_sessions(&self) -> ApiResult<Vec<DeviceSession>> {
        let response = self
            .client
            .get(format!("{}/api/sessions/heartbeat", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;
        json_body(response).await
    }
}

/// Classify a non-success status into the error taxonomy
fn check_status(response: &Response) -> ApiResult<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(classify(status, None))
}

async fn json_body<T: for<'de> Deserialize<'de>>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify(status, Some(&body)));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| ApiError::InvalidPayload(e.to_string()))
}

fn classify(status: StatusCode, body: Option<&str>) -> ApiError {
    let message = body.map_or_else(
        || format!("HTTP {}", status.as_u16()),
        parse_error_message,
    );
    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized
    } else if status == StatusCode::TOO_MANY_REQUESTS {
        // Backpressure, not rejection: retry on the next trigger
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    } else if status.is_client_error() {
        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        ApiError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_error_message(body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "no error body".to_string()
    } else {
        trimmed.to_string()
    }
}

fn rfc3339_millis(unix_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(unix_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn normalize_endpoint(raw: String) -> ApiResult<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(ApiError::InvalidConfiguration(
            "API base URL must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(ApiError::InvalidConfiguration(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.example.com".to_string()).is_err());
    }

    #[test]
    fn normalize_endpoint_trims_trailing_slash() {
        let url = normalize_endpoint("https://api.pawkit.app/".to_string()).unwrap();
        assert_eq!(url, "https://api.pawkit.app");
    }

    #[test]
    fn classify_maps_status_families() {
        assert!(matches!(
            classify(StatusCode::UNAUTHORIZED, None),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, Some("{\"error\":\"bad card\"}")),
            ApiError::Rejected { status: 422, .. }
        ));
        assert!(matches!(
            classify(StatusCode::BAD_GATEWAY, None),
            ApiError::Server { status: 502, .. }
        ));
        // Rate limiting retries later instead of dropping the entry
        assert!(classify(StatusCode::TOO_MANY_REQUESTS, None).is_transient());
    }

    #[test]
    fn transient_classification() {
        let server = classify(StatusCode::INTERNAL_SERVER_ERROR, None);
        assert!(server.is_transient());

        let rejected = classify(StatusCode::BAD_REQUEST, None);
        assert!(!rejected.is_transient());

        let auth = classify(StatusCode::UNAUTHORIZED, None);
        assert!(!auth.is_transient());
    }

    #[test]
    fn rfc3339_since_param() {
        assert_eq!(rfc3339_millis(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(rfc3339_millis(1_704_067_200_000), "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn wire_record_defaults_tombstone_fields() {
        let wire: WireRecord = serde_json::from_str(
            r#"{"id":"018d3b2e-7c1a-7000-8000-000000000000","workspaceId":"ws-1",
                "data":{},"createdAt":1,"updatedAt":2}"#,
        )
        .unwrap();
        assert!(!wire.deleted);
        assert_eq!(wire.deleted_at, None);
    }
}
