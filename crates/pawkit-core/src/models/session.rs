//! Device session model

use serde::{Deserialize, Serialize};

/// Identity and labels for one running client
///
/// `device_id` is persisted per installation; `session_id` is ephemeral per
/// process. The labels are purely for "viewing from another device" UX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSession {
    pub device_id: String,
    pub session_id: String,
    pub device_name: String,
    pub browser: String,
    pub os: String,
    /// Last heartbeat time (unix ms)
    pub last_active_at: i64,
}

impl DeviceSession {
    /// Create a session with a fresh last-active timestamp
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        session_id: impl Into<String>,
        device_name: impl Into<String>,
        browser: impl Into<String>,
        os: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            session_id: session_id.into(),
            device_name: device_name.into(),
            browser: browser.into(),
            os: os.into(),
            last_active_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
