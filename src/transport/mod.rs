//! # Remote Service Transport
//!
//! The recognition service is an opaque HTTP collaborator:
//!
//! | Request                                   | Response                          |
//! |-------------------------------------------|-----------------------------------|
//! | `GET /session`                            | `{ "session_id": string }`        |
//! | `POST /scan?session_id=<id>` (multipart)  | `{ "sr": string, "rows": n, .. }` |
//! | `GET /download-results?session_id=<id>`   | spreadsheet bytes                 |
//! | `GET /health`                             | [`HealthReport`]                  |
//! | `GET /api/status`                         | [`ApiStatus`]                     |
//! | `GET /api/results-count`                  | [`ResultsCount`]                  |
//!
//! Everything above the transport talks to [`ScanTransport`], so tests can
//! substitute scripted responses and the upload pipeline stays free of
//! HTTP details.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionId;

pub use http::HttpTransport;

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";
/// File name announced for the image part.
pub const UPLOAD_FILE_NAME: &str = "capture.jpg";
/// Local file name for the exported spreadsheet.
pub const EXPORT_FILE_NAME: &str = "results.xlsx";
/// Query parameter scoping requests to a session.
pub const SESSION_QUERY: &str = "session_id";

/// Image payload for `POST /scan`.
#[derive(Debug, Clone)]
pub struct ScanUpload {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl ScanUpload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "image/jpeg",
        }
    }
}

/// Byte-level upload progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    /// Total body size when known.
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Percentage 0..=100; an unknown or zero total counts as 1 byte.
    pub fn percent(&self) -> u8 {
        let total = self.total.unwrap_or(0).max(1);
        let pct = (100.0 * self.loaded as f64 / total as f64).round();
        pct.clamp(0.0, 100.0) as u8
    }
}

/// Callback receiving upload progress.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Failure talking to the service.
///
/// `status == None` means no HTTP status was ever obtained: the server was
/// unreachable or the connection broke before a response arrived.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct TransportError {
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub reason: String,
}

impl TransportError {
    /// No response at all.
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            reason: reason.into(),
        }
    }

    /// Non-2xx response, with its body when it parsed as JSON.
    pub fn http(status: u16, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            body,
            reason: format!("HTTP {status}"),
        }
    }

    /// A 2xx response whose body could not be interpreted.
    pub fn decode(status: u16, reason: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            body: None,
            reason: reason.into(),
        }
    }

    /// Server-provided `detail`, if any.
    ///
    /// Strings are returned verbatim; structured details (validation error
    /// lists) are serialized as JSON. `null` and empty strings count as
    /// absent.
    pub fn detail(&self) -> Option<String> {
        match self.body.as_ref()?.get("detail")? {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        Self {
            status: error.status().map(|s| s.as_u16()),
            body: None,
            reason: error.to_string(),
        }
    }
}

/// `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// `GET /api/status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiStatus {
    pub backend_running: bool,
    pub tesseract_available: bool,
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

/// `GET /api/results-count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsCount {
    pub count: u64,
    #[serde(default)]
    pub last_updated: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Requests the client makes against the recognition service.
#[async_trait]
pub trait ScanTransport: Send + Sync {
    /// Ask the service for a new session identifier.
    async fn create_session(&self) -> Result<SessionId, TransportError>;

    /// Upload one image for recognition, reporting body progress.
    async fn upload_scan(
        &self,
        session: &SessionId,
        upload: ScanUpload,
        progress: ProgressSink,
    ) -> Result<Value, TransportError>;

    /// Fetch the session's result spreadsheet.
    async fn download_results(&self, session: &SessionId) -> Result<Vec<u8>, TransportError>;

    async fn health(&self) -> Result<HealthReport, TransportError> {
        Err(TransportError::unreachable("health endpoint not supported"))
    }

    async fn api_status(&self) -> Result<ApiStatus, TransportError> {
        Err(TransportError::unreachable("status endpoint not supported"))
    }

    async fn results_count(&self, _session: Option<&SessionId>) -> Result<ResultsCount, TransportError> {
        Err(TransportError::unreachable("results count endpoint not supported"))
    }
}
