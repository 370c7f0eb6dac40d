//! reqwest-backed [`ScanTransport`].

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    ApiStatus, HealthReport, ProgressEvent, ProgressSink, ResultsCount, SESSION_QUERY, ScanTransport, ScanUpload,
    TransportError, UPLOAD_FIELD, UPLOAD_FILE_NAME,
};
use crate::error::{ScanError, ScanResult};
use crate::session::SessionId;

/// Upload bodies are fed to the connection in chunks of this size; each
/// chunk handed over produces one progress event.
const UPLOAD_CHUNK: usize = 16 * 1024;

#[derive(Deserialize)]
struct SessionBody {
    session_id: String,
}

/// HTTP client for the recognition service.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    /// `request_timeout` bounds the small JSON and download requests. Scan
    /// uploads are bounded by the upload pipeline instead.
    pub fn new(base_url: &str, request_timeout: Duration) -> ScanResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| ScanError::config("base_url", base_url, e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ScanError::config("base_url", base_url, "not a hierarchical URL"));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(concat!("srscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScanError::config("http_client", "reqwest", e.to_string()))?;
        Ok(Self {
            client,
            base,
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str, session: Option<&SessionId>) -> Result<Url, TransportError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| TransportError::unreachable(format!("bad endpoint {path}: {e}")))?;
        if let Some(session) = session {
            url.query_pairs_mut().append_pair(SESSION_QUERY, session.as_str());
        }
        Ok(url)
    }

    async fn get(&self, url: Url) -> Result<Response, TransportError> {
        debug!("GET {url}");
        let response = self.client.get(url).timeout(self.request_timeout).send().await?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TransportError> {
        let response = self.get(url).await?;
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::decode(status, format!("unexpected response body: {e}")))
    }
}

/// Turn non-2xx responses into errors carrying the JSON body, if any.
async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .bytes()
        .await
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());
    Err(TransportError::http(status.as_u16(), body))
}

/// Stream `bytes` in chunks, reporting how much has been handed over.
fn progress_body(bytes: Vec<u8>, progress: ProgressSink) -> Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut loaded = 0u64;
    let stream = futures_util::stream::iter(chunks).map(move |chunk| {
        loaded += chunk.len() as u64;
        progress(ProgressEvent {
            loaded,
            total: Some(total),
        });
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

#[async_trait]
impl ScanTransport for HttpTransport {
    async fn create_session(&self) -> Result<SessionId, TransportError> {
        let url = self.endpoint("session", None)?;
        let body: SessionBody = self.get_json(url).await?;
        SessionId::new(body.session_id).ok_or_else(|| TransportError::decode(200, "empty session_id"))
    }

    async fn upload_scan(
        &self,
        session: &SessionId,
        upload: ScanUpload,
        progress: ProgressSink,
    ) -> Result<Value, TransportError> {
        let url = self.endpoint("scan", Some(session))?;
        let len = upload.bytes.len() as u64;
        let part = Part::stream_with_length(progress_body(upload.bytes, progress), len)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(upload.mime)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        debug!("POST {url} ({len} bytes)");
        let response = check_status(self.client.post(url).multipart(form).send().await?).await?;
        let bytes = response.bytes().await?;
        // Anything that is not JSON is kept as text for display.
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
    }

    async fn download_results(&self, session: &SessionId) -> Result<Vec<u8>, TransportError> {
        let url = self.endpoint("download-results", Some(session))?;
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        self.get_json(self.endpoint("health", None)?).await
    }

    async fn api_status(&self) -> Result<ApiStatus, TransportError> {
        self.get_json(self.endpoint("api/status", None)?).await
    }

    async fn results_count(&self, session: Option<&SessionId>) -> Result<ResultsCount, TransportError> {
        self.get_json(self.endpoint("api/results-count", session)?).await
    }
}
