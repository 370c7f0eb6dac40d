use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde_json::Value;
use tokio::sync::watch;

use super::INITIAL_PROGRESS;
use super::state::{UploadPhase, UploadSnapshot};
use crate::capture::CapturedImage;
use crate::error::{ScanError, ScanResult};
use crate::messages;
use crate::processing::{DEFAULT_MAX_WIDTH, DEFAULT_QUALITY, Downscaler};
use crate::session::SessionProvider;
use crate::transport::{ProgressEvent, ProgressSink, ScanTransport, ScanUpload, TransportError};

/// Tunables for [`UploadPipeline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadSettings {
    /// Overall bound on the send, racing the request.
    pub timeout: Duration,
    pub max_width: u32,
    pub quality: f32,
    /// Delay before a completed progress bar drops back to 0.
    pub reset_delay: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(30_000),
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            reset_delay: Duration::from_millis(300),
        }
    }
}

/// Why an attempt failed, in the order the cases are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFailure {
    SessionLoading,
    ImageProcessing,
    Timeout { after: Duration },
    /// No HTTP status was obtained.
    Network,
    ServerDetail(String),
    Generic,
}

impl UploadFailure {
    pub fn message(&self) -> String {
        match self {
            Self::SessionLoading => messages::SESSION_LOADING.to_owned(),
            Self::ImageProcessing => messages::IMAGE_PROCESSING.to_owned(),
            Self::Timeout { after } => messages::timeout(*after),
            Self::Network => messages::NETWORK.to_owned(),
            Self::ServerDetail(detail) => messages::server_detail(detail),
            Self::Generic => messages::GENERIC_UPLOAD.to_owned(),
        }
    }
}

/// Classify a transport failure that was not a timeout.
pub fn classify(err: &TransportError) -> UploadFailure {
    if err.status.is_none() {
        return UploadFailure::Network;
    }
    match err.detail() {
        Some(detail) => UploadFailure::ServerDetail(detail),
        None => UploadFailure::Generic,
    }
}

/// Human-readable text for a success body.
///
/// `SR: <sr> (rows: <rows>)` when the body carries a non-empty `sr` string
/// and a numeric `rows`; the pretty-printed body otherwise.
pub fn summarize(body: &Value) -> String {
    match (body.get("sr"), body.get("rows")) {
        (Some(Value::String(sr)), Some(Value::Number(rows))) if !sr.is_empty() => messages::scan_summary(sr, rows),
        _ => serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string()),
    }
}

/// Terminal result of [`UploadPipeline::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Nothing captured yet.
    Skipped,
    Succeeded { message: String },
    Failed { failure: UploadFailure },
}

impl UploadOutcome {
    /// The text that was published as the result, if any.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Skipped => None,
            Self::Succeeded { message } => Some(message.clone()),
            Self::Failed { failure } => Some(failure.message()),
        }
    }
}

pub struct UploadPipeline {
    transport: Arc<dyn ScanTransport>,
    sessions: Arc<dyn SessionProvider>,
    downscaler: Downscaler,
    settings: UploadSettings,
    state: Arc<watch::Sender<UploadSnapshot>>,
}

impl UploadPipeline {
    pub fn new(
        transport: Arc<dyn ScanTransport>,
        sessions: Arc<dyn SessionProvider>,
        downscaler: Downscaler,
        settings: UploadSettings,
    ) -> Self {
        let (state, _) = watch::channel(UploadSnapshot::default());
        Self {
            transport,
            sessions,
            downscaler,
            settings,
            state: Arc::new(state),
        }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.state.borrow().clone()
    }

    /// Publish a result produced outside an upload, such as a camera failure.
    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.send_modify(|s| s.result = Some(message));
    }

    /// Run one upload attempt for `image`.
    ///
    /// Every failure the user can act on resolves to
    /// [`UploadOutcome::Failed`] with the transient state reset. `Err` is
    /// reserved for misuse, i.e. starting while another attempt is in
    /// flight.
    pub async fn upload(&self, image: Option<&CapturedImage>) -> ScanResult<UploadOutcome> {
        let Some(image) = image else {
            debug!("Upload requested with nothing captured");
            return Ok(UploadOutcome::Skipped);
        };
        let source = Arc::clone(image.bytes());
        let attempt = self.begin()?;
        let _slot = SlotGuard {
            state: Arc::clone(&self.state),
            attempt,
        };

        if self.sessions.current().id().is_none() {
            return self.fail(attempt, UploadFailure::SessionLoading);
        }

        self.advance(UploadPhase::Resizing)?;
        let resized = match self
            .downscaler
            .resize(&source, self.settings.max_width, self.settings.quality)
            .await
        {
            Ok(resized) => resized,
            Err(err) => {
                error!("Resize before upload failed: {err}");
                return self.fail(attempt, UploadFailure::ImageProcessing);
            }
        };

        self.advance(UploadPhase::AwaitingSession)?;
        let Some(session) = self.sessions.current().id().cloned() else {
            return self.fail(attempt, UploadFailure::SessionLoading);
        };

        self.advance(UploadPhase::Sending)?;
        self.state.send_modify(|s| s.progress = INITIAL_PROGRESS);
        info!(
            "Uploading attempt {attempt}: {}x{}, {} bytes, session {session}",
            resized.size.w,
            resized.size.h,
            resized.bytes.len()
        );

        let send = self
            .transport
            .upload_scan(&session, ScanUpload::jpeg(resized.bytes), self.progress_sink(attempt));
        match tokio::time::timeout(self.settings.timeout, send).await {
            Err(_) => {
                error!("Upload attempt {attempt} timed out after {:?}", self.settings.timeout);
                self.fail(
                    attempt,
                    UploadFailure::Timeout {
                        after: self.settings.timeout,
                    },
                )
            }
            Ok(Err(err)) => {
                error!("Upload attempt {attempt} failed: {err}");
                self.fail(attempt, classify(&err))
            }
            Ok(Ok(body)) => self.succeed(attempt, &body),
        }
    }

    /// Claim the upload slot; rejects re-entry.
    fn begin(&self) -> ScanResult<u64> {
        let mut busy = None;
        let mut attempt = 0;
        self.state.send_if_modified(|s| {
            if s.uploading || s.phase != UploadPhase::Idle {
                busy = Some(s.phase);
                return false;
            }
            s.attempt += 1;
            s.uploading = true;
            s.progress = 0;
            s.result = None;
            attempt = s.attempt;
            true
        });
        match busy {
            Some(phase) => Err(ScanError::state(
                phase.to_string(),
                "start upload",
                "an upload is already in flight",
            )),
            None => Ok(attempt),
        }
    }

    fn advance(&self, next: UploadPhase) -> ScanResult<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|s| match s.phase.transition(next) {
            Ok(phase) => {
                s.phase = phase;
                true
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }

    /// Terminal step, then straight back to `Idle`.
    fn finish(&self, terminal: UploadPhase, progress: u8, result: String) -> ScanResult<()> {
        self.advance(terminal)?;
        self.state.send_modify(|s| {
            s.progress = progress;
            s.uploading = false;
            s.result = Some(result);
        });
        self.advance(UploadPhase::Idle)
    }

    fn fail(&self, attempt: u64, failure: UploadFailure) -> ScanResult<UploadOutcome> {
        debug!("Attempt {attempt} failed: {failure:?}");
        self.finish(UploadPhase::Failed, 0, failure.message())?;
        Ok(UploadOutcome::Failed { failure })
    }

    fn succeed(&self, attempt: u64, body: &Value) -> ScanResult<UploadOutcome> {
        let message = summarize(body);
        info!("Attempt {attempt} succeeded: {message}");
        self.finish(UploadPhase::Succeeded, 100, message.clone())?;

        let state = Arc::clone(&self.state);
        let delay = self.settings.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_if_modified(|s| {
                if s.attempt != attempt || s.uploading {
                    return false;
                }
                s.progress = 0;
                true
            });
        });
        Ok(UploadOutcome::Succeeded { message })
    }

    /// Byte progress for `attempt`; late events from older attempts and
    /// regressions are dropped.
    fn progress_sink(&self, attempt: u64) -> ProgressSink {
        let state = Arc::clone(&self.state);
        Arc::new(move |event: ProgressEvent| {
            let pct = event.percent();
            state.send_if_modified(|s| {
                if s.attempt != attempt || s.phase != UploadPhase::Sending || pct <= s.progress {
                    return false;
                }
                s.progress = pct;
                true
            });
        })
    }
}

/// Frees the upload slot if an attempt is dropped before reaching a
/// terminal phase (task aborted, future dropped, early `?` return).
struct SlotGuard {
    state: Arc<watch::Sender<UploadSnapshot>>,
    attempt: u64,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let attempt = self.attempt;
        self.state.send_if_modified(|s| {
            if s.attempt != attempt || !s.uploading {
                return false;
            }
            warn!("Upload attempt {attempt} abandoned in {}", s.phase);
            s.phase = UploadPhase::Idle;
            s.uploading = false;
            s.progress = 0;
            true
        });
    }
}
