//! # Client Configuration
//!
//! Settings for talking to the recognition service and shaping captures.
//! Values come from built-in defaults, optionally overridden by a TOML
//! file, optionally overridden again by command-line flags.
//!
//! ## Configuration Parameters
//!
//! | Parameter | Type | Default | Description |
//! |-----------|------|---------|-------------|
//! | `base_url` | `String` | `http://localhost:8000` | Service root |
//! | `timeout_ms` | `u64` | 30000 | Overall bound on one upload |
//! | `max_width` | `u32` | 1000 | Upload width bound (never upscales) |
//! | `upload_quality` | `f32` | 0.7 | JPEG quality of the upload, in (0, 1] |
//! | `capture_quality` | `f32` | 0.9 | JPEG quality of the master capture |
//! | `fallback_width` | `u32` | 640 | Raster width before the stream reports one |
//! | `fallback_height` | `u32` | 480 | Raster height before the stream reports one |
//! | `progress_reset_ms` | `u64` | 300 | Delay before a full progress bar resets |
//! | `storage_path` | path | `<data dir>/srscan/storage.json` | Durable session storage |
//! | `download_dir` | path | `.` | Where exports are saved |
//!
//! ## Examples
//!
//! ```rust
//! use srscan::config::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(
//!     r#"
//!     base_url = "http://scanner.local:8000"
//!     timeout_ms = 10000
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.max_width, 1000);
//! assert!(config.validate().is_ok());
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use srscan_scale::Size;

use crate::error::{ScanError, ScanResult};
use crate::upload::UploadSettings;

/// Configuration for a scan client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Root URL of the recognition service. A trailing slash is optional.
    pub base_url: String,

    /// Overall upload timeout in milliseconds. Must be greater than 0.
    pub timeout_ms: u64,

    /// Uploads wider than this are downscaled. Must be greater than 0.
    pub max_width: u32,

    /// JPEG quality for the bandwidth-bounded upload.
    pub upload_quality: f32,

    /// JPEG quality for the master capture.
    pub capture_quality: f32,

    pub fallback_width: u32,
    pub fallback_height: u32,

    pub progress_reset_ms: u64,

    /// JSON file holding the session identifier across runs.
    pub storage_path: PathBuf,

    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_ms: 30_000,
            max_width: 1000,
            upload_quality: 0.7,
            capture_quality: 0.9,
            fallback_width: 640,
            fallback_height: 480,
            progress_reset_ms: 300,
            storage_path: default_storage_path(),
            download_dir: PathBuf::from("."),
        }
    }
}

/// `<data dir>/srscan/storage.json`, or a relative `.srscan/` when the
/// platform has no data directory.
pub fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("srscan"))
        .unwrap_or_else(|| PathBuf::from(".srscan"))
        .join("storage.json")
}

impl ClientConfig {
    pub fn from_toml_str(source: &str) -> ScanResult<Self> {
        toml::from_str(source).map_err(|e| ScanError::config("toml", "<inline>", e.to_string()))
    }

    /// Load a TOML file. Missing keys keep their defaults; unknown keys are
    /// rejected.
    pub fn from_toml_file(path: &Path) -> ScanResult<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ScanError::io("read config", e))?;
        toml::from_str(&source)
            .map_err(|e| ScanError::config("toml", path.display().to_string(), e.to_string()))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> ScanResult<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ScanError::config("base_url", &self.base_url, e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ScanError::config("base_url", &self.base_url, "scheme must be http or https"));
        }
        if self.timeout_ms == 0 {
            return Err(ScanError::config("timeout_ms", "0", "must be greater than 0"));
        }
        if self.max_width == 0 {
            return Err(ScanError::config("max_width", "0", "must be greater than 0"));
        }
        for (field, value) in [
            ("upload_quality", self.upload_quality),
            ("capture_quality", self.capture_quality),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ScanError::config(field, value.to_string(), "must be in (0, 1]"));
            }
        }
        if self.fallback_width == 0 || self.fallback_height == 0 {
            return Err(ScanError::config(
                "fallback_width/fallback_height",
                format!("{}x{}", self.fallback_width, self.fallback_height),
                "must both be greater than 0",
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn fallback_size(&self) -> Size {
        Size {
            w: self.fallback_width,
            h: self.fallback_height,
        }
    }

    pub fn upload_settings(&self) -> UploadSettings {
        UploadSettings {
            timeout: self.timeout(),
            max_width: self.max_width,
            quality: self.upload_quality,
            reset_delay: Duration::from_millis(self.progress_reset_ms),
        }
    }
}
