//! # srscan
//!
//! Client for a document recognition service: capture a photo from a
//! camera, downscale it locally, upload it with progress and a timeout,
//! and download the session's accumulated results as a spreadsheet.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//! - `capture`: Camera acquisition backends and frame capture
//! - `processing`: Bandwidth-bounded downscaling before upload
//! - `core`: Revocable object handles for in-memory buffers
//! - `session`: Lazily bootstrapped, durable session identifier
//! - `transport`: The remote service contract and its HTTP client
//! - `upload`: The upload state machine and result classification
//! - `export`: Result spreadsheet download
//! - `station`: Lifecycle wrapper tying the above together
//! - `config`: Configuration management and validation
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use srscan::capture::sources::SyntheticDevices;
//! use srscan::config::ClientConfig;
//! use srscan::session::{FileStore, StoredSessionProvider};
//! use srscan::transport::HttpTransport;
//! use srscan::{ScanStation, Size};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::default();
//! let transport = Arc::new(HttpTransport::new(&config.base_url, Duration::from_secs(60))?);
//! let store = Arc::new(FileStore::new(&config.storage_path));
//! let sessions = Arc::new(StoredSessionProvider::new(store, transport.clone()));
//! let devices = Arc::new(SyntheticDevices::new(Size { w: 1280, h: 720 }));
//!
//! let mut station = ScanStation::new(&config, devices, transport, sessions);
//! station.init().await;
//! station.session_ready().await;
//! station.capture().await?;
//! let outcome = station.upload().await?;
//! println!("{:?}", outcome.message());
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod export;
pub mod messages;
pub mod processing;
pub mod session;
pub mod station;
pub mod transport;
pub mod upload;

pub use error::{ScanError, ScanResult};
pub use srscan_scale::Size;
pub use station::ScanStation;
