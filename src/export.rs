//! # Export Trigger
//!
//! Downloads the session's result spreadsheet and saves it as
//! `results.xlsx`. The bytes land in a temporary file inside the target
//! directory first and are renamed into place, so a half-written
//! spreadsheet never appears under the final name.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use tempfile::NamedTempFile;

use crate::error::{ScanError, ScanResult};
use crate::session::SessionProvider;
use crate::transport::{EXPORT_FILE_NAME, ScanTransport};

pub struct ExportTrigger {
    transport: Arc<dyn ScanTransport>,
    sessions: Arc<dyn SessionProvider>,
}

impl ExportTrigger {
    pub fn new(transport: Arc<dyn ScanTransport>, sessions: Arc<dyn SessionProvider>) -> Self {
        Self { transport, sessions }
    }

    /// Fetch the export into `dest_dir`.
    ///
    /// Returns `Ok(None)` without any request when there is no session.
    /// Transport failures surface as [`ScanError::Transport`].
    pub async fn download_export(&self, dest_dir: &Path) -> ScanResult<Option<PathBuf>> {
        let Some(session) = self.sessions.current().id().cloned() else {
            debug!("Export skipped: no session yet");
            return Ok(None);
        };

        let bytes = self.transport.download_results(&session).await?;
        let dest_dir = dest_dir.to_path_buf();
        let target = dest_dir.join(EXPORT_FILE_NAME);
        let written = target.clone();
        let len = bytes.len();

        tokio::task::spawn_blocking(move || save(&dest_dir, &written, &bytes))
            .await
            .map_err(|e| ScanError::task("export save", e))??;

        info!("Export for session {session} saved to {} ({len} bytes)", target.display());
        Ok(Some(target))
    }
}

fn save(dir: &Path, target: &Path, bytes: &[u8]) -> ScanResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| ScanError::io("create export directory", e))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ScanError::io("create export temp file", e))?;
    tmp.write_all(bytes)
        .map_err(|e| ScanError::io("write export", e))?;
    tmp.persist(target)
        .map_err(|e| ScanError::io("persist export", e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_replaces_previous_export() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join(EXPORT_FILE_NAME);
        save(dir.path(), &target, b"first").unwrap();
        save(dir.path(), &target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out/exports");
        let target = nested.join(EXPORT_FILE_NAME);
        save(&nested, &target, b"x").unwrap();
        assert!(target.exists());
    }
}
