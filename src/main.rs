use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use log::{info, warn};

use srscan::capture::MediaDevices;
use srscan::capture::sources::{StillImageDevices, SyntheticDevices};
use srscan::config::ClientConfig;
use srscan::session::{FileStore, SessionProvider, SessionState, StoredSessionProvider};
use srscan::transport::{HttpTransport, ScanTransport};
use srscan::upload::UploadOutcome;
use srscan::{ScanStation, Size};

/// Capture a document photo, upload it for recognition, export results.
#[derive(Parser, Debug)]
#[command(name = "srscan", version)]
#[command(about = "📷 Capture, upload and export service-request scans")]
#[command(long_about = "Capture a photo from a camera (or a picture on disk), downscale it, upload it to the
recognition service and print the recognised SR number. Results accumulate per session and can be
exported as a spreadsheet.")]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true, help = "Load settings from a TOML file")]
    config: Option<PathBuf>,

    /// Service root URL
    #[arg(long, global = true, help = "Recognition service URL, e.g. http://localhost:8000")]
    base_url: Option<String>,

    /// Upload timeout
    #[arg(long, global = true, help = "Upload timeout: 500ms, 30s (30 seconds), 2m (2 minutes)")]
    timeout: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture one frame and upload it
    Scan {
        /// Use a picture on disk as the camera
        #[arg(long, conflicts_with = "camera")]
        image: Option<PathBuf>,

        /// Use a webcam by index
        #[arg(long)]
        camera: Option<u32>,

        /// Test pattern size when neither --image nor --camera is given
        #[arg(long, default_value = "1280x720", help = "Synthetic feed size, WIDTHxHEIGHT")]
        synthetic: String,
    },
    /// Download the session's results spreadsheet
    Export {
        #[arg(short, long, help = "Directory to save results.xlsx into")]
        out: Option<PathBuf>,
    },
    /// Ensure a session exists and print its identifier
    Session,
    /// Query the service's health and status endpoints
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let transport: Arc<dyn ScanTransport> = Arc::new(
        HttpTransport::new(&config.base_url, config.timeout()).context("Failed to build HTTP client")?,
    );
    let store = Arc::new(FileStore::new(&config.storage_path));
    let sessions: Arc<dyn SessionProvider> = Arc::new(StoredSessionProvider::new(store, Arc::clone(&transport)));

    match args.command {
        Command::Scan {
            image,
            camera,
            synthetic,
        } => {
            let devices = select_devices(image, camera, &synthetic)?;
            scan(&config, devices, transport, sessions).await
        }
        Command::Export { out } => {
            sessions.ensure_session().await.context("No session available")?;
            let dest = out.unwrap_or_else(|| config.download_dir.clone());
            let trigger = srscan::export::ExportTrigger::new(transport, sessions);
            match trigger.download_export(&dest).await.context("Export failed")? {
                Some(path) => println!("{}", path.display()),
                None => bail!("No session yet; run `srscan session` first"),
            }
            Ok(())
        }
        Command::Session => {
            match sessions.ensure_session().await.context("Session bootstrap failed")? {
                SessionState::Ready(id) => println!("{id}"),
                other => bail!("Session not ready: {other:?}"),
            }
            Ok(())
        }
        Command::Status => status(transport.as_ref(), sessions.as_ref()).await,
    }
}

fn load_config(args: &Args) -> Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout) = &args.timeout {
        config.timeout_ms = u64::try_from(parse_duration(timeout)?.as_millis())?;
    }
    config.validate()?;
    Ok(config)
}

fn select_devices(image: Option<PathBuf>, camera: Option<u32>, synthetic: &str) -> Result<Arc<dyn MediaDevices>> {
    if let Some(path) = image {
        return Ok(Arc::new(StillImageDevices::new(path)));
    }
    if let Some(index) = camera {
        return webcam(index);
    }
    Ok(Arc::new(SyntheticDevices::new(parse_size(synthetic)?)))
}

#[cfg(feature = "camera")]
fn webcam(index: u32) -> Result<Arc<dyn MediaDevices>> {
    Ok(Arc::new(srscan::capture::sources::NokhwaDevices::new(index)))
}

#[cfg(not(feature = "camera"))]
fn webcam(_index: u32) -> Result<Arc<dyn MediaDevices>> {
    bail!("This build has no webcam support; rebuild with `--features camera` or use --image")
}

async fn scan(
    config: &ClientConfig,
    devices: Arc<dyn MediaDevices>,
    transport: Arc<dyn ScanTransport>,
    sessions: Arc<dyn SessionProvider>,
) -> Result<()> {
    let mut station = ScanStation::new(config, devices, transport, sessions);
    station.init().await;
    if !station.camera_active() {
        bail!(station.result().unwrap_or_else(|| "camera unavailable".into()));
    }
    if station.session_ready().await.id().is_none() {
        warn!("No session yet; the upload will report that the system is still loading");
    }

    let image = station.capture().await.context("Capture failed")?;
    info!("Captured {}x{} as {}", image.size().w, image.size().h, image.preview());

    let outcome = station.upload().await?;
    station.teardown();
    match outcome {
        UploadOutcome::Succeeded { message } => {
            println!("{message}");
            Ok(())
        }
        UploadOutcome::Failed { failure } => Err(anyhow!(failure.message())),
        UploadOutcome::Skipped => bail!("Nothing was captured"),
    }
}

async fn status(transport: &dyn ScanTransport, sessions: &dyn SessionProvider) -> Result<()> {
    let health = transport.health().await.context("Health check failed")?;
    println!(
        "service: {} ({})",
        health.service.as_deref().unwrap_or("unknown"),
        health.status
    );
    if let Some(version) = &health.version {
        println!("version: {version}");
    }

    match transport.api_status().await {
        Ok(api) => {
            println!("backend running: {}", api.backend_running);
            println!("tesseract available: {}", api.tesseract_available);
        }
        Err(err) => warn!("api/status unavailable: {err}"),
    }

    let session = sessions.current();
    match transport.results_count(session.id()).await {
        Ok(count) => println!("results: {}", count.count),
        Err(err) => warn!("api/results-count unavailable: {err}"),
    }
    Ok(())
}

/// Parse duration string like "500ms", "30s", "2m" into a Duration
fn parse_duration(duration: &str) -> Result<Duration> {
    if let Ok(seconds) = duration.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }
    let (num_str, unit) = if let Some(num) = duration.strip_suffix("ms") {
        (num, "ms")
    } else if duration.len() >= 2 {
        duration.split_at(duration.len() - 1)
    } else {
        return Err(anyhow!("Invalid duration format: {}", duration));
    };
    let num: u64 = num_str
        .parse()
        .map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    match unit {
        "ms" => Ok(Duration::from_millis(num)),
        "s" => Ok(Duration::from_secs(num)),
        "m" => Ok(Duration::from_secs(num * 60)),
        _ => Err(anyhow!(
            "Invalid duration unit: {}. Use 'ms', 's' for seconds or 'm' for minutes",
            unit
        )),
    }
}

/// Parse "WIDTHxHEIGHT"
fn parse_size(size: &str) -> Result<Size> {
    let (w, h) = size
        .split_once(['x', 'X'])
        .ok_or_else(|| anyhow!("Invalid size: {}. Use WIDTHxHEIGHT, e.g. 1280x720", size))?;
    let parsed = Size {
        w: w.trim().parse().with_context(|| format!("Invalid width in {size}"))?,
        h: h.trim().parse().with_context(|| format!("Invalid height in {size}"))?,
    };
    if parsed.w == 0 || parsed.h == 0 {
        bail!("Size must be non-zero: {}", size);
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("45s").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("1h").is_err());
        assert!(parse_duration("x").is_err());
    }

    #[test]
    fn sizes() {
        assert_eq!(parse_size("1280x720").unwrap(), Size { w: 1280, h: 720 });
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("1280").is_err());
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let args = Args::try_parse_from(["srscan", "export", "--out", "/tmp", "--base-url", "http://h:1"]).unwrap();
        assert_eq!(args.base_url.as_deref(), Some("http://h:1"));
        assert!(matches!(args.command, Command::Export { out: Some(_) }));
    }
}
