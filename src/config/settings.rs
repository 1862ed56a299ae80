//! Configuration settings for TrainPanel
//!
//! Defines CLI arguments (with environment fallbacks), defaults, and the
//! resolved runtime configuration handed to the web layer.

use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, PanelError, Result};

/// Default compute region for buckets and jobs
pub const DEFAULT_REGION: &str = "europe-west4";

/// Default zone of the VM hosting the panel
pub const DEFAULT_ZONE: &str = "europe-west4-a";

/// Default VM instance name
pub const DEFAULT_INSTANCE: &str = "ddsp-docker";

/// Prefix for time-seeded bucket names
pub const BUCKET_PREFIX: &str = "gs://ddsp-train-";

/// TrainPanel - web control panel for remote training jobs
#[derive(Parser, Debug, Clone)]
#[command(name = "trainpanel")]
#[command(author = "TrainPanel Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Upload audio, preprocess, train and monitor models on managed cloud jobs")]
#[command(long_about = r#"
TrainPanel serves a single web page that drives a remote training workflow:

  1. Upload .wav/.mp3 files to a storage bucket
  2. Run a preprocessing job over the uploaded audio
  3. Submit a training job with the chosen hyperparameters
  4. Poll status, open TensorBoard, download the trained model
  5. Delete the bucket when done

All remote work is delegated to the gsutil, gcloud and tensorboard CLIs,
which must be installed and authenticated on the host.

Examples:
  trainpanel                                  # Serve on 127.0.0.1:8080
  trainpanel --bind 0.0.0.0 --port 80         # Serve publicly
  trainpanel --bucket gs://my-bucket -v       # Reuse an existing bucket
"#)]
pub struct CliArgs {
    /// Bind address
    #[arg(long, default_value = "127.0.0.1", env = "TRAINPANEL_BIND")]
    pub bind: String,

    /// Listen port
    #[arg(short, long, default_value = "8080", env = "TRAINPANEL_PORT")]
    pub port: u16,

    /// Region for the bucket and remote jobs
    #[arg(long, default_value = DEFAULT_REGION, env = "TRAINPANEL_REGION")]
    pub region: String,

    /// Zone of the VM running the panel (used to look up its address)
    #[arg(long, default_value = DEFAULT_ZONE, env = "TRAINPANEL_ZONE")]
    pub zone: String,

    /// Name of the VM running the panel
    #[arg(long, default_value = DEFAULT_INSTANCE, env = "TRAINPANEL_INSTANCE")]
    pub instance: String,

    /// Bucket URL (default: time-seeded gs://ddsp-train-<secs>)
    #[arg(long, value_name = "URL", env = "TRAINPANEL_BUCKET")]
    pub bucket: Option<String>,

    /// GCP project (default: `gcloud config get-value project`)
    #[arg(long, env = "TRAINPANEL_PROJECT")]
    pub project: Option<String>,

    /// Directory for uploads, downloads and model archives
    #[arg(long, default_value = "instance", value_name = "PATH", env = "TRAINPANEL_INSTANCE_DIR")]
    pub instance_dir: PathBuf,

    /// Allowed upload extensions
    #[arg(long, value_delimiter = ',', default_value = ".wav,.mp3")]
    pub allowed_extensions: Vec<String>,

    /// Maximum upload request size (e.g., 512M)
    #[arg(long, default_value = "512M", value_name = "SIZE")]
    pub max_upload_size: String,

    /// Container image name for preprocessing jobs
    #[arg(long, default_value = "ddsp-preprocess")]
    pub preprocess_image: String,

    /// Container image name for training jobs
    #[arg(long, default_value = "ddsp-train")]
    pub train_image: String,

    /// TensorBoard port
    #[arg(long, default_value = "6006")]
    pub tensorboard_port: u16,

    /// Log output format
    #[arg(long, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Log output format
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON lines
    Json,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Socket address to serve on
    pub addr: SocketAddr,
    /// Bucket URL, e.g. `gs://ddsp-train-1700000000`
    pub bucket: String,
    /// Region for bucket and jobs
    pub region: String,
    /// Zone of the hosting VM
    pub zone: String,
    /// Name of the hosting VM
    pub instance: String,
    /// Explicit project, if configured
    pub project: Option<String>,
    /// Root directory for local files
    pub instance_dir: PathBuf,
    /// Allowed upload extensions, lowercase with leading dot
    pub allowed_extensions: Vec<String>,
    /// Maximum upload request size in bytes
    pub max_upload_bytes: usize,
    /// Preprocessing image name
    pub preprocess_image: String,
    /// Training image name
    pub train_image: String,
    /// TensorBoard port
    pub tensorboard_port: u16,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            bucket: default_bucket_name(Utc::now()),
            region: DEFAULT_REGION.to_string(),
            zone: DEFAULT_ZONE.to_string(),
            instance: DEFAULT_INSTANCE.to_string(),
            project: None,
            instance_dir: PathBuf::from("instance"),
            allowed_extensions: vec![".wav".to_string(), ".mp3".to_string()],
            max_upload_bytes: 512 * 1024 * 1024,
            preprocess_image: "ddsp-preprocess".to_string(),
            train_image: "ddsp-train".to_string(),
            tensorboard_port: 6006,
        }
    }
}

impl PanelConfig {
    /// Build configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", args.bind, args.port)
            .parse()
            .map_err(|e| PanelError::config(format!("Invalid bind address: {}", e)))?;

        let bucket = match &args.bucket {
            Some(b) => normalize_bucket(b)?,
            None => default_bucket_name(Utc::now()),
        };

        let max_upload_bytes = parse_size(&args.max_upload_size)
            .map_err(|e| PanelError::config(format!("Invalid max upload size: {}", e)))?
            as usize;

        let allowed_extensions = args
            .allowed_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| e.len() > 1)
            .collect::<Vec<_>>();
        if allowed_extensions.is_empty() {
            return Err(PanelError::config("At least one upload extension is required"));
        }

        Ok(Self {
            addr,
            bucket,
            region: args.region.clone(),
            zone: args.zone.clone(),
            instance: args.instance.clone(),
            project: args.project.clone(),
            instance_dir: args.instance_dir.clone(),
            allowed_extensions,
            max_upload_bytes,
            preprocess_image: args.preprocess_image.clone(),
            train_image: args.train_image.clone(),
            tensorboard_port: args.tensorboard_port,
        })
    }

    /// Directory uploaded audio is saved to
    pub fn uploads_dir(&self) -> PathBuf {
        self.instance_dir.join("uploads")
    }

    /// Directory the trained model is fetched into
    pub fn downloads_dir(&self) -> PathBuf {
        self.instance_dir.join("downloads")
    }

    /// Create the local working directories
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.uploads_dir(), self.downloads_dir()] {
            std::fs::create_dir_all(&dir).with_path(&dir)?;
        }
        Ok(())
    }

    /// Check an extension (with leading dot) against the allowed set
    pub fn is_allowed_extension(&self, ext: &str) -> bool {
        let ext = normalize_extension(ext);
        self.allowed_extensions.iter().any(|allowed| *allowed == ext)
    }

    /// Log directory TensorBoard reads from
    pub fn model_logdir(&self) -> String {
        format!("{}/model", self.bucket)
    }
}

/// Time-seeded bucket name: `gs://ddsp-train-<unix seconds>`
pub fn default_bucket_name(now: DateTime<Utc>) -> String {
    format!("{}{}", BUCKET_PREFIX, now.timestamp())
}

fn normalize_bucket(bucket: &str) -> Result<String> {
    let bucket = bucket.trim().trim_end_matches('/');
    let name = bucket.strip_prefix("gs://").unwrap_or(bucket);

    if name.is_empty() || name.contains('/') {
        return Err(PanelError::config(format!("Invalid bucket: {}", bucket)));
    }

    Ok(format!("gs://{}", name))
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// Parse size string (e.g., "1G", "512M", "64K")
pub fn parse_size(size: &str) -> std::result::Result<u64, String> {
    let size = size.trim().to_uppercase();

    if size.is_empty() {
        return Err("Empty size string".to_string());
    }

    let (num_str, multiplier) = if size.ends_with("GB") || size.ends_with('G') {
        (size.trim_end_matches(|c| c == 'G' || c == 'B'), 1024u64 * 1024 * 1024)
    } else if size.ends_with("MB") || size.ends_with('M') {
        (size.trim_end_matches(|c| c == 'M' || c == 'B'), 1024u64 * 1024)
    } else if size.ends_with("KB") || size.ends_with('K') {
        (size.trim_end_matches(|c| c == 'K' || c == 'B'), 1024u64)
    } else {
        (size.trim_end_matches('B'), 1u64)
    };

    let num: f64 = num_str
        .trim()
        .parse()
        .map_err(|_| format!("Invalid number: {}", num_str))?;

    Ok((num * multiplier as f64) as u64)
}

/// Resolve the configuration and prepare directories under `dir`
pub fn prepare(mut config: PanelConfig, dir: &Path) -> Result<PanelConfig> {
    config.instance_dir = dir.to_path_buf();
    config.ensure_dirs()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["trainpanel"];
        argv.extend_from_slice(extra);
        CliArgs::parse_from(argv)
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("512M").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert!(parse_size("").is_err());
        assert!(parse_size("abcM").is_err());
    }

    #[test]
    fn test_default_bucket_name_is_time_seeded() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(default_bucket_name(now), "gs://ddsp-train-1700000000");
    }

    #[test]
    fn test_from_cli_defaults() {
        let config = PanelConfig::from_cli(&args(&[])).unwrap();
        assert_eq!(config.addr.port(), 8080);
        assert_eq!(config.region, "europe-west4");
        assert_eq!(config.zone, "europe-west4-a");
        assert_eq!(config.instance, "ddsp-docker");
        assert!(config.bucket.starts_with(BUCKET_PREFIX));
        assert_eq!(config.allowed_extensions, vec![".wav", ".mp3"]);
        assert_eq!(config.tensorboard_port, 6006);
    }

    #[test]
    fn test_from_cli_bucket_normalization() {
        let config = PanelConfig::from_cli(&args(&["--bucket", "my-bucket/"])).unwrap();
        assert_eq!(config.bucket, "gs://my-bucket");
        assert_eq!(config.model_logdir(), "gs://my-bucket/model");

        assert!(PanelConfig::from_cli(&args(&["--bucket", "gs://a/b"])).is_err());
    }

    #[test]
    fn test_allowed_extensions() {
        let config = PanelConfig::from_cli(&args(&["--allowed-extensions", "wav,FLAC"])).unwrap();
        assert!(config.is_allowed_extension(".wav"));
        assert!(config.is_allowed_extension(".flac"));
        assert!(config.is_allowed_extension(".WAV"));
        assert!(!config.is_allowed_extension(".mp3"));
    }

    #[test]
    fn test_prepare_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = prepare(PanelConfig::default(), tmp.path()).unwrap();
        assert!(config.uploads_dir().is_dir());
        assert!(config.downloads_dir().is_dir());
    }
}
