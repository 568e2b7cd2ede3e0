//! Configuration file handling.
//!
//! The file lives at `<config dir>/memo-runner/config.toml` unless a path is
//! given explicitly. A missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::job::aggregator::StageTable;
use crate::job::staging::StageMode;

pub const APP_DIR_NAME: &str = "memo-runner";
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub generator: GeneratorConfig,
    pub media: MediaConfig,
    pub job: JobConfig,
    pub stages: StageTable,
}

/// The generation program. It is invoked as
/// `<program> <args...> --config <config_file> --input_image <img>
/// --input_audio <audio> --output_dir <dir>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub program: String,
    pub args: Vec<String>,
    pub config_file: PathBuf,
    /// Directory the generator runs in; inherits ours when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_dir: Option<PathBuf>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["inference.py".to_string()],
            config_file: PathBuf::from("configs/inference.yaml"),
            current_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: String,
    pub ffprobe: String,
    /// Images whose sides differ by less than this many pixels count as square.
    pub square_tolerance: u32,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            ffprobe: "ffprobe".to_string(),
            square_tolerance: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Parent of per-run working areas; the system temp dir when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_root: Option<PathBuf>,
    pub stage_mode: StageMode,
    /// Keep the working area of failed runs for inspection.
    pub keep_work_dir: bool,
    pub output_extensions: Vec<String>,
    pub poll_interval_ms: u64,
    /// How long to wait for output to drain after the generator exits.
    pub drain_timeout_ms: u64,
    /// Grace period between SIGTERM and SIGKILL on cancellation.
    pub kill_grace_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            work_root: None,
            stage_mode: StageMode::Copy,
            keep_work_dir: false,
            output_extensions: vec!["mp4".to_string()],
            poll_interval_ms: 50,
            drain_timeout_ms: 2_000,
            kill_grace_ms: 5_000,
        }
    }
}

impl JobConfig {
    pub fn work_root(&self) -> PathBuf {
        self.work_root.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }
}

impl Config {
    /// Default location, `None` if the platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(msg) = self.stages.validate() {
            bail!(msg);
        }
        if self.generator.program.trim().is_empty() {
            bail!("generator.program must not be empty");
        }
        if self.job.output_extensions.is_empty() {
            bail!("job.output_extensions must list at least one extension");
        }
        Ok(())
    }

    /// Write this config to `path`, creating parent directories. Refuses to
    /// overwrite an existing file.
    pub fn write_new(&self, path: &Path) -> Result<()> {
        if path.exists() {
            bail!("Config file already exists: {}", path.display());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_toml()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
