use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    bend::{DEFAULT_BEND_RANGE_SECONDS, DEFAULT_MAX_CONTROL_POINTS},
    channel::DEFAULT_EVENT_CAPACITY,
    session::{DEFAULT_BLOCK_SIZE, SessionConfig},
    source::Orientation,
};

pub const CONFIG_FILE_NAME: &str = "platter.config.toml";
pub const CONFIG_PATH_ENV: &str = "PLATTER_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlatterConfig {
    pub engine: EngineConfig,
    pub render: RenderConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub bend_range_seconds: f64,
    pub orientation: Orientation,
    pub event_capacity: usize,
    pub max_control_points: usize,
    pub bend_channel: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub block_size: usize,
    pub sample_rate: u32,
    pub output_channels: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub log_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bend_range_seconds: DEFAULT_BEND_RANGE_SECONDS,
            orientation: Orientation::Forward,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_control_points: DEFAULT_MAX_CONTROL_POINTS,
            bend_channel: None,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            sample_rate: 44_100,
            output_channels: 2,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: "info,platter_core=debug".to_string(),
            trace_file_prefix: "platter".to_string(),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            bend_range_seconds: self.bend_range_seconds,
            orientation: self.orientation,
            max_control_points: self.max_control_points,
            bend_channel: self.bend_channel.map(|channel| channel.min(15)),
        }
    }
}

impl PlatterConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed to parse config TOML")
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: PlatterConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config TOML from {}", path.display()))?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    // A file that exists but fails to parse is an error, never a silent default.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }
        match discover_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
