use crate::transport::serial::SerialSettings;
use anyhow::Context;
use mmwcore::source::DEFAULT_CHUNK_SIZE;
use mmwcore::PipelineSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_poll_interval_ms() -> u64 {
    20
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Radar chirp configuration uploaded to the sensor and used for scaling.
    pub radar_config: PathBuf,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Bytes per read when replaying a capture.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub serial: SerialSettings,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let mut config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        // radar config paths are relative to the workflow file
        if config.radar_config.is_relative() {
            if let Some(parent) = path_ref.parent() {
                config.radar_config = parent.join(&config.radar_config);
            }
        }
        Ok(config)
    }

    pub fn from_args(radar_config: PathBuf) -> Self {
        Self {
            radar_config,
            pipeline: PipelineSettings::default(),
            poll_interval_ms: default_poll_interval_ms(),
            chunk_size: default_chunk_size(),
            serial: SerialSettings::default(),
        }
    }
}
