//! Agent configuration. Only `flow.timeout_secs` reaches the engine; the rest wires the pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Zeek conn.log to replay; stdin when absent
    pub input: Option<PathBuf>,
    /// Where feature rows go
    pub output: OutputConfig,
    /// Flow reconstruction parameters
    pub flow: FlowConfig,
    /// Replay a finished log or follow a live stream
    pub mode: RunMode,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Sweep on record timestamps, flush at end of input
    Replay,
    /// Sweep on the wall clock until Ctrl+C or end of input
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Ndjson,
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output file; stdout when absent
    pub path: Option<PathBuf>,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Inactivity (seconds) after which an unterminated flow is finalized
    pub timeout_secs: f64,
    /// How often (seconds, record time or wall clock) the table is swept
    pub sweep_interval_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            input: None,
            output: OutputConfig::default(),
            flow: FlowConfig::default(),
            mode: RunMode::Replay,
            log: LogConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            format: OutputFormat::Ndjson,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60.0,
            sweep_interval_secs: 5.0,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl AgentConfig {
    /// Load from JSON file if present; otherwise return default
    pub fn load(path: &std::path::Path) -> Self {
        if path.exists() {
            if let Ok(data) = std::fs::read_to_string(path) {
                if let Ok(c) = serde_json::from_str::<AgentConfig>(&data) {
                    return c;
                }
            }
        }
        Self::default()
    }
}
