//! Configuration for the step counter agent.

use crate::core::LinearModel;
use crate::forward::SinkConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which consumer drains the sample queue. Exactly one runs per process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Window the samples and count steps
    #[default]
    Prediction,
    /// Stream raw samples to the dataset sink
    Collection,
}

impl std::fmt::Display for PipelineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineMode::Prediction => write!(f, "prediction"),
            PipelineMode::Collection => write!(f, "collection"),
        }
    }
}

/// Main configuration for the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Accelerometer sampling rate
    pub sample_rate_hz: u32,

    /// Length of one prediction window
    pub window_duration_ms: u32,

    /// Sample queue capacity
    pub queue_capacity: usize,

    /// Push/pop timeout on the sample queue
    #[serde(with = "duration_ms")]
    pub queue_timeout: Duration,

    /// Tag samples with a latched step edge
    pub step_edge_detection: bool,

    pub mode: PipelineMode,

    /// Dataset collection server
    pub sink: SinkConfig,

    /// Predictor coefficients
    pub model: LinearModel,

    /// Path for session history and statistics
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("step-counter-agent");

        let sample_rate_hz = 100;
        let window_duration_ms = 1000;

        Self {
            sample_rate_hz,
            window_duration_ms,
            queue_capacity: window_len(sample_rate_hz, window_duration_ms),
            queue_timeout: Duration::from_millis(500),
            step_edge_detection: false,
            mode: PipelineMode::default(),
            sink: SinkConfig::default(),
            model: LinearModel::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("step-counter-agent")
            .join("config.json")
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Samples per window.
    pub fn window_len(&self) -> usize {
        window_len(self.sample_rate_hz, self.window_duration_ms)
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.sample_rate_hz.max(1)))
    }

    pub fn sessions_path(&self) -> PathBuf {
        self.data_path.join("sessions.jsonl")
    }

    pub fn stats_path(&self) -> PathBuf {
        self.data_path.join("stats.json")
    }

    /// Check the values the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::Invalid("sample rate must be positive".into()));
        }
        if self.sample_rate_hz > 1000 {
            return Err(ConfigError::Invalid(format!(
                "sample rate {} Hz is above the 1 ms timer resolution",
                self.sample_rate_hz
            )));
        }
        if self.window_len() < 2 {
            return Err(ConfigError::Invalid(format!(
                "window of {} ms at {} Hz holds {} samples, need at least 2",
                self.window_duration_ms,
                self.sample_rate_hz,
                self.window_len()
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid("queue capacity must be positive".into()));
        }
        if self.queue_timeout.is_zero() {
            return Err(ConfigError::Invalid("queue timeout must be positive".into()));
        }
        Ok(())
    }
}

fn window_len(sample_rate_hz: u32, window_duration_ms: u32) -> usize {
    (u64::from(sample_rate_hz) * u64::from(window_duration_ms) / 1000) as usize
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Durations stored as whole milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_rate_hz, 100);
        assert_eq!(config.window_len(), 100);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.sample_period(), Duration::from_millis(10));
        assert_eq!(config.mode, PipelineMode::Prediction);
        assert!(!config.step_edge_detection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_len_from_rate_and_duration() {
        let config = Config {
            sample_rate_hz: 50,
            window_duration_ms: 2000,
            ..Config::default()
        };
        assert_eq!(config.window_len(), 100);
        assert_eq!(config.sample_period(), Duration::from_millis(20));
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let zero_rate = Config {
            sample_rate_hz: 0,
            ..Config::default()
        };
        assert!(matches!(zero_rate.validate(), Err(ConfigError::Invalid(_))));

        let short_window = Config {
            window_duration_ms: 10,
            ..Config::default()
        };
        assert!(matches!(
            short_window.validate(),
            Err(ConfigError::Invalid(_))
        ));

        let no_queue = Config {
            queue_capacity: 0,
            ..Config::default()
        };
        assert!(no_queue.validate().is_err());

        let no_timeout = Config {
            queue_timeout: Duration::ZERO,
            ..Config::default()
        };
        assert!(no_timeout.validate().is_err());
    }

    #[test]
    fn test_json_round_trip_keeps_millis() {
        let config = Config {
            queue_timeout: Duration::from_millis(250),
            mode: PipelineMode::Collection,
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"queue_timeout\":250"));
        assert!(json.contains("\"mode\":\"collection\""));

        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.queue_timeout, Duration::from_millis(250));
        assert_eq!(parsed.mode, PipelineMode::Collection);
        assert_eq!(parsed.sink, config.sink);
    }
}
