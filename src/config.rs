use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SyncConfig {
    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub markup: MarkupConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusConfig {
    /// Used for `Event`s sent without an explicit ttl.
    #[serde(default = "default_event_ttl", with = "duration_ms")]
    pub default_event_ttl: Duration,

    #[serde(default = "default_hover_ttl", with = "duration_ms")]
    pub hover_ttl: Duration,

    /// Upper bound on events retained for late subscribers.
    #[serde(default = "default_max_buffered_events")]
    pub max_buffered_events: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            default_event_ttl: default_event_ttl(),
            hover_ttl: default_hover_ttl(),
            max_buffered_events: default_max_buffered_events(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkupConfig {
    #[serde(default = "default_true")]
    pub strip_footnotes: bool,

    #[serde(default = "default_true")]
    pub strip_cross_references: bool,

    /// Split plain text outside `\w` markers into highlightable words.
    #[serde(default = "default_true")]
    pub split_bare_text: bool,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            strip_footnotes: default_true(),
            strip_cross_references: default_true(),
            split_bare_text: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionConfig {
    /// Compare declared `x-occurrences` totals with the computed totals.
    #[serde(default = "default_true")]
    pub check_declared_totals: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            check_declared_totals: default_true(),
        }
    }
}

impl SyncConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;
    Ok(config)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to parse config: {message}")]
    Parse { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_event_ttl() -> Duration {
    Duration::from_millis(1500)
}

fn default_hover_ttl() -> Duration {
    Duration::from_millis(250)
}

fn default_max_buffered_events() -> usize {
    256
}

fn default_true() -> bool {
    true
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
