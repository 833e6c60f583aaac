//! Application-level configuration loading for the viewer timings and buffers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::{
    services::playback_service::DurationBackoff,
    state::{editor::DEFAULT_RETIME_TOLERANCE_SECS, playback::DurationRetry},
};

/// Default location on disk where the binary looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "REPLAY_STATS_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    #[validate(nested)]
    playback: PlaybackConfig,
    #[validate(nested)]
    editor: EditorConfig,
    #[validate(nested)]
    events: EventsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
struct PlaybackConfig {
    #[validate(range(min = 10, max = 5000))]
    tick_interval_ms: u64,
    #[validate(range(min = 1))]
    duration_retry_initial_ms: u64,
    #[validate(range(min = 1))]
    duration_retry_max_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
struct EditorConfig {
    #[validate(range(min = 0.0, max = 30.0))]
    retime_tolerance_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(default)]
struct EventsConfig {
    #[validate(range(min = 1, max = 4096))]
    capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        tick_interval_ms = config.playback.tick_interval_ms,
                        "loaded viewer settings from config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "invalid config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON document; absent keys keep their defaults.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        if config.playback.duration_retry_max_ms < config.playback.duration_retry_initial_ms {
            anyhow::bail!("playback.duration_retry_max_ms is below the initial delay");
        }
        Ok(config)
    }

    /// Interval between two position publications while playing.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.playback.tick_interval_ms)
    }

    /// Backoff used while the media duration is unknown.
    pub fn duration_backoff(&self) -> DurationBackoff {
        DurationBackoff {
            initial: Duration::from_millis(self.playback.duration_retry_initial_ms),
            max: Duration::from_millis(self.playback.duration_retry_max_ms),
            retry: DurationRetry::Unbounded,
        }
    }

    /// Divergence, in seconds, above which nudging the candidate seeks the clock.
    pub fn retime_tolerance(&self) -> f64 {
        self.editor.retime_tolerance_secs
    }

    /// Buffer size of the observer broadcast channel.
    pub fn event_capacity(&self) -> usize {
        self.events.capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            editor: EditorConfig::default(),
            events: EventsConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            duration_retry_initial_ms: 250,
            duration_retry_max_ms: 2000,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            retime_tolerance_secs: DEFAULT_RETIME_TOLERANCE_SECS,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
