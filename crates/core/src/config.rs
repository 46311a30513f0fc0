use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

pub const DEFAULT_LOADER: &str = "file-watcher";
pub const DEFAULT_STORAGE: &str = "csv";
pub const DEFAULT_RULES_PATH: &str = "trace-rules.csv";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
const DEFAULT_DEBOUNCE_MS: u64 = 200;

/// Strategy selection and loader tuning.
///
/// Every key is read as `TRACE_{KEY}`. When `TRACE_PROFILE` is set (e.g.
/// `PROD`), `{PROFILE}_TRACE_{KEY}` is tried first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Active profile name (empty = default).
    pub profile: String,
    /// Key of the reload strategy (`file-watcher`, `polling`).
    pub loader_class: String,
    /// Key of the rule storage (`csv`, `memory`).
    pub storage_handler_class: String,
    pub rules_path: PathBuf,
    #[serde(with = "millis")]
    pub poll_interval: Duration,
    #[serde(with = "millis")]
    pub debounce: Duration,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            loader_class: DEFAULT_LOADER.to_string(),
            storage_handler_class: DEFAULT_STORAGE.to_string(),
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        }
    }
}

impl TraceConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Unset, empty or unparsable
    /// values fall back to the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let profile = get("TRACE_PROFILE").unwrap_or_default().to_uppercase();

        let profiled = |key: &str| -> Option<String> {
            let key = format!("TRACE_{}", key);
            if !profile.is_empty() {
                if let Some(v) = get(&format!("{}_{}", profile, key)) {
                    return Some(v);
                }
            }
            get(&key)
        };

        let millis = |key: &str, default: u64| -> Duration {
            let Some(raw) = profiled(key) else {
                return Duration::from_millis(default);
            };
            parse_millis(&format!("TRACE_{}", key), &raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, default, "using default");
                Duration::from_millis(default)
            })
        };

        Self {
            loader_class: profiled("LOADER_CLASS").unwrap_or_else(|| DEFAULT_LOADER.to_string()),
            storage_handler_class: profiled("STORAGE_HANDLER_CLASS")
                .unwrap_or_else(|| DEFAULT_STORAGE.to_string()),
            rules_path: PathBuf::from(
                profiled("RULES_PATH").unwrap_or_else(|| DEFAULT_RULES_PATH.to_string()),
            ),
            poll_interval: millis("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS),
            debounce: millis("DEBOUNCE_MS", DEFAULT_DEBOUNCE_MS),
            profile,
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Trace config loaded (profile: {}):", self.profile_label());
        tracing::info!("  loader:   {}", self.loader_class);
        tracing::info!("  storage:  {} ({})", self.storage_handler_class, self.rules_path.display());
        tracing::info!(
            "  timing:   poll={}ms debounce={}ms",
            self.poll_interval.as_millis(),
            self.debounce.as_millis()
        );
    }
}

fn parse_millis(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
