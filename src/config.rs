use std::env;
use std::time::Duration;

/// Bundled config for mobile and web builds
const BUNDLED_CONFIG: &str = include_str!("../assets/config.env");

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:5000/calavera-ai";
const DEFAULT_TYPING_INTERVAL_MS: u64 = 20;
const DEFAULT_TOAST_DURATION_MS: u64 = 4000;
const DEFAULT_STORAGE_NAMESPACE: &str = "default";
const DEFAULT_LOG_FILTER: &str = "calavera=info";

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Base URL the `/api/*` paths are appended to.
    pub api_base: String,
    pub typing_interval: Duration,
    pub toast_duration: Duration,
    pub storage_namespace: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            typing_interval: Duration::from_millis(DEFAULT_TYPING_INTERVAL_MS),
            toast_duration: Duration::from_millis(DEFAULT_TOAST_DURATION_MS),
            storage_namespace: DEFAULT_STORAGE_NAMESPACE.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any variable source; unparsable numbers keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        Self {
            api_base: lookup("CALAVERA_API_BASE")
                .map(|base| base.trim().trim_end_matches('/').to_string())
                .filter(|base| !base.is_empty())
                .unwrap_or(defaults.api_base),
            typing_interval: millis("CALAVERA_TYPING_INTERVAL_MS", defaults.typing_interval),
            toast_duration: millis("CALAVERA_TOAST_DURATION_MS", defaults.toast_duration),
            storage_namespace: lookup("CALAVERA_STORAGE_NAMESPACE")
                .filter(|ns| !ns.trim().is_empty())
                .unwrap_or(defaults.storage_namespace),
            log_filter: lookup("CALAVERA_LOG").unwrap_or(defaults.log_filter),
        }
    }

    /// Reads the environment and rejects values the client cannot work with.
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.api_base.starts_with("http://") || self.api_base.starts_with("https://"),
            "CALAVERA_API_BASE must be an http(s) URL, got {:?}",
            self.api_base
        );
        anyhow::ensure!(
            !self.typing_interval.is_zero(),
            "CALAVERA_TYPING_INTERVAL_MS must be greater than zero"
        );
        Ok(())
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn load_dotenv() {
    // First try to load from .env file (desktop dev)
    if dotenvy::dotenv().is_ok() {
        return;
    }

    // Fall back to bundled config (mobile builds)
    load_bundled_config();
}

#[cfg(target_arch = "wasm32")]
pub fn load_dotenv() {
    load_bundled_config();
}

fn load_bundled_config() {
    for (key, value) in parse_env_lines(BUNDLED_CONFIG) {
        // Only set if not already set (allow env override)
        if env::var(&key).is_err() {
            // SAFETY: called from main before the runtime spawns any threads
            unsafe {
                env::set_var(key, value);
            }
        }
    }
}

fn parse_env_lines(source: &str) -> Vec<(String, String)> {
    source
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.typing_interval, Duration::from_millis(20));
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("CALAVERA_API_BASE", "https://chat.example.com/calavera-ai/"),
            ("CALAVERA_TYPING_INTERVAL_MS", "5"),
            ("CALAVERA_TOAST_DURATION_MS", "not-a-number"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base, "https://chat.example.com/calavera-ai");
        assert_eq!(config.typing_interval, Duration::from_millis(5));
        assert_eq!(config.toast_duration, Duration::from_millis(4000));
        assert_eq!(
            config.endpoint("/api/chat"),
            "https://chat.example.com/calavera-ai/api/chat"
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::default().validate().is_ok());

        let no_scheme = Config {
            api_base: "localhost:5000".to_string(),
            ..Config::default()
        };
        let err = no_scheme.validate().unwrap_err();
        assert!(err.to_string().contains("CALAVERA_API_BASE"));

        let frozen = Config {
            typing_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(frozen.validate().is_err());
    }

    #[test]
    fn test_parse_env_lines_skips_comments() {
        let parsed = parse_env_lines("# comment\n\nA = 1\nB=two\nbroken line\n");
        assert_eq!(
            parsed,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string())
            ]
        );
    }
}
