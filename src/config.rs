//! Waypoint configuration.
//!
//! Loaded from `~/.waypoint/config.toml` when present. Every field has a
//! default, so a missing file is a valid zero-config install. A few
//! environment variables override the file for scripted setups:
//! `WAYPOINT_DATA_DIR`, `WAYPOINT_LOCATIONS_FILE`, `WAYPOINT_DEFAULT_TZ`,
//! `WAYPOINT_SCHEDULER_BIN`, and `WAYPOINT_LOCATION_API_KEY`.
//!
//! The struct is built once in `main` and passed by reference from there —
//! nothing reads the environment after startup.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;

/// Waypoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where the stores live. Default: `~/.waypoint/`.
    pub data_dir: Option<PathBuf>,

    /// Zone registry path. Default: `locations.json` inside the data dir.
    pub locations_file: Option<PathBuf>,

    /// Fallback timezone used until a GPS fix resolves one.
    pub default_tz: String,

    /// The external scheduler binary.
    pub scheduler_bin: String,

    /// Seconds between cycle starts in daemon mode (on top of cycle time).
    pub tick_interval_secs: u64,

    pub provider: ProviderSettings,
}

/// Which location provider to use.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProviderSettings {
    /// No provider configured: a valid "no location available" steady state.
    None,

    /// Dawarich, a self-hosted GPS tracker.
    #[serde(rename_all = "kebab-case")]
    Dawarich {
        api_url: String,
        #[serde(default)]
        api_key: String,
    },

    /// A fixed position.
    Static { lat: f64, lon: f64 },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            locations_file: None,
            default_tz: "America/New_York".to_string(),
            scheduler_bin: "openclaw".to_string(),
            tick_interval_secs: 30,
            provider: ProviderSettings::None,
        }
    }
}

impl Config {
    /// Load config from `~/.waypoint/config.toml`, then apply environment
    /// overrides. A missing file yields the defaults.
    pub fn load() -> Result<Self, String> {
        let mut config = match Self::path() {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(&path)
                    .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
                toml::from_str(&contents)
                    .map_err(|e| format!("invalid config at {}: {e}", path.display()))?
            }
            _ => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// The config file path: `~/.waypoint/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waypoint").join("config.toml"))
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("WAYPOINT_DATA_DIR")
            && !v.is_empty()
        {
            self.data_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("WAYPOINT_LOCATIONS_FILE")
            && !v.is_empty()
        {
            self.locations_file = Some(PathBuf::from(v));
        }
        if let Ok(v) = env::var("WAYPOINT_DEFAULT_TZ")
            && !v.is_empty()
        {
            self.default_tz = v;
        }
        if let Ok(v) = env::var("WAYPOINT_SCHEDULER_BIN")
            && !v.is_empty()
        {
            self.scheduler_bin = v;
        }
        if let Ok(v) = env::var("WAYPOINT_LOCATION_API_KEY")
            && !v.is_empty()
            && let ProviderSettings::Dawarich { api_key, .. } = &mut self.provider
            && api_key.is_empty()
        {
            *api_key = v;
        }
    }

    /// The resolved data directory.
    pub fn data_dir(&self) -> Result<PathBuf, String> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|h| h.join(".waypoint")))
            .ok_or_else(|| "could not determine home directory".to_string())
    }

    /// The resolved zone registry path.
    pub fn locations_file(&self, data_dir: &Path) -> PathBuf {
        self.locations_file
            .clone()
            .unwrap_or_else(|| data_dir.join("locations.json"))
    }

    /// The daemon sleep between cycles.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.default_tz, "America/New_York");
        assert_eq!(config.scheduler_bin, "openclaw");
        assert_eq!(config.tick_interval_secs, 30);
        assert!(matches!(config.provider, ProviderSettings::None));
    }

    #[test]
    fn parses_dawarich_provider() {
        let config: Config = toml::from_str(
            r#"
            default-tz = "Europe/London"
            scheduler-bin = "/usr/local/bin/openclaw"

            [provider]
            kind = "dawarich"
            api-url = "http://localhost:3000"
            api-key = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_tz, "Europe/London");
        match &config.provider {
            ProviderSettings::Dawarich { api_url, api_key } => {
                assert_eq!(api_url, "http://localhost:3000");
                assert_eq!(api_key, "secret");
            }
            other => panic!("unexpected provider: {other:?}"),
        }
    }

    #[test]
    fn parses_static_provider() {
        let config: Config = toml::from_str(
            r#"
            [provider]
            kind = "static"
            lat = 40.758
            lon = -73.9855
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.provider,
            ProviderSettings::Static { lat, .. } if lat == 40.758
        ));
    }

    #[test]
    fn locations_file_defaults_into_data_dir() {
        let config = Config::default();
        assert_eq!(
            config.locations_file(Path::new("/data")),
            PathBuf::from("/data/locations.json")
        );
    }
}
