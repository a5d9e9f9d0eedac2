/// Accounting rules and their TOML configuration file.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer};

const MS_PER_MINUTE: u64 = 60 * 1000;

/// Process-wide accounting configuration. Loaded once at startup.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Local hour at which one logical day ends and the next begins.
    pub day_boundary_hour: u32,
    /// Local time from which unlogged time is attributed to the auto entry.
    #[serde(deserialize_with = "deserialize_time")]
    pub baseline: NaiveTime,
    pub fallback_category: String,
    pub auto_category: String,
    pub tick_rate_ms: u64,
    /// Per-logical-day ceilings in minutes, keyed by category.
    pub caps: BTreeMap<String, u64>,
    /// Quick picks offered by the category prompt, bound to keys 1-9.
    pub presets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            day_boundary_hour: 3,
            baseline: NaiveTime::from_hms_opt(8, 30, 0).unwrap_or_default(),
            fallback_category: "Entertainment".to_string(),
            auto_category: "Entertainment (Auto)".to_string(),
            tick_rate_ms: 250,
            caps: BTreeMap::from([("shower".to_string(), 45), ("python".to_string(), 30)]),
            presets: ["Entertainment", "Work", "Python", "Study", "Shower"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl Config {
    /// Parses a TOML document and validates it.
    pub fn from_toml(raw: &str) -> Result<Self> {
        let parsed: Config = toml::from_str(raw)?;
        parsed.normalized()
    }

    /// Ceiling in milliseconds for an already normalized category key.
    pub fn cap_limit_ms(&self, key: &str) -> Option<u64> {
        self.caps
            .get(key)
            .map(|minutes| minutes.saturating_mul(MS_PER_MINUTE))
    }

    fn normalized(mut self) -> Result<Self> {
        if self.day_boundary_hour >= 24 {
            bail!("day_boundary_hour must be between 0 and 23, got {}", self.day_boundary_hour);
        }
        if self.tick_rate_ms == 0 {
            bail!("tick_rate_ms must be positive");
        }
        self.fallback_category = self.fallback_category.trim().to_string();
        self.auto_category = self.auto_category.trim().to_string();
        if self.fallback_category.is_empty() || self.auto_category.is_empty() {
            bail!("fallback_category and auto_category must not be empty");
        }
        let mut caps = BTreeMap::new();
        for (name, minutes) in self.caps {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                bail!("capped category names must not be empty");
            }
            // Ceilings are compared against durations stored as i64 ms.
            let fits = minutes
                .checked_mul(MS_PER_MINUTE)
                .is_some_and(|ms| i64::try_from(ms).is_ok());
            if !fits {
                bail!("cap for {key:?} is too large: {minutes} minutes");
            }
            caps.insert(key, minutes);
        }
        self.caps = caps;
        self.presets = self
            .presets
            .into_iter()
            .map(|preset| preset.trim().to_string())
            .filter(|preset| !preset.is_empty())
            .collect();
        Ok(self)
    }
}

/// Loads the configuration from `path`, or from the default location when
/// that file exists. Falls back to built-in defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("no config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = Config::from_toml(&raw)
        .with_context(|| format!("invalid config file {}", path.display()))?;
    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("daytally").join("config.toml"))
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
        .map_err(|_| serde::de::Error::custom(format!("expected HH:MM, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.cap_limit_ms("shower"), Some(45 * 60 * 1000));
        assert_eq!(config.cap_limit_ms("work"), None);
    }

    #[test]
    fn parses_overrides_and_normalizes_cap_keys() {
        let config = Config::from_toml(
            r#"
            day_boundary_hour = 4
            baseline = "09:15"
            [caps]
            "  Reading " = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.day_boundary_hour, 4);
        assert_eq!(config.baseline, NaiveTime::from_hms_opt(9, 15, 0).unwrap());
        assert_eq!(config.cap_limit_ms("reading"), Some(20 * 60 * 1000));
        assert_eq!(config.cap_limit_ms("shower"), None);
    }

    #[test]
    fn accepts_baseline_with_seconds() {
        let config = Config::from_toml(r#"baseline = "08:30:15""#).unwrap();
        assert_eq!(config.baseline, NaiveTime::from_hms_opt(8, 30, 15).unwrap());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(Config::from_toml("day_boundary_hour = 24").is_err());
        assert!(Config::from_toml("tick_rate_ms = 0").is_err());
        assert!(Config::from_toml(r#"baseline = "half past eight""#).is_err());
        assert!(Config::from_toml("[caps]\n\" \" = 10").is_err());
        assert!(Config::from_toml("unknown = 1").is_err());
    }

    #[test]
    fn rejects_caps_that_overflow_milliseconds() {
        let err = Config::from_toml("[caps]\nreading = 1000000000000000").unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert!(Config::from_toml(&format!("[caps]\nreading = {}", u64::MAX)).is_err());

        let config = Config::from_toml("[caps]\nreading = 1440").unwrap();
        assert_eq!(config.cap_limit_ms("reading"), Some(1440 * 60 * 1000));
    }

    #[test]
    fn presets_are_trimmed_and_blanks_dropped() {
        let config = Config::from_toml(r#"presets = [" Work ", "", "Gym"]"#).unwrap();
        assert_eq!(config.presets, vec!["Work".to_string(), "Gym".to_string()]);
    }

    #[test]
    fn load_reads_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fallback_category = \"Leisure\"\n").unwrap();
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.fallback_category, "Leisure");
    }

    #[test]
    fn load_fails_for_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
