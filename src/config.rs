use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::date_util::{DateParser, DEFAULT_REPORTING_TZ};
use crate::error::{Error, Result};
use crate::metrics::stats::DEFAULT_MODE_COUNT;
use crate::query::builder::DEFAULT_ROW_LIMIT;

/// Deployment settings, read from `~/.funneldash/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CRM SQLite file used when `--db` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
    /// IANA zone month keys and naive timestamps are read in.
    pub reporting_timezone: String,
    pub row_limit: u32,
    /// Show first-touch attribution tabs when the columns exist.
    pub first_touch: bool,
    /// Fold UTM mediums/sources into canonical channels before grouping.
    pub normalize_utm: bool,
    /// Owners the sales view is restricted to. Empty means everyone.
    pub owner_allowlist: Vec<String>,
    pub mode_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: None,
            reporting_timezone: DEFAULT_REPORTING_TZ.name().to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            first_touch: true,
            normalize_utm: false,
            owner_allowlist: Vec::new(),
            mode_count: DEFAULT_MODE_COUNT,
        }
    }
}

impl Config {
    /// `~/.funneldash/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("cannot determine home directory".into()))?;
        Ok(home.join(".funneldash").join("config.toml"))
    }

    /// Load the config at the default location, or defaults if absent.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.row_limit == 0 {
            return Err(Error::Config("row_limit must be positive".into()));
        }
        if self.mode_count == 0 {
            return Err(Error::Config("mode_count must be positive".into()));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        parse_timezone(&self.reporting_timezone)
    }

    pub fn date_parser(&self) -> Result<DateParser> {
        Ok(DateParser::new(self.timezone()?))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| Error::Config(format!("unknown time zone: {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.reporting_timezone, "Europe/Lisbon");
        assert_eq!(config.row_limit, 200_000);
        assert!(config.first_touch);
        assert!(!config.normalize_utm);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
database = "/data/crm.db"
reporting_timezone = "America/New_York"
owner_allowlist = ["Jane Doe", "Bob"]
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/data/crm.db")));
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(config.owner_allowlist.len(), 2);
        assert_eq!(config.mode_count, 3);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "reporting_timezone = \"Mars/Olympus\"\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "row_limit = \"lots\"\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config {
            normalize_utm: true,
            ..Default::default()
        };
        let text = config.to_toml().unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
