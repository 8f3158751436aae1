//! Configuration types.
//!
//! Configuration is layered: built-in defaults, `/etc/qwatch/config.toml`,
//! the per-user config file, `QWATCH_*` environment variables, and finally
//! command-line flags (applied by `main`).

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Partition queried when neither the config nor the CLI names one
pub const DEFAULT_PARTITION: &str = "xiaojie";

/// Reference zone in which squeue timestamps are interpreted
pub const DEFAULT_TIMEZONE: &str = "US/Pacific";

/// Minimum allowed refresh interval in seconds (prevents tight polling loops)
pub const MIN_REFRESH_INTERVAL: f64 = 0.1;

/// Upper bound for the long-wait threshold (one year)
pub const MAX_LONG_WAIT_SECS: u64 = 365 * 24 * 3600;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub system: SystemConfig,

    pub query: QueryConfig,

    pub refresh: RefreshConfig,

    pub display: DisplayConfig,
}

/// System configuration for paths and environment
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Path to directory containing Slurm binaries (squeue, scontrol, sprio)
    /// If empty or not set, auto-detected via PATH
    pub slurm_bin_path: Option<std::path::PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Partition(s) used when none is given on the command line, comma-separated
    pub default_partition: String,

    /// IANA zone name the scheduler's wall-clock timestamps are in
    pub timezone: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_partition: DEFAULT_PARTITION.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Dashboard refresh interval in seconds
    pub interval_secs: f64,

    /// Pending jobs waiting longer than this are flagged
    pub long_wait_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            long_wait_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// User whose rows are emphasised on the dashboard (display only)
    pub highlight_user: Option<String>,

    /// Dashboard color theme: "dark" or "light"
    pub theme: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            highlight_user: None,
            theme: "dark".to_string(),
        }
    }
}

impl DisplayConfig {
    fn validate(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        let normalized = self.theme.to_lowercase();
        if normalized != "dark" && normalized != "light" {
            warnings.push(format!(
                "display.theme must be 'dark' or 'light', got '{}' - using default (dark)",
                self.theme
            ));
            self.theme = "dark".to_string();
        } else {
            self.theme = normalized;
        }
        warnings
    }
}

impl RefreshConfig {
    /// Validate refresh configuration values.
    /// Returns a list of warnings for invalid values that were corrected to defaults.
    /// If `strict` is true, returns Err instead of correcting values.
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        let defaults = Self::default();

        if !self.interval_secs.is_finite() || self.interval_secs < MIN_REFRESH_INTERVAL {
            let msg = format!(
                "refresh.interval_secs must be at least {MIN_REFRESH_INTERVAL} second(s), got {}",
                self.interval_secs
            );
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using default ({})", defaults.interval_secs));
            self.interval_secs = defaults.interval_secs;
        }

        if self.long_wait_secs == 0 || self.long_wait_secs > MAX_LONG_WAIT_SECS {
            let msg = format!(
                "refresh.long_wait_secs must be between 1 and {MAX_LONG_WAIT_SECS} second(s), got {}",
                self.long_wait_secs
            );
            if strict {
                return Err(msg);
            }
            warnings.push(format!("{msg} - using default ({})", defaults.long_wait_secs));
            self.long_wait_secs = defaults.long_wait_secs;
        }

        Ok(warnings)
    }

    /// Long-wait threshold as a chrono duration. Out-of-range values that
    /// skipped validation fall back to the default.
    pub fn long_wait(&self) -> chrono::Duration {
        let fallback = Self::default().long_wait_secs;
        let secs = if (1..=MAX_LONG_WAIT_SECS).contains(&self.long_wait_secs) {
            self.long_wait_secs
        } else {
            fallback
        };
        i64::try_from(secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or_else(|| chrono::Duration::hours(1))
    }
}

impl QueryConfig {
    /// Resolve the configured zone name.
    ///
    /// Callers validate at load time, so this only fails for values set after
    /// loading (e.g. a bad `--timezone` flag).
    pub fn zone(&self) -> Result<Tz, String> {
        parse_timezone(&self.timezone)
    }

    fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = Vec::new();
        if let Err(e) = parse_timezone(&self.timezone) {
            if strict {
                return Err(e);
            }
            warnings.push(format!("{e} - using default ({DEFAULT_TIMEZONE})"));
            self.timezone = DEFAULT_TIMEZONE.to_string();
        }
        if self.default_partition.trim().is_empty() {
            warnings.push(format!(
                "query.default_partition is empty - using default ({DEFAULT_PARTITION})"
            ));
            self.default_partition = DEFAULT_PARTITION.to_string();
        }
        Ok(warnings)
    }
}

/// Parse an IANA zone name such as "US/Pacific" or "Europe/Berlin".
pub fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| format!("unknown timezone '{name}'"))
}

impl AppConfig {
    /// Get the user config file path, respecting XDG_CONFIG_HOME
    ///
    /// Resolution order:
    /// 1. $XDG_CONFIG_HOME/qwatch/config.toml (if XDG_CONFIG_HOME is set)
    /// 2. $HOME/.config/qwatch/config.toml (if HOME is set)
    /// 3. dirs::config_dir()/qwatch/config.toml
    #[must_use]
    pub fn user_config_path() -> Option<std::path::PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
            && !xdg_config.is_empty()
        {
            return Some(std::path::PathBuf::from(xdg_config).join("qwatch/config.toml"));
        }

        if let Some(home) = std::env::var_os("HOME") {
            return Some(std::path::PathBuf::from(home).join(".config/qwatch/config.toml"));
        }

        dirs::config_dir().map(|dir| dir.join("qwatch/config.toml"))
    }

    /// Load configuration from files and environment.
    /// Returns the config and any warnings encountered during loading.
    pub fn load() -> (Self, Vec<String>) {
        let mut config = Self::default();
        let mut warnings = Vec::new();
        let strict = Self::is_strict_mode();

        Self::load_config_file(&mut config, "/etc/qwatch/config.toml", &mut warnings);

        if let Some(user_path) = Self::user_config_path() {
            Self::load_config_file(&mut config, &user_path.to_string_lossy(), &mut warnings);
        }

        config.apply_env_overrides();

        match config.validate(strict) {
            Ok(validation_warnings) => warnings.extend(validation_warnings),
            Err(err) => {
                eprintln!("Error: {}", err);
                eprintln!("(QWATCH_STRICT_CONFIG is set - config errors are fatal)");
                std::process::exit(1);
            }
        }

        (config, warnings)
    }

    /// Validate every section, correcting invalid values unless `strict`.
    pub fn validate(&mut self, strict: bool) -> Result<Vec<String>, String> {
        let mut warnings = self.refresh.validate(strict)?;
        warnings.extend(self.query.validate(strict)?);
        warnings.extend(self.display.validate());
        Ok(warnings)
    }

    /// Parse a TOML document into a config, for files and tests alike.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn is_strict_mode() -> bool {
        std::env::var("QWATCH_STRICT_CONFIG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Load a config file, collecting warnings on parse errors but not on missing files.
    fn load_config_file(config: &mut Self, path: &str, warnings: &mut Vec<String>) {
        let strict = Self::is_strict_mode();

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(parsed) => config.merge(parsed),
                Err(e) => {
                    if strict {
                        eprintln!("Error: Failed to parse config file '{}': {}", path, e);
                        eprintln!("(QWATCH_STRICT_CONFIG is set - config errors are fatal)");
                        std::process::exit(1);
                    }
                    warnings.push(format!("Config parse error in '{}': {}", path, e));
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                if strict {
                    eprintln!("Error: Could not read config file '{}': {}", path, e);
                    eprintln!("(QWATCH_STRICT_CONFIG is set - config errors are fatal)");
                    std::process::exit(1);
                }
                warnings.push(format!("Could not read config '{}': {}", path, e));
            }
        }
    }

    fn merge(&mut self, other: AppConfig) {
        self.system.slurm_bin_path = other
            .system
            .slurm_bin_path
            .or(self.system.slurm_bin_path.take());
        self.display.highlight_user = other
            .display
            .highlight_user
            .or(self.display.highlight_user.take());
        self.display.theme = other.display.theme;
        self.query = other.query;
        self.refresh = other.refresh;
    }

    fn apply_env_overrides(&mut self) {
        let strict = Self::is_strict_mode();

        if let Ok(val) = std::env::var("QWATCH_SLURM_PATH")
            && !val.is_empty()
        {
            let path = std::path::PathBuf::from(&val);
            if path.is_dir() {
                self.system.slurm_bin_path = Some(path);
            } else {
                Self::report_env_error(strict, "QWATCH_SLURM_PATH", &val, "not a valid directory");
            }
        }

        if let Ok(val) = std::env::var("QWATCH_PARTITION")
            && !val.trim().is_empty()
        {
            self.query.default_partition = val;
        }

        if let Ok(val) = std::env::var("QWATCH_TIMEZONE") {
            match parse_timezone(&val) {
                Ok(_) => self.query.timezone = val,
                Err(e) => Self::report_env_error(strict, "QWATCH_TIMEZONE", &val, &e),
            }
        }

        if let Ok(val) = std::env::var("QWATCH_REFRESH") {
            match val.parse::<f64>() {
                Ok(secs) if secs >= MIN_REFRESH_INTERVAL => self.refresh.interval_secs = secs,
                Ok(_) => Self::report_env_error(
                    strict,
                    "QWATCH_REFRESH",
                    &val,
                    &format!("must be at least {} second(s)", MIN_REFRESH_INTERVAL),
                ),
                Err(_) => Self::report_env_error(
                    strict,
                    "QWATCH_REFRESH",
                    &val,
                    "expected a number of seconds",
                ),
            }
        }

        if let Ok(val) = std::env::var("QWATCH_HIGHLIGHT_USER")
            && !val.is_empty()
        {
            self.display.highlight_user = Some(val);
        }

        if let Ok(val) = std::env::var("QWATCH_THEME")
            && !val.is_empty()
        {
            self.display.theme = val;
        }
    }

    /// Report an environment variable error, exiting if strict mode is enabled
    fn report_env_error(strict: bool, var_name: &str, value: &str, reason: &str) {
        if strict {
            eprintln!("Error: Invalid value '{}' for {}: {}", value, var_name, reason);
            eprintln!("(QWATCH_STRICT_CONFIG is set - config errors are fatal)");
            std::process::exit(1);
        } else {
            eprintln!(
                "Warning: Invalid value '{}' for {}, {} - using default",
                value, var_name, reason
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.query.default_partition, "xiaojie");
        assert_eq!(config.query.timezone, "US/Pacific");
        assert_eq!(config.refresh.interval_secs, 1.0);
        assert_eq!(config.refresh.long_wait_secs, 3600);
        assert!(config.display.highlight_user.is_none());
        assert_eq!(config.display.theme, "dark");
        assert_eq!(config.query.zone().unwrap(), chrono_tz::US::Pacific);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [refresh]
            interval_secs = 2.5

            [display]
            highlight_user = "alice"
            "#,
        )
        .unwrap();
        assert_eq!(config.refresh.interval_secs, 2.5);
        assert_eq!(config.refresh.long_wait_secs, 3600);
        assert_eq!(config.display.highlight_user.as_deref(), Some("alice"));
        assert_eq!(config.query.default_partition, DEFAULT_PARTITION);
    }

    #[test]
    fn test_validate_corrects_bad_interval() {
        let mut config = RefreshConfig {
            interval_secs: 0.0,
            long_wait_secs: 3600,
        };
        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("interval_secs"));
        assert_eq!(config.interval_secs, RefreshConfig::default().interval_secs);
    }

    #[test]
    fn test_validate_rejects_nan_interval() {
        let mut config = RefreshConfig {
            interval_secs: f64::NAN,
            long_wait_secs: 3600,
        };
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_validate_strict_mode_error() {
        let mut config = RefreshConfig {
            interval_secs: 1.0,
            long_wait_secs: 0,
        };
        let err = config.validate(true).unwrap_err();
        assert!(err.contains("long_wait_secs"));
    }

    #[test]
    fn test_validate_huge_long_wait() {
        let mut config = RefreshConfig {
            interval_secs: 1.0,
            long_wait_secs: u64::MAX,
        };
        assert!(config.clone().validate(true).is_err());

        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("long_wait_secs"));
        assert_eq!(config.long_wait_secs, 3600);
    }

    #[test]
    fn test_long_wait_duration() {
        let config = RefreshConfig {
            interval_secs: 1.0,
            long_wait_secs: MAX_LONG_WAIT_SECS,
        };
        assert_eq!(config.long_wait(), chrono::Duration::days(365));

        // Never panics, even when validation was skipped
        let unchecked = RefreshConfig {
            interval_secs: 1.0,
            long_wait_secs: i64::MAX as u64 / 10,
        };
        assert_eq!(unchecked.long_wait(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_validate_unknown_timezone_falls_back() {
        let mut config = AppConfig::default();
        config.query.timezone = "Mars/Olympus".to_string();
        let warnings = config.validate(false).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Mars/Olympus"));
        assert_eq!(config.query.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_validate_theme() {
        let mut config = AppConfig::default();
        config.display.theme = "LIGHT".to_string();
        assert!(config.validate(false).unwrap().is_empty());
        assert_eq!(config.display.theme, "light");

        config.display.theme = "solarized".to_string();
        let warnings = config.validate(false).unwrap();
        assert!(warnings[0].contains("solarized"));
        assert_eq!(config.display.theme, "dark");
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Berlin").unwrap(), chrono_tz::Europe::Berlin);
        assert!(parse_timezone("not/a-zone").is_err());
    }
}
