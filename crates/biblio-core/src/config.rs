//! Configuration management for biblio.
//!
//! Loads configuration from ${BIBLIO_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api_url`.
pub const API_URL_ENV: &str = "BIBLIO_API_URL";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for biblio configuration and session data.
    //!
    //! BIBLIO_HOME resolution order:
    //! 1. BIBLIO_HOME environment variable (if set)
    //! 2. ~/.config/biblio (default)

    use std::path::PathBuf;

    use anyhow::{Result, bail};

    /// Returns the biblio home directory.
    ///
    /// # Errors
    /// Returns an error if `BIBLIO_HOME` is unset and no home directory can
    /// be determined.
    pub fn biblio_home() -> Result<PathBuf> {
        resolve_home(std::env::var_os("BIBLIO_HOME").map(PathBuf::from), dirs::home_dir())
    }

    fn resolve_home(override_dir: Option<PathBuf>, home_dir: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = override_dir.filter(|d| !d.as_os_str().is_empty()) {
            return Ok(dir);
        }
        match home_dir {
            Some(home) => Ok(home.join(".config").join("biblio")),
            None => bail!("Cannot determine the home directory; set BIBLIO_HOME"),
        }
    }

    /// Returns the path to the config.toml file.
    ///
    /// # Errors
    /// See [`biblio_home`].
    pub fn config_path() -> Result<PathBuf> {
        Ok(biblio_home()?.join("config.toml"))
    }

    /// Returns the path to the persisted session record.
    ///
    /// # Errors
    /// See [`biblio_home`].
    pub fn session_path() -> Result<PathBuf> {
        Ok(biblio_home()?.join("session.json"))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_override_wins_over_home() {
            let home = resolve_home(
                Some(PathBuf::from("/srv/biblio")),
                Some(PathBuf::from("/home/ana")),
            );
            assert_eq!(home.unwrap(), PathBuf::from("/srv/biblio"));
        }

        #[test]
        fn test_empty_override_falls_back_to_home() {
            let home = resolve_home(Some(PathBuf::new()), Some(PathBuf::from("/home/ana")));
            assert_eq!(home.unwrap(), PathBuf::from("/home/ana/.config/biblio"));
        }

        #[test]
        fn test_missing_home_is_an_error() {
            let err = resolve_home(None, None).unwrap_err();
            assert!(err.to_string().contains("set BIBLIO_HOME"));
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive for the stderr and file layers.
    pub level: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the REST service.
    pub api_url: String,
    /// Request timeout; 0 disables the client-side timeout.
    pub timeout_secs: u32,
    pub log: LogConfig,
}

impl Config {
    pub const DEFAULT_API_URL: &str = "http://localhost:8090/biblioteca";
    const DEFAULT_TIMEOUT_SECS: u32 = 30;

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the config path cannot be resolved, or the file
    /// exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Resolves the API base URL: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL does not parse.
    pub fn effective_api_url(&self) -> Result<String> {
        resolve_api_url(std::env::var(API_URL_ENV).ok().as_deref(), &self.api_url)
    }

    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(u64::from(self.timeout_secs)))
        }
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Self::DEFAULT_API_URL.to_string(),
            timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            log: LogConfig::default(),
        }
    }
}

fn resolve_api_url(env_url: Option<&str>, config_url: &str) -> Result<String> {
    let chosen = [env_url.unwrap_or(""), config_url]
        .into_iter()
        .map(str::trim)
        .find(|url| !url.is_empty())
        .unwrap_or(Config::DEFAULT_API_URL);

    url::Url::parse(chosen).with_context(|| format!("Invalid API URL: {chosen}"))?;
    Ok(chosen.to_string())
}
