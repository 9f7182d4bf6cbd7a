//! CLI configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (`--config`, or `~/.tibber/config.yaml` when present)
//! 3. Environment variables (`TIBBER_TOKEN`, `TIBBER_HOME_ID`, `TIBBER_FORMAT`)
//!
//! Command-line flags are applied on top by the caller.

use crate::output::OutputFormat;
use powerctl_client::mask_token;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const ENV_TOKEN: &str = "TIBBER_TOKEN";
pub const ENV_HOME_ID: &str = "TIBBER_HOME_ID";
pub const ENV_FORMAT: &str = "TIBBER_FORMAT";

/// Written by `config edit` when no file exists yet.
pub const TEMPLATE: &str = "\
# Tibber CLI Configuration
# Get your token from: https://developer.tibber.com/settings/access-token

token: \"\"
# home_id: \"\"
# format: pretty  # Options: pretty, json, markdown
";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file '{}': {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file '{}': {}", .0.display(), .1)]
    Parse(PathBuf, String),

    #[error("no API token found. Set TIBBER_TOKEN environment variable or create config at {0}")]
    MissingToken(String),

    #[error("invalid key: {0}. Valid keys: token, home_id, format")]
    UnknownKey(String),

    #[error(transparent)]
    InvalidFormat(#[from] crate::output::InvalidFormat),

    #[error("cannot determine home directory; pass --config")]
    NoHomeDir,
}

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tibber API token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Home used by `prices`, `home` and `live` when none is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_id: Option<String>,
    /// Output format.
    pub format: OutputFormat,
}

impl Config {
    /// `~/.tibber/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        home::home_dir().map(|home| home.join(".tibber").join("config.yaml"))
    }

    /// The explicit path, or the default one.
    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path().ok_or(ConfigError::NoHomeDir),
        }
    }

    /// Loads configuration from file, then applies environment variable overrides.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(explicit, Self::default_path(), |key| std::env::var(key).ok())
    }

    fn load_with<F>(
        explicit: Option<&Path>,
        default_path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match default_path {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env_overrides(env);
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let parse_err = |e: serde_yaml::Error| ConfigError::Parse(path.to_path_buf(), e.to_string());

        // An empty or comment-only file means defaults.
        let blank = content
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'));
        let mut config: Config = if blank {
            Config::default()
        } else {
            let value: serde_yaml::Value = serde_yaml::from_str(&content).map_err(parse_err)?;
            if value.is_null() {
                Config::default()
            } else {
                serde_yaml::from_value(value).map_err(parse_err)?
            }
        };
        config.normalize();
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields defaults.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    fn apply_env_overrides<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = env(ENV_TOKEN).filter(|v| !v.is_empty()) {
            self.token = Some(token);
        }

        if let Some(home_id) = env(ENV_HOME_ID).filter(|v| !v.is_empty()) {
            self.home_id = Some(home_id);
        }

        if let Some(format) = env(ENV_FORMAT).filter(|v| !v.is_empty()) {
            match format.parse() {
                Ok(parsed) => self.format = parsed,
                Err(e) => tracing::warn!("Ignoring {}: {}", ENV_FORMAT, e),
            }
        }
    }

    fn normalize(&mut self) {
        self.token = self.token.take().filter(|t| !t.trim().is_empty());
        self.home_id = self.home_id.take().filter(|h| !h.trim().is_empty());
    }

    /// Returns the token, or an error naming where to put one.
    pub fn validate(&self) -> Result<&str, ConfigError> {
        self.token.as_deref().ok_or_else(|| {
            let hint = Self::default_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "~/.tibber/config.yaml".to_string());
            ConfigError::MissingToken(hint)
        })
    }

    /// Sets one key by name.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match key {
            "token" => self.token = Some(value.to_string()),
            "home_id" => self.home_id = Some(value.to_string()),
            "format" => self.format = value.parse()?,
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        self.normalize();
        Ok(())
    }

    /// The token with the middle hidden.
    pub fn masked_token(&self) -> Option<String> {
        self.token.as_deref().map(mask_token)
    }

    /// Saves configuration to a YAML file, readable by the owner only.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        write_private(path, content.as_bytes())
    }
}

/// Creates the parent directory (0700) and writes `content` with mode 0600.
pub fn write_private(path: &Path, content: &[u8]) -> Result<(), ConfigError> {
    let io_err = |e| ConfigError::Io(path.to_path_buf(), e);

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder.create(dir).map_err(io_err)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path).map_err(io_err)?;
    file.write_all(content).map_err(io_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(io_err)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.token, None);
        assert_eq!(config.format, OutputFormat::Pretty);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "token: abc123\nhome_id: home-1\nformat: json\n");

        let config = Config::load_with(Some(&path), None, env(&[])).unwrap();
        assert_eq!(config.token.as_deref(), Some("abc123"));
        assert_eq!(config.home_id.as_deref(), Some("home-1"));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.validate().unwrap(), "abc123");
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "token: from-file\nhome_id: home-1\n");

        let config = Config::load_with(
            Some(&path),
            None,
            env(&[(ENV_TOKEN, "from-env"), (ENV_FORMAT, "md")]),
        )
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("from-env"));
        assert_eq!(config.home_id.as_deref(), Some("home-1"));
        assert_eq!(config.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_invalid_env_format_is_ignored() {
        let config = Config::load_with(None, None, env(&[(ENV_FORMAT, "xml")])).unwrap();
        assert_eq!(config.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_missing_default_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");

        let config = Config::load_with(None, Some(missing), env(&[(ENV_HOME_ID, "h")])).unwrap();
        assert_eq!(config.home_id.as_deref(), Some("h"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yaml");

        let err = Config::load_with(Some(&missing), None, env(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", "format: xml\n");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(..)));
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn test_template_parses_to_empty_config() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "config.yaml", TEMPLATE);

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config, Config::default());

        let path = write(&dir, "empty.yaml", "");
        assert_eq!(Config::from_file(&path).unwrap(), Config::default());
    }

    #[test]
    fn test_set_keys() {
        let mut config = Config::default();
        config.set("token", "abcd1234efgh5678").unwrap();
        config.set("home_id", "home-2").unwrap();
        config.set("format", "markdown").unwrap();

        assert_eq!(config.masked_token().as_deref(), Some("abcd...5678"));
        assert_eq!(config.home_id.as_deref(), Some("home-2"));
        assert_eq!(config.format, OutputFormat::Markdown);

        assert!(matches!(
            config.set("colour", "red"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            config.set("format", "xml"),
            Err(ConfigError::InvalidFormat(_))
        ));
        assert_eq!(config.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let mut config = Config::default();
        config.set("token", "secret").unwrap();
        config.set("format", "json").unwrap();
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded, config);

        let yaml = fs::read_to_string(&path).unwrap();
        assert!(!yaml.contains("home_id"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_from_file_or_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_file_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
