use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub execution: ExecutionConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub shell: PathBuf,
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AuditConfig {
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("cmdguard"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Config file not found: {}", path.display()),
            )));
        }

        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;

        // Validate config
        config.validate()?;

        Ok(config)
    }

    /// Load from `path` (or the default location), falling back to defaults
    /// when no file exists. A file that exists but is invalid is still an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Ok(path) => path,
                Err(ConfigError::DirectoryNotFound) => return Ok(Self::default_config()),
                Err(e) => return Err(e),
            },
        };

        if path.exists() {
            Self::load_from(path)
        } else {
            Ok(Self::default_config())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_path()?)
    }

    /// Save configuration to a specific file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        // Validate before saving
        self.validate()?;

        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        // Set permissions to 600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Config {
            execution: ExecutionConfig {
                shell: PathBuf::from("/bin/sh"),
                timeout_seconds: 300,
            },
            audit: AuditConfig {
                enabled: true,
                log_path: None,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    /// Validate configuration values
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.execution.shell.is_absolute() {
            return Err(ConfigError::InvalidValue(format!(
                "shell must be an absolute path, got {}",
                self.execution.shell.display()
            )));
        }

        if self.execution.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue(format!(
                "Unknown log level: {}. Expected one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.execution.timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.execution.shell, PathBuf::from("/bin/sh"));
        assert_eq!(config.timeout(), Duration::from_secs(300));
        assert!(config.audit.enabled);
        assert!(config.audit.log_path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default_config();
        config.execution.timeout_seconds = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_validate_relative_shell() {
        let mut config = Config::default_config();
        config.execution.shell = PathBuf::from("sh");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_log_level() {
        let mut config = Config::default_config();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = Config::default_config();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();

        assert_eq!(config, parsed);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cmdguard").join("config.toml");

        let mut config = Config::default_config();
        config.execution.timeout_seconds = 42;
        config.audit.log_path = Some(temp_dir.path().join("audit.log"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[execution]
shell = "/bin/sh"
timeout_seconds = 0

[audit]
enabled = false

[logging]
level = "info"
"#,
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_load_malformed_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "execution = [").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config, Config::default_config());
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.toml");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ReadError(_))
        ));
    }
}
