use netcust_core::{HeaderStyle, DEFAULT_DOCUMENT_NAME};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Remote backup settings
#[derive(Debug, Clone, Serialize)]
pub struct SyncConfig {
    /// Directory holding the remote backup document. Unset disables sync.
    pub remote_dir: ConfigValue<Option<PathBuf>>,
    /// File name of the backup document inside `remote_dir`
    pub document_name: ConfigValue<String>,
}

/// CSV export settings
#[derive(Debug, Clone, Serialize)]
pub struct ExportConfig {
    pub header: ConfigValue<HeaderStyle>,
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding customers, fields and sync settings documents
    pub data_dir: ConfigValue<PathBuf>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub sync: SyncConfig,
    pub export: ExportConfig,
}

/// Internal structs for deserializing the config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    sync: SyncFile,
    export: ExportFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SyncFile {
    remote_dir: Option<PathBuf>,
    document_name: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportFile {
    header: Option<HeaderStyle>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |name| std::env::var(name).ok())
    }

    fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        // Start with defaults
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut remote_dir = ConfigValue::new(None, ConfigSource::Default);
        let mut document_name =
            ConfigValue::new(DEFAULT_DOCUMENT_NAME.to_string(), ConfigSource::Default);
        let mut header = ConfigValue::new(HeaderStyle::default(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(dir) = file_config.sync.remote_dir {
                remote_dir = ConfigValue::new(Some(resolve_relative(&path, dir)), ConfigSource::File);
            }
            if let Some(name) = file_config.sync.document_name {
                document_name = ConfigValue::new(name, ConfigSource::File);
            }
            if let Some(style) = file_config.export.header {
                header = ConfigValue::new(style, ConfigSource::File);
            }

            config_file = Some(path);
        }

        // Apply environment variable overrides
        if let Some(dir) = env("NETCUST_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(dir) = env("NETCUST_REMOTE_DIR") {
            remote_dir = ConfigValue::new(Some(PathBuf::from(dir)), ConfigSource::Environment);
        }
        if let Some(name) = env("NETCUST_DOCUMENT_NAME") {
            document_name = ConfigValue::new(name, ConfigSource::Environment);
        }

        Ok(Self {
            data_dir,
            config_file,
            sync: SyncConfig {
                remote_dir,
                document_name,
            },
            export: ExportConfig { header },
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/netcust/
    /// - macOS: ~/Library/Application Support/netcust/
    /// - Windows: %APPDATA%/netcust/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("netcust")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/netcust/
    /// - macOS: ~/Library/Application Support/netcust/
    /// - Windows: %APPDATA%/netcust/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("netcust")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve_relative(config_path: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&path))
            .unwrap_or(path)
    } else {
        path
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert!(config.data_dir.value.ends_with("netcust"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.sync.remote_dir.value, None);
        assert_eq!(config.sync.document_name.value, "net_customers_backup.json");
        assert_eq!(config.export.header.value, HeaderStyle::Primary);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/data").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  remote_dir: /mnt/backup").unwrap();
        writeln!(file, "  document_name: shop.json").unwrap();
        writeln!(file, "export:").unwrap();
        writeln!(file, "  header: secondary").unwrap();

        let config = Config::load_with_env(Some(config_path.clone()), no_env).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/data"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(
            config.sync.remote_dir.value,
            Some(PathBuf::from("/mnt/backup"))
        );
        assert_eq!(config.sync.document_name.value, "shop.json");
        assert_eq!(config.export.header.value, HeaderStyle::Secondary);
        assert_eq!(config.export.header.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: data").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  remote_dir: ../shared").unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
        assert_eq!(
            config.sync.remote_dir.value,
            Some(temp_dir.path().join("../shared"))
        );
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /from/file").unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  document_name: file.json").unwrap();

        let env: HashMap<&str, &str> = [
            ("NETCUST_DATA_DIR", "/from/env"),
            ("NETCUST_REMOTE_DIR", "/env/remote"),
            ("NETCUST_DOCUMENT_NAME", "env.json"),
        ]
        .into_iter()
        .collect();

        let config =
            Config::load_with_env(Some(config_path), |k| env.get(k).map(|v| v.to_string()))
                .unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.data_dir.source, ConfigSource::Environment);
        assert_eq!(
            config.sync.remote_dir.value,
            Some(PathBuf::from("/env/remote"))
        );
        assert_eq!(config.sync.remote_dir.source, ConfigSource::Environment);
        assert_eq!(config.sync.document_name.value, "env.json");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load_with_env(Some(config_path), no_env);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_invalid_header_style_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "export:").unwrap();
        writeln!(file, "  header: fancy").unwrap();

        assert!(Config::load_with_env(Some(config_path), no_env).is_err());
    }

    #[test]
    fn test_partial_file_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "sync:").unwrap();
        writeln!(file, "  remote_dir: /mnt/backup").unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.sync.remote_dir.source, ConfigSource::File);
        assert_eq!(config.sync.document_name.source, ConfigSource::Default);
    }
}
