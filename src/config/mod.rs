//! TOML-based configuration.
//!
//! Supports a config file (cubewright.toml) with environment variable
//! expansion.
//!
//! Example configuration:
//! ```toml
//! [backend]
//! driver = "duckdb"
//! connection_string = "./data/cubes.duckdb"
//!
//! [file_store]
//! root = "${CUBEWRIGHT_DATA}/uploads"
//!
//! [build]
//! cleanup_on_failure = false
//! materialise_views = true
//! stage_timeout_secs = 300
//!
//! [output]
//! preview_page_size = 100
//! export_page_size = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub file_store: FileStoreSettings,
    pub build: BuildSettings,
    pub output: OutputSettings,
}

/// Backend connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Database driver ("duckdb", "postgres").
    pub driver: String,

    /// Connection string or database path (supports ${ENV_VAR} expansion).
    pub connection_string: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            driver: "duckdb".into(),
            connection_string: ":memory:".into(),
        }
    }
}

impl BackendSettings {
    pub fn resolved_connection_string(&self) -> Result<String, SettingsError> {
        expand_env_vars(&self.connection_string)
    }
}

/// File store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileStoreSettings {
    /// Root directory of the local store.
    pub root: String,
}

impl Default for FileStoreSettings {
    fn default() -> Self {
        Self {
            root: "./data/uploads".into(),
        }
    }
}

impl FileStoreSettings {
    pub fn resolved_root(&self) -> Result<PathBuf, SettingsError> {
        Ok(PathBuf::from(expand_env_vars(&self.root)?))
    }
}

/// Build pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildSettings {
    /// Drop the per-revision schema when a build fails. Off by default
    /// so failed schemas stay around for post-mortem.
    pub cleanup_on_failure: bool,

    /// Materialise the per-language views after the base views succeed.
    pub materialise_views: bool,

    /// Per-stage duration after which a stage is logged as a
    /// performance anomaly. Stages are never aborted by this.
    pub stage_timeout_secs: u64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            cleanup_on_failure: false,
            materialise_views: true,
            stage_timeout_secs: 300,
        }
    }
}

/// Output service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Default rows per preview page.
    pub preview_page_size: u64,

    /// Rows fetched per cursor page while streaming exports.
    pub export_page_size: u64,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            preview_page_size: 100,
            export_page_size: 5000,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `CUBEWRIGHT_CONFIG`
    /// 2. `./cubewright.toml`
    /// 3. `~/.config/cubewright/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("CUBEWRIGHT_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("cubewright.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cubewright").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(chars.next().expect("peeked"));
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(chars.next().expect("peeked"));
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_vars_braces() {
        env::set_var("CW_TEST_VAR", "hello");
        assert_eq!(expand_env_vars("${CW_TEST_VAR}").unwrap(), "hello");
        assert_eq!(
            expand_env_vars("prefix_${CW_TEST_VAR}_suffix").unwrap(),
            "prefix_hello_suffix"
        );
        env::remove_var("CW_TEST_VAR");
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        env::set_var("CW_TEST_VAR2", "world");
        assert_eq!(expand_env_vars("$CW_TEST_VAR2").unwrap(), "world");
        assert_eq!(expand_env_vars("$CW_TEST_VAR2!").unwrap(), "world!");
        env::remove_var("CW_TEST_VAR2");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        assert!(expand_env_vars("${CW_NONEXISTENT_12345}").is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[backend]
driver = "duckdb"
connection_string = "./data/cubes.duckdb"

[build]
cleanup_on_failure = true
stage_timeout_secs = 60

[output]
preview_page_size = 25
"#;
        let settings: Settings = toml::from_str(toml).unwrap();
        assert_eq!(settings.backend.driver, "duckdb");
        assert!(settings.build.cleanup_on_failure);
        assert_eq!(settings.build.stage_timeout_secs, 60);
        assert_eq!(settings.output.preview_page_size, 25);
        // Unset sections fall back wholesale
        assert_eq!(settings.output.export_page_size, 5000);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.backend.driver, "duckdb");
        assert!(!settings.build.cleanup_on_failure);
        assert!(settings.build.materialise_views);
    }
}
