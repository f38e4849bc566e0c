//! Configuration Loader
//!
//! Environment-aware loading of the `temporal` configuration tree. Handles
//! safe file reads, an optional `temporal:` document root, environment
//! override files and sanitized debug output.

use super::TemporalConfig;
use crate::error::{AssemblyError, AssemblyResult};
use serde_yaml::Value as YamlValue;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_CONFIG_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB limit
const BASE_CONFIG_FILE_NAMES: [&str; 2] = ["temporal.yaml", "temporal.yml"];
const ROOT_KEY: &str = "temporal";

/// Holds a resolved and validated [`TemporalConfig`]
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: TemporalConfig,
    environment: String,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// Parse a YAML document; `temporal:`-rooted and bare trees are both accepted
    pub fn from_yaml_str(yaml: &str) -> AssemblyResult<Self> {
        let value = Self::parse_yaml("inline", yaml)?;
        let config = Self::into_config("inline", value)?;
        Ok(Self {
            config,
            environment: Self::detect_environment(),
            source: None,
        })
    }

    /// Load a single configuration file
    pub fn load_from_file(path: impl AsRef<Path>) -> AssemblyResult<Self> {
        let path = path.as_ref();
        let content = Self::read_config_file_safely(path)?;
        let value = Self::parse_yaml(&path.display().to_string(), &content)?;
        let config = Self::into_config(&path.display().to_string(), value)?;

        debug!(path = %path.display(), "Loaded temporal configuration file");

        Ok(Self {
            config,
            environment: Self::detect_environment(),
            source: Some(path.to_path_buf()),
        })
    }

    /// Load `temporal.yaml` from `dir`, merged with `temporal.<environment>.yaml` when present
    pub fn load_from_directory_with_env(
        dir: impl AsRef<Path>,
        environment: &str,
    ) -> AssemblyResult<Self> {
        let dir = dir.as_ref();
        let base_path = Self::find_config_file(dir)?;
        let mut merged = Self::parse_yaml(
            &base_path.display().to_string(),
            &Self::read_config_file_safely(&base_path)?,
        )?;
        merged = Self::unwrap_root(merged);

        let override_path = dir.join(format!("temporal.{environment}.yaml"));
        if override_path.is_file() {
            debug!(
                environment = %environment,
                path = %override_path.display(),
                "Applying environment-specific overrides"
            );
            let overrides = Self::parse_yaml(
                &override_path.display().to_string(),
                &Self::read_config_file_safely(&override_path)?,
            )?;
            Self::merge_yaml_values(&mut merged, Self::unwrap_root(overrides));
        }

        let config = Self::into_config(&base_path.display().to_string(), merged)?;

        Ok(Self {
            config,
            environment: environment.to_string(),
            source: Some(base_path),
        })
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &TemporalConfig {
        &self.config
    }

    pub fn into_inner(self) -> TemporalConfig {
        self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// File the configuration was read from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Configuration as JSON with credentials masked
    pub fn debug_config(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null);
        let sensitive_patterns = ["key", "pem", "secret", "token", "password", "credential"];
        Self::sanitize_json_recursive(&mut value, &sensitive_patterns);
        value
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("TEMPORAL_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn find_config_file(dir: &Path) -> AssemblyResult<PathBuf> {
        BASE_CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| {
                AssemblyError::configuration(
                    dir.display().to_string(),
                    format!(
                        "No configuration file found (searched: {})",
                        BASE_CONFIG_FILE_NAMES.join(", ")
                    ),
                )
            })
    }

    /// Safely read a configuration file with size and file type checks
    fn read_config_file_safely(path: &Path) -> AssemblyResult<String> {
        let display = path.display().to_string();
        let metadata = std::fs::metadata(path)
            .map_err(|e| AssemblyError::configuration(&display, format!("Failed to read: {e}")))?;

        if !metadata.is_file() {
            return Err(AssemblyError::configuration(
                display,
                "Configuration path must point to a regular file",
            ));
        }

        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(AssemblyError::configuration(
                display,
                format!(
                    "Configuration file too large ({}MB > {}MB limit)",
                    metadata.len() / (1024 * 1024),
                    MAX_CONFIG_FILE_SIZE / (1024 * 1024)
                ),
            ));
        }

        std::fs::read_to_string(path)
            .map_err(|e| AssemblyError::configuration(display, format!("Failed to read: {e}")))
    }

    fn parse_yaml(source: &str, content: &str) -> AssemblyResult<YamlValue> {
        let value: YamlValue = serde_yaml::from_str(content)
            .map_err(|e| AssemblyError::configuration(source, format!("Invalid YAML: {e}")))?;
        // An empty document means "all defaults"
        Ok(match value {
            YamlValue::Null => YamlValue::Mapping(Default::default()),
            other => other,
        })
    }

    /// Strip a top-level `temporal:` key when it is the only key present
    fn unwrap_root(value: YamlValue) -> YamlValue {
        if let YamlValue::Mapping(map) = &value {
            if map.len() == 1 {
                if let Some(inner) = map.get(YamlValue::String(ROOT_KEY.to_string())) {
                    return match inner {
                        YamlValue::Null => YamlValue::Mapping(Default::default()),
                        other => other.clone(),
                    };
                }
            }
        }
        value
    }

    fn into_config(source: &str, value: YamlValue) -> AssemblyResult<TemporalConfig> {
        let mut config: TemporalConfig =
            serde_yaml::from_value(Self::unwrap_root(value)).map_err(|e| {
                AssemblyError::configuration(
                    source,
                    format!("Failed to deserialize configuration: {e}"),
                )
            })?;
        config.resolve()?;
        Ok(config)
    }

    /// Recursively merge YAML values (environment overrides into base config)
    fn merge_yaml_values(base: &mut YamlValue, override_value: YamlValue) {
        match (&mut *base, override_value) {
            (YamlValue::Mapping(base_map), YamlValue::Mapping(override_map)) => {
                for (key, value) in override_map {
                    if let Some(existing_value) = base_map.get_mut(&key) {
                        Self::merge_yaml_values(existing_value, value);
                    } else {
                        base_map.insert(key, value);
                    }
                }
            }
            (base_ref, override_val) => {
                *base_ref = override_val;
            }
        }
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    if is_sensitive {
                        match val {
                            serde_json::Value::Null => {}
                            serde_json::Value::String(s) if s.is_empty() => {
                                *val = serde_json::Value::String("[EMPTY]".to_string());
                            }
                            _ => {
                                *val = serde_json::Value::String("[MASKED]".to_string());
                            }
                        }
                    } else {
                        Self::sanitize_json_recursive(val, sensitive_patterns);
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items.iter_mut() {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rooted_and_bare_documents() {
        let rooted = ConfigManager::from_yaml_str(
            "temporal:\n  defaultClient: bar\n  clients:\n    bar:\n      namespace: bar\n",
        )
        .unwrap();
        assert_eq!(rooted.config().default_client, "bar");

        let bare = ConfigManager::from_yaml_str("defaultClient: default\n").unwrap();
        assert_eq!(bare.config().default_client, "default");

        let empty = ConfigManager::from_yaml_str("").unwrap();
        assert!(empty.config().clients.contains_key("default"));
    }

    #[test]
    fn test_environment_override_merge() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("temporal.yaml"),
            "temporal:\n  workers:\n    foo:\n      taskQueue: foo\n      maxConcurrentActivityTaskPollers: 2\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("temporal.production.yaml"),
            "temporal:\n  workers:\n    foo:\n      maxConcurrentActivityTaskPollers: 8\n",
        )
        .unwrap();

        let manager =
            ConfigManager::load_from_directory_with_env(dir.path(), "production").unwrap();
        let foo = &manager.config().workers["foo"];
        assert_eq!(foo.task_queue, "foo");
        assert_eq!(foo.tunables.max_concurrent_activity_task_pollers, 8);
        assert_eq!(manager.environment(), "production");

        let manager = ConfigManager::load_from_directory_with_env(dir.path(), "test").unwrap();
        assert_eq!(
            manager.config().workers["foo"]
                .tunables
                .max_concurrent_activity_task_pollers,
            2
        );
    }

    #[test]
    fn test_missing_directory_file() {
        let dir = TempDir::new().unwrap();
        let err = ConfigManager::load_from_directory_with_env(dir.path(), "test").unwrap_err();
        assert!(err.to_string().contains("No configuration file found"));
    }

    #[test]
    fn test_debug_config_masks_credentials() {
        let manager = ConfigManager::from_yaml_str(
            "clients:\n  bar:\n    namespace: bar\n    clientKey: super-secret-key\n    clientPem: cert-body\n",
        )
        .unwrap();
        let debug = manager.debug_config();
        let bar = &debug["clients"]["bar"];
        assert_eq!(bar["clientKey"], "[MASKED]");
        assert_eq!(bar["clientPem"], "[MASKED]");
        assert_eq!(bar["namespace"], "bar");
    }
}
