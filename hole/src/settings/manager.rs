use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use hole_bootstrap::config::ConfigPrefix;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{
    keyed::{KeyedConfig, Settings},
    stack::ConfigStack,
};
use crate::{
    error::{HoleError, Result},
    plugin::PluginManager,
};

// built-in config keys
pub const KEY_USER_CONFIG: &str = "user.config";
pub const KEY_PLUGIN_PATH: &str = "plugin.path";
pub const KEY_PLUGIN_ENABLED: &str = "plugin.enabled";

pub const SYSTEM_LEVEL: &str = "SYSTEM";
pub const USER_LEVEL: &str = "USER";

const BUILTIN_KEYS: [&str; 3] = [KEY_USER_CONFIG, KEY_PLUGIN_PATH, KEY_PLUGIN_ENABLED];

/// The `[hole]` section of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HoleSettings {
    /// JSON file loaded as the `USER` level.
    pub user_config: Option<PathBuf>,
    pub plugin_path: Option<PathBuf>,
    /// Names of the plugins to enable; the built-in set when absent.
    pub plugins: Option<Vec<String>>,
}

impl ConfigPrefix for HoleSettings {
    const PREFIX: &'static str = "hole";
}

impl HoleSettings {
    fn to_settings(&self) -> Settings {
        let mut settings = Settings::new();
        if let Some(path) = &self.user_config {
            settings.insert(KEY_USER_CONFIG.to_string(), json!(path.to_string_lossy()));
        }
        if let Some(path) = &self.plugin_path {
            settings.insert(KEY_PLUGIN_PATH.to_string(), json!(path.to_string_lossy()));
        }
        if let Some(plugins) = &self.plugins {
            settings.insert(KEY_PLUGIN_ENABLED.to_string(), json!(plugins));
        }
        settings
    }
}

/// Owns the application's [`ConfigStack`].
///
/// Levels, bottom to top: `DEFAULT` (built-in and plugin defaults), `SYSTEM` (the
/// `[hole]` section) and `USER` (the JSON file named by `user.config`).
#[derive(Debug)]
pub struct ConfigManager {
    stack: RwLock<ConfigStack>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self {
            stack: RwLock::new(ConfigStack::new(KeyedConfig::new(BUILTIN_KEYS))),
        }
    }
}

impl ConfigManager {
    /// Rebuilds the stack with the built-in keys plus every registered plugin's keys.
    pub fn install_defaults(&self, plugins: &PluginManager) -> Result<()> {
        let mut keys: Vec<String> = BUILTIN_KEYS.iter().map(|k| k.to_string()).collect();
        plugins.for_each_registered(|plugin| {
            keys.extend(plugin.config_keys().iter().map(|k| k.to_string()))
        });

        let mut default_config = KeyedConfig::new(keys);
        default_config.set(KEY_USER_CONFIG, Value::Null)?;
        default_config.set(KEY_PLUGIN_PATH, Value::Null)?;
        default_config.set(KEY_PLUGIN_ENABLED, json!(PluginManager::BUILTIN))?;
        let mut result = Ok(());
        plugins.for_each_registered(|plugin| {
            if result.is_ok() {
                result = plugin.apply_defaults(&mut default_config);
            }
        });
        result?;

        *self.write() = ConfigStack::new(default_config);
        Ok(())
    }

    /// Loads the `[hole]` section as the `SYSTEM` level.
    pub fn load_settings(&self, hole_settings: &HoleSettings) -> Result<()> {
        let settings = hole_settings.to_settings();
        let mut stack = self.write();
        stack.create_level(SYSTEM_LEVEL);
        stack.load_at(&settings, SYSTEM_LEVEL)
    }

    /// Loads a JSON object file as `level`.
    pub fn load_from_file(&self, path: &Path, level: &str) -> Result<()> {
        if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
            return Err(HoleError::UnsupportedConfigFile(path.to_path_buf()));
        }
        if path.is_dir() {
            return Err(HoleError::Config(format!(
                "the given path is a directory: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path).map_err(|source| HoleError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = serde_json::from_str(&content)?;

        tracing::debug!(path = %path.display(), level, keys = settings.len(), "loading config file");
        let mut stack = self.write();
        stack.create_level(level);
        stack.load_at(&settings, level)
    }

    /// Loads the file named by `user.config`, if any, as the `USER` level.
    pub fn load_user_config(&self) -> Result<()> {
        let Some(path) = self.get_str(KEY_USER_CONFIG) else {
            return Ok(());
        };
        self.load_from_file(Path::new(&path), USER_LEVEL)
    }

    /// The current value of `key` in the dynamic view.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().dynamic().get(key).cloned()
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.read().dynamic().get_str(key).map(str::to_string)
    }

    /// Names listed under `plugin.enabled`.
    pub fn enabled_plugins(&self) -> Result<Vec<String>> {
        let value = self.get(KEY_PLUGIN_ENABLED).unwrap_or(Value::Null);
        let plugins: Option<Vec<String>> = serde_json::from_value(value)?;
        Ok(plugins.unwrap_or_default())
    }

    pub fn stack(&self) -> RwLockReadGuard<'_, ConfigStack> {
        self.read()
    }

    fn read(&self) -> RwLockReadGuard<'_, ConfigStack> {
        self.stack.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConfigStack> {
        self.stack.write().unwrap_or_else(|e| e.into_inner())
    }
}
