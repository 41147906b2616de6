use std::{
    collections::BTreeMap,
    collections::HashMap,
    env,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use config::{ConfigError, Environment, File, ValueKind};
use serde::de::DeserializeOwned;

/// Environment variable pointing at the folder that holds `config.toml`.
pub const CONFIG_FOLDER_ENV: &str = "HOLE_CONFIG";

static DEFAULT_CONFIG_FOLDER: LazyLock<PathBuf> = LazyLock::new(|| {
    if let Ok(dir) = env::var(CONFIG_FOLDER_ENV) {
        return PathBuf::from(dir);
    }
    let mut root_path = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_default(),
    };
    root_path.push("etc");
    root_path
});

/// Config is the configuration of the application.
///
/// It is loaded from the `config.toml` file of the config folder, then overridden by
/// environment variables such as `HOLE_LOGGING__CONSOLE_APPENDER__ENABLE=false`.
///
/// # Example
/// ```no_run
/// use hole_bootstrap::config::Config;
/// use hole_bootstrap::log::LoggingConfig;
///
/// let config = Config::load(Some("HOLE"), "__").unwrap();
/// let logging = config.get::<LoggingConfig>().unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    inner: config::Config,
}

impl Config {
    pub fn new(inner: config::Config) -> Self {
        Self { inner }
    }

    /// Loads the config from the default folder.
    ///
    /// The folder is `$HOLE_CONFIG` when set, otherwise `etc` under the crate
    /// manifest dir (cargo runs) or next to the executable.
    pub fn load(
        env_config_prefix: Option<&str>,
        env_config_split: &str,
    ) -> Result<Self, ConfigError> {
        Self::from_folder(
            DEFAULT_CONFIG_FOLDER.as_path(),
            env_config_prefix,
            env_config_split,
        )
    }

    pub fn from_folder(
        path: &Path,
        env_config_prefix: Option<&str>,
        env_config_split: &str,
    ) -> Result<Self, ConfigError> {
        let cfg = path.join("config.toml");
        let mut builder = config::Config::builder();

        if cfg.exists() {
            builder = builder.add_source(File::from(cfg));
        } else {
            tracing::warn!("not found config `{}`", cfg.display());
        }
        let environment = match env_config_prefix {
            Some(prefix) => Environment::with_prefix(prefix).prefix_separator("_"),
            None => Environment::default(),
        };
        builder = builder.add_source(
            environment
                .separator(env_config_split)
                .try_parsing(true),
        );
        let config = builder.build()?;

        Ok(Self { inner: config })
    }

    /// Reads the section named by `T::PREFIX`.
    ///
    /// A missing section is deserialized from an empty table, so types with
    /// `#[serde(default)]` fall back to their defaults.
    pub fn get<T>(&self) -> Result<T, ConfigError>
    where
        T: ConfigPrefix + DeserializeOwned,
    {
        match self.inner.get::<T>(T::PREFIX) {
            Ok(o) => Ok(o),
            Err(e) => {
                let ConfigError::NotFound(_) = &e else {
                    return Err(e);
                };
                let v = config::Value::new(None, ValueKind::Table(Default::default()));

                T::deserialize(v).map_err(|_| e)
            }
        }
    }

    pub fn to_properties(&self) -> Result<Properties, ConfigError> {
        Properties::from_config(self)
    }
}

/// ConfigPrefix names the config section a type is read from.
///
/// # Example
/// ```
/// use hole_bootstrap::config::ConfigPrefix;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct PortConfig {
///     port: u16,
/// }
/// impl ConfigPrefix for PortConfig {
///     const PREFIX: &'static str = "port";
/// }
/// ```
pub trait ConfigPrefix {
    const PREFIX: &'static str;
}

/// Flattened `key=value` view of a [`Config`], sorted by key.
pub struct Properties {
    properties: BTreeMap<String, String>,
}

pub struct PropertiesConfig {
    array_split: bool,
    separator: char,
}

impl Default for PropertiesConfig {
    fn default() -> Self {
        PropertiesConfig {
            array_split: true,
            separator: '.',
        }
    }
}

impl Properties {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::from_config_opt(config, &PropertiesConfig::default())
    }

    pub fn from_config_opt(
        config: &Config,
        properties_config: &PropertiesConfig,
    ) -> Result<Self, ConfigError> {
        let mut properties = BTreeMap::new();
        let config_map: HashMap<String, config::Value> = config.inner.clone().try_deserialize()?;
        Self::flatten("", &config_map, &mut properties, properties_config);
        Ok(Self { properties })
    }

    fn flatten(
        prefix: &str,
        map: &HashMap<String, config::Value>,
        properties: &mut BTreeMap<String, String>,
        properties_config: &PropertiesConfig,
    ) {
        for (key, value) in map {
            let full_key = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, properties_config.separator, key)
            };
            Self::handle_value(&full_key, value, properties, properties_config);
        }
    }

    fn handle_value(
        key: &str,
        value: &config::Value,
        properties: &mut BTreeMap<String, String>,
        properties_config: &PropertiesConfig,
    ) {
        let rendered = match &value.kind {
            ValueKind::Boolean(b) => b.to_string(),
            ValueKind::I64(i) => i.to_string(),
            ValueKind::I128(i) => i.to_string(),
            ValueKind::U64(u) => u.to_string(),
            ValueKind::U128(u) => u.to_string(),
            ValueKind::Float(f) => format!("{:.2}", f),
            ValueKind::String(s) => s.clone(),
            ValueKind::Nil => "Null".to_string(),
            ValueKind::Array(arr) if properties_config.array_split => {
                for (index, item) in arr.iter().enumerate() {
                    let array_key = format!("{}[{}]", key, index);
                    Self::handle_value(&array_key, item, properties, properties_config);
                }
                return;
            }
            ValueKind::Array(arr) => arr
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<String>>()
                .join(","),
            ValueKind::Table(nested_map) => {
                Self::flatten(key, nested_map, properties, properties_config);
                return;
            }
        };
        properties.insert(key.to_string(), rendered);
    }

    pub fn get_properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub fn to_properties(&self) -> String {
        self.properties
            .iter()
            .map(|(key, value)| format!("{} = {}", key, value))
            .collect::<Vec<String>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct SampleConfig {
        name: String,
        plugins: Vec<String>,
    }

    impl ConfigPrefix for SampleConfig {
        const PREFIX: &'static str = "sample";
    }

    fn folder_with(content: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), content).unwrap();
        dir
    }

    #[test]
    fn reads_section_from_config_file() {
        let dir = folder_with(
            r#"
            [sample]
            name = "hole"
            plugins = ["key-value", "time"]
            "#,
        );
        let config = Config::from_folder(dir.path(), Some("HOLE_TEST_UNSET"), "__").unwrap();
        let sample = config.get::<SampleConfig>().unwrap();

        assert_eq!(sample.name, "hole");
        assert_eq!(sample.plugins, vec!["key-value", "time"]);
    }

    #[test]
    fn missing_section_falls_back_to_defaults() {
        let dir = folder_with("[other]\nvalue = 1\n");
        let config = Config::from_folder(dir.path(), Some("HOLE_TEST_UNSET"), "__").unwrap();
        let sample = config.get::<SampleConfig>().unwrap();

        assert!(sample.name.is_empty());
        assert!(sample.plugins.is_empty());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_folder(dir.path(), Some("HOLE_TEST_UNSET"), "__");

        assert!(config.is_ok());
    }

    #[test]
    fn properties_are_flattened_and_sorted() {
        let dir = folder_with(
            r#"
            [sample]
            name = "hole"
            plugins = ["key-value", "time"]
            [sample.nested]
            enabled = true
            "#,
        );
        let config = Config::from_folder(dir.path(), Some("HOLE_TEST_UNSET"), "__").unwrap();
        let properties = config.to_properties().unwrap();
        let map = properties.get_properties();

        assert_eq!(map.get("sample.name").map(String::as_str), Some("hole"));
        assert_eq!(map.get("sample.plugins[1]").map(String::as_str), Some("time"));
        assert_eq!(map.get("sample.nested.enabled").map(String::as_str), Some("true"));
        assert!(
            properties
                .to_properties()
                .starts_with("sample.name = hole")
        );
    }
}
