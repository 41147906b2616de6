use chrono::Utc;

use crate::{app::HoleApp, entry::Entry, error::Result, settings::KeyedConfig};

use super::Plugin;

const KEY_TIME_PROPERTY: &str = "time.key";
const DEFAULT_TIME_PROPERTY: &str = "time";
const CONFIG_KEYS: &[&str] = &[KEY_TIME_PROPERTY];

/// Stamps every new entry with its creation time in Unix milliseconds.
///
/// The property name comes from `time.key`. Properties already on the entry are never
/// overwritten.
pub struct TimePlugin;

impl TimePlugin {
    pub const NAME: &'static str = "time";
}

impl Plugin for TimePlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn config_keys(&self) -> &'static [&'static str] {
        CONFIG_KEYS
    }

    fn apply_defaults(&self, config: &mut KeyedConfig) -> Result<()> {
        config.set(KEY_TIME_PROPERTY, DEFAULT_TIME_PROPERTY)
    }

    fn on_create_entry(&self, entry: &mut Entry, app: &HoleApp) {
        let property = app
            .config()
            .get_str(KEY_TIME_PROPERTY)
            .unwrap_or_else(|| DEFAULT_TIME_PROPERTY.to_string());
        if entry.properties().contains_key(&property) {
            tracing::warn!(
                id = entry.id(),
                property = property.as_str(),
                "creation time not stamped, property already set"
            );
            return;
        }
        entry.set(property, Utc::now().timestamp_millis().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_property_is_time() {
        let mut config = KeyedConfig::new(TimePlugin.config_keys().iter().copied());

        TimePlugin.apply_defaults(&mut config).unwrap();

        assert_eq!(config.get_str(KEY_TIME_PROPERTY), Some("time"));
    }
}
