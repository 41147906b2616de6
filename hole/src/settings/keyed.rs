use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use serde_json::Value;

use crate::error::{HoleError, Result};

/// Values loaded into a [`KeyedConfig`] in one go.
pub type Settings = BTreeMap<String, Value>;

/// A map of JSON values whose keys must belong to a predefined key set.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedConfig {
    key_set: Arc<HashSet<String>>,
    data: Settings,
}

impl KeyedConfig {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_set: Arc::new(keys.into_iter().map(Into::into).collect()),
            data: Settings::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// The value of `key` as a string, `None` when unset, null or not a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        if !self.key_set.contains(key) {
            return Err(HoleError::IllegalKey(key.to_string()));
        }
        self.data.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Sets every pair of `settings`; stops at the first key outside the key set.
    pub fn load(&mut self, settings: &Settings) -> Result<()> {
        settings
            .iter()
            .try_for_each(|(key, value)| self.set(key, value.clone()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_set.contains(key)
    }

    pub fn data(&self) -> &Settings {
        &self.data
    }

    /// Merges `other`'s values over this config's values.
    pub(crate) fn merge(&mut self, other: &KeyedConfig) {
        self.data
            .extend(other.data.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}
