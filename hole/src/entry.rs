//! Entries and the manager that owns them.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use serde::Serialize;

use crate::error::{HoleError, Result};

/// An entry: a unique id and a set of string properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    id: u32,
    properties: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            properties: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Sets a property, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Result<&str> {
        self.properties
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| HoleError::KeyNotFound(key.to_string()))
    }

    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }
}

/// Registry of every entry created during the process, addressed by id.
#[derive(Debug, Default)]
pub struct EntryManager {
    by_id: RwLock<HashMap<u32, Entry>>,
    max_id: AtomicU32,
}

impl EntryManager {
    pub fn get_by_id(&self, id: u32) -> Result<Entry> {
        let by_id = self.by_id.read().unwrap_or_else(|e| e.into_inner());
        by_id.get(&id).cloned().ok_or(HoleError::EntryNotFound(id))
    }

    /// Creates an entry holding `data` under the next id.
    ///
    /// `decorate` runs before the entry is stored; it is how plugins add properties.
    pub fn create<F>(&self, data: HashMap<String, String>, decorate: F) -> Entry
    where
        F: FnOnce(&mut Entry),
    {
        let id = self.max_id.fetch_add(1, Ordering::SeqCst) + 1;
        let mut entry = Entry::new(id);
        for (key, value) in data {
            entry.set(key, value);
        }
        decorate(&mut entry);

        tracing::debug!(id, properties = entry.properties.len(), "entry created");
        self.by_id
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, entry.clone());
        entry
    }

    pub fn len(&self) -> usize {
        self.by_id.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn ids_start_at_one_and_increase() {
        let manager = EntryManager::default();

        let first = manager.create(HashMap::new(), |_| {});
        let second = manager.create(HashMap::new(), |_| {});

        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn stores_data_and_decoration() {
        let manager = EntryManager::default();

        let entry = manager.create(data(&[("key", "name"), ("value", "James")]), |entry| {
            entry.set("time", "0")
        });
        let stored = manager.get_by_id(entry.id()).unwrap();

        assert_eq!(stored.get("key").unwrap(), "name");
        assert_eq!(stored.get("value").unwrap(), "James");
        assert_eq!(stored.get("time").unwrap(), "0");
        assert_eq!(stored, entry);
    }

    #[test]
    fn missing_entry_and_key_are_errors() {
        let manager = EntryManager::default();
        let entry = manager.create(HashMap::new(), |_| {});

        assert!(matches!(manager.get_by_id(7), Err(HoleError::EntryNotFound(7))));
        assert!(matches!(entry.get("value"), Err(HoleError::KeyNotFound(key)) if key == "value"));
    }

    #[test]
    fn serializes_as_json_object() {
        let mut entry = Entry::new(3);
        entry.set("key", "name");

        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json, serde_json::json!({"id": 3, "properties": {"key": "name"}}));
    }
}
