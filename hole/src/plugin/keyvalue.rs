use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    app::HoleApp,
    command::{Command, CommandTemplate},
    common::{Bundle, StatusCode},
    error::{HoleError, Result},
    handler::{Handler, HandlerManager},
};

use super::Plugin;

/// Entry ids by the key they were created with, oldest first.
#[derive(Debug, Default)]
struct KeyIndex {
    by_key: RwLock<HashMap<String, Vec<u32>>>,
}

impl KeyIndex {
    fn insert(&self, key: &str, id: u32) {
        self.by_key
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key.to_string())
            .or_default()
            .push(id);
    }

    fn ids(&self, key: &str) -> Option<Vec<u32>> {
        self.by_key
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

/// Provides `new <key> <value>` and `key <key>`.
#[derive(Default)]
pub struct KeyValuePlugin {
    index: Arc<KeyIndex>,
}

impl KeyValuePlugin {
    pub const NAME: &'static str = "key-value";
}

impl Plugin for KeyValuePlugin {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn register_handlers(&self, handlers: &HandlerManager) -> Result<()> {
        handlers.register_handler(Some("new"), Arc::new(NewHandler::new(&self.index)), true)?;
        handlers.register_handler(Some("key"), Arc::new(KeyHandler::new(&self.index)), true)
    }
}

struct NewHandler {
    template: CommandTemplate,
    index: Arc<KeyIndex>,
}

impl NewHandler {
    fn new(index: &Arc<KeyIndex>) -> Self {
        Self {
            template: CommandTemplate::new(2),
            index: Arc::clone(index),
        }
    }
}

impl Handler for NewHandler {
    fn template(&self) -> &CommandTemplate {
        &self.template
    }

    fn usage(&self) -> &str {
        "new <key> <value>"
    }

    fn description(&self) -> &str {
        "create an entry holding a key and a value"
    }

    fn handle(&self, command: &Command, bundle: &mut Bundle, app: &HoleApp) -> Result<()> {
        let [key, value] = command.args.as_slice() else {
            return Err(HoleError::InvalidArgument(format!(
                "new: 2 arguments are required, but {} arguments are provided",
                command.args.len()
            )));
        };
        let data = HashMap::from([
            ("key".to_string(), key.clone()),
            ("value".to_string(), value.clone()),
        ]);
        let entry = app.create_entry(data);
        self.index.insert(key, entry.id());

        bundle.buffer.push_str(&format!(
            "You've created a new entry: key: {} ; value: {}",
            key, value
        ));
        bundle.status_code = StatusCode::Success;
        Ok(())
    }
}

struct KeyHandler {
    template: CommandTemplate,
    index: Arc<KeyIndex>,
}

impl KeyHandler {
    fn new(index: &Arc<KeyIndex>) -> Self {
        Self {
            template: CommandTemplate::new(1),
            index: Arc::clone(index),
        }
    }
}

impl Handler for KeyHandler {
    fn template(&self) -> &CommandTemplate {
        &self.template
    }

    fn usage(&self) -> &str {
        "key <key>"
    }

    fn description(&self) -> &str {
        "print the values stored under a key"
    }

    fn handle(&self, command: &Command, bundle: &mut Bundle, app: &HoleApp) -> Result<()> {
        let [key] = command.args.as_slice() else {
            return Err(HoleError::InvalidArgument(format!(
                "key: 1 argument is required, but {} arguments are provided",
                command.args.len()
            )));
        };
        let ids = self
            .index
            .ids(key)
            .ok_or_else(|| HoleError::KeyNotFound(key.clone()))?;

        let entries = app.entries();
        for id in ids {
            let entry = entries.get_by_id(id)?;
            bundle.buffer.push_str(entry.get("value")?);
            bundle.buffer.push('\n');
        }
        bundle.status_code = StatusCode::Success;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_keeps_creation_order() {
        let index = KeyIndex::default();

        index.insert("name", 3);
        index.insert("age", 4);
        index.insert("name", 5);

        assert_eq!(index.ids("name"), Some(vec![3, 5]));
        assert_eq!(index.ids("age"), Some(vec![4]));
        assert_eq!(index.ids("city"), None);
    }

    #[test]
    fn handlers_share_the_plugin_index() {
        let plugin = KeyValuePlugin::default();
        let handlers = HandlerManager::default();

        plugin.register_handlers(&handlers).unwrap();

        assert!(handlers.get_handler(Some("new")).is_ok());
        assert!(handlers.get_handler(Some("key")).is_ok());
        assert_eq!(Arc::strong_count(&plugin.index), 3);
    }
}
