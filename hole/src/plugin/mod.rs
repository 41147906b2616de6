//! Compiled-in plugins and the manager that enables them.
//!
//! A plugin contributes config keys and handlers, and hooks into the execution pipeline.
//! Hooks only run for enabled plugins, in registration order.

mod keyvalue;
mod time;

use std::sync::{Arc, RwLock, RwLockReadGuard};

pub use keyvalue::KeyValuePlugin;
pub use time::TimePlugin;

use crate::{
    app::HoleApp,
    command::TokenIterator,
    common::Bundle,
    entry::Entry,
    error::{HoleError, Result},
    handler::HandlerManager,
    settings::KeyedConfig,
};

pub trait Plugin: Send + Sync {
    /// Unique name used by `plugin.enabled`.
    fn name(&self) -> &'static str;

    /// Config keys this plugin may read or set.
    fn config_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Writes default values for [`Plugin::config_keys`].
    fn apply_defaults(&self, _config: &mut KeyedConfig) -> Result<()> {
        Ok(())
    }

    /// Called once when the plugin is enabled.
    fn register_handlers(&self, _handlers: &HandlerManager) -> Result<()> {
        Ok(())
    }

    /// Runs before dispatch. Setting a status on the bundle skips the handler.
    fn before_execute(
        &self,
        _bundle: &mut Bundle,
        _tokens: &mut TokenIterator,
        _app: &HoleApp,
    ) -> Result<()> {
        Ok(())
    }

    /// Runs after dispatch, before the buffer is printed.
    fn before_print(&self, _bundle: &mut Bundle, _app: &HoleApp) {}

    /// Runs for every new entry before it is stored.
    fn on_create_entry(&self, _entry: &mut Entry, _app: &HoleApp) {}
}

#[derive(Default)]
pub struct PluginManager {
    plugins: RwLock<Vec<Arc<dyn Plugin>>>,
    enabled: RwLock<Vec<&'static str>>,
}

impl PluginManager {
    /// Plugins enabled when the config does not say otherwise.
    pub const BUILTIN: [&'static str; 2] = [KeyValuePlugin::NAME, TimePlugin::NAME];

    pub fn with_builtin() -> Self {
        let manager = Self::default();
        manager.register(Arc::new(KeyValuePlugin::default()));
        manager.register(Arc::new(TimePlugin));
        manager
    }

    /// Registers a plugin, replacing any plugin of the same name.
    pub fn register(&self, plugin: Arc<dyn Plugin>) {
        let mut plugins = self.plugins.write().unwrap_or_else(|e| e.into_inner());
        match plugins.iter_mut().find(|p| p.name() == plugin.name()) {
            Some(existing) => *existing = plugin,
            None => plugins.push(plugin),
        }
    }

    pub fn get_plugin_by_name(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        self.registered()
            .iter()
            .find(|plugin| plugin.name() == name)
            .cloned()
            .ok_or_else(|| HoleError::PluginNotFound(name.to_string()))
    }

    /// Marks a plugin as enabled and returns it.
    pub fn enable(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        let plugin = self.get_plugin_by_name(name)?;
        let mut enabled = self.enabled.write().unwrap_or_else(|e| e.into_inner());
        if !enabled.contains(&plugin.name()) {
            enabled.push(plugin.name());
        }
        Ok(plugin)
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        let plugin = self.get_plugin_by_name(name)?;
        self.enabled
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|enabled| *enabled != plugin.name());
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&name)
    }

    /// Enabled plugins in registration order.
    pub fn enabled_plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.registered()
            .iter()
            .filter(|plugin| self.is_enabled(plugin.name()))
            .cloned()
            .collect()
    }

    pub fn for_each_enabled<F>(&self, mut callback: F)
    where
        F: FnMut(&dyn Plugin),
    {
        for plugin in self.enabled_plugins() {
            callback(plugin.as_ref());
        }
    }

    pub fn for_each_registered<F>(&self, mut callback: F)
    where
        F: FnMut(&dyn Plugin),
    {
        let plugins: Vec<Arc<dyn Plugin>> = self.registered().clone();
        for plugin in plugins {
            callback(plugin.as_ref());
        }
    }

    fn registered(&self) -> RwLockReadGuard<'_, Vec<Arc<dyn Plugin>>> {
        self.plugins.read().unwrap_or_else(|e| e.into_inner())
    }
}
