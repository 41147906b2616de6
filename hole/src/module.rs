use di::{Ref, ServiceCollection, singleton_as_self};
use hole_bootstrap::Module;

use crate::{
    entry::EntryManager, handler::HandlerManager, plugin::PluginManager, settings::ConfigManager,
};

/// Registers the application's managers as singletons.
pub struct HoleModule;

impl Module for HoleModule {
    fn configure(&self, binder: &mut ServiceCollection) {
        binder
            .add(
                singleton_as_self::<PluginManager>()
                    .from(|_| Ref::new(PluginManager::with_builtin())),
            )
            .add(singleton_as_self::<HandlerManager>().from(|_| Ref::new(HandlerManager::default())))
            .add(singleton_as_self::<EntryManager>().from(|_| Ref::new(EntryManager::default())))
            .add(singleton_as_self::<ConfigManager>().from(|_| Ref::new(ConfigManager::default())));
    }
}
