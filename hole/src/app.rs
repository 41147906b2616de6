use std::{any::Any, collections::HashMap};

use di::{Ref, ServiceCollection, ServiceProvider};
use hole_bootstrap::{Module, config::Config};

use crate::{
    command::TokenIterator,
    common::{Bundle, StatusCode},
    entry::{Entry, EntryManager},
    error::{HoleError, Result},
    handler::HandlerManager,
    module::HoleModule,
    plugin::PluginManager,
    settings::{ConfigManager, HoleSettings},
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application: managers resolved from the service provider plus the execution
/// pipeline.
pub struct HoleApp {
    provider: ServiceProvider,
}

impl HoleApp {
    /// Wires the managers together: config defaults, the `[hole]` section when the
    /// bootstrap config is registered, the user file, built-in handlers and plugins.
    pub fn new(provider: ServiceProvider) -> Result<Self> {
        let app = Self { provider };
        app.init()?;
        Ok(app)
    }

    /// An application built from [`HoleModule`] alone, without bootstrap config.
    pub fn standalone() -> Result<Self> {
        let mut services = ServiceCollection::new();
        HoleModule.configure(&mut services);
        let provider = services
            .build_provider()
            .map_err(|e| HoleError::Config(e.to_string()))?;
        Self::new(provider)
    }

    pub fn use_manager<T: Any + Send + Sync>(&self) -> Ref<T> {
        self.provider.get_required::<T>()
    }

    pub fn handlers(&self) -> Ref<HandlerManager> {
        self.use_manager()
    }

    pub fn entries(&self) -> Ref<EntryManager> {
        self.use_manager()
    }

    pub fn plugins(&self) -> Ref<PluginManager> {
        self.use_manager()
    }

    pub fn config(&self) -> Ref<ConfigManager> {
        self.use_manager()
    }

    fn init(&self) -> Result<()> {
        let config = self.config();
        config.install_defaults(&self.plugins())?;
        if let Some(bootstrap_config) = self.provider.get::<Config>() {
            let settings: HoleSettings = bootstrap_config
                .get()
                .map_err(|e| HoleError::Config(e.to_string()))?;
            config.load_settings(&settings)?;
        }
        config.load_user_config()?;

        self.handlers().register_builtin()?;
        for name in config.enabled_plugins()? {
            self.enable_plugin(&name)?;
        }
        Ok(())
    }

    /// Enables a registered plugin and registers its handlers.
    pub fn enable_plugin(&self, name: &str) -> Result<()> {
        let plugin = self.plugins().enable(name)?;
        plugin.register_handlers(&self.handlers())?;
        tracing::debug!(plugin = name, "plugin enabled");
        Ok(())
    }

    /// Creates an entry from `data`, letting enabled plugins decorate it first.
    pub fn create_entry(&self, data: HashMap<String, String>) -> Entry {
        let plugins = self.plugins();
        self.entries().create(data, |entry| {
            plugins.for_each_enabled(|plugin| plugin.on_create_entry(entry, self))
        })
    }

    /// Runs one invocation: plugin pre-hooks, dispatch unless a hook already set a
    /// status, then plugin print hooks.
    pub fn execute_raw_args<I, S>(&self, args: I) -> Result<Bundle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut tokens = TokenIterator::new(args);
        let mut bundle = Bundle::create();
        let plugins = self.plugins().enabled_plugins();

        for plugin in &plugins {
            plugin.before_execute(&mut bundle, &mut tokens, self)?;
        }
        if bundle.status_code == StatusCode::Null {
            self.handlers().execute(&mut bundle, &mut tokens, self)?;
        } else {
            tracing::debug!(status = ?bundle.status_code, "dispatch skipped by plugin");
        }
        for plugin in &plugins {
            plugin.before_print(&mut bundle, self);
        }
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{plugin::Plugin, settings::USER_LEVEL};

    /// Answers `ping` before dispatch and upper-cases every output.
    struct Shout;

    impl Plugin for Shout {
        fn name(&self) -> &'static str {
            "shout"
        }

        fn before_execute(
            &self,
            bundle: &mut Bundle,
            tokens: &mut TokenIterator,
            _app: &HoleApp,
        ) -> Result<()> {
            if tokens.peek() == Some("ping") {
                tokens.next();
                bundle.buffer.push_str("pong");
                bundle.status_code = StatusCode::Success;
            }
            Ok(())
        }

        fn before_print(&self, bundle: &mut Bundle, _app: &HoleApp) {
            bundle.buffer = bundle.buffer.to_uppercase();
        }
    }

    fn app_with_shout() -> HoleApp {
        let app = HoleApp::standalone().unwrap();
        app.plugins().register(Arc::new(Shout));
        app.enable_plugin("shout").unwrap();
        app
    }

    #[test]
    fn standalone_enables_builtin_plugins() {
        let app = HoleApp::standalone().unwrap();

        assert!(app.plugins().is_enabled("key-value"));
        assert!(app.plugins().is_enabled("time"));
        assert!(app.handlers().get_handler(Some("new")).is_ok());
    }

    #[test]
    fn created_entries_carry_time() {
        let app = HoleApp::standalone().unwrap();

        let entry = app.create_entry(HashMap::from([("key".to_string(), "name".to_string())]));

        assert_eq!(entry.id(), 1);
        assert!(entry.get("time").unwrap().parse::<i64>().unwrap() > 0);
        assert_eq!(app.entries().get_by_id(1).unwrap(), entry);
    }

    #[test]
    fn time_property_never_overwrites_entry_data() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("user.json");
        std::fs::write(&file, r#"{"time.key": "value"}"#).unwrap();
        let app = HoleApp::standalone().unwrap();
        app.config().load_from_file(&file, USER_LEVEL).unwrap();

        let bundle = app.execute_raw_args(["new", "name", "James"]).unwrap();

        assert_eq!(bundle.status_code, StatusCode::Success);
        let entry = app.entries().get_by_id(1).unwrap();
        assert_eq!(entry.get("value").unwrap(), "James");
        assert_eq!(entry.properties().len(), 2);
    }

    #[test]
    fn plugin_can_answer_before_dispatch() {
        let app = app_with_shout();

        let bundle = app.execute_raw_args(["ping"]).unwrap();

        assert_eq!(bundle.status_code, StatusCode::Success);
        assert_eq!(bundle.message(), "PONG");
    }

    #[test]
    fn print_hook_sees_handler_output() {
        let app = app_with_shout();

        let bundle = app.execute_raw_args(["new", "name", "James"]).unwrap();

        assert_eq!(
            bundle.message(),
            "YOU'VE CREATED A NEW ENTRY: KEY: NAME ; VALUE: JAMES"
        );
    }

    #[test]
    fn enabling_unknown_plugin_fails() {
        let app = HoleApp::standalone().unwrap();

        assert!(matches!(
            app.enable_plugin("server"),
            Err(HoleError::PluginNotFound(_))
        ));
    }
}
