use std::{cell::RefCell, collections::HashMap, path::PathBuf};

use crate::{
    config::Config,
    error::BootstrapError,
    log::{AppenderGuard, ConsoleAppenderConfig, FileAppenderConfig, Logger, LoggingConfig},
    module::Module,
};
use di::{Ref, ServiceCollection, ServiceProvider, singleton_as_self};
use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_rolling_file::RollingFileAppenderBase;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::Targets, fmt::writer::MakeWriterExt,
    layer::SubscriberExt, util::SubscriberInitExt,
};
use typed_builder::TypedBuilder;

/// Environment variable holding an `EnvFilter` directive that replaces the console filter.
pub const LOG_FILTER_ENV: &str = "HOLE_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Bootstrap is the entry point of the application.
///
/// It loads the configuration, initializes logging and builds the service provider
/// from the registered modules.
///
/// # Example
/// ```no_run
/// use hole_bootstrap::Bootstrap;
/// let bootstrap = Bootstrap::builder().build();
/// let provider = bootstrap.initialize().unwrap();
/// ```
#[derive(TypedBuilder)]
pub struct Bootstrap {
    /// Whether need to initialize logging.
    #[builder(default = true)]
    initialize_logging: bool,
    /// Whether need to print config.
    #[builder(default = false)]
    show_config: bool,

    /// Prefix of environment variables to override config values.
    #[builder(default = Some("HOLE".to_string()))]
    env_config_prefix: Option<String>,
    /// Separator of nested keys in environment variables.
    #[builder(default = "__".to_string())]
    env_config_split: String,
    /// Folder holding `config.toml`; the default folder is used when unset.
    #[builder(default, setter(strip_option))]
    config_folder: Option<PathBuf>,

    /// a collection of modules
    #[builder(default = vec![])]
    modules: Vec<Box<dyn Module>>,

    #[builder(default = RefCell::new(BootstrapBaseModule::default()), setter(skip))]
    base_modules: RefCell<BootstrapBaseModule>,
}

impl Bootstrap {
    /// Runs every start-up step and returns the service provider.
    pub fn initialize(&self) -> Result<ServiceProvider, BootstrapError> {
        // config first, logging reads its section
        self.initialize_config()?;
        self.initialize_logging()?;
        if self.show_config {
            self.show_config()?;
        }
        self.build_provider()
    }

    pub fn initialize_config(&self) -> Result<(), BootstrapError> {
        let env_config_prefix = self.env_config_prefix.as_deref();
        let env_config_split = self.env_config_split.as_str();
        let config = match &self.config_folder {
            Some(folder) => Config::from_folder(folder, env_config_prefix, env_config_split),
            None => Config::load(env_config_prefix, env_config_split),
        }
        .map_err(BootstrapError::ConfigLoadError)?;
        let _ = self
            .base_modules
            .borrow_mut()
            .config
            .insert(Ref::new(config));
        Ok(())
    }

    pub fn initialize_logging(&self) -> Result<(), BootstrapError> {
        if self.initialize_logging {
            self.initialize_logging_config()?;
            self.initialize_logging_loggers()?;
        }
        Ok(())
    }

    fn initialize_logging_config(&self) -> Result<(), BootstrapError> {
        let config = self.base_modules.borrow().config.clone();
        let Some(config) = config else {
            return Err(BootstrapError::MissingConfigValueError(
                "config is not loaded".to_string(),
            ));
        };
        let logging_config = Ref::new(LoggingConfig::new(&config)?);
        let _ = self
            .base_modules
            .borrow_mut()
            .logging_config
            .insert(logging_config);
        Ok(())
    }

    fn initialize_logging_loggers(&self) -> Result<(), BootstrapError> {
        let logging_config = self.base_modules.borrow().logging_config.clone();
        let Some(logging_config) = logging_config else {
            return Err(BootstrapError::MissingConfigValueError(
                "logging config is not loaded".to_string(),
            ));
        };
        let logger_map: HashMap<&str, &Logger> = logging_config
            .loggers()
            .iter()
            .map(|logger| (logger.name(), logger))
            .collect();

        let mut layers: Vec<BoxedLayer> = Vec::new();
        let mut writer_guards = Vec::new();
        for file_config in logging_config.file_appenders() {
            if file_config.enable() {
                let (writer, targets, level, guard) =
                    self.initialize_logging_file_tracing(file_config, &logger_map)?;
                let layer: BoxedLayer = tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer.with_max_level(level))
                    .with_filter(targets)
                    .boxed();
                layers.push(layer);
                writer_guards.push(guard);
            }
        }
        if let Some(console_config) = logging_config.console_appender().filter(|c| c.enable()) {
            let (writer, targets, level, guard) =
                self.initialize_logging_console_tracing(console_config, &logger_map)?;
            let layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(writer.with_max_level(level));
            let layer: BoxedLayer = match EnvFilter::try_from_env(LOG_FILTER_ENV) {
                Ok(env_filter) => layer.with_filter(env_filter).boxed(),
                Err(_) => layer.with_filter(targets).boxed(),
            };
            layers.push(layer);
            writer_guards.push(guard);
        }

        // guards live as long as the service provider
        let _ = self
            .base_modules
            .borrow_mut()
            .logger
            .insert(Ref::new(AppenderGuard::new(writer_guards)));
        tracing_subscriber::registry().with(layers).try_init()?;

        Ok(())
    }

    fn initialize_logging_console_tracing(
        &self,
        appender_config: &ConsoleAppenderConfig,
        logger_map: &HashMap<&str, &Logger>,
    ) -> Result<(NonBlocking, Targets, Level, WorkerGuard), BootstrapError> {
        let Some(level) = appender_config.write_level().as_tracing_level() else {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "logging.console_appender.write_level={}",
                appender_config.write_level()
            )));
        };
        let targets = build_targets(appender_config.logger_names(), logger_map)?;
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        Ok((writer, targets, level, guard))
    }

    fn initialize_logging_file_tracing(
        &self,
        appender_config: &FileAppenderConfig,
        logger_map: &HashMap<&str, &Logger>,
    ) -> Result<(NonBlocking, Targets, Level, WorkerGuard), BootstrapError> {
        let Some(level) = appender_config.write_level().as_tracing_level() else {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "logging.file_appenders[?].write_level={}",
                appender_config.write_level()
            )));
        };
        let file_path = appender_config.file_path();
        let path = file_path.to_string_lossy().into_owned();
        let creation_error = |message: String| BootstrapError::LogFileCreationError {
            path: path.clone(),
            message,
        };
        if let Some(parent) = file_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| creation_error(e.to_string()))?;
        }
        let file_appender = RollingFileAppenderBase::builder()
            .filename(path.clone())
            .max_filecount(appender_config.file_max_count())
            .condition_max_file_size(appender_config.file_max_size())
            .condition_daily()
            .build()
            .map_err(|e| creation_error(e.to_string()))?;
        let targets = build_targets(appender_config.logger_names(), logger_map)?;
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        Ok((writer, targets, level, guard))
    }

    pub fn show_config(&self) -> Result<(), BootstrapError> {
        if let Some(config) = &self.base_modules.borrow().config {
            let properties = config
                .to_properties()
                .map_err(BootstrapError::ConfigShowError)?;
            for (key, value) in properties.get_properties() {
                tracing::info!("load config {}={}", key, value);
            }
        }
        Ok(())
    }

    /// Builds the service provider from the base services and every module.
    pub fn build_provider(&self) -> Result<ServiceProvider, BootstrapError> {
        let mut services = ServiceCollection::new();
        self.base_modules.borrow().configure(&mut services);
        for module in &self.modules {
            module.configure(&mut services);
        }
        services
            .build_provider()
            .map_err(|e| BootstrapError::ServiceProviderError(e.to_string()))
    }
}

/// Folds the named loggers into per-target level filters.
fn build_targets(
    logger_names: &[String],
    logger_map: &HashMap<&str, &Logger>,
) -> Result<Targets, BootstrapError> {
    let mut targets = Targets::new();
    for name in logger_names {
        let Some(logger) = logger_map.get(name.as_str()) else {
            return Err(BootstrapError::InvalidConfigValueError(format!(
                "unknown logger `{}`",
                name
            )));
        };
        let level = logger.level().as_tracing_level_filter();
        targets = if logger.target().is_empty() {
            targets.with_default(level)
        } else {
            targets.with_target(logger.target(), level)
        };
    }
    Ok(targets)
}

#[derive(Default)]
struct BootstrapBaseModule {
    config: Option<Ref<Config>>,
    logger: Option<Ref<AppenderGuard>>,
    logging_config: Option<Ref<LoggingConfig>>,
}

impl Module for BootstrapBaseModule {
    fn configure(&self, binder: &mut ServiceCollection) {
        // register base services
        register_service::<Config>(&self.config, binder);
        register_service::<LoggingConfig>(&self.logging_config, binder);
        register_service::<AppenderGuard>(&self.logger, binder);
    }
}

/// register an already built service as a singleton.
fn register_service<T: Send + Sync + 'static>(
    service: &Option<Ref<T>>,
    binder: &mut ServiceCollection,
) {
    if let Some(svc) = service.clone() {
        binder.add(singleton_as_self::<T>().from(move |_| svc.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct Greeting(&'static str);

    struct GreetingModule;

    impl Module for GreetingModule {
        fn configure(&self, binder: &mut ServiceCollection) {
            binder.add(singleton_as_self::<Greeting>().from(|_| Ref::new(Greeting("hello"))));
        }
    }

    fn bootstrap_in(folder: &std::path::Path) -> Bootstrap {
        Bootstrap::builder()
            .initialize_logging(false)
            .env_config_prefix(Some("HOLE_TEST_UNSET".to_string()))
            .config_folder(folder.to_path_buf())
            .modules(vec![Box::new(GreetingModule) as Box<dyn Module>])
            .build()
    }

    #[test]
    fn registers_config_and_module_services() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "[hole]\nplugins = []\n").unwrap();

        let provider = bootstrap_in(dir.path()).initialize().unwrap();

        assert!(provider.get::<Config>().is_some());
        assert_eq!(provider.get_required::<Greeting>().0, "hello");
    }

    #[test]
    fn skips_logging_services_when_logging_is_disabled() {
        let dir = tempfile::tempdir().unwrap();

        let provider = bootstrap_in(dir.path()).initialize().unwrap();

        assert!(provider.get::<LoggingConfig>().is_none());
        assert!(provider.get::<AppenderGuard>().is_none());
    }

    #[test]
    fn show_config_succeeds_without_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "[hole]\nuser_config = \"a.json\"\n").unwrap();
        let bootstrap = bootstrap_in(dir.path());

        bootstrap.initialize_config().unwrap();

        assert!(bootstrap.show_config().is_ok());
    }

    #[test]
    fn build_targets_rejects_unknown_logger() {
        let root = Logger::root(crate::log::Level::Info);
        let logger_map: HashMap<&str, &Logger> = [(root.name(), &root)].into_iter().collect();

        assert!(build_targets(&["root".to_string()], &logger_map).is_ok());
        assert!(build_targets(&["other".to_string()], &logger_map).is_err());
    }
}
