use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("unable to load config: {0}")]
    ConfigLoadError(#[source] config::ConfigError),
    #[error("unable to show config: {0}")]
    ConfigShowError(#[source] config::ConfigError),
    #[error("missing config value: {0}")]
    MissingConfigValueError(String),
    #[error("invalid config value: {0}")]
    InvalidConfigValueError(String),
    #[error("unable to create log file `{path}`: {message}")]
    LogFileCreationError { path: String, message: String },
    #[error("unable to initialize tracing subscriber: {0}")]
    TracingSubscriberInitError(#[from] tracing_subscriber::util::TryInitError),
    #[error("unable to build service provider: {0}")]
    ServiceProviderError(String),
}
