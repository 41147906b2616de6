use std::{collections::HashSet, fmt, path::PathBuf, str::FromStr};

use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    config::{Config, ConfigPrefix},
    error::BootstrapError,
};

/// Name of the logger used when the config declares none.
pub const ROOT_LOGGER: &str = "root";

/// The `[logging]` section.
///
/// Loggers map a tracing target to a level; appenders pick the loggers they write by name.
///
/// ```toml
/// [[logging.loggers]]
/// name = "root"
/// level = "warn"
///
/// [[logging.loggers]]
/// name = "hole"
/// target = "hole"
/// level = "debug"
///
/// [logging.console_appender]
/// logger_names = ["root", "hole"]
///
/// [[logging.file_appenders]]
/// file_path = "/tmp/hole/hole.log"
/// logger_names = ["hole"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    loggers: Vec<Logger>,
    console_appender: Option<ConsoleAppenderConfig>,
    file_appenders: Vec<FileAppenderConfig>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            loggers: vec![Logger::root(Level::Warn)],
            console_appender: Some(ConsoleAppenderConfig::default()),
            file_appenders: vec![],
        }
    }
}

impl LoggingConfig {
    pub fn new(config: &Config) -> Result<Self, BootstrapError> {
        let logging_config: Self = config.get().map_err(BootstrapError::ConfigLoadError)?;
        logging_config.validate()?;
        Ok(logging_config)
    }

    /// Checks that every appender refers to declared loggers and writes at a real level.
    pub fn validate(&self) -> Result<(), BootstrapError> {
        let declared: HashSet<&str> = self.loggers.iter().map(Logger::name).collect();
        if let Some(console) = &self.console_appender {
            check_appender(
                "console_appender",
                console.enable,
                console.write_level,
                &console.logger_names,
                &declared,
            )?;
        }
        for (index, file) in self.file_appenders.iter().enumerate() {
            let appender = format!("file_appenders[{}]", index);
            check_appender(
                &appender,
                file.enable,
                file.write_level,
                &file.logger_names,
                &declared,
            )?;
        }
        Ok(())
    }

    pub fn loggers(&self) -> &[Logger] {
        &self.loggers
    }

    pub fn console_appender(&self) -> Option<&ConsoleAppenderConfig> {
        self.console_appender.as_ref()
    }

    pub fn file_appenders(&self) -> &[FileAppenderConfig] {
        &self.file_appenders
    }
}

impl ConfigPrefix for LoggingConfig {
    const PREFIX: &'static str = "logging";
}

fn check_appender(
    appender: &str,
    enable: bool,
    write_level: Level,
    logger_names: &[String],
    declared: &HashSet<&str>,
) -> Result<(), BootstrapError> {
    if !enable {
        return Ok(());
    }
    if write_level == Level::Off {
        return Err(BootstrapError::InvalidConfigValueError(format!(
            "logging.{}.write_level={}",
            appender, write_level
        )));
    }
    match logger_names.iter().find(|name| !declared.contains(name.as_str())) {
        Some(unknown) => Err(BootstrapError::InvalidConfigValueError(format!(
            "logging.{}.logger_names references unknown logger `{}`",
            appender, unknown
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Logger {
    #[serde(deserialize_with = "crate::serde::non_empty")]
    name: String,
    /// Tracing target prefix; empty means every target.
    #[serde(default)]
    target: String,
    #[serde(default)]
    level: Level,
}

impl Logger {
    pub fn root(level: Level) -> Self {
        Self {
            name: ROOT_LOGGER.to_string(),
            target: String::new(),
            level,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

/// Console output goes to stderr so that stdout only carries command output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsoleAppenderConfig {
    enable: bool,
    write_level: Level,
    logger_names: Vec<String>,
}

impl Default for ConsoleAppenderConfig {
    fn default() -> Self {
        Self {
            enable: true,
            write_level: Level::Trace,
            logger_names: default_logger_names(),
        }
    }
}

impl ConsoleAppenderConfig {
    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn write_level(&self) -> Level {
        self.write_level
    }

    pub fn logger_names(&self) -> &[String] {
        &self.logger_names
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileAppenderConfig {
    #[serde(default = "default_enable")]
    enable: bool,
    #[serde(default = "default_write_level")]
    write_level: Level,
    #[serde(default = "default_logger_names")]
    logger_names: Vec<String>,
    file_path: PathBuf,
    #[serde(default = "default_file_max_count")]
    file_max_count: usize,
    #[serde(default = "default_file_max_size")]
    file_max_size: u64,
}

impl FileAppenderConfig {
    pub fn enable(&self) -> bool {
        self.enable
    }

    pub fn write_level(&self) -> Level {
        self.write_level
    }

    pub fn logger_names(&self) -> &[String] {
        &self.logger_names
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.file_path
    }

    pub fn file_max_count(&self) -> usize {
        self.file_max_count
    }

    pub fn file_max_size(&self) -> u64 {
        self.file_max_size
    }
}

fn default_enable() -> bool {
    true
}

fn default_write_level() -> Level {
    Level::Trace
}

fn default_logger_names() -> Vec<String> {
    vec![ROOT_LOGGER.to_string()]
}

fn default_file_max_count() -> usize {
    7
}

fn default_file_max_size() -> u64 {
    10 * 1024 * 1024
}

/// Keeps the non-blocking writers flushing until the application exits.
pub struct AppenderGuard {
    _guards: Vec<WorkerGuard>,
}

impl AppenderGuard {
    pub fn new(guards: Vec<WorkerGuard>) -> Self {
        Self { _guards: guards }
    }
}

/// Log level as written in the config; matched case-insensitively.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Level {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Off,
}

// rows follow the variant order of `Level`
static LEVELS: [(Level, &str, LevelFilter); 6] = [
    (Level::Trace, "trace", LevelFilter::TRACE),
    (Level::Debug, "debug", LevelFilter::DEBUG),
    (Level::Info, "info", LevelFilter::INFO),
    (Level::Warn, "warn", LevelFilter::WARN),
    (Level::Error, "error", LevelFilter::ERROR),
    (Level::Off, "off", LevelFilter::OFF),
];

#[derive(Debug, Error)]
#[error("unknown log level `{0}`, expected one of trace, debug, info, warn, error, off")]
pub struct ParseLevelError(String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LEVELS
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(s))
            .map(|(level, _, _)| *level)
            .ok_or_else(|| ParseLevelError(s.to_string()))
    }
}

impl TryFrom<String> for Level {
    type Error = ParseLevelError;

    fn try_from(value: String) -> Result<Self, <Self as TryFrom<String>>::Error> {
        value.parse()
    }
}

impl Level {
    fn entry(&self) -> &'static (Level, &'static str, LevelFilter) {
        &LEVELS[*self as usize]
    }

    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    /// `None` for [`Level::Off`], which has no event level.
    pub fn as_tracing_level(&self) -> Option<tracing::Level> {
        self.as_tracing_level_filter().into_level()
    }

    pub fn as_tracing_level_filter(&self) -> LevelFilter {
        self.entry().2
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;

    fn load(content: &str) -> Result<LoggingConfig, BootstrapError> {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), content).unwrap();
        let config = Config::from_folder(dir.path(), Some("HOLE_TEST_UNSET"), "__").unwrap();
        LoggingConfig::new(&config)
    }

    #[rstest]
    #[case("trace", Level::Trace)]
    #[case("DEBUG", Level::Debug)]
    #[case("Info", Level::Info)]
    #[case("warn", Level::Warn)]
    #[case("error", Level::Error)]
    #[case("off", Level::Off)]
    fn parses_level_case_insensitively(#[case] input: &str, #[case] expected: Level) {
        assert_eq!(input.parse::<Level>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown_level() {
        let error = "verbose".parse::<Level>().unwrap_err();

        assert!(error.to_string().contains("`verbose`"));
        assert!(load("[[logging.loggers]]\nname = \"root\"\nlevel = \"loud\"\n").is_err());
    }

    #[rstest]
    #[case(Level::Trace, Some(tracing::Level::TRACE), LevelFilter::TRACE)]
    #[case(Level::Warn, Some(tracing::Level::WARN), LevelFilter::WARN)]
    #[case(Level::Off, None, LevelFilter::OFF)]
    fn maps_to_tracing_levels(
        #[case] level: Level,
        #[case] event_level: Option<tracing::Level>,
        #[case] filter: LevelFilter,
    ) {
        assert_eq!(level.as_tracing_level(), event_level);
        assert_eq!(level.as_tracing_level_filter(), filter);
        assert_eq!(level.to_string().parse::<Level>().unwrap(), level);
    }

    #[test]
    fn defaults_to_root_logger_on_console() {
        let logging = load("").unwrap();

        assert_eq!(logging.loggers().len(), 1);
        assert_eq!(logging.loggers()[0].name(), ROOT_LOGGER);
        assert_eq!(logging.loggers()[0].level(), Level::Warn);
        assert!(logging.console_appender().is_some_and(|c| c.enable()));
        assert!(logging.file_appenders().is_empty());
    }

    #[test]
    fn reads_loggers_and_appenders() {
        let logging = load(
            r#"
            [[logging.loggers]]
            name = "root"
            level = "error"

            [[logging.loggers]]
            name = "hole"
            target = "hole"
            level = "debug"

            [logging.console_appender]
            logger_names = ["root", "hole"]

            [[logging.file_appenders]]
            file_path = "/tmp/hole/hole.log"
            logger_names = ["hole"]
            file_max_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(logging.loggers()[1].target(), "hole");
        assert_eq!(logging.loggers()[1].level(), Level::Debug);
        let file = &logging.file_appenders()[0];
        assert!(file.enable());
        assert_eq!(file.file_max_count(), 3);
        assert_eq!(file.file_max_size(), default_file_max_size());
        assert_eq!(file.logger_names(), ["hole".to_string()]);
    }

    #[test]
    fn rejects_unknown_logger_name() {
        let result = load(
            r#"
            [logging.console_appender]
            logger_names = ["missing"]
            "#,
        );

        assert!(matches!(
            result,
            Err(BootstrapError::InvalidConfigValueError(message)) if message.contains("missing")
        ));
    }

    #[test]
    fn rejects_enabled_appender_writing_at_off() {
        let result = load(
            r#"
            [logging.console_appender]
            write_level = "off"
            "#,
        );

        assert!(matches!(result, Err(BootstrapError::InvalidConfigValueError(_))));
    }

    #[test]
    fn ignores_disabled_appender() {
        let result = load(
            r#"
            [logging.console_appender]
            enable = false
            logger_names = ["missing"]
            "#,
        );

        assert!(result.is_ok());
    }
}
