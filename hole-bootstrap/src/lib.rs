//! Start-up kernel for the hole command line.
//!
//! [`Bootstrap`] loads `config.toml`, installs the tracing subscriber described by its
//! `[logging]` section and builds a dependency-injection container from a list of
//! [`Module`]s.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod log;
pub mod module;
mod serde;

pub use bootstrap::Bootstrap;
pub use error::BootstrapError;
pub use module::Module;
