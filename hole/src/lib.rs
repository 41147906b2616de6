//! Hole: a small command line entry store.
//!
//! Arguments are tokenized, matched to a handler by the leading command name and
//! parsed against that handler's template. Plugins add handlers and decorate entries.

pub mod app;
pub mod command;
pub mod common;
pub mod entry;
pub mod error;
pub mod handler;
pub mod module;
pub mod plugin;
pub mod settings;

pub use app::{HoleApp, VERSION};
pub use common::{Bundle, StatusCode};
pub use error::HoleError;
pub use module::HoleModule;
