//! Key-restricted settings layered by level.
//!
//! [`KeyedConfig`] only accepts keys from a fixed key set. [`ConfigStack`] stacks several of
//! them (`DEFAULT`, `SYSTEM`, `USER`, ...) and keeps a dynamic view that merges them in
//! order. [`ConfigManager`] builds the application's stack from the bootstrap config and
//! the user's JSON file.

mod keyed;
mod manager;
mod stack;

pub use keyed::{KeyedConfig, Settings};
pub use manager::{
    ConfigManager, HoleSettings, KEY_PLUGIN_ENABLED, KEY_PLUGIN_PATH, KEY_USER_CONFIG,
    SYSTEM_LEVEL, USER_LEVEL,
};
pub use stack::{ConfigStack, DEFAULT_LEVEL};
