use std::collections::{HashMap, hash_map};

use super::keyed::{KeyedConfig, Settings};
use crate::error::{HoleError, Result};

/// Label of the bottom level every stack starts with.
pub const DEFAULT_LEVEL: &str = "DEFAULT";

/// Levels of [`KeyedConfig`] from least to most specific, plus the dynamic view.
///
/// The dynamic view is what readers consult. It only changes through [`ConfigStack::load_dynamic`],
/// [`ConfigStack::load_at`] and [`ConfigStack::update`], so editing a level directly has
/// no effect until the next `update`.
#[derive(Debug, Clone)]
pub struct ConfigStack {
    by_level: HashMap<String, KeyedConfig>,
    level_stack: Vec<String>,
    dynamic: KeyedConfig,
}

impl ConfigStack {
    pub fn new(default_config: KeyedConfig) -> Self {
        let dynamic = default_config.clone();
        Self {
            by_level: HashMap::from([(DEFAULT_LEVEL.to_string(), default_config)]),
            level_stack: vec![DEFAULT_LEVEL.to_string()],
            dynamic,
        }
    }

    /// Pushes a new level initialised from the dynamic view.
    ///
    /// Creating a level that already exists resets it and keeps its position.
    pub fn create_level(&mut self, level: &str) -> &mut KeyedConfig {
        if !self.level_stack.iter().any(|l| l == level) {
            self.level_stack.push(level.to_string());
        }
        let config = self.dynamic.clone();
        match self.by_level.entry(level.to_string()) {
            hash_map::Entry::Occupied(mut occupied) => {
                occupied.insert(config);
                occupied.into_mut()
            }
            hash_map::Entry::Vacant(vacant) => vacant.insert(config),
        }
    }

    /// Loads settings into the dynamic view only.
    pub fn load_dynamic(&mut self, settings: &Settings) -> Result<()> {
        self.dynamic.load(settings)
    }

    /// Loads settings into `level`, every level above it, and the dynamic view.
    pub fn load_at(&mut self, settings: &Settings, level: &str) -> Result<()> {
        let index = self.index_of(level)?;
        for name in &self.level_stack[index..] {
            if let Some(config) = self.by_level.get_mut(name) {
                config.load(settings)?;
            }
        }
        self.dynamic.load(settings)
    }

    /// Rebuilds the dynamic view by merging every level in stack order.
    pub fn update(&mut self) {
        for level in &self.level_stack {
            if let Some(config) = self.by_level.get(level) {
                self.dynamic.merge(config);
            }
        }
    }

    pub fn get(&self, level: &str) -> Result<&KeyedConfig> {
        self.by_level
            .get(level)
            .ok_or_else(|| HoleError::LevelNotFound(level.to_string()))
    }

    pub fn get_mut(&mut self, level: &str) -> Result<&mut KeyedConfig> {
        self.by_level
            .get_mut(level)
            .ok_or_else(|| HoleError::LevelNotFound(level.to_string()))
    }

    pub fn dynamic(&self) -> &KeyedConfig {
        &self.dynamic
    }

    /// Level labels from bottom to top.
    pub fn levels(&self) -> &[String] {
        &self.level_stack
    }

    fn index_of(&self, level: &str) -> Result<usize> {
        self.level_stack
            .iter()
            .position(|l| l == level)
            .ok_or_else(|| HoleError::LevelNotFound(level.to_string()))
    }
}
