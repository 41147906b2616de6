//! Command handlers and their registry.

mod builtin;

use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard},
};

pub use builtin::{DefaultHandler, ItemHandler};

use clap::error::{ContextKind, ContextValue, ErrorKind};

use crate::{
    app::HoleApp,
    command::{Command, CommandTemplate, TokenIterator},
    common::Bundle,
    error::{HoleError, Result},
};

/// Executes one command.
///
/// The template becomes the handler's clap subcommand; `handle` receives the parsed
/// result and writes its output to the bundle.
pub trait Handler: Send + Sync {
    fn template(&self) -> &CommandTemplate;

    /// Short usage line, e.g. `item <id>`.
    fn usage(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        ""
    }

    fn handle(&self, command: &Command, bundle: &mut Bundle, app: &HoleApp) -> Result<()>;
}

/// Handlers by command name. The `None` key holds the default handler, which runs when
/// no command name is given.
#[derive(Default)]
pub struct HandlerManager {
    by_name: RwLock<HandlerMap>,
}

type HandlerMap = HashMap<Option<String>, Arc<dyn Handler>>;

impl HandlerManager {
    pub fn register_handler(
        &self,
        name: Option<&str>,
        handler: Arc<dyn Handler>,
        override_existing: bool,
    ) -> Result<()> {
        let key = name.map(str::to_string);
        let mut by_name = self.by_name.write().unwrap_or_else(|e| e.into_inner());
        if !override_existing && by_name.contains_key(&key) {
            return Err(HoleError::HandlerAlreadyExists(
                name.unwrap_or("<default>").to_string(),
            ));
        }
        tracing::trace!(command = name.unwrap_or("<default>"), "register handler");
        by_name.insert(key, handler);
        Ok(())
    }

    /// Registers the default handler and `item`.
    pub fn register_builtin(&self) -> Result<()> {
        self.register_handler(None, Arc::new(DefaultHandler::new()), false)?;
        self.register_handler(Some("item"), Arc::new(ItemHandler::new()), false)
    }

    pub fn get_handler(&self, name: Option<&str>) -> Result<Arc<dyn Handler>> {
        self.read()
            .get(&name.map(str::to_string))
            .cloned()
            .ok_or_else(|| match name {
                Some(name) => HoleError::UnrecognizedCommand(name.to_string()),
                None => HoleError::UnrecognizedCommand("no command given".to_string()),
            })
    }

    /// Named handlers as `(usage, description)`, sorted by command name.
    pub fn command_names(&self) -> Vec<(String, String)> {
        let by_name = self.read();
        let mut named: Vec<(&String, &Arc<dyn Handler>)> = by_name
            .iter()
            .filter_map(|(name, handler)| name.as_ref().map(|name| (name, handler)))
            .collect();
        named.sort_by(|a, b| a.0.cmp(b.0));
        named
            .into_iter()
            .map(|(name, handler)| {
                let usage = match handler.usage() {
                    "" => name.clone(),
                    usage => usage.to_string(),
                };
                (usage, handler.description().to_string())
            })
            .collect()
    }

    /// The clap parser for every registered handler: the default handler's template at
    /// the root and one subcommand per named handler.
    pub fn command_line(&self) -> Result<clap::Command> {
        Self::build_command_line(&self.read())
    }

    /// Parses the remaining tokens and runs the selected handler.
    ///
    /// Parse failures after a registered command name are invalid arguments; any other
    /// parse failure is an unrecognized command.
    pub fn execute(
        &self,
        bundle: &mut Bundle,
        tokens: &mut TokenIterator,
        app: &HoleApp,
    ) -> Result<()> {
        let args: Vec<String> = tokens.by_ref().collect();
        let handlers = self.read().clone();
        let command_name = args
            .first()
            .filter(|name| handlers.contains_key(&Some(name.to_string())));

        let matches = Self::build_command_line(&handlers)?
            .try_get_matches_from(&args)
            .map_err(|e| parse_error(&e, command_name.map(String::as_str)))?;
        let (name, matches) = match matches.subcommand() {
            Some((name, sub_matches)) => (Some(name), sub_matches),
            None => (None, &matches),
        };
        let handler = handlers
            .get(&name.map(str::to_string))
            .cloned()
            .ok_or_else(|| HoleError::UnrecognizedCommand(name.unwrap_or_default().to_string()))?;
        let command = handler.template().read(matches);

        tracing::debug!(
            command = name.unwrap_or("<default>"),
            args = command.args.len(),
            options = command.options.len(),
            "dispatch"
        );
        handler.handle(&command, bundle, app)
    }

    fn build_command_line(handlers: &HandlerMap) -> Result<clap::Command> {
        let root = handlers
            .get(&None)
            .ok_or_else(|| HoleError::UnrecognizedCommand("no command given".to_string()))?;
        let mut named: Vec<(&String, &Arc<dyn Handler>)> = handlers
            .iter()
            .filter_map(|(name, handler)| name.as_ref().map(|name| (name, handler)))
            .collect();
        named.sort_by(|a, b| a.0.cmp(b.0));

        let command_line = root
            .template()
            .to_clap("hole")
            .no_binary_name(true)
            .disable_help_subcommand(true)
            .args_conflicts_with_subcommands(true);
        Ok(named.into_iter().fold(command_line, |command_line, (name, handler)| {
            command_line.subcommand(handler.template().to_clap(name.clone()))
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, HandlerMap> {
        self.by_name.read().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_error(error: &clap::Error, command_name: Option<&str>) -> HoleError {
    if error.kind() == ErrorKind::InvalidSubcommand {
        return match error.get(ContextKind::InvalidSubcommand) {
            Some(ContextValue::String(name)) => HoleError::UnrecognizedCommand(name.clone()),
            _ => HoleError::UnrecognizedCommand(describe(error)),
        };
    }
    match command_name {
        Some(name) => HoleError::InvalidArgument(format!("{}: {}", name, describe(error))),
        None => HoleError::UnrecognizedCommand(describe(error)),
    }
}

fn describe(error: &clap::Error) -> String {
    let reason = error.kind().as_str().unwrap_or("invalid input");
    match error.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => format!("{} `{}`", reason, arg),
        Some(ContextValue::Strings(args)) => format!("{} `{}`", reason, args.join(" ")),
        _ => reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop(CommandTemplate);

    impl Handler for Noop {
        fn template(&self) -> &CommandTemplate {
            &self.0
        }

        fn handle(&self, _: &Command, _: &mut Bundle, _: &HoleApp) -> Result<()> {
            Ok(())
        }
    }

    fn noop() -> Arc<dyn Handler> {
        Arc::new(Noop(CommandTemplate::new(0)))
    }

    #[test]
    fn refuses_duplicate_unless_overriding() {
        let manager = HandlerManager::default();
        manager.register_handler(Some("new"), noop(), false).unwrap();

        let duplicate = manager.register_handler(Some("new"), noop(), false);
        let replaced = manager.register_handler(Some("new"), noop(), true);

        assert!(matches!(duplicate, Err(HoleError::HandlerAlreadyExists(name)) if name == "new"));
        assert!(replaced.is_ok());
    }

    #[test]
    fn unknown_name_is_unrecognized() {
        let manager = HandlerManager::default();
        manager.register_builtin().unwrap();

        assert!(manager.get_handler(None).is_ok());
        assert!(matches!(
            manager.get_handler(Some("delete")),
            Err(HoleError::UnrecognizedCommand(name)) if name == "delete"
        ));
    }

    #[test]
    fn command_line_has_one_subcommand_per_name() {
        let manager = HandlerManager::default();
        manager.register_builtin().unwrap();
        manager.register_handler(Some("alpha"), noop(), false).unwrap();

        let command_line = manager.command_line().unwrap();
        let names: Vec<&str> = command_line.get_subcommands().map(|c| c.get_name()).collect();

        assert_eq!(names, ["alpha", "item"]);
        assert!(command_line.get_arguments().any(|arg| arg.get_id() == "version"));
    }

    #[test]
    fn command_line_needs_default_handler() {
        let manager = HandlerManager::default();

        assert!(matches!(
            manager.command_line(),
            Err(HoleError::UnrecognizedCommand(_))
        ));
    }

    #[test]
    fn command_names_are_sorted_and_skip_default() {
        let manager = HandlerManager::default();
        manager.register_builtin().unwrap();
        manager.register_handler(Some("alpha"), noop(), false).unwrap();

        let names = manager.command_names();

        assert_eq!(names[0], ("alpha".to_string(), String::new()));
        assert_eq!(names[1].0, "item <id>");
        assert_eq!(names.len(), 2);
    }
}
