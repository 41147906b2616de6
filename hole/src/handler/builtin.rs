use crate::{
    app::{HoleApp, VERSION},
    command::{Command, CommandTemplate, OptionTemplate},
    common::{Bundle, StatusCode},
    error::{HoleError, Result},
};

use super::Handler;

/// Runs when no command name is given: `--version` and `--help`.
pub struct DefaultHandler {
    template: CommandTemplate,
}

impl DefaultHandler {
    pub fn new() -> Self {
        Self {
            template: CommandTemplate::new(0)
                .option(OptionTemplate::new("version").exclusive())
                .option(OptionTemplate::new("help").exclusive()),
        }
    }

    fn manual(app: &HoleApp) -> String {
        let mut lines = vec![
            "Manual of using Hole:".to_string(),
            format!("  {:<24}{}", "hole --version", "print the version"),
            format!("  {:<24}{}", "hole --help", "print this manual"),
        ];
        for (usage, description) in app.handlers().command_names() {
            lines.push(format!("  {:<24}{}", format!("hole {}", usage), description));
        }
        lines.join("\n")
    }
}

impl Default for DefaultHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for DefaultHandler {
    fn template(&self) -> &CommandTemplate {
        &self.template
    }

    fn handle(&self, command: &Command, bundle: &mut Bundle, app: &HoleApp) -> Result<()> {
        let output = match command.options.as_slice() {
            [] => {
                return Err(HoleError::UnrecognizedCommand(
                    "no command given".to_string(),
                ));
            }
            [option] if option.template.long_label() == "version" => {
                format!("Hole v{}", VERSION)
            }
            [option] if option.template.long_label() == "help" => Self::manual(app),
            _ => {
                return Err(HoleError::UnrecognizedCommand(
                    "expected exactly one of --version or --help".to_string(),
                ));
            }
        };
        bundle.buffer.push_str(&output);
        bundle.status_code = StatusCode::Success;
        Ok(())
    }
}

/// `item <id>`: prints an entry as JSON.
pub struct ItemHandler {
    template: CommandTemplate,
}

impl ItemHandler {
    pub fn new() -> Self {
        Self {
            template: CommandTemplate::new(1),
        }
    }
}

impl Default for ItemHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for ItemHandler {
    fn template(&self) -> &CommandTemplate {
        &self.template
    }

    fn usage(&self) -> &str {
        "item <id>"
    }

    fn description(&self) -> &str {
        "print an entry by id"
    }

    fn handle(&self, command: &Command, bundle: &mut Bundle, app: &HoleApp) -> Result<()> {
        let raw_id = command.args.first().map(String::as_str).unwrap_or_default();
        let id: u32 = raw_id.parse().map_err(|_| {
            HoleError::InvalidArgument(format!("item: entry id must be a number: {}", raw_id))
        })?;
        let entry = app.entries().get_by_id(id)?;

        bundle.buffer.push_str(&serde_json::to_string_pretty(&entry)?);
        bundle.status_code = StatusCode::Success;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandOption;

    fn flag(label: &str) -> CommandOption {
        CommandOption {
            template: OptionTemplate::new(label),
            args: Vec::new(),
        }
    }

    #[test]
    fn default_handler_takes_a_single_option() {
        let app = HoleApp::standalone().unwrap();
        let handler = DefaultHandler::new();
        let mut bundle = Bundle::create();
        let both = Command {
            args: Vec::new(),
            options: vec![flag("version"), flag("help")],
        };
        let repeated = Command {
            args: Vec::new(),
            options: vec![flag("version"), flag("version")],
        };

        assert!(matches!(
            handler.handle(&both, &mut bundle, &app),
            Err(HoleError::UnrecognizedCommand(_))
        ));
        assert!(matches!(
            handler.handle(&repeated, &mut bundle, &app),
            Err(HoleError::UnrecognizedCommand(_))
        ));
        assert_eq!(bundle.status_code, StatusCode::Null);
    }

    #[test]
    fn default_handler_prints_version() {
        let app = HoleApp::standalone().unwrap();
        let mut bundle = Bundle::create();
        let command = Command {
            args: Vec::new(),
            options: vec![flag("version")],
        };

        DefaultHandler::new().handle(&command, &mut bundle, &app).unwrap();

        assert_eq!(bundle.message(), format!("Hole v{}", VERSION));
        assert_eq!(bundle.status_code, StatusCode::Success);
    }
}
