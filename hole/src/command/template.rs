use clap::{Arg, ArgAction, ArgMatches, builder::Str, value_parser};

/// Describes an option: its labels and how many arguments follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionTemplate {
    long_label: String,
    short_label: Option<char>,
    num_args: usize,
    exclusive: bool,
}

impl OptionTemplate {
    /// An option without arguments whose short label is the first character of `long_label`.
    pub fn new(long_label: &str) -> Self {
        Self {
            long_label: long_label.to_string(),
            short_label: long_label.chars().next(),
            num_args: 0,
            exclusive: false,
        }
    }

    pub fn with_short(long_label: &str, short_label: char) -> Self {
        Self {
            short_label: Some(short_label),
            ..Self::new(long_label)
        }
    }

    pub fn num_args(mut self, num_args: usize) -> Self {
        self.num_args = num_args;
        self
    }

    /// The option must be the only argument on the command line.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn long_label(&self) -> &str {
        &self.long_label
    }

    pub fn short_label(&self) -> Option<char> {
        self.short_label
    }

    fn to_arg(&self) -> Arg {
        let arg = Arg::new(self.long_label.clone())
            .long(self.long_label.clone())
            .short(self.short_label)
            .exclusive(self.exclusive);
        if self.num_args == 0 {
            arg.action(ArgAction::Count)
        } else {
            arg.action(ArgAction::Set)
                .num_args(self.num_args)
                .value_parser(value_parser!(String))
        }
    }

    /// One [`CommandOption`] per occurrence of a flag; options with arguments occur once.
    fn read(&self, matches: &ArgMatches) -> Vec<CommandOption> {
        let id = self.long_label.as_str();
        if self.num_args == 0 {
            let occurrences = usize::from(matches.get_count(id));
            return vec![self.occurrence(Vec::new()); occurrences];
        }
        match matches.get_many::<String>(id) {
            Some(values) => vec![self.occurrence(values.cloned().collect())],
            None => Vec::new(),
        }
    }

    fn occurrence(&self, args: Vec<String>) -> CommandOption {
        CommandOption {
            template: self.clone(),
            args,
        }
    }
}

/// The expected shape of a command: an exact number of positional arguments and the
/// options it accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTemplate {
    num_args: usize,
    options: Vec<OptionTemplate>,
}

impl CommandTemplate {
    pub fn new(num_args: usize) -> Self {
        Self {
            num_args,
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: OptionTemplate) -> Self {
        self.options.push(option);
        self
    }

    pub fn num_args(&self) -> usize {
        self.num_args
    }

    pub fn options(&self) -> &[OptionTemplate] {
        &self.options
    }

    /// A clap command named `name` with every positional argument required.
    ///
    /// Without declared options, positional values may start with `-`.
    pub fn to_clap(&self, name: impl Into<Str>) -> clap::Command {
        let hyphen_values = self.options.is_empty();
        let mut command = clap::Command::new(name)
            .disable_help_flag(true)
            .disable_version_flag(true);
        for index in 0..self.num_args {
            command = command.arg(
                Arg::new(positional_id(index))
                    .index(index + 1)
                    .required(true)
                    .action(ArgAction::Set)
                    .value_parser(value_parser!(String))
                    .allow_hyphen_values(hyphen_values),
            );
        }
        for option in &self.options {
            command = command.arg(option.to_arg());
        }
        command
    }

    /// Collects the arguments and options of a successful parse of [`Self::to_clap`].
    pub fn read(&self, matches: &ArgMatches) -> Command {
        let args = (0..self.num_args)
            .filter_map(|index| matches.get_one::<String>(&positional_id(index)).cloned())
            .collect();
        let options = self
            .options
            .iter()
            .flat_map(|option| option.read(matches))
            .collect();
        Command { args, options }
    }
}

fn positional_id(index: usize) -> String {
    format!("arg{}", index + 1)
}

/// An option parsed from the command line with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOption {
    pub template: OptionTemplate,
    pub args: Vec<String>,
}

/// A command line parsed against a [`CommandTemplate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
    pub options: Vec<CommandOption>,
}

impl Command {
    /// The option with the given long label, if present.
    pub fn option(&self, long_label: &str) -> Option<&CommandOption> {
        self.options
            .iter()
            .find(|option| option.template.long_label() == long_label)
    }

    pub fn has_option(&self, long_label: &str) -> bool {
        self.option(long_label).is_some()
    }
}
