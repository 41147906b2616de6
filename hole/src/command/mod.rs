//! Turning raw arguments into commands: the token cursor, templates that build the clap
//! parser, and parsed results.

mod template;
mod token;

pub use template::{Command, CommandOption, CommandTemplate, OptionTemplate};
pub use token::TokenIterator;
