use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// A program plus its arguments, ready to hand to a child process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

/// Errors produced while turning a command string into a [`CommandSpec`].
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command is empty")]
    Empty,
    #[error("failed to parse command `{command}`: {source}")]
    Parse {
        command: String,
        #[source]
        source: shell_words::ParseError,
    },
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Split a command line using shell quoting rules.
    pub fn parse(command: &str) -> Result<Self, CommandError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(CommandError::Empty);
        }

        let mut words = shell_words::split(command)
            .map_err(|source| CommandError::Parse {
                command: command.to_string(),
                source,
            })?
            .into_iter();

        let program = words.next().ok_or(CommandError::Empty)?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Replace every `{name}` placeholder in the arguments with `value`.
    pub fn substitute(&self, name: &str, value: &str) -> Self {
        let placeholder = format!("{{{name}}}");
        Self {
            program: self.program.clone(),
            args: self
                .args
                .iter()
                .map(|arg| arg.replace(&placeholder, value))
                .collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", shell_words::join(self.argv()))
    }
}
