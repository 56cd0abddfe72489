use serde::Serialize;
use thiserror::Error;

/// Validation failure raised while turning an invocation into a command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Command name is not known in a pull-request context.
    #[error("Invalid command: {name}")]
    InvalidCommand { name: String },

    /// Command needs an option and none was given.
    #[error(
        "Required option {option} for command {name}.\nPossible values : {}",
        .values.join(", ")
    )]
    RequiredOptionMissing {
        name: String,
        option: &'static str,
        values: Vec<&'static str>,
    },

    /// Supplied options do not match what the command accepts.
    #[error("Invalid options for command {name}: {}", .options.join(" "))]
    InvalidOptions { name: String, options: Vec<String> },
}

/// Stable identifier of a [`CommandError`] variant, used in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandErrorKind {
    InvalidCommand,
    RequiredOptionMissing,
    InvalidOptions,
}

impl CommandErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCommand => "invalid_command",
            Self::RequiredOptionMissing => "required_option_missing",
            Self::InvalidOptions => "invalid_options",
        }
    }
}

impl CommandError {
    pub fn invalid_options(name: &str, options: &[&str]) -> Self {
        Self::InvalidOptions {
            name: name.to_string(),
            options: options.iter().map(|option| option.to_string()).collect(),
        }
    }

    pub fn kind(&self) -> CommandErrorKind {
        match self {
            Self::InvalidCommand { .. } => CommandErrorKind::InvalidCommand,
            Self::RequiredOptionMissing { .. } => CommandErrorKind::RequiredOptionMissing,
            Self::InvalidOptions { .. } => CommandErrorKind::InvalidOptions,
        }
    }

    /// Name of the command the error is about.
    pub fn command_name(&self) -> &str {
        match self {
            Self::InvalidCommand { name }
            | Self::RequiredOptionMissing { name, .. }
            | Self::InvalidOptions { name, .. } => name,
        }
    }

    /// Returns true for failures about the options of a known command.
    pub fn is_options_error(&self) -> bool {
        matches!(
            self,
            Self::RequiredOptionMissing { .. } | Self::InvalidOptions { .. }
        )
    }
}
