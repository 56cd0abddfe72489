//! Comment-driven command parsing and dispatch for the OCA GitHub bot.
//!
//! Scans pull request and issue comments for `/ocabot <command> [<option> ...]`,
//! validates each invocation against its command, and hands validated commands
//! off to an `ocabot_queue::TaskQueue`.

pub mod bot_command;
pub mod command_dispatch;
pub mod command_error;
pub mod command_grammar;
pub mod command_registry;
pub mod command_reply;
pub mod comment_dispatcher;
pub mod invocation_context;

pub use bot_command::{BotCommand, BumpVersionMode};
pub use command_dispatch::{parse_commands, ParsedCommands};
pub use command_error::{CommandError, CommandErrorKind};
pub use command_grammar::{scan_invocations, CommandScanner, Invocation, BOT_COMMAND_TRIGGER};
pub use command_registry::{CommandEligibility, CommandRegistry, CommandRoute, COMMAND_ROUTES};
pub use command_reply::render_command_error_reply;
pub use comment_dispatcher::{
    CommentDispatcher, CommentEvent, DispatchFailure, DispatchReport, DispatchedCommand,
};
pub use invocation_context::{InvocationContext, PscRepository, RepositoryIdentity};
