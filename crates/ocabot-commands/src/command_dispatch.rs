use crate::{
    bot_command::BotCommand,
    command_error::CommandError,
    command_grammar::{scan_invocations, CommandScanner},
    command_registry::CommandRegistry,
    invocation_context::InvocationContext,
};

/// Lazy sequence of commands parsed from one comment.
///
/// Each element is one invocation that applies to the context: either the
/// validated command or the error that invocation produced. An error does not
/// end the sequence; later invocations are still produced. Invocations that do
/// not apply to the context produce no element.
#[derive(Debug, Clone)]
pub struct ParsedCommands<'a> {
    invocations: CommandScanner<'a>,
    context: &'a InvocationContext,
    registry: &'a CommandRegistry,
}

impl Iterator for ParsedCommands<'_> {
    type Item = Result<BotCommand, CommandError>;

    fn next(&mut self) -> Option<Self::Item> {
        for invocation in self.invocations.by_ref() {
            match self.registry.resolve(&invocation, self.context) {
                Ok(None) => continue,
                Ok(Some(command)) => {
                    tracing::debug!(
                        command = command.name(),
                        line = invocation.line_number,
                        "parsed command"
                    );
                    return Some(Ok(command));
                }
                Err(error) => {
                    tracing::debug!(
                        command = invocation.command,
                        line = invocation.line_number,
                        kind = error.kind().as_str(),
                        "rejected command"
                    );
                    return Some(Err(error));
                }
            }
        }
        None
    }
}

impl std::iter::FusedIterator for ParsedCommands<'_> {}

/// Parses every `/ocabot` command of `text` posted in `context`.
pub fn parse_commands<'a>(
    text: &'a str,
    context: &'a InvocationContext,
    registry: &'a CommandRegistry,
) -> ParsedCommands<'a> {
    ParsedCommands {
        invocations: scan_invocations(text),
        context,
        registry,
    }
}
