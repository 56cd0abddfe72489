//! Routing of invocations to command variants.
//!
//! Pull requests are strict: a name with no eligible route is reported back as
//! an invalid command. Plain issues are permissive: a name with no eligible
//! route is skipped without error, since `/ocabot` may be mentioned in
//! unrelated discussions.

use crate::{
    bot_command::{BotCommand, ADD_PSC_COMMAND, MERGE_COMMAND, MIGRATION_COMMAND, REBASE_COMMAND},
    command_error::CommandError,
    command_grammar::Invocation,
    invocation_context::{InvocationContext, PscRepository},
};

/// Context in which a route applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEligibility {
    /// Any pull request.
    PullRequest,
    /// A plain issue of the configured PSC repository.
    PscIssue,
}

/// One row of the routing table.
#[derive(Clone, Copy)]
pub struct CommandRoute {
    pub name: &'static str,
    pub eligibility: CommandEligibility,
    pub usage: &'static str,
    pub build: fn(&[&str]) -> Result<BotCommand, CommandError>,
}

impl std::fmt::Debug for CommandRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRoute")
            .field("name", &self.name)
            .field("eligibility", &self.eligibility)
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// Every command the bot understands.
pub const COMMAND_ROUTES: &[CommandRoute] = &[
    CommandRoute {
        name: MERGE_COMMAND,
        eligibility: CommandEligibility::PullRequest,
        usage: "/ocabot merge <major|minor|patch|nobump>",
        build: BotCommand::merge,
    },
    CommandRoute {
        name: REBASE_COMMAND,
        eligibility: CommandEligibility::PullRequest,
        usage: "/ocabot rebase",
        build: BotCommand::rebase,
    },
    CommandRoute {
        name: MIGRATION_COMMAND,
        eligibility: CommandEligibility::PullRequest,
        usage: "/ocabot migration <module>",
        build: BotCommand::migration_issue,
    },
    CommandRoute {
        name: ADD_PSC_COMMAND,
        eligibility: CommandEligibility::PscIssue,
        usage: "/ocabot add_psc <team>",
        build: BotCommand::add_psc,
    },
];

/// Resolves invocations against [`COMMAND_ROUTES`].
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    psc_repository: Option<PscRepository>,
}

impl CommandRegistry {
    pub fn new(psc_repository: Option<PscRepository>) -> Self {
        Self { psc_repository }
    }

    pub fn psc_repository(&self) -> Option<&PscRepository> {
        self.psc_repository.as_ref()
    }

    pub fn routes(&self) -> &'static [CommandRoute] {
        COMMAND_ROUTES
    }

    fn is_eligible(&self, route: &CommandRoute, context: &InvocationContext) -> bool {
        match route.eligibility {
            CommandEligibility::PullRequest => context.is_pull_request,
            CommandEligibility::PscIssue => {
                !context.is_pull_request
                    && self
                        .psc_repository
                        .as_ref()
                        .is_some_and(|psc| psc.matches(&context.repository))
            }
        }
    }

    /// Returns the route `name` resolves to in `context`, if any.
    pub fn route_for(&self, name: &str, context: &InvocationContext) -> Option<&'static CommandRoute> {
        COMMAND_ROUTES
            .iter()
            .find(|route| route.name == name && self.is_eligible(route, context))
    }

    /// Builds the command for `invocation`.
    ///
    /// `Ok(None)` means the invocation does not apply to this context and is
    /// ignored.
    pub fn resolve(
        &self,
        invocation: &Invocation<'_>,
        context: &InvocationContext,
    ) -> Result<Option<BotCommand>, CommandError> {
        match self.route_for(invocation.command, context) {
            Some(route) => (route.build)(&invocation.options).map(Some),
            None if context.is_pull_request => Err(CommandError::InvalidCommand {
                name: invocation.command.to_string(),
            }),
            None => {
                tracing::debug!(
                    command = invocation.command,
                    line = invocation.line_number,
                    repository = %context.repository,
                    "ignoring command outside of its eligible context"
                );
                Ok(None)
            }
        }
    }
}
