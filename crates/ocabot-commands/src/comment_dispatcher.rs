//! Drives the command parser for one comment and hands commands to a queue.

use ocabot_queue::{TaskQueue, TaskReceipt};
use serde::Serialize;

use crate::{
    bot_command::BotCommand,
    command_dispatch::parse_commands,
    command_error::CommandError,
    command_registry::CommandRegistry,
    command_reply::render_command_error_reply,
    invocation_context::InvocationContext,
};

/// A comment posted on a pull request or issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentEvent {
    pub context: InvocationContext,
    pub number: u64,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchedCommand {
    pub command: BotCommand,
    pub receipt: TaskReceipt,
}

/// Why one invocation of a comment did not result in a queued task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchFailure {
    /// Invocation was rejected; `reply` is meant for the comment author.
    Rejected {
        error_kind: &'static str,
        message: String,
        reply: String,
    },
    /// Command was valid but the queue refused it.
    HandoffFailed { command: String, message: String },
}

impl DispatchFailure {
    fn rejected(username: &str, error: &CommandError) -> Self {
        Self::Rejected {
            error_kind: error.kind().as_str(),
            message: error.to_string(),
            reply: render_command_error_reply(username, error),
        }
    }

    pub fn reply(&self) -> Option<&str> {
        match self {
            Self::Rejected { reply, .. } => Some(reply.as_str()),
            Self::HandoffFailed { .. } => None,
        }
    }
}

/// Outcome of dispatching one comment, in comment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub dispatched: Vec<DispatchedCommand>,
    pub failures: Vec<DispatchFailure>,
}

impl DispatchReport {
    pub fn is_empty(&self) -> bool {
        self.dispatched.is_empty() && self.failures.is_empty()
    }

    /// Replies to post back on the pull request or issue.
    pub fn replies(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().filter_map(DispatchFailure::reply)
    }
}

/// Parses comments and hands every valid command to `queue`.
#[derive(Debug)]
pub struct CommentDispatcher<Q> {
    registry: CommandRegistry,
    queue: Q,
    dry_run: bool,
}

impl<Q: TaskQueue> CommentDispatcher<Q> {
    pub fn new(registry: CommandRegistry, queue: Q) -> Self {
        Self {
            registry,
            queue,
            dry_run: false,
        }
    }

    /// Forwards `dry_run` to every task handed off by this dispatcher.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Dispatches every command of `event`. One failing invocation never stops the others.
    pub fn dispatch(&self, event: &CommentEvent) -> DispatchReport {
        let mut report = DispatchReport::default();
        for parsed in parse_commands(&event.body, &event.context, &self.registry) {
            let command = match parsed {
                Ok(command) => command,
                Err(error) => {
                    tracing::info!(
                        repository = %event.context.repository,
                        number = event.number,
                        username = %event.context.username,
                        error = %error,
                        "command rejected"
                    );
                    report
                        .failures
                        .push(DispatchFailure::rejected(&event.context.username, &error));
                    continue;
                }
            };
            match command.delay(&self.queue, &event.context, event.number, self.dry_run) {
                Ok(receipt) => report.dispatched.push(DispatchedCommand { command, receipt }),
                Err(error) => {
                    tracing::warn!(
                        command = command.name(),
                        repository = %event.context.repository,
                        number = event.number,
                        "failed to hand off command: {error:#}"
                    );
                    report.failures.push(DispatchFailure::HandoffFailed {
                        command: command.name().to_string(),
                        message: format!("{error:#}"),
                    });
                }
            }
        }
        report
    }
}
