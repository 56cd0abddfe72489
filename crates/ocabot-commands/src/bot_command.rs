//! Validated bot commands and their hand-off to the task queue.

use anyhow::Result;
use ocabot_queue::{TaskName, TaskQueue, TaskReceipt, TaskRequest, TaskTarget};
use serde::Serialize;

use crate::{command_error::CommandError, invocation_context::InvocationContext};

pub const MERGE_COMMAND: &str = "merge";
pub const REBASE_COMMAND: &str = "rebase";
pub const MIGRATION_COMMAND: &str = "migration";
pub const ADD_PSC_COMMAND: &str = "add_psc";

const BUMPVERSION_MODE_OPTION: &str = "bumpversion_mode";
const TEAM_FIELD: &str = "team";
const MODULE_FIELD: &str = "module";

/// Version bump applied by the merge task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpVersionMode {
    Major,
    Minor,
    Patch,
    NoBump,
}

impl BumpVersionMode {
    pub const ALL: [BumpVersionMode; 4] = [
        BumpVersionMode::Major,
        BumpVersionMode::Minor,
        BumpVersionMode::Patch,
        BumpVersionMode::NoBump,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::NoBump => "nobump",
        }
    }

    /// Parses an option token. Matching is exact, as typed in the comment.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == raw)
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|mode| mode.as_str()).collect()
    }
}

impl std::fmt::Display for BumpVersionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command that passed validation and is ready to be handed off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BotCommand {
    Merge {
        bump_mode: BumpVersionMode,
    },
    Rebase,
    #[serde(rename = "migration")]
    MigrationIssue {
        module: String,
    },
    #[serde(rename = "add_psc")]
    AddPsc {
        team: String,
    },
}

impl BotCommand {
    /// `merge <major|minor|patch|nobump>`
    pub fn merge(options: &[&str]) -> Result<Self, CommandError> {
        match options {
            [] => Err(CommandError::RequiredOptionMissing {
                name: MERGE_COMMAND.to_string(),
                option: BUMPVERSION_MODE_OPTION,
                values: BumpVersionMode::names(),
            }),
            [mode] => BumpVersionMode::parse(mode)
                .map(|bump_mode| Self::Merge { bump_mode })
                .ok_or_else(|| CommandError::invalid_options(MERGE_COMMAND, options)),
            _ => Err(CommandError::invalid_options(MERGE_COMMAND, options)),
        }
    }

    /// `rebase`, without options.
    pub fn rebase(options: &[&str]) -> Result<Self, CommandError> {
        if options.is_empty() {
            Ok(Self::Rebase)
        } else {
            Err(CommandError::invalid_options(REBASE_COMMAND, options))
        }
    }

    /// `migration <module>`
    pub fn migration_issue(options: &[&str]) -> Result<Self, CommandError> {
        match options {
            [module] => Ok(Self::MigrationIssue {
                module: module.to_string(),
            }),
            _ => Err(CommandError::invalid_options(MIGRATION_COMMAND, options)),
        }
    }

    /// `add_psc <team>`
    pub fn add_psc(options: &[&str]) -> Result<Self, CommandError> {
        match options {
            [team] => Ok(Self::AddPsc {
                team: team.to_string(),
            }),
            _ => Err(CommandError::invalid_options(ADD_PSC_COMMAND, options)),
        }
    }

    /// Name the command is invoked with.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Merge { .. } => MERGE_COMMAND,
            Self::Rebase => REBASE_COMMAND,
            Self::MigrationIssue { .. } => MIGRATION_COMMAND,
            Self::AddPsc { .. } => ADD_PSC_COMMAND,
        }
    }

    pub fn task_name(&self) -> TaskName {
        match self {
            Self::Merge { .. } => TaskName::MergeBotStart,
            Self::Rebase => TaskName::RebaseBotStart,
            Self::MigrationIssue { .. } => TaskName::MigrationIssueStart,
            Self::AddPsc { .. } => TaskName::AddPscMember,
        }
    }

    /// Packages the command as `(org, repo, number, username, <fields>, dry_run)`.
    pub fn task_request(&self, target: TaskTarget, dry_run: bool) -> TaskRequest {
        let request = TaskRequest::new(self.task_name(), target, dry_run);
        match self {
            Self::Merge { bump_mode } => {
                request.with_field(BUMPVERSION_MODE_OPTION, bump_mode.as_str())
            }
            Self::Rebase => request,
            Self::MigrationIssue { module } => request.with_field(MODULE_FIELD, module.as_str()),
            Self::AddPsc { team } => request.with_field(TEAM_FIELD, team.as_str()),
        }
    }

    /// Hands the command off to `queue` for pull request or issue `number`.
    ///
    /// `dry_run` is forwarded untouched; only the task implementation reads it.
    pub fn delay<Q: TaskQueue + ?Sized>(
        &self,
        queue: &Q,
        context: &InvocationContext,
        number: u64,
        dry_run: bool,
    ) -> Result<TaskReceipt> {
        let target = TaskTarget {
            organization: context.repository.organization.clone(),
            repository: context.repository.repository.clone(),
            number,
            username: context.username.clone(),
        };
        let receipt = queue.enqueue(self.task_request(target, dry_run))?;
        tracing::info!(
            command = self.name(),
            task = %receipt.task(),
            task_id = receipt.task_id().unwrap_or("-"),
            repository = %context.repository,
            number,
            username = %context.username,
            dry_run,
            "command handed off"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::{BotCommand, BumpVersionMode};
    use crate::{
        command_error::CommandError,
        invocation_context::{InvocationContext, RepositoryIdentity},
    };
    use ocabot_queue::{InMemoryTaskQueue, TaskName, TaskTarget};

    fn target() -> TaskTarget {
        TaskTarget {
            organization: "OCA".to_string(),
            repository: "stock-logistics-workflow".to_string(),
            number: 101,
            username: "erin".to_string(),
        }
    }

    #[test]
    fn unit_bump_version_mode_parse_is_exact() {
        assert_eq!(BumpVersionMode::parse("nobump"), Some(BumpVersionMode::NoBump));
        assert_eq!(BumpVersionMode::parse("Major"), None);
        assert_eq!(BumpVersionMode::names(), vec!["major", "minor", "patch", "nobump"]);
    }

    #[test]
    fn unit_merge_without_options_is_a_required_option_error() {
        let error = BotCommand::merge(&[]).expect_err("missing option");
        assert_eq!(
            error,
            CommandError::RequiredOptionMissing {
                name: "merge".to_string(),
                option: "bumpversion_mode",
                values: vec!["major", "minor", "patch", "nobump"],
            }
        );
    }

    #[test]
    fn functional_merge_accepts_each_bump_mode() {
        for mode in BumpVersionMode::ALL {
            let command = BotCommand::merge(&[mode.as_str()]).expect("valid mode");
            assert_eq!(command, BotCommand::Merge { bump_mode: mode });
        }
    }

    #[test]
    fn functional_merge_rejects_unknown_or_extra_options() {
        assert_eq!(
            BotCommand::merge(&["bogus"]).expect_err("bogus"),
            CommandError::invalid_options("merge", &["bogus"])
        );
        assert_eq!(
            BotCommand::merge(&["major", "minor"]).expect_err("two options"),
            CommandError::invalid_options("merge", &["major", "minor"])
        );
    }

    #[test]
    fn functional_rebase_rejects_any_option() {
        assert_eq!(BotCommand::rebase(&[]).expect("no options"), BotCommand::Rebase);
        assert_eq!(
            BotCommand::rebase(&["extra"]).expect_err("extra"),
            CommandError::invalid_options("rebase", &["extra"])
        );
    }

    #[test]
    fn functional_single_token_commands_require_exactly_one_option() {
        assert_eq!(
            BotCommand::add_psc(&["reviewers"]).expect("team"),
            BotCommand::AddPsc {
                team: "reviewers".to_string()
            }
        );
        assert_eq!(
            BotCommand::migration_issue(&["base_rest"]).expect("module"),
            BotCommand::MigrationIssue {
                module: "base_rest".to_string()
            }
        );
        for options in [&[][..], &["a", "b"][..]] {
            assert!(BotCommand::add_psc(options).is_err());
            let error = BotCommand::migration_issue(options).expect_err("arity");
            assert!(matches!(error, CommandError::InvalidOptions { .. }));
        }
    }

    #[test]
    fn integration_task_requests_follow_positional_contract() {
        let merge = BotCommand::Merge {
            bump_mode: BumpVersionMode::Minor,
        }
        .task_request(target(), false);
        assert_eq!(merge.task, TaskName::MergeBotStart);
        assert_eq!(
            merge.positional_args(),
            vec!["OCA", "stock-logistics-workflow", "101", "erin", "minor", "false"]
        );

        let rebase = BotCommand::Rebase.task_request(target(), true);
        assert_eq!(
            rebase.positional_args(),
            vec!["OCA", "stock-logistics-workflow", "101", "erin", "true"]
        );

        let psc = BotCommand::AddPsc {
            team: "board".to_string(),
        }
        .task_request(target(), true);
        assert_eq!(psc.field("team"), Some("board"));
    }

    #[test]
    fn integration_delay_enqueues_with_context_and_number() {
        let queue = InMemoryTaskQueue::new();
        let context = InvocationContext::pull_request(
            RepositoryIdentity::new("OCA", "web"),
            "frank",
        );
        let receipt = BotCommand::MigrationIssue {
            module: "web_responsive".to_string(),
        }
        .delay(&queue, &context, 77, true)
        .expect("delay");
        assert_eq!(receipt.task(), TaskName::MigrationIssueStart);

        let requests = queue.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].target.repository, "web");
        assert_eq!(requests[0].target.number, 77);
        assert_eq!(requests[0].target.username, "frank");
        assert_eq!(requests[0].field("module"), Some("web_responsive"));
    }

    #[test]
    fn regression_dry_run_is_forwarded_for_merge_and_rebase() {
        let queue = InMemoryTaskQueue::new();
        let context =
            InvocationContext::pull_request(RepositoryIdentity::new("OCA", "web"), "grace");
        BotCommand::Rebase
            .delay(&queue, &context, 1, true)
            .expect("rebase");
        BotCommand::Merge {
            bump_mode: BumpVersionMode::Patch,
        }
        .delay(&queue, &context, 1, true)
        .expect("merge");
        assert!(queue.requests().iter().all(|request| request.dry_run));
    }

    #[test]
    fn regression_serialized_command_uses_invocation_names() {
        let encoded = serde_json::to_value(BotCommand::AddPsc {
            team: "x".to_string(),
        })
        .expect("encode");
        assert_eq!(encoded["command"], "add_psc");
        let encoded = serde_json::to_value(BotCommand::Merge {
            bump_mode: BumpVersionMode::NoBump,
        })
        .expect("encode");
        assert_eq!(encoded["command"], "merge");
        assert_eq!(encoded["bump_mode"], "nobump");
    }
}
