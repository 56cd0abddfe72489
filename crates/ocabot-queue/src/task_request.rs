use serde::{Deserialize, Serialize};

/// Enumerates the background tasks a bot command can hand off to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskName {
    MergeBotStart,
    RebaseBotStart,
    MigrationIssueStart,
    AddPscMember,
}

impl TaskName {
    pub const ALL: [TaskName; 4] = [
        TaskName::MergeBotStart,
        TaskName::RebaseBotStart,
        TaskName::MigrationIssueStart,
        TaskName::AddPscMember,
    ];

    /// Returns the stable snake_case wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MergeBotStart => "merge_bot_start",
            Self::RebaseBotStart => "rebase_bot_start",
            Self::MigrationIssueStart => "migration_issue_start",
            Self::AddPscMember => "add_psc_member",
        }
    }

    /// Returns the name used to enable or disable this task in configuration.
    pub fn switch_name(self) -> &'static str {
        match self {
            Self::MergeBotStart => "merge_bot",
            Self::RebaseBotStart => "rebase_bot",
            Self::MigrationIssueStart => "migration_issue_bot",
            Self::AddPscMember => "add_psc_member",
        }
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pull request or issue a task operates on, and the user who asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTarget {
    pub organization: String,
    pub repository: String,
    pub number: u64,
    pub username: String,
}

/// One named, command-specific argument of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskField {
    pub name: String,
    pub value: String,
}

impl TaskField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Fully parameterized unit of work submitted to a [`crate::TaskQueue`].
///
/// Field order is significant: `fields` are appended to the positional
/// arguments in the order they were added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: TaskName,
    pub target: TaskTarget,
    #[serde(default)]
    pub fields: Vec<TaskField>,
    #[serde(default)]
    pub dry_run: bool,
}

impl TaskRequest {
    pub fn new(task: TaskName, target: TaskTarget, dry_run: bool) -> Self {
        Self {
            task,
            target,
            fields: Vec::new(),
            dry_run,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(TaskField::new(name, value));
        self
    }

    /// Looks up a command-specific field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.value.as_str())
    }

    /// Returns `(organization, repository, number, username, fields..., dry_run)`.
    pub fn positional_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(5 + self.fields.len());
        args.push(self.target.organization.clone());
        args.push(self.target.repository.clone());
        args.push(self.target.number.to_string());
        args.push(self.target.username.clone());
        args.extend(self.fields.iter().map(|field| field.value.clone()));
        args.push(self.dry_run.to_string());
        args
    }
}
