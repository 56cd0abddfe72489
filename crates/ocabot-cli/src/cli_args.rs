use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_non_blank(value: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("value must not be blank".to_string());
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Parser)]
#[command(
    name = "ocabot",
    about = "Dispatch /ocabot commands found in GitHub comments to the task spool",
    version
)]
/// Top-level `ocabot` command line.
pub struct Cli {
    #[arg(
        long = "spool-dir",
        env = "OCABOT_SPOOL_DIR",
        default_value = ".ocabot/spool",
        global = true,
        help = "Directory where handed-off tasks are spooled for workers."
    )]
    pub spool_dir: PathBuf,

    #[arg(
        long = "state-path",
        env = "OCABOT_STATE_PATH",
        default_value = ".ocabot/state.json",
        global = true,
        help = "State file recording processed event keys."
    )]
    pub state_path: PathBuf,

    #[arg(
        long = "psc-repo",
        env = "GITHUB_PSC_REPO",
        global = true,
        help = "Repository where `/ocabot add_psc` is accepted, as <repo> or <org>/<repo>."
    )]
    pub psc_repo: Option<String>,

    #[arg(
        long = "bot-tasks",
        env = "BOT_TASKS",
        value_delimiter = ',',
        default_value = "all",
        global = true,
        help = "Comma-separated task switches to enable, or `all`."
    )]
    pub bot_tasks: Vec<String>,

    #[arg(
        long = "bot-tasks-disabled",
        env = "BOT_TASKS_DISABLED",
        value_delimiter = ',',
        global = true,
        help = "Comma-separated task switches to disable."
    )]
    pub bot_tasks_disabled: Vec<String>,

    #[arg(
        long = "dry-run",
        env = "DRY_RUN",
        action = ArgAction::SetTrue,
        global = true,
        help = "Ask workers to run handed-off tasks without side effects."
    )]
    pub dry_run: bool,

    #[arg(
        long = "processed-event-cap",
        env = "OCABOT_PROCESSED_EVENT_CAP",
        default_value_t = 10_000,
        value_parser = parse_positive_usize,
        global = true,
        help = "Maximum number of processed event keys remembered for deduplication."
    )]
    pub processed_event_cap: usize,

    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Log more on stderr (-v info, -vv debug); RUST_LOG takes precedence."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Parse one comment and hand its commands off to the spool.
    Dispatch(DispatchArgs),

    /// List tasks waiting in the spool.
    Pending(PendingArgs),

    /// Remove a spooled task once a worker has taken it.
    Ack(AckArgs),

    /// Print the command syntax and the supported commands.
    Grammar,
}

#[derive(Debug, Args)]
pub struct DispatchArgs {
    #[arg(long, value_parser = parse_non_blank, help = "Organization owning the repository.")]
    pub org: String,

    #[arg(long, value_parser = parse_non_blank, help = "Repository name.")]
    pub repo: String,

    #[arg(long, help = "Pull request or issue number.")]
    pub number: u64,

    #[arg(long, value_parser = parse_non_blank, help = "Login of the comment author.")]
    pub username: String,

    #[arg(
        long = "pull-request",
        action = ArgAction::SetTrue,
        help = "The comment was posted on a pull request rather than a plain issue."
    )]
    pub pull_request: bool,

    #[arg(
        long,
        conflicts_with = "body_file",
        required_unless_present = "body_file",
        help = "Comment body."
    )]
    pub body: Option<String>,

    #[arg(long = "body-file", help = "Read the comment body from this file.")]
    pub body_file: Option<PathBuf>,

    #[arg(
        long = "event-key",
        help = "Unique delivery key; a key already processed is not dispatched again."
    )]
    pub event_key: Option<String>,

    #[arg(long, action = ArgAction::SetTrue, help = "Print the report as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PendingArgs {
    #[arg(long, default_value_t = 50, value_parser = parse_positive_usize)]
    pub limit: usize,

    #[arg(long, action = ArgAction::SetTrue, help = "Print tasks as JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AckArgs {
    #[arg(value_parser = parse_non_blank, help = "Id of the spooled task, as printed by `pending`.")]
    pub task_id: String,
}
