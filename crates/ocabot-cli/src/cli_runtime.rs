use std::io::Write;

use anyhow::{anyhow, Context, Result};
use ocabot_commands::{
    CommandEligibility, CommandRegistry, CommentDispatcher, CommentEvent, DispatchFailure,
    DispatchReport, InvocationContext, PscRepository, RepositoryIdentity, BOT_COMMAND_TRIGGER,
};
use ocabot_queue::{SpoolTaskQueue, SwitchableTaskQueue, TaskReceipt, TaskSwitches};

use crate::{
    cli_args::{AckArgs, Cli, CliCommand, DispatchArgs, PendingArgs},
    event_state_store::EventStateStore,
};

/// Runs the parsed command line, writing user output to stdout.
pub fn run_cli(cli: Cli) -> Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run_cli_with_output(&cli, &mut out)
}

pub fn run_cli_with_output(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    match &cli.command {
        CliCommand::Dispatch(args) => run_dispatch(cli, args, out),
        CliCommand::Pending(args) => run_pending(cli, args, out),
        CliCommand::Ack(args) => run_ack(cli, args, out),
        CliCommand::Grammar => run_grammar(cli, out),
    }
}

fn build_registry(cli: &Cli) -> Result<CommandRegistry> {
    let psc_repository = match cli.psc_repo.as_deref() {
        Some(raw) => PscRepository::parse(raw).map_err(|error| anyhow!("--psc-repo: {error}"))?,
        None => None,
    };
    Ok(CommandRegistry::new(psc_repository))
}

fn build_task_switches(cli: &Cli) -> TaskSwitches {
    TaskSwitches::from_lists(
        cli.bot_tasks.iter().map(String::as_str),
        cli.bot_tasks_disabled.iter().map(String::as_str),
    )
}

fn read_comment_body(args: &DispatchArgs) -> Result<String> {
    match (&args.body, &args.body_file) {
        (Some(body), _) => Ok(body.clone()),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read comment body from {}", path.display())),
        (None, None) => Err(anyhow!("either --body or --body-file is required")),
    }
}

fn run_dispatch(cli: &Cli, args: &DispatchArgs, out: &mut dyn Write) -> Result<()> {
    // Held until the key is saved, so an overlapping run with the same key waits here.
    let mut state = match args.event_key.as_deref() {
        Some(_) => Some(EventStateStore::load_locked(
            cli.state_path.clone(),
            cli.processed_event_cap,
        )?),
        None => None,
    };
    if let (Some(key), Some(store)) = (args.event_key.as_deref(), state.as_ref()) {
        if store.contains(key) {
            tracing::info!(event_key = key, "event already processed; skipping");
            writeln!(out, "event {key} already processed; nothing dispatched")?;
            return Ok(());
        }
    }

    let repository = RepositoryIdentity::new(args.org.as_str(), args.repo.as_str());
    let context = if args.pull_request {
        InvocationContext::pull_request(repository, args.username.as_str())
    } else {
        InvocationContext::issue(repository, args.username.as_str())
    };
    let event = CommentEvent {
        context,
        number: args.number,
        body: read_comment_body(args)?,
    };

    let queue = SwitchableTaskQueue::new(
        SpoolTaskQueue::open(cli.spool_dir.clone())?,
        build_task_switches(cli),
    );
    let dispatcher = CommentDispatcher::new(build_registry(cli)?, queue).with_dry_run(cli.dry_run);
    let report = dispatcher.dispatch(&event);

    if let (Some(key), Some(store)) = (args.event_key.as_deref(), state.as_mut()) {
        store.mark_processed(key);
        store.save()?;
    }

    if args.json {
        let payload =
            serde_json::to_string_pretty(&report).context("failed to encode dispatch report")?;
        writeln!(out, "{payload}")?;
    } else {
        out.write_all(render_dispatch_report(&report).as_bytes())?;
    }
    Ok(())
}

/// Human-readable summary of a dispatch, one line per invocation plus replies.
pub fn render_dispatch_report(report: &DispatchReport) -> String {
    if report.is_empty() {
        return "no commands found\n".to_string();
    }
    let mut rendered = String::new();
    for dispatched in &report.dispatched {
        let line = match &dispatched.receipt {
            TaskReceipt::Queued { task_id, task } => {
                format!("queued {} as {task} ({task_id})", dispatched.command.name())
            }
            TaskReceipt::Disabled { task } => {
                format!("skipped {}: task {task} is disabled", dispatched.command.name())
            }
        };
        rendered.push_str(&line);
        rendered.push('\n');
    }
    for failure in &report.failures {
        match failure {
            DispatchFailure::Rejected { message, reply, .. } => {
                rendered.push_str(&format!(
                    "rejected: {}\nreply:\n{reply}\n",
                    message.replace('\n', " ")
                ));
            }
            DispatchFailure::HandoffFailed { command, message } => {
                rendered.push_str(&format!("failed to queue {command}: {message}\n"));
            }
        }
    }
    rendered
}

fn run_pending(cli: &Cli, args: &PendingArgs, out: &mut dyn Write) -> Result<()> {
    let queue = SpoolTaskQueue::open(cli.spool_dir.clone())?;
    let records = queue.list_pending(args.limit)?;
    if args.json {
        let payload =
            serde_json::to_string_pretty(&records).context("failed to encode pending tasks")?;
        writeln!(out, "{payload}")?;
        return Ok(());
    }
    if records.is_empty() {
        writeln!(out, "no pending tasks")?;
        return Ok(());
    }
    for record in records {
        writeln!(
            out,
            "{} {} {}",
            record.task_id,
            record.request.task,
            record.request.positional_args().join(" ")
        )?;
    }
    Ok(())
}

fn run_ack(cli: &Cli, args: &AckArgs, out: &mut dyn Write) -> Result<()> {
    let queue = SpoolTaskQueue::open(cli.spool_dir.clone())?;
    if queue.acknowledge(&args.task_id)? {
        writeln!(out, "acknowledged {}", args.task_id)?;
    } else {
        writeln!(out, "task {} is not pending", args.task_id)?;
    }
    Ok(())
}

fn run_grammar(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let registry = build_registry(cli)?;
    writeln!(out, "{BOT_COMMAND_TRIGGER} <command> [<option> ...]")?;
    writeln!(out)?;
    for route in registry.routes() {
        let scope = match route.eligibility {
            CommandEligibility::PullRequest => "pull requests".to_string(),
            CommandEligibility::PscIssue => match registry.psc_repository() {
                Some(psc) => format!("issues of {psc}"),
                None => "issues of the PSC repository (not configured)".to_string(),
            },
        };
        writeln!(out, "  {:<45} {scope}", route.usage)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;

    use super::{render_dispatch_report, run_cli_with_output};
    use crate::cli_args::Cli;
    use ocabot_commands::DispatchReport;

    fn run(args: &[&str]) -> String {
        let cli = Cli::try_parse_from(args.iter().copied()).expect("parse");
        let mut out = Vec::new();
        run_cli_with_output(&cli, &mut out).expect("run");
        String::from_utf8(out).expect("utf8")
    }

    fn dispatch_args<'a>(spool_dir: &'a str, body: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
        let mut args = vec![
            "ocabot",
            "--spool-dir",
            spool_dir,
            "dispatch",
            "--org",
            "OCA",
            "--repo",
            "server-tools",
            "--number",
            "42",
            "--username",
            "peggy",
            "--body",
            body,
        ];
        args.extend_from_slice(extra);
        args
    }

    fn spooled_task_count(spool_dir: &Path) -> usize {
        std::fs::read_dir(spool_dir.join("tasks"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn unit_empty_report_renders_placeholder() {
        assert_eq!(
            render_dispatch_report(&DispatchReport::default()),
            "no commands found\n"
        );
    }

    #[test]
    fn functional_dispatch_spools_pull_request_commands() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let spool_arg = spool.to_str().expect("utf8 path");
        let output = run(&dispatch_args(
            spool_arg,
            "/ocabot merge patch",
            &["--pull-request"],
        ));
        assert!(output.starts_with("queued merge as merge_bot_start (task-"));
        assert_eq!(spooled_task_count(&spool), 1);
    }

    #[test]
    fn functional_dispatch_prints_reply_for_rejected_commands() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let output = run(&dispatch_args(
            spool.to_str().expect("utf8 path"),
            "/ocabot merge",
            &["--pull-request"],
        ));
        assert!(output.contains("rejected: Required option bumpversion_mode for command merge."));
        assert!(output.contains("Hi @peggy. Your command failed:"));
        assert_eq!(spooled_task_count(&spool), 0);
    }

    #[test]
    fn integration_event_key_prevents_second_dispatch() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let state = tempdir.path().join("state.json");
        let mut args = vec![
            "ocabot",
            "--spool-dir",
            spool.to_str().expect("utf8 path"),
            "--state-path",
            state.to_str().expect("utf8 path"),
        ];
        args.extend([
            "dispatch",
            "--org",
            "OCA",
            "--repo",
            "web",
            "--number",
            "3",
            "--username",
            "peggy",
            "--pull-request",
            "--body",
            "/ocabot rebase",
            "--event-key",
            "delivery-77",
        ]);
        let first = run(&args);
        let second = run(&args);
        assert!(first.starts_with("queued rebase"));
        assert_eq!(second, "event delivery-77 already processed; nothing dispatched\n");
        assert_eq!(spooled_task_count(&spool), 1);
        assert!(!crate::event_state_store::event_state_lock_path(&state).exists());
    }

    #[test]
    fn integration_disabled_tasks_are_reported_and_not_spooled() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let mut args = vec!["ocabot", "--bot-tasks-disabled", "rebase_bot"];
        args.extend(dispatch_args(
            spool.to_str().expect("utf8 path"),
            "/ocabot rebase",
            &["--pull-request"],
        )
        .into_iter()
        .skip(1));
        let output = run(&args);
        assert_eq!(output, "skipped rebase: task rebase_bot_start is disabled\n");
        assert_eq!(spooled_task_count(&spool), 0);
    }

    #[test]
    fn integration_pending_lists_spooled_tasks_as_json() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let spool_arg = spool.to_str().expect("utf8 path");
        run(&[
            "ocabot",
            "--psc-repo",
            "OCA/oca-psc",
            "--dry-run",
            "--spool-dir",
            spool_arg,
            "dispatch",
            "--org",
            "OCA",
            "--repo",
            "oca-psc",
            "--number",
            "9",
            "--username",
            "peggy",
            "--body",
            "/ocabot add_psc board",
        ]);
        let output = run(&["ocabot", "--spool-dir", spool_arg, "pending", "--json"]);
        let records: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(records[0]["request"]["task"], "add_psc_member");
        assert_eq!(records[0]["request"]["fields"][0]["value"], "board");
        assert_eq!(records[0]["request"]["dry_run"], true);
    }

    #[test]
    fn integration_ack_removes_a_pending_task() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let spool_arg = spool.to_str().expect("utf8 path");
        run(&dispatch_args(spool_arg, "/ocabot rebase", &["--pull-request"]));
        let pending = run(&["ocabot", "--spool-dir", spool_arg, "pending"]);
        let task_id = pending
            .split_whitespace()
            .next()
            .expect("task id")
            .to_string();

        let acked = run(&["ocabot", "--spool-dir", spool_arg, "ack", task_id.as_str()]);
        assert_eq!(acked, format!("acknowledged {task_id}\n"));
        let again = run(&["ocabot", "--spool-dir", spool_arg, "ack", task_id.as_str()]);
        assert_eq!(again, format!("task {task_id} is not pending\n"));
        assert_eq!(spooled_task_count(&spool), 0);
    }

    #[test]
    fn regression_ack_refuses_paths_outside_the_spool() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let cli = Cli::try_parse_from([
            "ocabot",
            "--spool-dir",
            spool.to_str().expect("utf8 path"),
            "ack",
            "../state",
        ])
        .expect("parse");
        let error = run_cli_with_output(&cli, &mut Vec::new()).expect_err("invalid id");
        assert!(error.to_string().contains("invalid spooled task id"));
    }

    #[test]
    fn regression_issue_comment_with_unknown_command_is_silent() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let spool = tempdir.path().join("spool");
        let output = run(&dispatch_args(
            spool.to_str().expect("utf8 path"),
            "/ocabot frobnicate",
            &[],
        ));
        assert_eq!(output, "no commands found\n");
    }

    #[test]
    fn regression_grammar_lists_every_command() {
        let output = run(&["ocabot", "--psc-repo", "oca-psc", "grammar"]);
        assert!(output.starts_with("/ocabot <command> [<option> ...]"));
        for usage in ["merge", "rebase", "migration", "add_psc"] {
            assert!(output.contains(&format!("/ocabot {usage}")), "{usage}");
        }
        assert!(output.contains("issues of oca-psc"));
    }
}
