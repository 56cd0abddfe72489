use std::sync::Arc;

use ocabot_commands::{
    parse_commands, BotCommand, BumpVersionMode, CommandError, CommandRegistry, CommentDispatcher,
    CommentEvent, InvocationContext, PscRepository, RepositoryIdentity,
};
use ocabot_queue::{
    SpoolTaskQueue, SwitchableTaskQueue, TaskName, TaskQueue, TaskReceipt, TaskSwitches,
};

fn psc_registry() -> CommandRegistry {
    CommandRegistry::new(PscRepository::parse("OCA/oca-psc").expect("psc repository"))
}

fn pull_request_event(body: &str, number: u64) -> CommentEvent {
    CommentEvent {
        context: InvocationContext::pull_request(
            RepositoryIdentity::new("OCA", "account-invoicing"),
            "quentin",
        ),
        number,
        body: body.to_string(),
    }
}

#[test]
fn integration_pull_request_comment_reaches_spool_with_positional_contract() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let spool = SpoolTaskQueue::open(tempdir.path()).expect("open spool");
    let dispatcher = CommentDispatcher::new(psc_registry(), spool).with_dry_run(true);

    let body = "Thanks for the review!\n\
                > /ocabot merge major\n\
                /ocabot merge minor\n\
                /ocabot migration account_invoice_triple_discount";
    let report = dispatcher.dispatch(&pull_request_event(body, 1500));
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    assert_eq!(report.dispatched.len(), 2);

    let pending = dispatcher.queue().list_pending(10).expect("list pending");
    let args = pending
        .iter()
        .map(|record| record.request.positional_args())
        .collect::<Vec<_>>();
    assert_eq!(
        args,
        vec![
            vec!["OCA", "account-invoicing", "1500", "quentin", "minor", "true"],
            vec![
                "OCA",
                "account-invoicing",
                "1500",
                "quentin",
                "account_invoice_triple_discount",
                "true"
            ],
        ]
    );

    let events = std::fs::read_to_string(dispatcher.queue().events_path()).expect("event log");
    let events = events
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("event json"))
        .collect::<Vec<_>>();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| event["event"] == "queued"));
    assert_eq!(events[1]["task"], "migration_issue_start");
}

#[test]
fn integration_mixed_comment_spools_valid_commands_and_replies_to_invalid_ones() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let spool = SpoolTaskQueue::open(tempdir.path()).expect("open spool");
    let dispatcher = CommentDispatcher::new(psc_registry(), spool);

    let body = "/ocabot rebase now\n/ocabot rebase\n/ocabot merge bogus\n/ocabot squash";
    let report = dispatcher.dispatch(&pull_request_event(body, 7));

    assert_eq!(report.dispatched.len(), 1);
    assert_eq!(report.dispatched[0].command, BotCommand::Rebase);
    let replies = report.replies().collect::<Vec<_>>();
    assert_eq!(replies.len(), 3);
    assert!(replies[0].contains("Invalid options for command rebase: now"));
    assert!(replies[1].contains("Invalid options for command merge: bogus"));
    assert!(replies[2].contains("Invalid command: squash"));

    let pending = dispatcher.queue().list_pending(10).expect("list pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request.task, TaskName::RebaseBotStart);
}

#[test]
fn integration_task_switches_apply_in_front_of_the_spool() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let spool = Arc::new(SpoolTaskQueue::open(tempdir.path()).expect("open spool"));
    let queue = SwitchableTaskQueue::new(
        Arc::clone(&spool),
        TaskSwitches::from_lists(["merge_bot", "rebase_bot"], ["rebase_bot"]),
    );
    let dispatcher = CommentDispatcher::new(psc_registry(), queue);

    let report = dispatcher.dispatch(&pull_request_event(
        "/ocabot rebase\n/ocabot merge patch",
        21,
    ));
    let receipts = report
        .dispatched
        .iter()
        .map(|dispatched| dispatched.receipt.clone())
        .collect::<Vec<_>>();
    assert_eq!(
        receipts[0],
        TaskReceipt::Disabled {
            task: TaskName::RebaseBotStart
        }
    );
    assert!(matches!(
        receipts[1],
        TaskReceipt::Queued {
            task: TaskName::MergeBotStart,
            ..
        }
    ));
    assert_eq!(spool.list_pending(10).expect("list pending").len(), 1);
}

#[test]
fn integration_add_psc_is_scoped_to_psc_repository_issues() {
    let registry = psc_registry();
    let psc_issue = InvocationContext::issue(RepositoryIdentity::new("OCA", "oca-psc"), "rupert");
    let other_issue = InvocationContext::issue(RepositoryIdentity::new("OCA", "web"), "rupert");
    let psc_pull_request =
        InvocationContext::pull_request(RepositoryIdentity::new("OCA", "oca-psc"), "rupert");

    let text = "/ocabot add_psc localization";
    assert_eq!(
        parse_commands(text, &psc_issue, &registry).collect::<Vec<_>>(),
        vec![Ok(BotCommand::AddPsc {
            team: "localization".to_string()
        })]
    );
    assert_eq!(parse_commands(text, &other_issue, &registry).count(), 0);
    assert_eq!(
        parse_commands(text, &psc_pull_request, &registry).collect::<Vec<_>>(),
        vec![Err(CommandError::InvalidCommand {
            name: "add_psc".to_string()
        })]
    );
}

#[test]
fn integration_commands_can_be_handed_off_by_the_caller_one_by_one() {
    let tempdir = tempfile::tempdir().expect("tempdir");
    let spool = SpoolTaskQueue::open(tempdir.path()).expect("open spool");
    let registry = psc_registry();
    let context =
        InvocationContext::pull_request(RepositoryIdentity::new("OCA", "web"), "sybil");

    let mut errors = Vec::new();
    for parsed in parse_commands("/ocabot merge\n/ocabot merge nobump", &context, &registry) {
        match parsed {
            Ok(command) => {
                assert_eq!(
                    command,
                    BotCommand::Merge {
                        bump_mode: BumpVersionMode::NoBump
                    }
                );
                command
                    .delay(&spool, &context, 99, false)
                    .expect("hand off");
            }
            Err(error) => errors.push(error),
        }
    }
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_options_error());

    let pending = spool.list_pending(10).expect("list pending");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request.field("bumpversion_mode"), Some("nobump"));
    assert!(spool.enqueue(pending[0].request.clone()).is_ok());
}
