//! Command line front end for the ocabot comment dispatcher.
//!
//! Exposes the clap argument model, the processed-event state store and the
//! runtime that wires comments, the command registry and the task spool.

pub mod bootstrap_helpers;
pub mod cli_args;
pub mod cli_runtime;
pub mod event_state_store;

pub use bootstrap_helpers::{default_log_level, init_tracing};
pub use cli_args::{AckArgs, Cli, CliCommand, DispatchArgs, PendingArgs};
pub use cli_runtime::{render_dispatch_report, run_cli, run_cli_with_output};
pub use event_state_store::{acquire_event_state_lock, EventStateLock, EventStateStore};
