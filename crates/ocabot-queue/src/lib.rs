//! Execution backend interface for ocabot commands.
//!
//! Defines the task payload handed off by validated commands, the enqueue
//! contract, and the queue implementations: an in-memory recorder, a durable
//! file spool, and a wrapper honoring per-task enable/disable switches.

pub mod spool_io;
pub mod spool_queue;
pub mod task_queue;
pub mod task_request;
pub mod task_switches;

pub use spool_io::{current_unix_timestamp_ms, write_json_atomic, write_text_atomic};
pub use spool_queue::{SpoolTaskQueue, SpoolTaskRecord};
pub use task_queue::{InMemoryTaskQueue, TaskQueue, TaskReceipt};
pub use task_request::{TaskField, TaskName, TaskRequest, TaskTarget};
pub use task_switches::{SwitchableTaskQueue, TaskSwitches};
