//! Command executors that run diagnostics on the host.

mod approval;
mod shell;

pub use approval::{ApprovalGate, CommandApproval};
pub use shell::ShellExecutor;
