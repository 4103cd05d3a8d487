//! Core logic of the troubleshooting agent: the reasoning loop, decision
//! parsing, history keeping and the collaborator contracts.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod context;
pub mod deadline;
pub mod decision;
mod event;
pub mod executor;
mod fallback;
pub mod history;
mod model_client;
mod prompt;

pub use agent::{Agent, AgentBuilder, AgentSettings};
pub use context::{ContextProvider, OsInfo, ShellInfo, StaticContext};
pub use decision::{Action, Decision, DecisionErrorKind, DecisionParseError};
pub use event::AgentEvent;
pub use executor::{CommandExecutor, CommandOutcome, DisabledExecutor};
pub use fallback::{SUMMARY_LEAD_IN, fallback_message};
