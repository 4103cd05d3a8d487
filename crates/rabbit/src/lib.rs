//! An out-of-the-box troubleshooting agent that runs diagnostics on the
//! local machine.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the agent into your own host apps.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod context;
pub mod executor;
mod session;

pub use context::SystemContext;
pub use session::{Session, SessionBuilder};

/// Re-exports of [`rabbit_core`] crate.
pub mod core {
    pub use rabbit_core::*;
}
