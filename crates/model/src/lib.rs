//! An abstraction layer for the language models the agent talks to.
//!
//! The agent only needs a "send a prompt, receive text" contract, but
//! providers stream their answers, so the response is modelled as a
//! stream of events that the caller polls until completion.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
