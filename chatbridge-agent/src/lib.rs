//! Message handling for chatbridge
//!
//! This crate classifies inbound text and produces the reply, either from a
//! built-in command or from a conversational turn with history.

pub mod context;
pub mod router;

pub use router::{Command, CommandRouter, Input};
