//! Message envelopes exchanged between bridge sessions and the router

pub mod events;

pub use events::{InboundMessage, OutboundMessage};
