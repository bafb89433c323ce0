//! Messaging network transports for chatbridge
//!
//! A transport is one live connection for one bot session. It reports
//! lifecycle changes and inbound messages, and delivers replies.

pub mod base;
pub mod whatsapp;

pub use base::{
    AllowList, ChannelError, EventSender, Result, SessionEvent, SessionTransport, TransportFactory,
};
pub use whatsapp::{WhatsAppTransport, WhatsAppTransportFactory};
