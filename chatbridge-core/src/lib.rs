//! Core types and traits for chatbridge
//!
//! This crate provides the session model, conversation store, configuration
//! and logging shared by all other chatbridge components.

pub mod bus;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod session;
pub mod utils;

pub use error::{Error, Result};
