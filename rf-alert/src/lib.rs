//! 433 MHz alert dispatch engine.
//!
//! Watches a radio receiver for configured alert codes and fans every match
//! out to a local command, media center hosts and email.

pub mod config;
pub mod domain;
pub mod error;
pub mod listener;
pub mod logging;
pub mod notification;
pub mod panic_hook;
pub mod receiver;
pub mod shutdown;
pub mod utils;

pub use error::{Error, Result};
