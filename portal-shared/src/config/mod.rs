//! # Configuration
//!
//! Client configuration: where the backend lives, how to log, where the
//! session cookies are kept and how long transient messages stay visible.

pub mod client;

pub use client::{ClientConfig, ConfigError, LogFormat, MessageTimings};
