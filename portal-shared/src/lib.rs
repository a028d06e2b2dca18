#![cfg_attr(not(test), forbid(unsafe_code))]

//! Models and configuration shared by the signup portal client crates.

pub mod config;
pub mod models;
