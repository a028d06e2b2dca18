pub mod completion;
pub mod config;
pub mod roster;
pub mod session;
pub mod shell;
