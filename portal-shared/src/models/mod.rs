//! Wire models for the signup portal REST API.

pub mod activity;
pub mod auth;
pub mod errors;

pub use activity::{Activity, Roster};
pub use auth::{AuthStatus, MessageResponse, SessionResponse};
pub use errors::ErrorDetail;
