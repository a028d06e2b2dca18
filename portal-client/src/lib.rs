#![cfg_attr(not(test), forbid(unsafe_code))]

//! Client-side state for the activity signup portal.
//!
//! [`controller::Controller`] owns the teacher session and the activity
//! roster, reacts to UI events and network completions on a single task,
//! and publishes a renderable [`view::PageView`] after every change.

pub mod api;
pub mod controller;
pub mod notice;
pub mod session;
pub mod view;

pub use api::{ApiError, Backend, HttpBackend};
pub use controller::{
    ActionKind, ActionOutcome, Controller, ControllerClosed, ControllerHandle, LoginOutcome,
    LogoutOutcome, UiEvent,
};
pub use notice::{MessageKind, TransientMessage};
pub use session::SessionState;
pub use view::PageView;
