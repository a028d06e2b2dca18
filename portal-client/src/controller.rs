//! Session and roster controller.
//!
//! A single task owns the [`SessionState`], the last fetched [`Roster`] and
//! the [`PageView`]. UI events, network completions and message expiries
//! all arrive on one FIFO channel and are handled one at a time. Network
//! calls run on their own tasks and report back as completion events, so
//! a second click can overlap an in-flight request; the roster render is
//! replaced wholesale each time, so the last completion wins.

use std::{future::Future, sync::Arc};

use shared::{
    config::MessageTimings,
    models::{AuthStatus, MessageResponse, Roster, SessionResponse},
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::{
    api::{ApiError, Backend},
    notice::{MessageSlot, TransientMessage},
    session::SessionState,
    view::PageView,
};

/// Shown when a logged-out user tries to change registrations.
pub const LOGIN_REQUIRED_TEXT: &str = "Please log in as a teacher to manage registrations.";
/// Shown when a mutating call comes back 401.
pub const AUTH_REQUIRED_TEXT: &str = "Authentication required. Please log in again.";
/// Fallback for failures without a backend detail.
pub const GENERIC_FAILURE_TEXT: &str = "An error occurred. Please try again.";
/// Fallback for login failures without a backend detail.
pub const LOGIN_FAILED_TEXT: &str = "Login failed. Please try again.";
/// Shown after a confirmed logout.
pub const LOGGED_OUT_TEXT: &str = "You have been logged out.";
/// Shown when the activity or email is blank.
pub const MISSING_FIELDS_TEXT: &str = "Please choose an activity and enter a student email.";

/// Roster mutations a teacher can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Register a student.
    Signup,
    /// Remove a student.
    Unregister,
}

impl ActionKind {
    fn verb(self) -> &'static str {
        match self {
            Self::Signup => "signup",
            Self::Unregister => "unregister",
        }
    }
}

/// Result of a signup or unregister request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Backend confirmation text.
    Succeeded(String),
    /// Refused locally; nobody is logged in.
    NotLoggedIn,
    /// Refused locally; activity or email was blank.
    Invalid,
    /// Backend answered 401 and the session was dropped.
    Unauthorized,
    /// Any other failure, with the text shown to the user.
    Failed(String),
}

/// Result of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Now logged in as this user.
    LoggedIn(String),
    /// Refused locally; this user is already logged in.
    AlreadyLoggedIn(String),
    /// Backend refused, with the inline error text.
    Rejected(String),
}

/// Result of a logout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// Session ended.
    LoggedOut,
    /// Nothing to do; nobody is logged in.
    NotLoggedIn,
    /// Backend call failed; the session is unchanged.
    Failed,
}

/// Input events, the native counterpart of page load, clicks and submits.
#[derive(Debug)]
pub enum UiEvent {
    /// Page load: query the session, then fetch the roster.
    Startup,
    /// User icon click: opens the login dialog or logs out.
    UserIconClicked,
    /// Closes the login dialog and clears its inline error.
    CloseLoginDialog,
    /// Login form submit.
    SubmitLogin {
        /// Entered user name.
        username: String,
        /// Entered password.
        password: String,
        /// Receives the outcome once known.
        reply: Option<oneshot::Sender<LoginOutcome>>,
    },
    /// Logout request.
    Logout {
        /// Receives the outcome once known.
        reply: Option<oneshot::Sender<LogoutOutcome>>,
    },
    /// Signup form submit or removal-control click.
    Action {
        /// Which mutation.
        kind: ActionKind,
        /// Activity name.
        activity: String,
        /// Student email.
        email: String,
        /// Receives the outcome once known.
        reply: Option<oneshot::Sender<ActionOutcome>>,
    },
    /// Re-fetch the roster.
    Refresh,
}

#[derive(Debug)]
enum Event {
    Ui(UiEvent),
    StatusLoaded(Result<AuthStatus, ApiError>),
    LoginFinished {
        username: String,
        result: Result<SessionResponse, ApiError>,
        reply: Option<oneshot::Sender<LoginOutcome>>,
    },
    LogoutFinished {
        result: Result<SessionResponse, ApiError>,
        reply: Option<oneshot::Sender<LogoutOutcome>>,
    },
    RosterLoaded(Result<Roster, ApiError>),
    ActionFinished {
        kind: ActionKind,
        result: Result<MessageResponse, ApiError>,
        reply: Option<oneshot::Sender<ActionOutcome>>,
    },
    MessageExpired(u64),
}

/// The controller task has stopped.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("controller is no longer running")]
pub struct ControllerClosed;

/// Owner of session, roster and view state.
pub struct Controller {
    backend: Arc<dyn Backend>,
    timings: MessageTimings,
    session: SessionState,
    roster: Option<Roster>,
    view: PageView,
    messages: MessageSlot,
    events: mpsc::UnboundedReceiver<Event>,
    loopback: mpsc::WeakUnboundedSender<Event>,
    published: watch::Sender<PageView>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("session", &self.session)
            .field("timings", &self.timings)
            .field("roster_loaded", &self.roster.is_some())
            .field("message", &self.messages.current())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Starts the controller on the current tokio runtime and queues the
    /// startup event.
    ///
    /// The task runs until every [`ControllerHandle`] is dropped and no
    /// network call is outstanding.
    pub fn spawn(backend: Arc<dyn Backend>, timings: MessageTimings) -> ControllerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (published, view) = watch::channel(PageView::default());

        let controller = Self {
            backend,
            timings,
            session: SessionState::LoggedOut,
            roster: None,
            view: PageView::default(),
            messages: MessageSlot::default(),
            events: rx,
            loopback: tx.downgrade(),
            published,
        };
        tokio::spawn(controller.run());

        let handle = ControllerHandle { events: tx, view };
        let _ = handle.send(UiEvent::Startup);
        handle
    }

    async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle(event);
        }
        debug!("controller stopped");
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::Ui(ui) => self.handle_ui(ui),
            Event::StatusLoaded(result) => self.on_status(result),
            Event::LoginFinished {
                username,
                result,
                reply,
            } => self.on_login(username, result, reply),
            Event::LogoutFinished { result, reply } => self.on_logout(result, reply),
            Event::RosterLoaded(result) => self.on_roster(result),
            Event::ActionFinished {
                kind,
                result,
                reply,
            } => self.on_action(kind, result, reply),
            Event::MessageExpired(generation) => {
                if self.messages.dismiss(generation) {
                    self.publish();
                }
            }
        }
    }

    fn handle_ui(&mut self, event: UiEvent) {
        match event {
            UiEvent::Startup => {
                let backend = Arc::clone(&self.backend);
                self.spawn_call(async move { Event::StatusLoaded(backend.auth_status().await) });
            }
            UiEvent::UserIconClicked => {
                if self.session.authenticated() {
                    self.request_logout(None);
                } else {
                    self.view.login_dialog.open = true;
                    self.publish();
                }
            }
            UiEvent::CloseLoginDialog => {
                self.view.login_dialog.open = false;
                self.view.login_dialog.error = None;
                self.publish();
            }
            UiEvent::SubmitLogin {
                username,
                password,
                reply,
            } => self.submit_login(username, password, reply),
            UiEvent::Logout { reply } => self.request_logout(reply),
            UiEvent::Action {
                kind,
                activity,
                email,
                reply,
            } => self.perform_action(kind, &activity, &email, reply),
            UiEvent::Refresh => self.refresh_roster(),
        }
    }

    fn on_status(&mut self, result: Result<AuthStatus, ApiError>) {
        let status = match result {
            Ok(status) => Some(status),
            Err(err) => {
                error!(error = %err, "failed to query session status, assuming logged out");
                None
            }
        };
        self.session = SessionState::from_status(status.as_ref());
        info!(authenticated = self.session.authenticated(), "session resolved");
        self.apply_session();
        self.refresh_roster();
    }

    fn submit_login(
        &mut self,
        username: String,
        password: String,
        reply: Option<oneshot::Sender<LoginOutcome>>,
    ) {
        if let Some(current) = self.session.current_user() {
            let current = current.to_owned();
            self.show(
                TransientMessage::info(format!("Already logged in as {current}.")),
                self.timings.auth_confirmation(),
            );
            respond(reply, LoginOutcome::AlreadyLoggedIn(current));
            return;
        }

        let username = username.trim().to_owned();
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            let result = backend.login(&username, &password).await;
            Event::LoginFinished {
                username,
                result,
                reply,
            }
        });
    }

    fn on_login(
        &mut self,
        username: String,
        result: Result<SessionResponse, ApiError>,
        reply: Option<oneshot::Sender<LoginOutcome>>,
    ) {
        match result {
            Ok(_) => {
                self.session.login_succeeded(username.clone());
                self.apply_session();
                self.show(
                    TransientMessage::success(format!("Welcome, {username}!")),
                    self.timings.auth_confirmation(),
                );
                self.refresh_roster();
                respond(reply, LoginOutcome::LoggedIn(username));
            }
            Err(err) => {
                warn!(%username, error = %err, "login rejected");
                let text = err.detail().unwrap_or(LOGIN_FAILED_TEXT).to_owned();
                self.view.login_dialog.open = true;
                self.view.login_dialog.error = Some(text.clone());
                self.publish();
                respond(reply, LoginOutcome::Rejected(text));
            }
        }
    }

    fn request_logout(&mut self, reply: Option<oneshot::Sender<LogoutOutcome>>) {
        if !self.session.authenticated() {
            respond(reply, LogoutOutcome::NotLoggedIn);
            return;
        }
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            Event::LogoutFinished {
                result: backend.logout().await,
                reply,
            }
        });
    }

    fn on_logout(
        &mut self,
        result: Result<SessionResponse, ApiError>,
        reply: Option<oneshot::Sender<LogoutOutcome>>,
    ) {
        match result {
            Ok(_) => {
                self.session.logout_confirmed();
                self.apply_session();
                self.show(
                    TransientMessage::info(LOGGED_OUT_TEXT),
                    self.timings.auth_confirmation(),
                );
                self.refresh_roster();
                respond(reply, LogoutOutcome::LoggedOut);
            }
            Err(err) => {
                warn!(error = %err, "logout failed");
                respond(reply, LogoutOutcome::Failed);
            }
        }
    }

    /// Issues a roster fetch. Failures end in the static failure text and
    /// never reach the caller.
    fn refresh_roster(&mut self) {
        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move { Event::RosterLoaded(backend.activities().await) });
    }

    fn on_roster(&mut self, result: Result<Roster, ApiError>) {
        match result {
            Ok(roster) => {
                debug!(activities = roster.len(), "roster loaded");
                self.view.show_roster(&roster);
                self.roster = Some(roster);
            }
            Err(err) => {
                error!(error = %err, "failed to fetch activities");
                self.view.show_roster_failure();
                self.roster = None;
            }
        }
        self.view.roster_revision += 1;
        self.publish();
    }

    fn perform_action(
        &mut self,
        kind: ActionKind,
        activity: &str,
        email: &str,
        reply: Option<oneshot::Sender<ActionOutcome>>,
    ) {
        if !self.session.authenticated() {
            self.show(
                TransientMessage::error(LOGIN_REQUIRED_TEXT),
                self.timings.action_result(),
            );
            respond(reply, ActionOutcome::NotLoggedIn);
            return;
        }

        let activity = activity.trim().to_owned();
        let email = email.trim().to_owned();
        if kind == ActionKind::Signup {
            self.view.signup_form.activity.clone_from(&activity);
            self.view.signup_form.email.clone_from(&email);
        }
        if activity.is_empty() || email.is_empty() {
            self.show(
                TransientMessage::error(MISSING_FIELDS_TEXT),
                self.timings.action_result(),
            );
            respond(reply, ActionOutcome::Invalid);
            return;
        }

        let backend = Arc::clone(&self.backend);
        self.spawn_call(async move {
            let result = match kind {
                ActionKind::Signup => backend.signup(&activity, &email).await,
                ActionKind::Unregister => backend.unregister(&activity, &email).await,
            };
            Event::ActionFinished {
                kind,
                result,
                reply,
            }
        });
    }

    fn on_action(
        &mut self,
        kind: ActionKind,
        result: Result<MessageResponse, ApiError>,
        reply: Option<oneshot::Sender<ActionOutcome>>,
    ) {
        let outcome = match result {
            Ok(response) => {
                if kind == ActionKind::Signup {
                    self.view.signup_form.clear_inputs();
                }
                self.show(
                    TransientMessage::success(response.message.clone()),
                    self.timings.action_result(),
                );
                self.refresh_roster();
                ActionOutcome::Succeeded(response.message)
            }
            Err(err) if err.is_unauthorized() => {
                warn!(action = kind.verb(), "backend rejected session");
                self.session.unauthorized();
                self.apply_session();
                self.show(
                    TransientMessage::error(AUTH_REQUIRED_TEXT),
                    self.timings.action_result(),
                );
                ActionOutcome::Unauthorized
            }
            Err(err) => {
                error!(action = kind.verb(), error = %err, "roster change failed");
                let text = err.detail().unwrap_or(GENERIC_FAILURE_TEXT).to_owned();
                self.show(TransientMessage::error(text.clone()), self.timings.action_result());
                ActionOutcome::Failed(text)
            }
        };
        respond(reply, outcome);
    }

    /// Re-renders auth-dependent parts, including the last roster, and
    /// publishes.
    fn apply_session(&mut self) {
        self.view.apply_session(&self.session);
        if let Some(roster) = &self.roster {
            self.view.show_roster(roster);
        }
        self.publish();
    }

    fn show(&mut self, message: TransientMessage, ttl: std::time::Duration) {
        let loopback = self.loopback.clone();
        self.messages.show(message, ttl, move |generation| {
            if let Some(tx) = loopback.upgrade() {
                let _ = tx.send(Event::MessageExpired(generation));
            }
        });
        self.publish();
    }

    fn publish(&mut self) {
        self.view.message = self.messages.current().cloned();
        self.published.send_replace(self.view.clone());
    }

    fn spawn_call<F>(&self, call: F)
    where
        F: Future<Output = Event> + Send + 'static,
    {
        let Some(tx) = self.loopback.upgrade() else {
            debug!("controller shutting down, dropping request");
            return;
        };
        tokio::spawn(async move {
            let _ = tx.send(call.await);
        });
    }
}

fn respond<T>(reply: Option<oneshot::Sender<T>>, outcome: T) {
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }
}

/// Cloneable front door to a running [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<Event>,
    view: watch::Receiver<PageView>,
}

impl ControllerHandle {
    /// Queues a UI event.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub fn send(&self, event: UiEvent) -> Result<(), ControllerClosed> {
        self.events
            .send(Event::Ui(event))
            .map_err(|_| ControllerClosed)
    }

    /// Submits the login form and waits for the outcome.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<LoginOutcome, ControllerClosed> {
        let (reply, outcome) = oneshot::channel();
        self.send(UiEvent::SubmitLogin {
            username: username.into(),
            password: password.into(),
            reply: Some(reply),
        })?;
        outcome.await.map_err(|_| ControllerClosed)
    }

    /// Requests a logout and waits for the outcome.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub async fn logout(&self) -> Result<LogoutOutcome, ControllerClosed> {
        let (reply, outcome) = oneshot::channel();
        self.send(UiEvent::Logout { reply: Some(reply) })?;
        outcome.await.map_err(|_| ControllerClosed)
    }

    /// Performs a signup or unregister and waits for the outcome.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub async fn perform_action(
        &self,
        kind: ActionKind,
        activity: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<ActionOutcome, ControllerClosed> {
        let (reply, outcome) = oneshot::channel();
        self.send(UiEvent::Action {
            kind,
            activity: activity.into(),
            email: email.into(),
            reply: Some(reply),
        })?;
        outcome.await.map_err(|_| ControllerClosed)
    }

    /// Registers `email` for `activity`.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub async fn signup(
        &self,
        activity: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<ActionOutcome, ControllerClosed> {
        self.perform_action(ActionKind::Signup, activity, email).await
    }

    /// Removes `email` from `activity`.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub async fn unregister(
        &self,
        activity: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<ActionOutcome, ControllerClosed> {
        self.perform_action(ActionKind::Unregister, activity, email).await
    }

    /// Queues a roster re-fetch.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller task has stopped.
    pub fn refresh(&self) -> Result<(), ControllerClosed> {
        self.send(UiEvent::Refresh)
    }

    /// The latest published view.
    #[must_use]
    pub fn view(&self) -> PageView {
        self.view.borrow().clone()
    }

    /// A receiver notified on every published view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PageView> {
        self.view.clone()
    }

    /// Waits until a published view satisfies `predicate` and returns it.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller stops first.
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&PageView) -> bool,
    ) -> Result<PageView, ControllerClosed> {
        let mut view = self.view.clone();
        let matched = view.wait_for(predicate).await.map_err(|_| ControllerClosed)?;
        Ok(matched.clone())
    }

    /// Waits for the roster area to be replaced after `revision`.
    ///
    /// # Errors
    /// Returns [`ControllerClosed`] if the controller stops first.
    pub async fn wait_for_roster_after(&self, revision: u64) -> Result<PageView, ControllerClosed> {
        self.wait_for(|view| view.roster_revision > revision).await
    }
}
