//! In-process stand-in for the portal backend.
//!
//! Serves the same routes, status codes and messages as the real service
//! on an ephemeral port, keeps sessions in memory keyed by a `session_id`
//! cookie, and exposes a few switches for failure paths.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use cookie::{Cookie, SameSite};
use serde::Deserialize;
use serde_json::json;
use shared::{
    config::ClientConfig,
    models::{Activity, Roster},
};
use tokio::{net::TcpListener, task::JoinHandle};
use uuid::Uuid;

/// Credentials the stand-in accepts.
pub const TEACHER: (&str, &str) = ("ms_smith", "pw123");

const SESSION_COOKIE: &str = "session_id";

#[derive(Debug, Default)]
struct PortalState {
    roster: Roster,
    sessions: HashMap<String, String>,
    roster_down: bool,
    bare_session_replies: bool,
    requests: Vec<String>,
}

type Shared = Arc<Mutex<PortalState>>;

/// A running stand-in backend. Aborted on drop.
pub struct TestPortal {
    addr: SocketAddr,
    state: Shared,
    task: JoinHandle<()>,
}

impl TestPortal {
    /// Starts a portal seeded with the usual school activities.
    pub async fn spawn() -> Self {
        Self::with_roster(seed_roster()).await
    }

    /// Starts a portal serving `roster`.
    pub async fn with_roster(roster: Roster) -> Self {
        let state: Shared = Arc::new(Mutex::new(PortalState {
            roster,
            ..PortalState::default()
        }));

        let app = Router::new()
            .route("/auth/status", get(auth_status))
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/activities", get(activities))
            .route("/activities/{name}/signup", post(signup))
            .route("/activities/{name}/unregister", delete(unregister))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("listener address");
        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("stand-in portal");
        });

        Self { addr, state, task }
    }

    /// Base URL of the portal.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client configuration pointing at this portal.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::load_config(None, Some(&self.base_url())).expect("valid portal URL")
    }

    /// Current participants of `activity` as the backend sees them.
    pub fn participants(&self, activity: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .roster
            .get(activity)
            .map(|a| a.participants.clone())
            .unwrap_or_default()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.state.lock().unwrap().sessions.len()
    }

    /// Forgets every session, as after a backend restart.
    pub fn revoke_sessions(&self) {
        self.state.lock().unwrap().sessions.clear();
    }

    /// Makes `GET /activities` fail with a 500.
    pub fn set_roster_down(&self, down: bool) {
        self.state.lock().unwrap().roster_down = down;
    }

    /// Makes login answer 200 with no body and logout answer 204.
    pub fn set_bare_session_replies(&self, bare: bool) {
        self.state.lock().unwrap().bare_session_replies = bare;
    }

    /// Requests received so far, as `METHOD path`.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// How many received requests start with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }
}

impl Drop for TestPortal {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The school's activities in the order the real backend serves them.
pub fn seed_roster() -> Roster {
    Roster::from_activities([
        activity(
            "Chess Club",
            "Learn strategies and compete in chess tournaments",
            "Fridays, 3:30 PM - 5:00 PM",
            12,
            &["michael@mergington.edu", "daniel@mergington.edu"],
        ),
        activity(
            "Programming Class",
            "Learn programming fundamentals and build software projects",
            "Tuesdays and Thursdays, 3:30 PM - 4:30 PM",
            20,
            &["emma@mergington.edu", "sophia@mergington.edu"],
        ),
        activity(
            "Gym Class",
            "Physical education and sports activities",
            "Mondays, Wednesdays, Fridays, 2:00 PM - 3:00 PM",
            30,
            &["john@mergington.edu", "olivia@mergington.edu"],
        ),
    ])
}

/// Builds one activity.
pub fn activity(
    name: &str,
    description: &str,
    schedule: &str,
    max_participants: u32,
    participants: &[&str],
) -> Activity {
    Activity {
        name: name.to_string(),
        description: description.to_string(),
        schedule: schedule.to_string(),
        max_participants,
        participants: participants.iter().map(ToString::to_string).collect(),
    }
}

fn detail(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "detail": text }))).into_response()
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
}

fn current_teacher(state: &PortalState, headers: &HeaderMap) -> Option<String> {
    session_id(headers).and_then(|id| state.sessions.get(&id).cloned())
}

fn record(state: &Shared, line: String) -> std::sync::MutexGuard<'_, PortalState> {
    let mut guard = state.lock().unwrap();
    guard.requests.push(line);
    guard
}

async fn auth_status(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = record(&state, "GET /auth/status".into());
    let username = current_teacher(&state, &headers);
    Json(json!({
        "authenticated": username.is_some(),
        "username": username,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct LoginQuery {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Query(query): Query<LoginQuery>) -> Response {
    let mut state = record(&state, "POST /login".into());
    if (query.username.as_str(), query.password.as_str()) != TEACHER {
        return detail(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }

    let id = Uuid::new_v4().to_string();
    state.sessions.insert(id.clone(), query.username);
    let cookie = Cookie::build((SESSION_COOKIE, id))
        .http_only(true)
        .path("/")
        .same_site(SameSite::Lax)
        .build();

    let mut response = if state.bare_session_replies {
        StatusCode::OK.into_response()
    } else {
        Json(json!({ "message": "Login successful", "authenticated": true })).into_response()
    };
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string()).expect("cookie header"),
    );
    response
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = record(&state, "POST /logout".into());
    if let Some(id) = session_id(&headers) {
        state.sessions.remove(&id);
    }

    let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    removal.make_removal();
    let mut response = if state.bare_session_replies {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(json!({ "message": "Logged out successfully", "authenticated": false }))
            .into_response()
    };
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&removal.to_string()).expect("cookie header"),
    );
    response
}

async fn activities(State(state): State<Shared>) -> Response {
    let state = record(&state, "GET /activities".into());
    if state.roster_down {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
    }
    Json(&state.roster).into_response()
}

#[derive(Deserialize)]
struct EmailQuery {
    email: String,
}

async fn signup(
    State(state): State<Shared>,
    Path(name): Path<String>,
    Query(query): Query<EmailQuery>,
    headers: HeaderMap,
) -> Response {
    let mut state = record(&state, format!("POST /activities/{name}/signup"));
    if current_teacher(&state, &headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Teacher authentication required");
    }
    let Some(activity) = state.roster.get_mut(&name) else {
        return detail(StatusCode::NOT_FOUND, "Activity not found");
    };
    if activity.has_participant(&query.email) {
        return detail(StatusCode::BAD_REQUEST, "Student is already signed up");
    }
    if activity.spots_left() <= 0 {
        return detail(StatusCode::BAD_REQUEST, "Activity is full");
    }
    activity.participants.push(query.email.clone());
    Json(json!({ "message": format!("Signed up {} for {name}", query.email) })).into_response()
}

async fn unregister(
    State(state): State<Shared>,
    Path(name): Path<String>,
    Query(query): Query<EmailQuery>,
    headers: HeaderMap,
) -> Response {
    let mut state = record(&state, format!("DELETE /activities/{name}/unregister"));
    if current_teacher(&state, &headers).is_none() {
        return detail(StatusCode::UNAUTHORIZED, "Teacher authentication required");
    }
    let Some(activity) = state.roster.get_mut(&name) else {
        return detail(StatusCode::NOT_FOUND, "Activity not found");
    };
    if !activity.has_participant(&query.email) {
        return detail(
            StatusCode::BAD_REQUEST,
            "Student is not signed up for this activity",
        );
    }
    activity.participants.retain(|p| p != &query.email);
    Json(json!({ "message": format!("Unregistered {} from {name}", query.email) }))
        .into_response()
}
