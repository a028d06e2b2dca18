//! REST client for the portal backend.
//!
//! [`Backend`] is the seam the controller talks to; [`HttpBackend`] is the
//! `reqwest` implementation that carries the `session_id` cookie between
//! calls through a shared cookie jar.

use std::{error::Error as StdError, sync::Arc};

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, cookie::Jar};
use serde::de::DeserializeOwned;
use shared::{
    config::ClientConfig,
    models::{AuthStatus, ErrorDetail, MessageResponse, Roster, SessionResponse},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Failure of a single backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// The backend answered 401.
    #[error("authentication required")]
    Unauthorized {
        /// Backend-supplied reason, if any.
        detail: Option<String>,
    },

    /// Any other non-2xx answer.
    #[error("request rejected with {status}: {detail}")]
    Rejected {
        /// HTTP status of the response.
        status: StatusCode,
        /// Parsed error body.
        detail: ErrorDetail,
    },

    /// A 2xx answer whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The endpoint URL could not be built from the configured base URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Wraps any transport-level error.
    pub fn transport(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Transport(err.into())
    }

    /// Backend-supplied detail text suitable for showing to the user.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { detail } => detail.as_deref(),
            Self::Rejected { detail, .. } => detail.message(),
            _ => None,
        }
    }

    /// Returns `true` for a 401 answer.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(Box::new(err))
    }
}

/// Operations the portal backend exposes to the client.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// `GET /auth/status`
    async fn auth_status(&self) -> Result<AuthStatus, ApiError>;

    /// `POST /login?username=&password=`
    async fn login(&self, username: &str, password: &str) -> Result<SessionResponse, ApiError>;

    /// `POST /logout`
    async fn logout(&self) -> Result<SessionResponse, ApiError>;

    /// `GET /activities`
    async fn activities(&self) -> Result<Roster, ApiError>;

    /// `POST /activities/{name}/signup?email=`
    async fn signup(&self, activity: &str, email: &str) -> Result<MessageResponse, ApiError>;

    /// `DELETE /activities/{name}/unregister?email=`
    async fn unregister(&self, activity: &str, email: &str) -> Result<MessageResponse, ApiError>;
}

/// [`Backend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
    jar: Arc<Jar>,
}

impl HttpBackend {
    /// Creates a client with an empty cookie jar.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_jar(config, Arc::new(Jar::default()))
    }

    /// Creates a client that reads and writes cookies through `jar`.
    ///
    /// # Errors
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be built.
    pub fn with_jar(config: &ClientConfig, jar: Arc<Jar>) -> Result<Self, ApiError> {
        let mut builder = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: config.base_url.clone(),
            client: builder.build()?,
            jar,
        })
    }

    /// The backend root every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The cookie jar holding the session cookie.
    #[must_use]
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Builds `base/seg1/seg2/...`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn auth_status(&self) -> Result<AuthStatus, ApiError> {
        let url = self.endpoint(&["auth", "status"])?;
        debug!(%url, "querying session status");
        decode(self.client.get(url).send().await?).await
    }

    async fn login(&self, username: &str, password: &str) -> Result<SessionResponse, ApiError> {
        let url = self.endpoint(&["login"])?;
        debug!(%url, username, "submitting login");
        let response = self
            .client
            .post(url)
            .query(&[("username", username), ("password", password)])
            .send()
            .await?;
        decode_session(response, true).await
    }

    async fn logout(&self) -> Result<SessionResponse, ApiError> {
        let url = self.endpoint(&["logout"])?;
        debug!(%url, "ending session");
        decode_session(self.client.post(url).send().await?, false).await
    }

    async fn activities(&self) -> Result<Roster, ApiError> {
        let url = self.endpoint(&["activities"])?;
        debug!(%url, "fetching roster");
        decode(self.client.get(url).send().await?).await
    }

    async fn signup(&self, activity: &str, email: &str) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&["activities", activity, "signup"])?;
        debug!(%url, email, "signing up student");
        let response = self
            .client
            .post(url)
            .query(&[("email", email)])
            .send()
            .await?;
        decode(response).await
    }

    async fn unregister(&self, activity: &str, email: &str) -> Result<MessageResponse, ApiError> {
        let url = self.endpoint(&["activities", activity, "unregister"])?;
        debug!(%url, email, "unregistering student");
        let response = self
            .client
            .delete(url)
            .query(&[("email", email)])
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejection(status, response).await);
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| ApiError::Decode(err.to_string()))
}

/// Login and logout succeed on any 2xx. The body is read when it parses;
/// an empty or non-JSON body yields `authenticated` as implied by the call.
async fn decode_session(
    response: Response,
    authenticated: bool,
) -> Result<SessionResponse, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(rejection(status, response).await);
    }
    let body = response.text().await.unwrap_or_default();
    Ok(serde_json::from_str(&body).unwrap_or_else(|err| {
        debug!(%status, error = %err, "session response without JSON body");
        SessionResponse {
            message: String::new(),
            authenticated,
        }
    }))
}

async fn rejection(status: StatusCode, response: Response) -> ApiError {
    let body = response.text().await.unwrap_or_default();
    let detail = ErrorDetail::from_body(&body);
    if status == StatusCode::UNAUTHORIZED {
        ApiError::Unauthorized {
            detail: detail.message().map(str::to_owned),
        }
    } else {
        ApiError::Rejected { status, detail }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base: &str) -> HttpBackend {
        let config = ClientConfig::load_config(None, Some(base)).expect("test base URL is valid");
        HttpBackend::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_percent_encodes_segments() {
        let backend = backend("http://localhost:8000");
        let url = backend
            .endpoint(&["activities", "Chess Club", "signup"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/activities/Chess%20Club/signup"
        );
    }

    #[test]
    fn test_endpoint_escapes_slashes_in_names() {
        let backend = backend("http://localhost:8000");
        let url = backend
            .endpoint(&["activities", "Arts/Crafts", "unregister"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/activities/Arts%2FCrafts/unregister"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let backend = backend("https://school.example.edu/portal");
        let url = backend.endpoint(&["auth", "status"]).unwrap();
        assert_eq!(url.as_str(), "https://school.example.edu/portal/auth/status");
    }

    #[test]
    fn test_detail_accessors() {
        let unauthorized = ApiError::Unauthorized {
            detail: Some("Teacher authentication required".into()),
        };
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.detail(), Some("Teacher authentication required"));

        let rejected = ApiError::Rejected {
            status: StatusCode::BAD_REQUEST,
            detail: ErrorDetail::new("Activity full"),
        };
        assert!(!rejected.is_unauthorized());
        assert_eq!(rejected.detail(), Some("Activity full"));

        let transport = ApiError::transport("connection refused");
        assert_eq!(transport.detail(), None);
        assert_eq!(transport.to_string(), "request failed: connection refused");
    }
}
