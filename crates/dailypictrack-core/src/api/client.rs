//! API client for communicating with the DailyPicTrack REST API.
//!
//! All traffic funnels through [`ApiClient::execute`], which applies the
//! two interception rules every request shares:
//!
//! - outgoing: the stored token, read at dispatch time, is attached as
//!   `Authorization: Bearer <token>`; without a token the request goes out
//!   unauthenticated
//! - incoming: a 401 evicts the token and publishes
//!   [`SessionEvent::Invalidated`] before the error reaches the caller
//!
//! Everything else passes through untouched.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::error::{ApiError, Result};
use super::events::{SessionEvent, SessionEvents};
use crate::auth::TokenStore;
use crate::models::{Image, ImagesResponse};
use crate::navigation::Route;
use crate::upload::UploadRequest;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the hosted API
pub const DEFAULT_BASE_URL: &str = "https://secrete-96mz.onrender.com/api/v1";

/// HTTP request timeout in seconds
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Uploads get longer: images go up over slow mobile links.
pub const UPLOAD_TIMEOUT_SECS: u64 = 60;

/// Path of the credential exchange; a 401 here means bad credentials,
/// not a stale session.
pub const LOGIN_PATH: &str = "/auth/login";

const USER_AGENT: &str = concat!("dailypictrack/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Fixed settings shared by every request
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub upload_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            upload_timeout: Duration::from_secs(UPLOAD_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// API client for DailyPicTrack.
/// Clone is cheap - the connection pool, token store and event channel are
/// all shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    upload_timeout: Duration,
    store: Arc<dyn TokenStore>,
    events: SessionEvents,
}

impl ApiClient {
    /// Create a client for the hosted API
    pub fn new(store: Arc<dyn TokenStore>) -> Result<Self> {
        Self::with_config(ClientConfig::default(), store)
    }

    pub fn with_config(config: ClientConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(ApiError::from_transport)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_timeout: config.upload_timeout,
            store,
            events: SessionEvents::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Receive session events raised by any clone of this client
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Outgoing interception: attach the current token, if any.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.store.get() {
            Ok(Some(token)) => builder.bearer_auth(token),
            Ok(None) => builder,
            Err(e) => {
                warn!(error = %e, "Failed to read session token, sending unauthenticated");
                builder
            }
        }
    }

    /// Incoming interception: pass successes through, turn failures into
    /// `ApiError`, and tear the session down on 401.
    async fn intercept(&self, path: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session(path);
        }
        Err(ApiError::from_status(status, &body))
    }

    fn invalidate_session(&self, path: &str) {
        warn!(path, "Server rejected session, signing out");
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove session token");
        }
        self.events.publish(SessionEvent::Invalidated {
            path: path.to_string(),
            redirect_to: Route::Login,
        });
    }

    /// Send a request through both interceptors.
    async fn execute(&self, path: &str, builder: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        debug!(path, status = %response.status(), "Response received");
        self.intercept(path, response).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    async fn parse<T: DeserializeOwned>(path: &str, response: Response) -> Result<T> {
        let text = response.text().await.map_err(ApiError::from_transport)?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(path, self.request(Method::GET, path)).await?;
        Self::parse(path, response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response> {
        self.execute(path, self.request(Method::POST, path).json(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.execute(path, self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Exchange credentials for a session token.
    /// The token is returned, not stored; see `SessionInspector::login`.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let response = self
            .post(LOGIN_PATH, &LoginRequest { email, password })
            .await?;
        let parsed: LoginResponse = Self::parse(LOGIN_PATH, response).await?;
        match parsed.token {
            Some(token) if !token.is_empty() => {
                info!("Login accepted");
                Ok(token)
            }
            _ => Err(ApiError::MissingToken),
        }
    }

    /// Register a new account. A separate login is needed afterwards.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<()> {
        self.post("/auth/signup", &SignupRequest { name, email, password })
            .await?;
        info!("Account created");
        Ok(())
    }

    // ===== Images =====

    /// All images belonging to the signed-in user, newest first as served
    pub async fn my_images(&self) -> Result<Vec<Image>> {
        let response: ImagesResponse = self.get("/images/my-images").await?;
        let images = response.into_images();
        debug!(count = images.len(), "Fetched images");
        Ok(images)
    }

    /// Upload one image. The request is validated first and gets the longer
    /// upload timeout.
    pub async fn upload_image(&self, request: UploadRequest) -> Result<()> {
        request
            .validate()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

        let path = "/images/upload";
        debug!(
            file = %request.file_name,
            bytes = request.bytes.len(),
            tags = request.tags.len(),
            "Uploading image"
        );
        let form = request.into_form()?;
        let builder = self
            .request(Method::POST, path)
            .multipart(form)
            .timeout(self.upload_timeout);
        self.execute(path, builder).await?;
        info!("Image uploaded");
        Ok(())
    }

    pub async fn delete_image(&self, id: &str) -> Result<()> {
        let id = id.trim();
        if !is_path_safe_id(id) {
            return Err(ApiError::InvalidRequest(format!("Invalid image id: {:?}", id)));
        }
        self.delete(&format!("/images/delete/{}", id)).await?;
        info!(id, "Image deleted");
        Ok(())
    }
}

/// Ids are spliced into the URL path, so only unreserved characters pass.
fn is_path_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
