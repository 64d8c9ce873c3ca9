//! Command handlers. `App` owns the session, the API client and the
//! navigator that reacts to session teardown.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use dailypictrack_core::api::{ApiClient, SessionEvent};
use dailypictrack_core::auth::{SessionInspector, SessionState, TokenStore};
use dailypictrack_core::config::Config;
use dailypictrack_core::dashboard::{daily_uploads, remove_image, tag_distribution, DashboardStats};
use dailypictrack_core::forms::{
    login_failure_message, signup_failure_message, LoginForm, SignupForm,
};
use dailypictrack_core::gallery::{find_detail, Page};
use dailypictrack_core::models::Image;
use dailypictrack_core::navigation::{Navigator, Route};
use dailypictrack_core::upload::{upload_failure_message, UploadRequest, CAPTURE_FILE_NAME};
use dailypictrack_core::utils::{format_date, truncate_string};

/// Images listed under "Recent Images" on the dashboard
const RECENT_IMAGES: usize = 5;

/// Width of the documentation column in the gallery listing
const DOC_COLUMN_WIDTH: usize = 40;

pub struct App {
    pub config: Config,
    pub client: ApiClient,
    session: SessionInspector,
    navigator: Navigator,
    events: broadcast::Receiver<SessionEvent>,
}

impl App {
    pub fn new(api_url: Option<String>) -> Result<Self> {
        let mut config = Config::load()?;
        if api_url.is_some() {
            config.api_base_url = api_url;
        }

        let store = config.token_store()?;
        Self::with_store(config, store)
    }

    /// Build around an opened token store. Nothing reads the session here:
    /// each handler runs its own guard through `enter`, so an expired token
    /// is still on disk when `status` or `whoami` look at it.
    pub fn with_store(config: Config, store: Arc<dyn TokenStore>) -> Result<Self> {
        let session = SessionInspector::new(store.clone());
        let client = ApiClient::with_config(config.client_config(), store)
            .context("Failed to create API client")?;
        let events = client.subscribe();

        Ok(Self {
            config,
            client,
            session,
            navigator: Navigator::new(Route::Login),
            events,
        })
    }

    /// Drain session events; tell the user if the server signed them out.
    pub fn follow_session_events(&mut self) {
        let mut ended = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.navigator.apply(&event);
                    ended |= event.ended_session();
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "Session events lagged");
                }
                Err(_) => break,
            }
        }
        if ended && self.navigator.current() == Route::Login {
            eprintln!("Session expired. Please log in again with `dailypictrack login`.");
        }
    }

    /// Resolve `route` against the session, failing if it needs a login
    fn enter(&mut self, route: Route) -> Result<()> {
        let shown = Navigator::guard(route, self.session.is_authenticated());
        self.navigator.navigate(shown);
        if shown != route {
            anyhow::bail!("Not signed in. Run `dailypictrack login` first.");
        }
        Ok(())
    }

    fn prompt(label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(d) => print!("{} [{}]: ", label, d),
            None => print!("{}: ", label),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        let input = input.trim();
        Ok(match default {
            Some(d) if input.is_empty() => d.to_string(),
            _ => input.to_string(),
        })
    }

    // ===== Auth =====

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        self.enter(Route::Login)?;

        let email = match email {
            Some(e) => e,
            None => Self::prompt("Email", self.config.last_email.as_deref())?,
        };
        let password = rpassword::prompt_password("Password: ")?;

        let form = LoginForm::new(email, password);
        form.validate()?;

        let token = match self.client.login(form.email(), &form.password).await {
            Ok(token) => token,
            Err(e) => anyhow::bail!(login_failure_message(&e)),
        };
        let user = self.session.login(&token)?;

        self.config.last_email = Some(form.email().to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.navigator.navigate(Route::Dashboard);
        match user {
            Some(user) => println!("Welcome back, {}!", user.display_name()),
            None => println!("Signed in."),
        }
        Ok(())
    }

    pub async fn signup(&mut self, name: &str, email: &str) -> Result<()> {
        self.enter(Route::Signup)?;

        let password = rpassword::prompt_password("Password: ")?;
        let form = SignupForm::new(name, email, password);
        form.validate()?;

        if let Err(e) = self
            .client
            .signup(form.name(), form.email(), &form.password)
            .await
        {
            anyhow::bail!(signup_failure_message(&e));
        }

        self.navigator.navigate(Route::Login);
        println!("Account created. Sign in with `dailypictrack login --email {}`.", form.email());
        Ok(())
    }

    pub fn logout(&mut self) -> Result<()> {
        self.session.logout()?;
        self.navigator.navigate(Route::Login);
        println!("Signed out.");
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        let Some(user) = self.session.current_user() else {
            println!("Not signed in.");
            return Ok(());
        };
        println!("Name:    {}", user.display_name());
        if let Some(id) = user.user_id() {
            println!("User ID: {}", id);
        }
        if let Some(ref email) = user.email {
            println!("Email:   {}", email);
        }
        match user.expires_at() {
            Some(exp) => println!("Expires: {}", exp.format("%b %d, %Y %H:%M UTC")),
            None => println!("Expires: unknown"),
        }
        Ok(())
    }

    pub fn status(&self) -> Result<()> {
        println!("{}", self.status_line());
        Ok(())
    }

    fn status_line(&self) -> String {
        match self.session.state() {
            SessionState::Authenticated(user) => format!("Signed in as {}", user.display_name()),
            SessionState::Expired => "Session expired. Please log in again.".to_string(),
            SessionState::Unauthenticated => "Not signed in.".to_string(),
        }
    }

    // ===== Images =====

    async fn fetch_images(&self) -> Result<Vec<Image>> {
        self.client
            .my_images()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to load images: {}", e))
    }

    pub async fn dashboard(&mut self) -> Result<()> {
        self.enter(Route::Dashboard)?;
        let images = self.fetch_images().await?;

        let stats = DashboardStats::from_images(&images);
        println!("My Image Dashboard");
        println!("  Total images:  {}", stats.total_images);
        println!("  Storage used:  {}", stats.storage_used);
        println!("  Last upload:   {}", stats.last_upload);

        let days = daily_uploads(&images);
        if !days.is_empty() {
            println!("\nDaily uploads");
            for day in &days {
                println!("  {}  {}", day.date.format("%Y-%m-%d"), day.uploads);
            }
        }

        let tags = tag_distribution(&images);
        if !tags.is_empty() {
            println!("\nBy tag");
            for tag in &tags {
                println!("  {:<20} {} images", tag.name, tag.value);
            }
        }

        println!("\nRecent images");
        if images.is_empty() {
            println!("  No images uploaded yet.");
        }
        for image in images.iter().take(RECENT_IMAGES) {
            let date = image.uploaded_at.as_deref().map(format_date).unwrap_or_default();
            println!("  {}  {}  {}", image.id, date, image.image_url);
        }
        Ok(())
    }

    pub async fn gallery(&mut self, page: usize) -> Result<()> {
        self.enter(Route::Gallery)?;
        let images = self.fetch_images().await?;

        let page = Page::of(&images, page);
        if page.is_empty() {
            println!("No images found.");
            return Ok(());
        }
        for image in page.items {
            let date = image.uploaded_at.as_deref().map(format_date).unwrap_or_default();
            let doc = image
                .documentation()
                .map(|d| truncate_string(d, DOC_COLUMN_WIDTH))
                .unwrap_or_default();
            println!("{:<26} {:<14} {:<16} {}", image.id, date, image.primary_tag(), doc);
        }
        println!("\nPage {} of {}", page.number, page.total_pages);
        Ok(())
    }

    pub async fn show(&mut self, id: &str) -> Result<()> {
        self.enter(Route::Gallery)?;
        let images = self.fetch_images().await?;

        let detail = find_detail(&images, id)
            .ok_or_else(|| anyhow::anyhow!("No image with id {}", id))?;
        println!("Image:     {}", detail.image_url);
        println!("Uploaded:  {}", detail.uploaded);
        if let Some(doc) = detail.documentation {
            println!("Documentation:\n  {}", doc);
        }
        if !detail.tags.is_empty() {
            println!("Tags:      {}", detail.tags.join(", "));
        }
        Ok(())
    }

    async fn send_upload(&mut self, request: UploadRequest) -> Result<()> {
        self.enter(Route::Dashboard)?;
        request.validate()?;
        if let Err(e) = self.client.upload_image(request).await {
            anyhow::bail!(upload_failure_message(&e));
        }
        println!("Image uploaded successfully!");
        Ok(())
    }

    pub async fn upload(&mut self, path: &Path, doc: Option<String>, tags: Vec<String>) -> Result<()> {
        let request = UploadRequest::from_path(path)?
            .with_documentation(doc.as_deref().unwrap_or_default())
            .with_tags(tags);
        self.send_upload(request).await
    }

    pub async fn capture(&mut self, file: &Path, doc: Option<String>, tags: Vec<String>) -> Result<()> {
        let data_url = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let request = UploadRequest::from_data_url(&data_url, CAPTURE_FILE_NAME)?
            .with_documentation(doc.as_deref().unwrap_or_default())
            .with_tags(tags);
        self.send_upload(request).await
    }

    pub async fn delete(&mut self, ids: &[String]) -> Result<()> {
        self.enter(Route::Dashboard)?;
        let mut images = self.fetch_images().await?;

        let results = join_all(ids.iter().map(|id| self.client.delete_image(id))).await;

        let mut failed = 0;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => {
                    if !remove_image(&mut images, id.trim()) {
                        debug!(id = %id, "Deleted image was not in the fetched list");
                    }
                    println!("Deleted {}", id);
                }
                Err(e) => {
                    failed += 1;
                    eprintln!("Failed to delete {}: {}", id, e);
                }
            }
        }
        println!("{} images remaining", images.len());
        if failed > 0 {
            anyhow::bail!("{} of {} deletions failed", failed, ids.len());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use dailypictrack_core::auth::MemoryTokenStore;

    fn jwt_expiring_in(seconds: i64) -> String {
        let exp = unix_now() + seconds;
        let claims = format!(r#"{{"id":"u-1","name":"Ada","exp":{}}}"#, exp);
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(claims)
        )
    }

    fn unix_now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn app_with(token: Option<String>) -> (App, Arc<MemoryTokenStore>) {
        let store = Arc::new(match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        });
        let app = App::with_store(Config::default(), store.clone()).unwrap();
        (app, store)
    }

    #[test]
    fn test_startup_leaves_expired_token_for_status() {
        let (app, store) = app_with(Some(jwt_expiring_in(-60)));
        assert!(store.get().unwrap().is_some());

        // whoami still sees who the stale session belonged to
        assert_eq!(app.session.current_user().unwrap().display_name(), "Ada");

        assert_eq!(app.status_line(), "Session expired. Please log in again.");
        assert_eq!(store.get().unwrap(), None);
        assert_eq!(app.status_line(), "Not signed in.");
    }

    #[test]
    fn test_status_of_live_session() {
        let (app, _) = app_with(Some(jwt_expiring_in(3600)));
        assert_eq!(app.status_line(), "Signed in as Ada");
    }

    #[test]
    fn test_protected_route_needs_live_session() {
        let (mut app, _) = app_with(Some(jwt_expiring_in(-60)));
        assert!(app.enter(Route::Gallery).is_err());
        assert_eq!(app.navigator.current(), Route::Login);

        let (mut app, _) = app_with(Some(jwt_expiring_in(3600)));
        app.enter(Route::Gallery).unwrap();
        assert_eq!(app.navigator.current(), Route::Gallery);
    }
}
