use crate::api::CallbackListener;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Credentials, TokenGrant};
use async_trait::async_trait;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// OAuth token operations of the streaming service.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant>;

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    Valid,
    Expired,
}

/// Single JSON record holding the current token pair.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Returns `None` for a missing, unreadable or incomplete record.
    pub async fn load(&self) -> Option<Credentials> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&data) {
            Ok(creds) if creds.is_complete() => Some(creds),
            Ok(_) => {
                warn!("Stored credentials in {} are incomplete", self.path.display());
                None
            }
            Err(e) => {
                warn!("Stored credentials in {} are malformed: {}", self.path.display(), e);
                None
            }
        }
    }

    pub async fn save(&self, creds: &Credentials) -> Result<()> {
        // A bind mount of a missing file shows up as an empty directory.
        if tokio::fs::metadata(&self.path).await.is_ok_and(|m| m.is_dir()) {
            tokio::fs::remove_dir_all(&self.path).await?;
        }

        let data = serde_json::to_string_pretty(creds)?;
        tokio::fs::write(&self.path, data).await?;
        debug!("Saved credentials to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AuthorizationOptions {
    pub callback_port: u16,
    pub timeout: Duration,
    /// Log the consent URL instead of opening a browser.
    pub headless: bool,
}

impl From<&Config> for AuthorizationOptions {
    fn from(config: &Config) -> Self {
        Self {
            callback_port: config.callback_port,
            timeout: config.auth_timeout,
            headless: config.headless,
        }
    }
}

/// Owns the token pair and hands out a currently valid access token.
pub struct CredentialManager {
    endpoint: Arc<dyn TokenEndpoint>,
    store: CredentialStore,
    options: AuthorizationOptions,
    credentials: Mutex<Option<Credentials>>,
    authenticating: AtomicBool,
}

impl CredentialManager {
    pub fn new(endpoint: Arc<dyn TokenEndpoint>, store: CredentialStore, options: AuthorizationOptions) -> Self {
        Self {
            endpoint,
            store,
            options,
            credentials: Mutex::new(None),
            authenticating: AtomicBool::new(false),
        }
    }

    pub async fn state(&self) -> AuthState {
        match self.credentials.lock().await.as_ref() {
            Some(creds) if creds.is_expired() => AuthState::Expired,
            Some(_) => AuthState::Valid,
            None if self.authenticating.load(Ordering::SeqCst) => AuthState::Authenticating,
            None => AuthState::Unauthenticated,
        }
    }

    /// Restores persisted credentials, refreshing them when stale, and falls
    /// back to the interactive authorization flow. Any error is fatal to
    /// startup.
    pub async fn initialize(&self) -> Result<()> {
        if let Some(stored) = self.store.load().await {
            if !stored.is_expired() {
                info!("Loaded saved Spotify credentials");
                *self.credentials.lock().await = Some(stored);
                return Ok(());
            }

            info!("Saved Spotify token expired, refreshing");
            match self.refresh(&stored).await {
                Ok(fresh) => {
                    self.store.save(&fresh).await?;
                    *self.credentials.lock().await = Some(fresh);
                    return Ok(());
                }
                Err(e) => warn!("Failed to refresh saved token, re-authorizing: {}", e),
            }
        }

        self.authorize().await
    }

    async fn authorize(&self) -> Result<()> {
        self.authenticating.store(true, Ordering::SeqCst);
        let result = self.run_authorization_flow().await;
        self.authenticating.store(false, Ordering::SeqCst);

        let creds = result?;
        self.store.save(&creds).await?;
        *self.credentials.lock().await = Some(creds);
        info!("Spotify authorization complete");
        Ok(())
    }

    async fn run_authorization_flow(&self) -> Result<Credentials> {
        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();

        let listener = CallbackListener::bind(self.options.callback_port).await?;
        let url = self.endpoint.authorize_url(&state)?;
        open_authorization_page(&url, self.options.headless);

        let code = listener.wait_for_code(&state, self.options.timeout).await?;
        let grant = self.endpoint.exchange_code(&code).await?;

        Credentials::from_grant(grant, None, Utc::now().timestamp_millis())
            .ok_or_else(|| AppError::Authentication("Token response had no refresh token".to_string()))
    }

    async fn refresh(&self, current: &Credentials) -> Result<Credentials> {
        let grant = self.endpoint.refresh(&current.refresh_token).await?;
        Credentials::from_grant(grant, Some(&current.refresh_token), Utc::now().timestamp_millis())
            .ok_or_else(|| AppError::Authentication("Refresh response had no refresh token".to_string()))
    }

    /// Access token for the next authenticated call, refreshed first if
    /// expired. Refresh failures are returned to the caller; a failure to
    /// persist the refreshed record is only logged.
    pub async fn access_token(&self) -> Result<String> {
        let mut guard = self.credentials.lock().await;
        let current = guard.as_ref().ok_or(AppError::NotAuthenticated)?;

        if !current.is_expired() {
            return Ok(current.access_token.clone());
        }

        debug!("Access token expired, refreshing");
        let fresh = self.refresh(current).await.map_err(|e| {
            error!("Token refresh failed: {}", e);
            e
        })?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh.clone());
        drop(guard);

        if let Err(e) = self.store.save(&fresh).await {
            error!("Failed to persist refreshed credentials: {}", e);
        }
        Ok(token)
    }
}

fn open_authorization_page(url: &str, headless: bool) {
    if headless {
        info!("Running headless. Please open this URL manually:\n{}", url);
        return;
    }

    info!("Opening browser to authorize URL: {}", url);
    if let Err(e) = webbrowser::open(url) {
        error!("Failed to open browser: {}", e);
        info!("Please open this URL manually: {}", url);
    }
}
