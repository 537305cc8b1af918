use crate::error::{AppError, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;

const SUCCESS_PAGE: &str =
    "<h1>Authentication successful!</h1><p>You can close this window now.</p>";

/// Why a callback request ended the authorization flow without a code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    MissingCode,
    StateMismatch,
    Denied(String),
}

impl From<Rejection> for AppError {
    fn from(rejection: Rejection) -> Self {
        match rejection {
            Rejection::MissingCode => AppError::MissingAuthorizationCode,
            Rejection::StateMismatch => AppError::StateMismatch,
            Rejection::Denied(reason) => {
                AppError::Authentication(format!("Authorization denied: {}", reason))
            }
        }
    }
}

type Outcome = std::result::Result<String, Rejection>;

pub struct CallbackState {
    expected_state: String,
    sender: Mutex<Option<oneshot::Sender<Outcome>>>,
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

pub fn callback_routes(state: Arc<CallbackState>) -> Router {
    Router::new()
        .route("/callback", get(callback))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn callback(
    State(state): State<Arc<CallbackState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>> {
    let outcome = if let Some(reason) = params.error {
        Err(Rejection::Denied(reason))
    } else if params.state.as_deref() != Some(state.expected_state.as_str()) {
        Err(Rejection::StateMismatch)
    } else {
        match params.code.filter(|c| !c.is_empty()) {
            Some(code) => Ok(code),
            None => Err(Rejection::MissingCode),
        }
    };

    let sender = state.sender.lock().ok().and_then(|mut s| s.take());
    let Some(sender) = sender else {
        tracing::warn!("Ignoring callback, authorization already finished");
        return Err(AppError::Authentication("Authorization already finished".to_string()));
    };

    let response = match &outcome {
        Ok(_) => Ok(Html(SUCCESS_PAGE)),
        Err(rejection) => Err(rejection.clone().into()),
    };
    let _ = sender.send(outcome);
    response
}

async fn not_found() -> (StatusCode, Html<&'static str>) {
    (StatusCode::NOT_FOUND, Html("<h1>Not found</h1>"))
}

/// Local listener for the single OAuth redirect of one authorization flow.
pub struct CallbackListener {
    listener: TcpListener,
}

impl CallbackListener {
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        tracing::info!("Authorization server listening on http://localhost:{}", port);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves until the first `/callback` request or until `timeout` elapses,
    /// then shuts the listener down.
    pub async fn wait_for_code(self, expected_state: &str, timeout: Duration) -> Result<String> {
        let (code_tx, code_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let app = callback_routes(Arc::new(CallbackState {
            expected_state: expected_state.to_string(),
            sender: Mutex::new(Some(code_tx)),
        }));

        let listener = self.listener;
        tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                tracing::error!("Authorization server error: {}", e);
            }
        });

        let outcome = tokio::time::timeout(timeout, code_rx).await;
        let _ = shutdown_tx.send(());

        match outcome {
            Err(_) => Err(AppError::AuthorizationTimeout(timeout.as_secs())),
            Ok(Err(_)) => Err(AppError::Internal(anyhow::anyhow!(
                "Authorization server stopped before a callback arrived"
            ))),
            Ok(Ok(Ok(code))) => Ok(code),
            Ok(Ok(Err(rejection))) => Err(rejection.into()),
        }
    }
}
