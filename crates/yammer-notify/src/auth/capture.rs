//! Loopback capture of an implicit-flow OAuth token.
//!
//! The authorization server puts the token into the URL fragment of the
//! redirect, which browsers never send to a server. The redirect page
//! therefore runs a small script that forwards the token to `/token` (SYN),
//! shows the acknowledgement it gets back (SYN-ACK) and finally calls
//! `/done` (ACK), after which the server may shut down.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use reqwest::Url;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::AccessToken;
use super::error::CaptureError;
use crate::config::OAuthConfig;

pub const REDIRECT_PATH: &str = "/oauth/redirect";
pub const TOKEN_PATH: &str = "/token";
pub const DONE_PATH: &str = "/done";

/// Body returned for an accepted token.
const TOKEN_ACK: &str = "success";

const REDIRECT_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>yammer-notify</title>
</head>
<body>
    <span id="result"></span>
    <script>
        const result = document.getElementById("result");
        const params = new URLSearchParams(window.location.hash.substring(1));
        const token = params.get("access_token");
        if (token) {
            fetch("/token?token=" + encodeURIComponent(token))
                .then((response) => response.text())
                .then((text) => {
                    result.textContent = text;
                    return fetch("/done");
                })
                .catch(() => {
                    result.textContent = "something went wrong";
                });
        } else {
            result.textContent = "something went wrong";
        }
    </script>
</body>
</html>
"#;

type TokenSlot = Arc<Mutex<Option<oneshot::Sender<Result<AccessToken, CaptureError>>>>>;
type DoneSlot = Arc<Mutex<Option<oneshot::Sender<()>>>>;

/// Handler side of the two hand-offs. Each sender is taken on first use.
#[derive(Clone)]
struct CaptureState {
    token_tx: TokenSlot,
    done_tx: DoneSlot,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// A running capture server waiting for the browser.
pub struct CaptureServer {
    addr: SocketAddr,
    token_rx: oneshot::Receiver<Result<AccessToken, CaptureError>>,
    done_rx: oneshot::Receiver<()>,
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
    grace: Duration,
}

impl CaptureServer {
    /// Start listening on an OS-assigned port of the configured host.
    pub async fn bind(config: &OAuthConfig) -> Result<Self, CaptureError> {
        let listener = TcpListener::bind((config.bind_host.as_str(), 0))
            .await
            .map_err(CaptureError::Bind)?;
        let addr = listener.local_addr().map_err(CaptureError::Bind)?;

        let (token_tx, token_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let state = CaptureState {
            token_tx: Arc::new(Mutex::new(Some(token_tx))),
            done_tx: Arc::new(Mutex::new(Some(done_tx))),
        };
        let app = capture_routes(state);

        let server = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        debug!("capture server listening on {}", addr);

        Ok(Self {
            addr,
            token_rx,
            done_rx,
            shutdown_tx,
            server,
            grace: config.shutdown_grace(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Redirect URI to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.addr.port(), REDIRECT_PATH)
    }

    /// Authorization URL the user has to open in a browser.
    pub fn authorize_url(&self, endpoint: &str, client_id: &str) -> Result<Url, CaptureError> {
        Url::parse_with_params(
            endpoint,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.redirect_uri().as_str()),
                ("response_type", "token"),
            ],
        )
        .map_err(|e| CaptureError::InvalidUrl {
            url: endpoint.to_string(),
            message: e.to_string(),
        })
    }

    /// Wait for the token and then for the completion signal, then shut
    /// the server down.
    ///
    /// There is no timeout: the user may take as long as they like in the
    /// browser.
    pub async fn wait_for_token(self) -> Result<AccessToken, CaptureError> {
        let Self {
            token_rx,
            done_rx,
            shutdown_tx,
            server,
            grace,
            ..
        } = self;

        let received = token_rx.await.unwrap_or(Err(CaptureError::Abandoned));
        let token = match received {
            Ok(token) => token,
            Err(err) => {
                if let Err(shutdown_err) = shutdown(shutdown_tx, server, grace).await {
                    warn!("capture server shutdown after failed handshake: {}", shutdown_err);
                }
                return Err(err);
            }
        };
        debug!("token received, waiting for browser to finish");

        if done_rx.await.is_err() {
            return Err(CaptureError::Abandoned);
        }
        debug!("browser finished, shutting down capture server");

        shutdown(shutdown_tx, server, grace).await?;
        Ok(token)
    }
}

/// Run the complete login handshake and return the captured token.
///
/// Prints the authorization URL to stdout and blocks until the browser has
/// gone through all three phases.
pub async fn authenticate(
    config: &OAuthConfig,
    client_id: &str,
) -> Result<AccessToken, CaptureError> {
    let server = CaptureServer::bind(config).await?;
    let url = server.authorize_url(&config.authorize_url, client_id)?;

    println!("please authorize at: {url}");
    info!("waiting for authorization on {}", server.local_addr());

    server.wait_for_token().await
}

async fn shutdown(
    shutdown_tx: oneshot::Sender<()>,
    server: JoinHandle<std::io::Result<()>>,
    grace: Duration,
) -> Result<(), CaptureError> {
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(grace, server).await {
        Err(_) => Err(CaptureError::ShutdownTimeout(grace)),
        Ok(Err(join_err)) => Err(CaptureError::Serve(std::io::Error::other(join_err))),
        Ok(Ok(result)) => result.map_err(CaptureError::Serve),
    }
}

fn capture_routes(state: CaptureState) -> Router {
    Router::new()
        .route(REDIRECT_PATH, get(redirect))
        .route(TOKEN_PATH, get(receive_token))
        .route(DONE_PATH, get(receive_done))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn take<T>(slot: &Mutex<Option<T>>) -> Option<T> {
    slot.lock().unwrap_or_else(|e| e.into_inner()).take()
}

async fn redirect() -> Html<&'static str> {
    Html(REDIRECT_HTML)
}

async fn receive_token(
    State(state): State<CaptureState>,
    Query(query): Query<TokenQuery>,
) -> (StatusCode, &'static str) {
    let Some(tx) = take(&state.token_tx) else {
        warn!("ignoring repeated token request");
        return (StatusCode::CONFLICT, "token already received");
    };

    match query.token.filter(|t| !t.is_empty()) {
        Some(token) => {
            let _ = tx.send(Ok(AccessToken::new(token)));
            (StatusCode::OK, TOKEN_ACK)
        }
        None => {
            let _ = tx.send(Err(CaptureError::MissingToken));
            (StatusCode::BAD_REQUEST, "missing token")
        }
    }
}

async fn receive_done(State(state): State<CaptureState>) -> StatusCode {
    if let Some(tx) = take(&state.done_tx) {
        let _ = tx.send(());
    }
    StatusCode::OK
}
