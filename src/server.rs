// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! HTTP backend for graphical front-ends.
//!
//! Front-ends do not talk to the AUR or makepkg themselves. Instead they go
//! through this small HTTP backend, which proxies package searches to the AUR
//! RPC, and runs the install pipeline on request.
//!
//! # Routes
//!
//! | Method | Path           | Query                | Purpose                     |
//! |--------|----------------|----------------------|-----------------------------|
//! | GET    | `/api/test`    | `pkg`                | Connectivity check          |
//! | GET    | `/api/Search`  | `search`, `page`     | Search AUR packages         |
//! | POST   | `/api/Install` | `pkg`                | Clone, build, install       |
//!
//! Only the configured front-end origin may issue cross-origin requests.

mod handlers;

pub use handlers::InstallStatus;

use crate::{aur::AurSearch, config::ServerSettings, install::Builder, install::Installer};

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

/// Shared state injected into every handler.
#[derive(Debug)]
pub struct AppState<S, B>
where
    S: AurSearch,
    B: Builder,
{
    pub aur: S,
    pub installer: Installer<B>,
}

impl<S, B> AppState<S, B>
where
    S: AurSearch,
    B: Builder,
{
    /// Construct new application state.
    pub fn new(aur: S, installer: Installer<B>) -> Self {
        Self { aur, installer }
    }
}

pub type SharedState<S, B> = Arc<AppState<S, B>>;

/// Build the router with every route and middleware attached.
pub fn router<S, B>(state: AppState<S, B>, allowed_origin: HeaderValue) -> Router
where
    S: AurSearch,
    B: Builder,
{
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::new()
        .route("/api/test", get(handlers::test))
        .route("/api/Search", get(handlers::search::<S, B>))
        .route("/api/Install", any(handlers::install::<S, B>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Serve HTTP backend until the process is stopped.
///
/// # Errors
///
/// - Return [`ServerError::Origin`] if allowed origin is not a header value.
/// - Return [`ServerError::Bind`] if listen address cannot be bound.
/// - Return [`ServerError::Serve`] if serving connections fails.
pub async fn serve<S, B>(state: AppState<S, B>, settings: &ServerSettings) -> Result<()>
where
    S: AurSearch,
    B: Builder,
{
    let origin = HeaderValue::from_str(&settings.allowed_origin)
        .map_err(|_| ServerError::Origin(settings.allowed_origin.clone()))?;
    let app = router(state, origin);

    let listener = TcpListener::bind(&settings.listen)
        .await
        .map_err(|err| ServerError::Bind {
            source: err,
            listen: settings.listen.clone(),
        })?;
    info!("server listening on {}", settings.listen);

    axum::serve(listener, app).await.map_err(ServerError::Serve)
}

/// HTTP backend error types.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Allowed origin cannot be used as a header value.
    #[error("invalid allowed origin {0:?}")]
    Origin(String),

    /// Listen address cannot be bound.
    #[error("failed to bind to {listen}")]
    Bind {
        #[source]
        source: std::io::Error,
        listen: String,
    },

    /// Serving connections fails.
    #[error("server stopped unexpectedly")]
    Serve(#[source] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = ServerError> = std::result::Result<T, E>;
