// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{
    aur::{AurError, AurSearch, SearchResponse},
    install::{Builder, InstallError},
    server::SharedState,
};

use axum::{
    extract::{Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct PackageParams {
    pkg: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchParams {
    search: Option<String>,
    page: Option<String>,
}

/// JSON body answering install requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStatus {
    pub status: String,
    pub message: String,
}

impl InstallStatus {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".into(),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "failure".into(),
            message: message.into(),
        }
    }
}

/// Plain text error answers.
#[derive(Debug)]
pub(crate) enum ApiError {
    BadRequest(String),
    NotFound(String),
    MethodNotAllowed,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, message).into_response(),
            Self::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, "ONLY POST ALLOWED").into_response()
            }
            Self::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
            }
        }
    }
}

/// GET /api/test
pub(crate) async fn test(Query(params): Query<PackageParams>) -> Json<InstallStatus> {
    let pkg = params.pkg.unwrap_or_default();
    info!("requested package: {pkg}");
    Json(InstallStatus::success(format!("Package installed: {pkg}")))
}

/// GET /api/Search
pub(crate) async fn search<S, B>(
    State(state): State<SharedState<S, B>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError>
where
    S: AurSearch,
    B: Builder,
{
    let term = params
        .search
        .filter(|term| !term.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing search term".into()))?;
    let page = params
        .page
        .filter(|page| !page.is_empty())
        .unwrap_or_else(|| "1".into());

    info!("search AUR for {term:?}, page {page}");
    let response = state.aur.search(&term, &page).await.map_err(|err| {
        error!("{err:?}");
        ApiError::Internal(
            match err {
                AurError::Connect(_) | AurError::Status(_) => "Failed to fetch packages",
                AurError::Read(_) => "Failed to read response body",
                AurError::Parse(_) => "Failed to parse response",
            }
            .into(),
        )
    })?;

    if !response.error.is_empty() {
        return Err(ApiError::Internal(format!("AUR error: {}", response.error)));
    }

    if response.results.is_empty() {
        return Err(ApiError::NotFound(format!(
            "No results found or too many results. Please refine your search. Error: {}",
            response.error
        )));
    }

    info!("found {} packages", response.results.len());
    Ok(Json(response))
}

/// POST /api/Install
pub(crate) async fn install<S, B>(
    method: Method,
    State(state): State<SharedState<S, B>>,
    Query(params): Query<PackageParams>,
) -> Result<Json<InstallStatus>, ApiError>
where
    S: AurSearch,
    B: Builder,
{
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }

    let name = params.pkg.filter(|pkg| !pkg.is_empty()).ok_or_else(|| {
        error!("failed to install: missing pkg");
        ApiError::BadRequest("Missing 'pkg' query parameter".into())
    })?;

    // INVARIANT: Pipeline blocks on Git and makepkg, keep it off the runtime.
    let target = name.clone();
    let result = tokio::task::spawn_blocking(move || state.installer.install(&target))
        .await
        .map_err(|err| {
            error!("install task failed: {err}");
            ApiError::Internal("Install task failed".into())
        })?;

    let status = match result {
        Ok(installed) => {
            info!("AUR package URL: {}", installed.page_url());
            InstallStatus::success(format!("Package install triggered: {name}"))
        }
        Err(InstallError::InvalidName(_)) => {
            return Err(ApiError::BadRequest(format!("Invalid package name: {name}")))
        }
        Err(err @ (InstallError::BuildDir { .. } | InstallError::RemovePrevious { .. })) => {
            error!("{err:?}");
            return Err(ApiError::Internal(
                "Error removing previous directory".into(),
            ));
        }
        Err(InstallError::Clone(err)) => {
            error!("git clone error: {err}");
            InstallStatus::failure(format!("Git clone failed: {err}"))
        }
        Err(InstallError::Build { output }) => {
            error!("error during makepkg: {output}");
            InstallStatus::failure(format!("Couldn't build the package: {output}"))
        }
        Err(err @ (InstallError::Spawn { .. } | InstallError::ProgressStyle(_))) => {
            error!("{err:?}");
            InstallStatus::failure(format!("Couldn't build the package: {err}"))
        }
    };

    Ok(Json(status))
}
