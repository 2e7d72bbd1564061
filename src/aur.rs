// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Arch User Repository search.
//!
//! The AUR exposes a public JSON RPC to search its package index. Aurdesk only
//! needs the `search` request type, and only a handful of the fields of each
//! search result. The response is kept in the same shape the RPC hands it back
//! in, so that the HTTP backend can re-serve it to front-ends unchanged.
//!
//! # See Also
//!
//! - [AUR RPC interface](https://wiki.archlinux.org/title/Aurweb_RPC_interface)

use crate::config::AurSettings;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use tracing::{debug, instrument};

/// Version of the RPC interface spoken.
pub const RPC_VERSION: &str = "5";

/// Base URL of package pages on the AUR web front-end.
pub const PACKAGE_PAGE_URL: &str = "https://aur.archlinux.org/packages/";

/// Single AUR search result.
///
/// Field names follow the RPC exactly. Orphaned packages have no maintainer,
/// and both description and upstream URL are optional upstream as well.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Description", default)]
    pub description: Option<String>,

    #[serde(rename = "Maintainer", default)]
    pub maintainer: Option<String>,

    #[serde(rename = "Popularity", default)]
    pub popularity: f64,

    #[serde(rename = "Version", default)]
    pub version: String,

    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

/// Search response of the AUR RPC.
///
/// A non-empty `error` means the AUR refused the query, e.g., because it
/// matched too many packages.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<PackageInfo>,

    #[serde(default)]
    pub error: String,
}

/// Search the AUR package index.
pub trait AurSearch: Send + Sync + 'static {
    /// Search packages by term, returning one page of results.
    fn search(
        &self,
        term: &str,
        page: &str,
    ) -> impl Future<Output = Result<SearchResponse>> + Send;
}

/// AUR RPC client over HTTP.
#[derive(Debug, Clone)]
pub struct AurClient {
    client: Client,
    rpc_url: String,
}

impl AurClient {
    /// Construct new AUR client against configured RPC endpoint.
    ///
    /// # Errors
    ///
    /// - Return [`AurError::Connect`] if HTTP client cannot be built.
    pub fn new(settings: &AurSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("aurdesk/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(AurError::Connect)?;

        Ok(Self {
            client,
            rpc_url: settings.rpc_url.clone(),
        })
    }
}

impl AurSearch for AurClient {
    /// Search packages by name and description.
    ///
    /// # Errors
    ///
    /// - Return [`AurError::Connect`] if AUR cannot be reached.
    /// - Return [`AurError::Status`] if AUR does not answer with 200 OK, and
    ///   its answer does not carry an error message of its own.
    /// - Return [`AurError::Read`] if response body cannot be read.
    /// - Return [`AurError::Parse`] if response body is not valid JSON.
    #[instrument(skip(self), level = "debug")]
    async fn search(&self, term: &str, page: &str) -> Result<SearchResponse> {
        debug!("fetch packages from {}", self.rpc_url);
        let response = self
            .client
            .get(&self.rpc_url)
            .query(&[
                ("v", RPC_VERSION),
                ("type", "search"),
                ("arg", term),
                ("page", page),
            ])
            .send()
            .await
            .map_err(AurError::Connect)?;

        let status = response.status();
        debug!("response status: {status}");
        let body = response.bytes().await;

        // INVARIANT: Refusals like rate limits come as JSON with an error status.
        if status != StatusCode::OK {
            let refusal = body
                .ok()
                .and_then(|body| serde_json::from_slice::<SearchResponse>(&body).ok())
                .filter(|response| !response.error.is_empty());
            return refusal.ok_or(AurError::Status(status));
        }

        let body = body.map_err(AurError::Read)?;
        let response = serde_json::from_slice(&body)?;

        Ok(response)
    }
}

/// Determine URL of package page on the AUR web front-end.
pub fn package_page_url(name: impl AsRef<str>) -> String {
    format!("{PACKAGE_PAGE_URL}{}", name.as_ref())
}

/// Determine URL of package Git repository relative to base URL.
pub fn git_clone_url(base: impl AsRef<str>, name: impl AsRef<str>) -> String {
    format!("{}{}.git", base.as_ref(), name.as_ref())
}

/// AUR search error types.
#[derive(Debug, thiserror::Error)]
pub enum AurError {
    /// AUR cannot be reached.
    #[error("failed to connect to AUR")]
    Connect(#[source] reqwest::Error),

    /// AUR answered with something other than 200 OK.
    #[error("failed to fetch data from AUR (status: {})", .0.as_u16())]
    Status(StatusCode),

    /// Response body cannot be read.
    #[error("failed to read AUR response")]
    Read(#[source] reqwest::Error),

    /// Response body is not a valid search response.
    #[error("failed to parse AUR response")]
    Parse(#[from] serde_json::Error),
}

/// Friendly result alias :3
pub type Result<T, E = AurError> = std::result::Result<T, E>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{extract::RawQuery, http::header::CONTENT_TYPE, routing::get, Router};
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;
    use std::sync::{Arc, Mutex};
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    pub(crate) const RATE_LIMITED: &str =
        r#"{"error":"Rate limit reached","resultcount":0,"results":[],"type":"error","version":5}"#;

    /// Fake RPC endpoint answering every request the same way, recording
    /// the raw query strings it receives.
    pub(crate) fn upstream(
        status: StatusCode,
        body: &'static str,
    ) -> (Router, Arc<Mutex<Vec<String>>>) {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let seen = queries.clone();
        let app = Router::new().route(
            "/rpc/",
            get(move |RawQuery(query): RawQuery| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(query.unwrap_or_default());
                    (status, [(CONTENT_TYPE, "application/json")], body)
                }
            }),
        );
        (app, queries)
    }

    /// Serve router on a local port, returning its RPC URL.
    pub(crate) async fn serve_upstream(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}/rpc/")
    }

    /// Serve one answer whose body is cut short of its announced length.
    pub(crate) async fn serve_truncated() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|window| window == b"\r\n\r\n") {
                let len = stream.read(&mut buf).await.unwrap();
                if len == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..len]);
            }
            stream
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"results\":",
                )
                .await
                .unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{addr}/rpc/")
    }

    pub(crate) fn client(rpc_url: String) -> AurClient {
        AurClient::new(&AurSettings {
            rpc_url,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn search_sends_escaped_query() -> anyhow::Result<()> {
        let (app, queries) = upstream(
            StatusCode::OK,
            r#"{"resultcount":1,"results":[{"Name":"a-b","Version":"1-1","Popularity":1.5}],"type":"search","version":5}"#,
        );
        let aur = client(serve_upstream(app).await);

        let result = aur.search("a b&c", "2").await?;
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].name, "a-b");
        assert_eq!(result.error, "");
        assert_eq!(
            *queries.lock().unwrap(),
            vec!["v=5&type=search&arg=a+b%26c&page=2"]
        );

        Ok(())
    }

    #[tokio::test]
    async fn search_keeps_error_of_refused_query() -> anyhow::Result<()> {
        let (app, _) = upstream(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED);
        let aur = client(serve_upstream(app).await);

        let result = aur.search("paru", "1").await?;
        assert!(result.results.is_empty());
        assert_eq!(result.error, "Rate limit reached");

        Ok(())
    }

    #[tokio::test]
    async fn search_fails_on_bad_status() {
        let (app, _) = upstream(StatusCode::BAD_GATEWAY, "<html>Bad Gateway</html>");
        let aur = client(serve_upstream(app).await);
        let result = aur.search("paru", "1").await;
        assert!(matches!(result, Err(AurError::Status(StatusCode::BAD_GATEWAY))));

        // INVARIANT: JSON without an error message is still a bad status.
        let (app, _) = upstream(StatusCode::SERVICE_UNAVAILABLE, r#"{"results":[]}"#);
        let aur = client(serve_upstream(app).await);
        let result = aur.search("paru", "1").await;
        assert!(matches!(
            result,
            Err(AurError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn search_fails_on_garbage_body() {
        let (app, _) = upstream(StatusCode::OK, "<html>");
        let aur = client(serve_upstream(app).await);
        let result = aur.search("paru", "1").await;
        assert!(matches!(result, Err(AurError::Parse(_))));
    }

    #[tokio::test]
    async fn search_fails_on_truncated_body() {
        let aur = client(serve_truncated().await);
        let result = aur.search("paru", "1").await;
        assert!(matches!(result, Err(AurError::Read(_))));
    }

    #[tokio::test]
    async fn search_fails_without_upstream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let aur = client(format!("http://{addr}/rpc/"));
        let result = aur.search("paru", "1").await;
        assert!(matches!(result, Err(AurError::Connect(_))));
    }

    #[test]
    fn parse_search_response() -> anyhow::Result<()> {
        let result: SearchResponse = serde_json::from_str(
            r#"{
                "resultcount": 2,
                "type": "search",
                "version": 5,
                "results": [
                    {
                        "ID": 1,
                        "Name": "paru",
                        "Description": "Feature packed AUR helper",
                        "Maintainer": "Morganamilo",
                        "Popularity": 19.5,
                        "Version": "2.0.4-1",
                        "URL": "https://github.com/morganamilo/paru",
                        "NumVotes": 900
                    },
                    {
                        "Name": "orphan-thing",
                        "Description": null,
                        "Maintainer": null,
                        "Popularity": 0,
                        "Version": "0.1-1",
                        "URL": null
                    }
                ]
            }"#,
        )?;

        let expect = SearchResponse {
            results: vec![
                PackageInfo {
                    name: "paru".into(),
                    description: Some("Feature packed AUR helper".into()),
                    maintainer: Some("Morganamilo".into()),
                    popularity: 19.5,
                    version: "2.0.4-1".into(),
                    url: Some("https://github.com/morganamilo/paru".into()),
                },
                PackageInfo {
                    name: "orphan-thing".into(),
                    description: None,
                    maintainer: None,
                    popularity: 0.0,
                    version: "0.1-1".into(),
                    url: None,
                },
            ],
            error: String::new(),
        };
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn parse_error_response() -> anyhow::Result<()> {
        let result: SearchResponse = serde_json::from_str(
            r#"{"error":"Too many package results.","resultcount":0,"results":[],"type":"error","version":5}"#,
        )?;
        assert!(result.results.is_empty());
        assert_eq!(result.error, "Too many package results.");

        Ok(())
    }

    #[test]
    fn serialize_uses_rpc_field_names() -> anyhow::Result<()> {
        let info = PackageInfo {
            name: "foo".into(),
            maintainer: Some("bar".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&info)?;
        assert_eq!(value["Name"], "foo");
        assert_eq!(value["Maintainer"], "bar");
        assert!(value["URL"].is_null());

        Ok(())
    }

    #[test_case("https://aur.archlinux.org/", "paru", "https://aur.archlinux.org/paru.git"; "default base")]
    #[test_case("https://example.org/aur/", "yay-bin", "https://example.org/aur/yay-bin.git"; "custom base")]
    #[test]
    fn clone_url(base: &str, name: &str, expect: &str) {
        pretty_assertions::assert_eq!(git_clone_url(base, name), expect);
    }

    #[test]
    fn page_url() {
        assert_eq!(package_page_url("paru"), "https://aur.archlinux.org/packages/paru");
    }
}
