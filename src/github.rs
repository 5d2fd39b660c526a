use anyhow::{Result, anyhow, bail};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use tracing::error;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// One repository as returned to callers. Recomputed per call, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub owner: String,
    pub stars: u64,
    pub forks: u64,
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<RawRepository>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    name: String,
    owner: Option<RawOwner>,
    stargazers_count: u64,
    forks_count: u64,
    description: Option<String>,
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

/// Search qualifier sent to GitHub. Popularity is approximated by stars.
pub fn search_query(language: Option<&str>) -> String {
    match language {
        Some(lang) => format!("stars:>1 language:{lang}"),
        None => "stars:>1".to_string(),
    }
}

pub struct GitHubClient {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    token: String,
    api_base: Url,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, api_base: Url) -> Result<Self> {
        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()?
            .https_or_http()
            .enable_http1()
            .build();
        let client: Client<_, Full<Bytes>> = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self {
            client,
            token: token.into(),
            api_base,
        })
    }

    /// Fetches the most popular repositories, optionally filtered by language.
    ///
    /// Single attempt: any transport or remote-side failure is logged and
    /// re-raised as one domain error embedding the original message.
    pub async fn fetch_popular_repositories(
        &self,
        count: u32,
        language: Option<&str>,
    ) -> Result<Vec<RepositorySummary>> {
        match self.search_repositories(count, language).await {
            Ok(repos) => Ok(repos),
            Err(e) => {
                error!("Error fetching popular repositories: {e:#}");
                Err(anyhow!("Failed to fetch popular repositories: {e}"))
            }
        }
    }

    async fn search_repositories(
        &self,
        count: u32,
        language: Option<&str>,
    ) -> Result<Vec<RepositorySummary>> {
        let mut url = self.api_base.join("/search/repositories")?;
        url.query_pairs_mut()
            .append_pair("q", &search_query(language))
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("per_page", &count.to_string());

        let req = Request::builder()
            .method(Method::GET)
            .uri(url.as_str())
            .header(
                hyper::header::AUTHORIZATION,
                format!("Bearer {}", self.token),
            )
            .header(hyper::header::ACCEPT, "application/vnd.github+json")
            .header(
                hyper::header::USER_AGENT,
                concat!("github-mcp-server/", env!("CARGO_PKG_VERSION")),
            )
            .body(Full::default())?;

        let res: hyper::Response<Incoming> = self.client.request(req).await?;
        let status = res.status();
        let body_bytes = res.into_body().collect().await?.to_bytes();
        if !status.is_success() {
            bail!(
                "GitHub API error ({status}): {}",
                String::from_utf8_lossy(&body_bytes)
            );
        }

        let parsed: SearchResponse = serde_json::from_slice(&body_bytes)?;
        Ok(parsed
            .items
            .into_iter()
            .map(|repo| RepositorySummary {
                name: repo.name,
                owner: repo
                    .owner
                    .map(|o| o.login)
                    .unwrap_or_else(|| "unknown".to_string()),
                stars: repo.stargazers_count,
                forks: repo.forks_count,
                description: repo.description,
                url: repo.html_url,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Query, State};
    use axum::http::StatusCode;
    use axum::response::Json;
    use axum::routing::get;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

    #[derive(Clone)]
    struct Stub {
        queries: SeenQueries,
        status: StatusCode,
        body: Value,
    }

    async fn search(
        State(stub): State<Stub>,
        Query(params): Query<HashMap<String, String>>,
    ) -> (StatusCode, Json<Value>) {
        stub.queries.lock().unwrap().push(params);
        (stub.status, Json(stub.body.clone()))
    }

    async fn spawn_stub(status: StatusCode, body: Value) -> (Url, SeenQueries) {
        let queries: SeenQueries = Arc::new(Mutex::new(Vec::new()));
        let stub = Stub {
            queries: queries.clone(),
            status,
            body,
        };
        let app = Router::new()
            .route("/search/repositories", get(search))
            .with_state(stub);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (Url::parse(&format!("http://{addr}")).unwrap(), queries)
    }

    fn raw_repo(name: &str, owner: Option<&str>, stars: u64, forks: u64) -> Value {
        let mut repo = json!({
            "name": name,
            "stargazers_count": stars,
            "forks_count": forks,
            "description": format!("{name} description"),
            "html_url": format!("https://github.com/example/{name}"),
        });
        if let Some(owner) = owner {
            repo["owner"] = json!({ "login": owner });
        }
        repo
    }

    #[test]
    fn search_query_appends_language_filter() {
        assert_eq!(search_query(None), "stars:>1");
        assert_eq!(search_query(Some("rust")), "stars:>1 language:rust");
    }

    #[tokio::test]
    async fn maps_raw_records_into_summaries() {
        let body = json!({ "items": [
            raw_repo("linux", Some("torvalds"), 150_000, 50_000),
            raw_repo("orphan", None, 90_000, 1_000),
        ]});
        let (base, _) = spawn_stub(StatusCode::OK, body).await;
        let client = GitHubClient::new("test-token", base).unwrap();

        let repos = client.fetch_popular_repositories(2, None).await.unwrap();

        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].name, "linux");
        assert_eq!(repos[0].owner, "torvalds");
        assert_eq!(repos[0].stars, 150_000);
        assert_eq!(repos[0].forks, 50_000);
        assert_eq!(repos[0].url, "https://github.com/example/linux");
        assert_eq!(repos[1].owner, "unknown");
        assert!(repos.windows(2).all(|pair| pair[0].stars >= pair[1].stars));
    }

    #[tokio::test]
    async fn forwards_search_parameters() {
        let (base, queries) = spawn_stub(StatusCode::OK, json!({ "items": [] })).await;
        let client = GitHubClient::new("test-token", base).unwrap();

        client
            .fetch_popular_repositories(5, Some("rust"))
            .await
            .unwrap();

        let seen = queries.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let params = &seen[0];
        assert_eq!(params["q"], "stars:>1 language:rust");
        assert_eq!(params["sort"], "stars");
        assert_eq!(params["order"], "desc");
        assert_eq!(params["per_page"], "5");
    }

    #[tokio::test]
    async fn upstream_error_is_wrapped() {
        let (base, _) = spawn_stub(
            StatusCode::FORBIDDEN,
            json!({ "message": "rate limit exceeded" }),
        )
        .await;
        let client = GitHubClient::new("test-token", base).unwrap();

        let err = client
            .fetch_popular_repositories(1, None)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Failed to fetch popular repositories"));
        assert!(message.contains("403"));
    }

    #[tokio::test]
    async fn connection_failure_is_wrapped() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let base = Url::parse(&format!("http://{addr}")).unwrap();
        let client = GitHubClient::new("test-token", base).unwrap();

        let err = client
            .fetch_popular_repositories(1, None)
            .await
            .unwrap_err();

        assert!(
            err.to_string()
                .contains("Failed to fetch popular repositories")
        );
    }
}
