//! Yammer HTTP client.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::{ApiError, ApiResult};
use crate::auth::AccessToken;
use crate::config::ApiConfig;

/// Client for the Yammer REST API.
///
/// Cloning is cheap; clones share the connection pool and the request
/// counter.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// HTTP client.
    client: Client,
    /// Base URL every relative path is resolved against (always ends in `/`).
    base_url: Url,
    /// Bearer token sent with every API request.
    token: AccessToken,
    user_agent: String,
    /// Number of requests sent so far, API and binary alike.
    requests: Arc<AtomicUsize>,
}

impl ApiClient {
    /// Create a new client from the API settings and an access token.
    pub fn new(config: &ApiConfig, token: AccessToken) -> ApiResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            base_url,
            token,
            user_agent: config.user_agent.clone(),
            requests: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Number of HTTP requests sent through this client and its clones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Build an authenticated request for `path` relative to the base URL.
    ///
    /// Query parameters are appended in the given order; a body, when
    /// present, is sent as JSON.
    pub fn request<B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<RequestBuilder>
    where
        B: Serialize + ?Sized,
    {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                message: e.to_string(),
            })?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }

        debug!("url: {}", url);

        let mut builder = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, self.user_agent.as_str())
            .bearer_auth(self.token.secret());

        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).map_err(ApiError::Encode)?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(bytes);
        }

        Ok(builder)
    }

    /// Shorthand for a bodyless GET request.
    pub fn get(&self, path: &str, query: &[(&str, String)]) -> ApiResult<RequestBuilder> {
        self.request::<()>(Method::GET, path, query, None)
    }

    /// Send a request and decode its JSON body into `T`.
    pub async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        let url = response.url().to_string();
        let body = read_ok_body(response).await?;

        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { url, source })
    }

    /// Download a binary resource (avatars). No authorization is sent.
    pub async fn fetch_binary(&self, url: &str) -> ApiResult<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| ApiError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let response = self.send(self.client.get(parsed)).await?;
        read_ok_body(response).await
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        Ok(request.send().await?)
    }
}

/// Read the full body, failing unless the status is exactly 200.
///
/// The body is drained in the failure case too so the connection can be
/// reused.
async fn read_ok_body(response: Response) -> ApiResult<Vec<u8>> {
    let status = response.status();
    let url = response.url().to_string();

    if status != StatusCode::OK {
        let _ = response.bytes().await;
        return Err(ApiError::UnexpectedStatus { status, url });
    }

    Ok(response.bytes().await?.to_vec())
}

fn parse_base_url(raw: &str) -> ApiResult<Url> {
    let mut text = raw.trim().to_string();
    if !text.ends_with('/') {
        text.push('/');
    }
    Url::parse(&text).map_err(|e| ApiError::InvalidUrl {
        url: raw.to_string(),
        message: e.to_string(),
    })
}
