use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::error::{error_from_response, ApiError};

/// Supplies the bearer token for outgoing requests. Implemented by the
/// session store; cleared when the backend answers 401.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> Option<String>;
    fn clear(&self);
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    health_timeout: Duration,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> Result<Self, ApiError> {
        if config.api_url.is_empty() {
            warn!("API_URL is not configured, requests will fail");
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ApiError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            health_timeout: config.health_timeout(),
            tokens: None,
        })
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = self.tokens.as_ref().and_then(|source| source.token()) {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored token is not a valid header value, sending request without it"),
            }
        }

        headers
    }

    pub async fn request<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut req = self
            .client
            .request(method.clone(), &url)
            .headers(self.get_headers());

        if let Some(query) = query {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let response = req.send().await.map_err(|e| {
            let err = ApiError::from(e);
            error!("NETWORK {} {}: {}", method, path, err);
            err
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("{} {} {}", status.as_u16(), method, path);

            if status == StatusCode::UNAUTHORIZED {
                warn!("Session expired or unauthorized, clearing stored token");
                if let Some(tokens) = &self.tokens {
                    tokens.clear();
                }
            }

            return Err(error_from_response(status, &body));
        }

        debug!("{} {} {}", status.as_u16(), method, path);
        let data = response.json::<T>().await?;
        Ok(data)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, (), ()>(Method::GET, path, None, None).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.request::<T, Q, ()>(Method::GET, path, Some(query), None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request::<T, (), B>(Method::POST, path, None, Some(body)).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request::<T, (), B>(Method::PUT, path, None, Some(body)).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request::<T, (), B>(Method::PATCH, path, None, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, (), ()>(Method::DELETE, path, None, None).await
    }

    /// Probes `/health` with the short health timeout.
    pub async fn test_connection(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).timeout(self.health_timeout).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Health check failed: {}", e);
                false
            }
        }
    }
}
