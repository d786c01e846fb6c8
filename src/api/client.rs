//! HTTP transport for the remote authentication service.
//!
//! Thin wrapper over reqwest. The bearer token is read from the shared
//! `TokenCell` at call time, never cached at construction, since the
//! token can change between requests.

use std::time::Duration;

use anyhow::Result;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::auth::TokenCell;
use crate::config::Config;
use crate::models::{LoginCredentials, Registration, User};

use super::{ApiError, AuthPayload, Transport};

/// HTTP client for the authentication service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    tokens: TokenCell,
}

impl HttpClient {
    /// Create a new client against the configured base URL.
    pub fn new(config: &Config, tokens: TokenCell) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = self.tokens.get() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    ApiError::InvalidResponse("stored token is not a valid header value".to_string())
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        path: &str,
    ) -> Result<T, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("failed to parse response from {}: {}", path, e))
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!(path, "sending GET request");
        let response = self
            .client
            .get(self.url(path))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, path).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "sending POST request");
        let response = self
            .client
            .post(self.url(path))
            .headers(self.auth_headers()?)
            .json(body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        Self::parse_json(response, path).await
    }
}

impl Transport for HttpClient {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthPayload, ApiError> {
        self.post_json("/auth/login", credentials).await
    }

    async fn register(&self, data: &Registration) -> Result<AuthPayload, ApiError> {
        self.post_json("/auth/register", data).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        debug!("sending logout request");
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .headers(self.auth_headers()?)
            .send()
            .await?;

        // Any 2xx counts; the body is ignored.
        Self::check_response(response).await?;
        Ok(())
    }

    async fn current_user(&self) -> Result<User, ApiError> {
        self.get_json("/auth/me").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(api_url: &str, tokens: TokenCell) -> HttpClient {
        let config = Config {
            api_url: api_url.to_string(),
            ..Config::default()
        };
        HttpClient::new(&config, tokens).expect("Failed to build client")
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = test_client("http://localhost:8080/api/", TokenCell::default());
        assert_eq!(client.url("/auth/login"), "http://localhost:8080/api/auth/login");
    }

    #[test]
    fn test_no_authorization_header_without_token() {
        let client = test_client("http://localhost:8080/api", TokenCell::default());
        let headers = client.auth_headers().expect("Failed to build headers");
        assert!(!headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_bearer_token_read_at_call_time() {
        let tokens = TokenCell::default();
        let client = test_client("http://localhost:8080/api", tokens.clone());

        // No token yet
        let headers = client.auth_headers().expect("Failed to build headers");
        assert!(!headers.contains_key(header::AUTHORIZATION));

        // Token set after construction must still be picked up
        tokens.set(Some("T1".to_string()));
        let headers = client.auth_headers().expect("Failed to build headers");
        assert_eq!(
            headers.get(header::AUTHORIZATION).map(|v| v.to_str().unwrap()),
            Some("Bearer T1")
        );

        // And dropped once cleared
        tokens.set(None);
        let headers = client.auth_headers().expect("Failed to build headers");
        assert!(!headers.contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_token_with_invalid_header_chars_is_rejected() {
        let tokens = TokenCell::default();
        tokens.set(Some("bad\ntoken".to_string()));
        let client = test_client("http://localhost:8080/api", tokens);
        assert!(client.auth_headers().is_err());
    }
}
