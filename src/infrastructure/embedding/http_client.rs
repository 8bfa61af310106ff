use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use crate::domain::DomainError;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Map a non-success status to the error taxonomy
///
/// Server-side failures and throttling mean the backend is unavailable right
/// now; any other client error means the request itself was rejected.
pub fn status_error(status: StatusCode, body: &str) -> DomainError {
    let message = format!("HTTP {}: {}", status, body);

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        DomainError::provider_unavailable("http", message)
    } else {
        DomainError::invalid_input(message)
    }
}

/// Attribute an HTTP-level failure to the named provider
pub fn attribute(error: DomainError, provider: &str) -> DomainError {
    match error {
        DomainError::ProviderUnavailable { message, .. } => {
            DomainError::provider_unavailable(provider, message)
        }
        other => other,
    }
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        // Connect failures and client-side timeouts both land here
        let response = request.json(body).send().await.map_err(|e| {
            DomainError::provider_unavailable("http", format!("Request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &error_body));
        }

        response.json().await.map_err(|e| {
            DomainError::provider_unavailable("http", format!("Failed to parse response: {}", e))
        })
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::RwLock;

    #[derive(Debug, Clone)]
    enum Scripted {
        Response(serde_json::Value),
        Status(u16, String),
        Unreachable(String),
    }

    /// Scripted HTTP client keyed by URL
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        scripts: RwLock<HashMap<String, Scripted>>,
        requests: RwLock<Vec<(String, serde_json::Value)>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        fn script(self, url: impl Into<String>, scripted: Scripted) -> Self {
            self.scripts.write().unwrap().insert(url.into(), scripted);
            self
        }

        pub fn with_response(self, url: impl Into<String>, response: serde_json::Value) -> Self {
            self.script(url, Scripted::Response(response))
        }

        pub fn with_status(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
            self.script(url, Scripted::Status(status, body.into()))
        }

        /// Simulate a connection failure
        pub fn with_error(self, url: impl Into<String>, error: impl Into<String>) -> Self {
            self.script(url, Scripted::Unreachable(error.into()))
        }

        /// Bodies posted so far, in order
        pub fn requests(&self) -> Vec<(String, serde_json::Value)> {
            self.requests.read().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpClientTrait for MockHttpClient {
        async fn post_json(
            &self,
            url: &str,
            _headers: Vec<(&str, &str)>,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, DomainError> {
            self.requests
                .write()
                .unwrap()
                .push((url.to_string(), body.clone()));

            let scripted = self.scripts.read().unwrap().get(url).cloned();

            match scripted {
                Some(Scripted::Response(value)) => Ok(value),
                Some(Scripted::Status(code, body)) => {
                    let status = StatusCode::from_u16(code).unwrap();
                    Err(status_error(status, &body))
                }
                Some(Scripted::Unreachable(error)) => {
                    Err(DomainError::provider_unavailable("http", error))
                }
                None => Err(DomainError::provider_unavailable(
                    "http",
                    format!("No mock response for {}", url),
                )),
            }
        }
    }
}
