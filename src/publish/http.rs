//! HTTP webhook publisher.

use super::{Notification, Publisher};
use crate::error::PublishError;
use async_trait::async_trait;
use reqwest::{Client, header::CONTENT_TYPE, header::HeaderValue};
use std::time::Duration;

/// Authentication method for webhook requests.
#[derive(Clone)]
pub enum HttpAuth {
    /// No authentication
    None,
    /// Bearer token authentication
    Bearer(String),
    /// Basic authentication (username, password)
    Basic(String, String),
}

/// Publishes notifications by POSTing the body to the destination URL.
///
/// A 4xx response is reported as a rejected message, anything else that is not
/// a success as a transport error.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::publish::HttpPublisher;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), change_notify::error::PublishError> {
/// let publisher = HttpPublisher::builder()
///     .with_auth_token("secret-token")
///     .with_timeout(Duration::from_secs(5))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct HttpPublisher {
    client: Client,
    auth: HttpAuth,
    content_type: HeaderValue,
}

impl HttpPublisher {
    /// Create a new builder for constructing an HTTP publisher.
    pub fn builder() -> HttpPublisherBuilder {
        HttpPublisherBuilder::new()
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, notification: &Notification) -> Result<(), PublishError> {
        let mut request = self
            .client
            .post(&notification.destination)
            .header(CONTENT_TYPE, self.content_type.clone())
            .body(notification.body.clone());

        request = match &self.auth {
            HttpAuth::None => request,
            HttpAuth::Bearer(token) => request.bearer_auth(token),
            HttpAuth::Basic(username, password) => request.basic_auth(username, Some(password)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(PublishError::Rejected(format!(
                "webhook answered {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        if !status.is_success() {
            return Err(PublishError::Transport(format!(
                "webhook answered {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        Ok(())
    }

    fn name(&self) -> String {
        "webhook".to_string()
    }
}

/// Builder for constructing an [`HttpPublisher`].
pub struct HttpPublisherBuilder {
    auth: HttpAuth,
    timeout: Duration,
    content_type: String,
}

impl HttpPublisherBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            auth: HttpAuth::None,
            timeout: Duration::from_secs(10),
            content_type: "application/json".to_string(),
        }
    }

    /// Use bearer token authentication.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth = HttpAuth::Bearer(token.into());
        self
    }

    /// Use basic authentication.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = HttpAuth::Basic(username.into(), password.into());
        self
    }

    /// Set the request timeout (default 10 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the `Content-Type` of posted bodies (default `application/json`).
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Build the publisher.
    ///
    /// # Errors
    ///
    /// Returns an error if the content type is not a valid header value or the
    /// HTTP client cannot be created.
    pub fn build(self) -> Result<HttpPublisher, PublishError> {
        let content_type = HeaderValue::from_str(&self.content_type)
            .map_err(|e| PublishError::Config(format!("Invalid content type: {}", e)))?;

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| PublishError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(HttpPublisher {
            client,
            auth: self.auth,
            content_type,
        })
    }
}

impl Default for HttpPublisherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = HttpPublisherBuilder::new();
        assert_eq!(builder.timeout, Duration::from_secs(10));
        assert_eq!(builder.content_type, "application/json");
        assert!(matches!(builder.auth, HttpAuth::None));
    }

    #[test]
    fn test_builder_auth() {
        let builder = HttpPublisherBuilder::new().with_basic_auth("user", "pass");
        assert!(matches!(builder.auth, HttpAuth::Basic(ref u, ref p) if u == "user" && p == "pass"));
    }

    #[test]
    fn test_invalid_content_type() {
        let result = HttpPublisherBuilder::new()
            .with_content_type("text/plain\n")
            .build();
        assert!(matches!(result, Err(PublishError::Config(msg)) if msg.contains("content type")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Reserve a free port, then release it so nothing listens there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let publisher = HttpPublisher::builder()
            .with_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let result = publisher
            .publish(&Notification::new(format!("http://127.0.0.1:{port}/hook"), "{}"))
            .await;
        assert!(matches!(result, Err(PublishError::Transport(_))));
    }
}
