//! HTTP plumbing shared by the providers.

use bytes::Bytes;
use futures::Stream;
use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::observability::{CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};

/// A response body as it arrives off the wire.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A thin wrapper around `reqwest` that posts JSON and hands back the streaming body.
///
/// Only connecting is bounded by a timeout.  Turn deadlines come from the relay's cancellation
/// token.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    connect_timeout: Duration,
}

impl HttpClient {
    /// Create a new client with the default connect timeout.
    pub fn new() -> Result<Self> {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with a custom connect timeout.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| {
                Error::transport(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            connect_timeout,
        })
    }

    /// Headers every provider request carries.
    pub fn default_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// Build an `Authorization: Bearer` header value.
    pub fn bearer(token: &str) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
            Error::invalid_request(
                format!("API key is not a valid header value: {e}"),
                Some("api_key".to_string()),
            )
        })
    }

    /// POST `body` to `url` and return the response body as a byte stream.
    ///
    /// A non-2xx answer becomes [`Error::Provider`] before any of the body is handed out.
    pub async fn post_stream(
        &self,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<ByteStream> {
        CLIENT_REQUESTS.click();
        let response = self
            .client
            .post(url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                if e.is_timeout() {
                    Error::transport(
                        format!(
                            "Request timed out after {:?}: {e}",
                            self.connect_timeout
                        ),
                        Some(Box::new(e)),
                    )
                } else if e.is_connect() {
                    Error::transport(format!("Connection error: {e}"), Some(Box::new(e)))
                } else {
                    Error::transport(format!("Request failed: {e}"), Some(Box::new(e)))
                }
            })?;

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        tracing::debug!(url, status = %response.status(), "provider accepted request");

        Ok(Box::pin(response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::transport(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        })))
    }

    /// Turn a non-2xx response into a provider error carrying the body as its message.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let message = match response.text().await {
            Ok(body) => body.trim().to_string(),
            Err(e) => format!("failed to read error response: {e}"),
        };
        tracing::warn!(status_code, %message, "provider returned error status");
        Error::provider(status_code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = HttpClient::new().unwrap();
        assert_eq!(client.connect_timeout, DEFAULT_CONNECT_TIMEOUT);

        let client = HttpClient::with_connect_timeout(Duration::from_secs(3)).unwrap();
        assert_eq!(client.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn bearer_header() {
        let value = HttpClient::bearer("sk-123").unwrap();
        assert_eq!(value.to_str().unwrap(), "Bearer sk-123");
        assert!(HttpClient::bearer("bad\nkey").unwrap_err().is_invalid_request());
    }

    #[test]
    fn json_content_type() {
        let headers = HttpClient::default_headers();
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }
}
