//! Provider backends.
//!
//! Each backend knows how to turn a [`ProviderRequest`] into its own wire body and which
//! [`WireFormat`] its response uses.  Everything past that point (HTTP, decoding, relaying)
//! is shared.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;

use crate::client::HttpClient;
use crate::decode::WireFormat;
use crate::{ProviderKind, ProviderRequest, Result, StreamFragment};

pub mod mistral;
pub mod ollama;

pub use mistral::{DEFAULT_MISTRAL_URL, Mistral};
pub use ollama::{DEFAULT_OLLAMA_URL, Ollama};

/// A live stream of decoded fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<StreamFragment>> + Send>>;

/// A backend that can answer a [`ProviderRequest`] with a stream of fragments.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Which backend this is.
    fn kind(&self) -> ProviderKind;

    /// The layout of each line of the response body.
    fn wire_format(&self) -> WireFormat;

    /// Serialize `request` into the JSON body this backend expects.
    fn request_body(&self, request: &ProviderRequest) -> Result<Vec<u8>>;

    /// Send `request` and return the decoded response stream.
    ///
    /// Fails with a provider error on a non-2xx status, before any fragment is produced.
    async fn send(&self, request: &ProviderRequest) -> Result<FragmentStream>;
}

/// Connection settings for the backends.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Full URL of the Ollama generate endpoint.
    pub ollama_url: String,
    /// Full URL of the Mistral chat completions endpoint.
    pub mistral_url: String,
    /// Bearer token for Mistral.
    pub mistral_api_key: Option<String>,
    /// How long to wait for a connection.
    pub connect_timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            mistral_url: DEFAULT_MISTRAL_URL.to_string(),
            mistral_api_key: None,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Build the backend for `kind`.
pub fn connect(kind: ProviderKind, settings: &ProviderSettings) -> Result<Arc<dyn Provider>> {
    let http = HttpClient::with_connect_timeout(settings.connect_timeout)?;
    let provider: Arc<dyn Provider> = match kind {
        ProviderKind::Ollama => Arc::new(Ollama::new(http, settings.ollama_url.clone())),
        ProviderKind::Mistral => Arc::new(Mistral::new(
            http,
            settings.mistral_url.clone(),
            settings.mistral_api_key.clone(),
        )?),
    };
    Ok(provider)
}
