//! The Mistral chat completions backend.

use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::client::HttpClient;
use crate::decode::{LineRecord, WireFormat, decode_lines};
use crate::providers::{FragmentStream, Provider};
use crate::{ChatTurn, Error, ProviderKind, ProviderRequest, Result};

/// The hosted chat completions endpoint.
pub const DEFAULT_MISTRAL_URL: &str = "https://api.mistral.ai/v1/chat/completions";

/// The finish reason that ends a Mistral stream.
const FINISH_STOP: &str = "stop";

/// The body of a Mistral chat completions request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MistralRequest {
    /// The model identifier.
    pub model: String,
    /// The conversation so far.
    pub messages: Vec<ChatTurn>,
    /// Always true.
    pub stream: bool,
}

impl MistralRequest {
    /// Build the wire body for `request`.
    pub fn from_request(request: &ProviderRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.turns(),
            stream: request.stream,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MistralChunk {
    #[serde(default)]
    choices: Vec<MistralChoice>,
}

#[derive(Debug, Deserialize)]
struct MistralChoice {
    #[serde(default)]
    delta: MistralDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MistralDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Decode the JSON part of one Mistral response line.
///
/// Only the first choice is looked at.  A chunk with no choices carries nothing.
pub(crate) fn decode_line(json: &str) -> Result<LineRecord> {
    let chunk: MistralChunk = serde_json::from_str(json).map_err(|e| {
        Error::decode(
            format!("failed to parse Mistral response: {e}"),
            Some(Box::new(e)),
        )
    })?;
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(LineRecord::default());
    };
    if let Some(reason) = choice
        .finish_reason
        .as_deref()
        .filter(|r| *r != FINISH_STOP)
    {
        tracing::debug!(reason, "non-terminal finish reason");
    }
    Ok(LineRecord {
        text: choice.delta.content.filter(|t| !t.is_empty()),
        done: choice.finish_reason.as_deref() == Some(FINISH_STOP),
    })
}

/// The Mistral backend.
#[derive(Debug, Clone)]
pub struct Mistral {
    http: HttpClient,
    url: String,
    api_key: String,
}

impl Mistral {
    /// Create a backend posting to `url` with the given bearer token.
    pub fn new(http: HttpClient, url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            Error::invalid_request(
                "Mistral API key not provided; set mistral_api_key in the config or MISTRAL_API_KEY",
                Some("mistral_api_key".to_string()),
            )
        })?;
        Ok(Self {
            http,
            url: url.into(),
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl Provider for Mistral {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mistral
    }

    fn wire_format(&self) -> WireFormat {
        WireFormat::Prefixed
    }

    fn request_body(&self, request: &ProviderRequest) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&MistralRequest::from_request(request))?)
    }

    async fn send(&self, request: &ProviderRequest) -> Result<FragmentStream> {
        let body = self.request_body(request)?;
        let mut headers = HttpClient::default_headers();
        headers.insert(header::AUTHORIZATION, HttpClient::bearer(&self.api_key)?);
        tracing::debug!(url = %self.url, model = %request.model, "sending Mistral request");
        let bytes = self.http.post_stream(&self.url, headers, body).await?;
        Ok(Box::pin(decode_lines(bytes, self.wire_format())))
    }
}
