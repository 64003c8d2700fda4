//! The Ollama `/api/generate` backend.

use serde::{Deserialize, Serialize};

use crate::client::HttpClient;
use crate::decode::{LineRecord, WireFormat, decode_lines};
use crate::providers::{FragmentStream, Provider};
use crate::{Error, ProviderKind, ProviderRequest, RequestPayload, Result, Role};

/// Where a stock Ollama install listens.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// The body of an Ollama generate request.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OllamaRequest {
    /// The model identifier.
    pub model: String,
    /// The prompt (or flattened transcript).
    pub prompt: String,
    /// The system prompt, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Always true.
    pub stream: bool,
}

impl OllamaRequest {
    /// Build the wire body for `request`.
    ///
    /// Ollama's generate endpoint has no notion of turns, so a turn sequence is flattened:
    /// system turns become `system`, the rest becomes a `User:`/`Assistant:` transcript ending
    /// with an open `Assistant: ` line.
    pub fn from_request(request: &ProviderRequest) -> Self {
        let (prompt, system) = match &request.payload {
            RequestPayload::Prompt { prompt, role } => (prompt.clone(), role.clone()),
            RequestPayload::Turns(conversation) => {
                let system = conversation
                    .system_turns()
                    .map(|t| t.content())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                let mut transcript = String::new();
                let mut last = None;
                for turn in conversation.turns() {
                    match turn.role() {
                        Role::System => continue,
                        Role::User => transcript.push_str("User: "),
                        Role::Assistant => transcript.push_str("Assistant: "),
                    }
                    transcript.push_str(turn.content());
                    transcript.push('\n');
                    last = Some(turn.role());
                }
                if last == Some(Role::User) {
                    transcript.push_str("Assistant: ");
                }
                (transcript, Some(system).filter(|s| !s.is_empty()))
            }
        };
        Self {
            model: request.model.clone(),
            prompt,
            system,
            stream: request.stream,
        }
    }
}

/// One line of an Ollama response body.
#[derive(Debug, Deserialize)]
struct OllamaChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

/// Decode one Ollama response line.
pub(crate) fn decode_line(line: &str) -> Result<LineRecord> {
    let chunk: OllamaChunk = serde_json::from_str(line).map_err(|e| {
        Error::decode(
            format!("failed to parse Ollama response: {e}"),
            Some(Box::new(e)),
        )
    })?;
    Ok(LineRecord {
        text: Some(chunk.response).filter(|t| !t.is_empty()),
        done: chunk.done,
    })
}

/// The Ollama backend.
#[derive(Debug, Clone)]
pub struct Ollama {
    http: HttpClient,
    url: String,
}

impl Ollama {
    /// Create a backend posting to `url`.
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait::async_trait]
impl Provider for Ollama {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn wire_format(&self) -> WireFormat {
        WireFormat::Ndjson
    }

    fn request_body(&self, request: &ProviderRequest) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&OllamaRequest::from_request(request))?)
    }

    async fn send(&self, request: &ProviderRequest) -> Result<FragmentStream> {
        let body = self.request_body(request)?;
        tracing::debug!(url = %self.url, model = %request.model, "sending Ollama request");
        let bytes = self
            .http
            .post_stream(&self.url, HttpClient::default_headers(), body)
            .await?;
        Ok(Box::pin(decode_lines(bytes, self.wire_format())))
    }
}
