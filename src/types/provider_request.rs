use std::path::PathBuf;

use crate::types::{ChatTurn, Conversation};
use crate::{Error, Result};

/// What a request asks the model about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPayload {
    /// A single prompt with an optional system role.
    Prompt {
        /// The user's prompt.
        prompt: String,
        /// The system role, if any.
        role: Option<String>,
    },

    /// A full turn sequence, sent verbatim.
    Turns(Conversation),
}

/// A validated, provider-independent request.
///
/// Providers turn this into their own wire body.  Construct it with
/// [`ProviderRequest::prompt`] or [`ProviderRequest::conversation`]; both validate their input
/// and always set `stream`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRequest {
    /// The model identifier.
    pub model: String,
    /// Whether the provider should stream its answer.
    pub stream: bool,
    /// The prompt or turn sequence.
    pub payload: RequestPayload,
    /// An input file named on the command line.  Forwarded as-is; askme never reads it.
    pub file: Option<PathBuf>,
}

impl ProviderRequest {
    /// Build a single-prompt request.
    ///
    /// An empty or whitespace-only role is dropped.
    pub fn prompt(
        model: impl Into<String>,
        prompt: impl Into<String>,
        role: Option<String>,
    ) -> Result<Self> {
        let model = validate_model(model.into())?;
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(Error::invalid_request(
                "a prompt is required",
                Some("prompt".to_string()),
            ));
        }
        let role = role.filter(|r| !r.trim().is_empty());
        Ok(Self {
            model,
            stream: true,
            payload: RequestPayload::Prompt { prompt, role },
            file: None,
        })
    }

    /// Build a request from an existing conversation.
    pub fn conversation(model: impl Into<String>, conversation: Conversation) -> Result<Self> {
        let model = validate_model(model.into())?;
        if conversation.is_empty() {
            return Err(Error::invalid_request(
                "conversation has no turns",
                Some("messages".to_string()),
            ));
        }
        Ok(Self {
            model,
            stream: true,
            payload: RequestPayload::Turns(conversation),
            file: None,
        })
    }

    /// Attach the opaque input file path.
    pub fn with_file(mut self, file: Option<PathBuf>) -> Self {
        self.file = file;
        self
    }

    /// The turns this request stands for.
    ///
    /// A turn-sequence payload is returned verbatim.  A prompt payload becomes a system turn
    /// (only when a role is present) followed by a user turn.
    pub fn turns(&self) -> Vec<ChatTurn> {
        match &self.payload {
            RequestPayload::Turns(conversation) => conversation.turns().to_vec(),
            RequestPayload::Prompt { prompt, role } => {
                let mut turns = Vec::with_capacity(2);
                if let Some(role) = role {
                    turns.push(ChatTurn::system(role.clone()));
                }
                turns.push(ChatTurn::user(prompt.clone()));
                turns
            }
        }
    }
}

fn validate_model(model: String) -> Result<String> {
    if model.trim().is_empty() {
        return Err(Error::invalid_request(
            "no model specified; set default_model in the config or pass --model",
            Some("model".to_string()),
        ));
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_request_streams() {
        let request = ProviderRequest::prompt("llama3", "why?", None).unwrap();
        assert!(request.stream);
        assert_eq!(request.turns(), vec![ChatTurn::user("why?")]);
    }

    #[test]
    fn prompt_request_with_role_synthesizes_two_turns() {
        let request =
            ProviderRequest::prompt("llama3", "why?", Some("be terse".to_string())).unwrap();
        assert_eq!(
            request.turns(),
            vec![ChatTurn::system("be terse"), ChatTurn::user("why?")]
        );
    }

    #[test]
    fn empty_role_is_omitted() {
        let request = ProviderRequest::prompt("llama3", "why?", Some(String::new())).unwrap();
        assert_eq!(
            request.payload,
            RequestPayload::Prompt {
                prompt: "why?".to_string(),
                role: None
            }
        );
    }

    #[test]
    fn empty_model_is_invalid() {
        let err = ProviderRequest::prompt("", "why?", None).unwrap_err();
        assert!(err.is_invalid_request());
        let err = ProviderRequest::conversation(" ", Conversation::with_system("x")).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn empty_prompt_is_invalid() {
        let err = ProviderRequest::prompt("llama3", "  ", None).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn empty_conversation_is_invalid() {
        let err = ProviderRequest::conversation("llama3", Conversation::new()).unwrap_err();
        assert!(err.is_invalid_request());
    }

    #[test]
    fn conversation_is_used_verbatim() {
        let mut conversation = Conversation::new();
        conversation.push_exchange("a", "b");
        let conversation = conversation.with_user("c");
        let request = ProviderRequest::conversation("m", conversation.clone()).unwrap();
        assert_eq!(request.turns(), conversation.turns().to_vec());
    }
}
