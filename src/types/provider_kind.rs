use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// The provider backends askme can talk to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// A local (or self-hosted) Ollama server.
    #[default]
    Ollama,

    /// The hosted Mistral chat completions API.
    Mistral,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Mistral => write!(f, "mistral"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    /// Parse a provider name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "mistral" => Ok(ProviderKind::Mistral),
            _ => Err(Error::unsupported_provider(s)),
        }
    }
}
