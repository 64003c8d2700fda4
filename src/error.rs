//! Error types for askme.
//!
//! Every failure a turn can hit is one variant of [`Error`].  The interactive loop reports the
//! error and re-prompts; single-shot mode prints it and exits non-zero.

use std::error;
use std::fmt;
use std::io;
use std::sync::Arc;

/// The main error type for askme.
#[derive(Clone, Debug)]
pub enum Error {
    /// The request was rejected before any I/O happened.
    InvalidRequest {
        /// Human-readable error message.
        message: String,
        /// Parameter that failed validation.
        param: Option<String>,
    },

    /// The provider answered with a non-2xx status.
    Provider {
        /// HTTP status code.
        status_code: u16,
        /// Human-readable error message (usually the response body).
        message: String,
    },

    /// A record in the response stream could not be decoded.
    Decode {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The provider name is not one askme knows how to talk to.
    UnsupportedProvider {
        /// The name that was asked for.
        name: String,
    },

    /// Connection-level failure talking to the provider.
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },

    /// The turn was cancelled by the caller or its deadline elapsed.
    Cancelled {
        /// Human-readable error message.
        message: String,
    },

    /// I/O error.
    Io {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Arc<io::Error>,
    },

    /// The configuration file could not be loaded.
    Config {
        /// Human-readable error message.
        message: String,
        /// The underlying error.
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    },
}

impl Error {
    /// Creates a new invalid request error.
    pub fn invalid_request(message: impl Into<String>, param: Option<String>) -> Self {
        Error::InvalidRequest {
            message: message.into(),
            param,
        }
    }

    /// Creates a new provider error.
    pub fn provider(status_code: u16, message: impl Into<String>) -> Self {
        Error::Provider {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a new decode error.
    pub fn decode(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Decode {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new unsupported provider error.
    pub fn unsupported_provider(name: impl Into<String>) -> Self {
        Error::UnsupportedProvider { name: name.into() }
    }

    /// Creates a new transport error.
    pub fn transport(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Transport {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Creates a new cancellation error.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Error::Cancelled {
            message: message.into(),
        }
    }

    /// Creates a new I/O error.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            message: message.into(),
            source: Arc::new(source),
        }
    }

    /// Creates a new configuration error.
    pub fn config(
        message: impl Into<String>,
        source: Option<Box<dyn error::Error + Send + Sync>>,
    ) -> Self {
        Error::Config {
            message: message.into(),
            source: source.map(Arc::from),
        }
    }

    /// Returns true if the request was rejected before any I/O.
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest { .. })
    }

    /// Returns true if the provider answered with a non-2xx status.
    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider { .. })
    }

    /// Returns true if a stream record could not be decoded.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode { .. })
    }

    /// Returns true if the provider name was not recognized.
    pub fn is_unsupported_provider(&self) -> bool {
        matches!(self, Error::UnsupportedProvider { .. })
    }

    /// Returns true if this is a connection-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns true if the turn was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Returns the status code associated with this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Provider { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest { message, param } => {
                if let Some(param) = param {
                    write!(f, "Invalid request: {message} (parameter: {param})")
                } else {
                    write!(f, "Invalid request: {message}")
                }
            }
            Error::Provider {
                status_code,
                message,
            } => {
                if message.is_empty() {
                    write!(f, "Provider returned error status: {status_code}")
                } else {
                    write!(f, "Provider returned error status: {status_code}: {message}")
                }
            }
            Error::Decode { message, .. } => {
                write!(f, "Failed to decode response: {message}")
            }
            Error::UnsupportedProvider { name } => {
                write!(f, "Unsupported provider: {name}")
            }
            Error::Transport { message, .. } => {
                write!(f, "Transport error: {message}")
            }
            Error::Cancelled { message } => {
                write!(f, "Cancelled: {message}")
            }
            Error::Io { message, .. } => {
                write!(f, "I/O error: {message}")
            }
            Error::Config { message, .. } => {
                write!(f, "Config error: {message}")
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Decode { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Transport { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            Error::Io { source, .. } => Some(source),
            Error::Config { source, .. } => source
                .as_ref()
                .map(|e| e.as_ref() as &(dyn error::Error + 'static)),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::io(err.to_string(), err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decode(format!("JSON error: {err}"), Some(Box::new(err)))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::config(format!("YAML error: {err}"), Some(Box::new(err)))
    }
}

/// A specialized Result type for askme operations.
pub type Result<T> = std::result::Result<T, Error>;
