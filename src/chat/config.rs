//! Configuration for the askme application.
//!
//! Settings come from two places: the YAML file at `~/.config/askme/config.yaml` and the
//! command line.  Command-line values win.  [`AskConfig::resolve`] merges the two.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arrrg_derive::CommandLine;
use serde::Deserialize;

use crate::providers::{DEFAULT_OLLAMA_URL, ProviderSettings};
use crate::{Error, ProviderKind, Result};

/// Environment variable that overrides the configured Mistral key.
pub const MISTRAL_API_KEY_ENV: &str = "MISTRAL_API_KEY";

/// Command-line arguments for askme.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct AskArgs {
    /// Provider to send the prompt to.
    #[arrrg(optional, "Provider to use: ollama or mistral (default: ollama)", "PROVIDER")]
    pub provider: Option<String>,

    /// Model to use.
    #[arrrg(optional, "Model to use (can be set in config)", "MODEL")]
    pub model: Option<String>,

    /// System role for the conversation.
    #[arrrg(optional, "Role to use for the system message", "ROLE")]
    pub role: Option<String>,

    /// File to send along with the prompt.
    #[arrrg(optional, "File to use as input", "FILE")]
    pub file: Option<String>,

    /// Interactive chat instead of a single question.
    #[arrrg(flag, "Enter chat mode (interactive conversation)")]
    pub chat: bool,

    /// Load the working directory as project context.
    #[arrrg(flag, "Read project files from the working directory (chat mode only)")]
    pub context: bool,

    /// Give up on a response after this many seconds.
    #[arrrg(optional, "Seconds to wait for a complete response (default: no limit)", "SECS")]
    pub timeout: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,

    /// Log request details to stderr.
    #[arrrg(flag, "Log request details to stderr")]
    pub verbose: bool,
}

/// The contents of the config file.  Every field is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    /// Provider used when none is given on the command line.
    pub provider: Option<String>,
    /// Model used when none is given on the command line.
    pub default_model: Option<String>,
    /// Full URL of the Ollama generate endpoint.
    pub ollama_url: Option<String>,
    /// Bearer token for Mistral.
    pub mistral_api_key: Option<String>,
    /// System role used when none is given on the command line.
    pub role_system: Option<String>,
    /// Response deadline in seconds.
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Where the config file lives, if a home directory can be found.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("askme").join("config.yaml"))
    }

    /// Parse a config document.
    pub fn parse(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::config(
                format!("failed to parse config file: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Load the config at `path`.  A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = match std::fs::read_to_string(path) {
            Ok(yaml) => yaml,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(Error::config(
                    format!("failed to read config file {}: {err}", path.display()),
                    Some(Box::new(err)),
                ));
            }
        };
        Self::parse(&yaml)
    }

    /// Load the config from [`FileConfig::default_path`].
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }
}

/// Resolved settings for one run of askme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskConfig {
    /// The provider to talk to.
    pub provider: ProviderKind,
    /// The model identifier.
    pub model: String,
    /// The system role, if any.
    pub role: Option<String>,
    /// A file to forward with the prompt.
    pub file: Option<PathBuf>,
    /// Interactive mode.
    pub chat: bool,
    /// Project context mode.
    pub context: bool,
    /// Response deadline.
    pub timeout: Option<Duration>,
    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
    /// Whether to log request details.
    pub verbose: bool,
    /// Full URL of the Ollama generate endpoint.
    pub ollama_url: String,
    /// Bearer token for Mistral.
    pub mistral_api_key: Option<String>,
}

impl AskConfig {
    /// Merge command-line `args` over `file`, reading `MISTRAL_API_KEY` from the environment.
    pub fn resolve(args: AskArgs, file: FileConfig) -> Result<Self> {
        Self::resolve_with_env(args, file, std::env::var(MISTRAL_API_KEY_ENV).ok())
    }

    /// Like [`AskConfig::resolve`], with the environment key passed in.
    pub fn resolve_with_env(
        args: AskArgs,
        file: FileConfig,
        env_api_key: Option<String>,
    ) -> Result<Self> {
        let provider = match non_empty(args.provider).or(non_empty(file.provider)) {
            Some(name) => name.parse::<ProviderKind>()?,
            None => ProviderKind::default(),
        };
        let model = non_empty(args.model)
            .or(non_empty(file.default_model))
            .ok_or_else(|| {
                Error::invalid_request(
                    "No model specified. Set a default model in config or use --model",
                    Some("model".to_string()),
                )
            })?;
        if args.context && !args.chat {
            return Err(Error::invalid_request(
                "--context only works with --chat. Use --chat or omit --context.",
                Some("context".to_string()),
            ));
        }
        let timeout = args
            .timeout
            .or(file.timeout_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        Ok(Self {
            provider,
            model,
            role: non_empty(args.role).or(non_empty(file.role_system)),
            file: non_empty(args.file).map(PathBuf::from),
            chat: args.chat,
            context: args.context,
            timeout,
            use_color: !args.no_color,
            verbose: args.verbose,
            ollama_url: non_empty(file.ollama_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            mistral_api_key: non_empty(env_api_key).or(non_empty(file.mistral_api_key)),
        })
    }

    /// Connection settings for [`crate::providers::connect`].
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            ollama_url: self.ollama_url.clone(),
            mistral_api_key: self.mistral_api_key.clone(),
            ..ProviderSettings::default()
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with_model() -> AskArgs {
        AskArgs {
            model: Some("llama3".to_string()),
            ..AskArgs::default()
        }
    }

    #[test]
    fn parse_full_config() {
        let config = FileConfig::parse(
            "provider: mistral\n\
             default_model: mistral-small\n\
             ollama_url: http://box:11434/api/generate\n\
             mistral_api_key: sk-file\n\
             role_system: be terse\n\
             timeout_secs: 30\n",
        )
        .unwrap();
        assert_eq!(config.provider.as_deref(), Some("mistral"));
        assert_eq!(config.default_model.as_deref(), Some("mistral-small"));
        assert_eq!(config.role_system.as_deref(), Some("be terse"));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn empty_and_partial_configs() {
        assert_eq!(FileConfig::parse("").unwrap(), FileConfig::default());
        let config = FileConfig::parse("default_model: llama3\n").unwrap();
        assert_eq!(config.default_model.as_deref(), Some("llama3"));
        assert!(config.provider.is_none());
    }

    #[test]
    fn malformed_config_is_a_config_error() {
        let err = FileConfig::parse("provider: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn missing_file_is_empty() {
        let path = std::env::temp_dir().join("askme-config-that-does-not-exist.yaml");
        assert_eq!(FileConfig::load(&path).unwrap(), FileConfig::default());
    }

    #[test]
    fn defaults() {
        let config = AskConfig::resolve_with_env(args_with_model(), FileConfig::default(), None)
            .unwrap();
        assert_eq!(config.provider, ProviderKind::Ollama);
        assert_eq!(config.model, "llama3");
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
        assert!(config.role.is_none());
        assert!(config.timeout.is_none());
        assert!(config.use_color);
        assert!(!config.chat);
    }

    #[test]
    fn command_line_wins_over_file() {
        let file = FileConfig {
            provider: Some("ollama".to_string()),
            default_model: Some("from-file".to_string()),
            role_system: Some("file role".to_string()),
            timeout_secs: Some(10),
            ..FileConfig::default()
        };
        let args = AskArgs {
            provider: Some("Mistral".to_string()),
            model: Some("from-args".to_string()),
            role: Some("args role".to_string()),
            timeout: Some(3),
            no_color: true,
            ..AskArgs::default()
        };
        let config = AskConfig::resolve_with_env(args, file, None).unwrap();
        assert_eq!(config.provider, ProviderKind::Mistral);
        assert_eq!(config.model, "from-args");
        assert_eq!(config.role.as_deref(), Some("args role"));
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert!(!config.use_color);
    }

    #[test]
    fn file_fills_gaps() {
        let file = FileConfig {
            default_model: Some("from-file".to_string()),
            role_system: Some("file role".to_string()),
            ollama_url: Some("http://box/api/generate".to_string()),
            ..FileConfig::default()
        };
        let config = AskConfig::resolve_with_env(AskArgs::default(), file, None).unwrap();
        assert_eq!(config.model, "from-file");
        assert_eq!(config.role.as_deref(), Some("file role"));
        assert_eq!(config.ollama_url, "http://box/api/generate");
    }

    #[test]
    fn environment_key_overrides_file_key() {
        let file = FileConfig {
            mistral_api_key: Some("sk-file".to_string()),
            ..FileConfig::default()
        };
        let config =
            AskConfig::resolve_with_env(args_with_model(), file.clone(), Some("sk-env".to_string()))
                .unwrap();
        assert_eq!(config.mistral_api_key.as_deref(), Some("sk-env"));
        let config = AskConfig::resolve_with_env(args_with_model(), file, None).unwrap();
        assert_eq!(config.mistral_api_key.as_deref(), Some("sk-file"));
    }

    #[test]
    fn model_is_required() {
        let err = AskConfig::resolve_with_env(AskArgs::default(), FileConfig::default(), None)
            .unwrap_err();
        assert!(err.is_invalid_request());
        assert!(err.to_string().contains("No model specified"));
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let args = AskArgs {
            provider: Some("openai".to_string()),
            ..args_with_model()
        };
        let err = AskConfig::resolve_with_env(args, FileConfig::default(), None).unwrap_err();
        assert!(err.is_unsupported_provider());
    }

    #[test]
    fn context_needs_chat() {
        let args = AskArgs {
            context: true,
            ..args_with_model()
        };
        let err = AskConfig::resolve_with_env(args, FileConfig::default(), None).unwrap_err();
        assert!(err.is_invalid_request());
        let args = AskArgs {
            context: true,
            chat: true,
            ..args_with_model()
        };
        assert!(AskConfig::resolve_with_env(args, FileConfig::default(), None).is_ok());
    }

    #[test]
    fn empty_ollama_url_means_default() {
        let file = FileConfig {
            ollama_url: Some("  ".to_string()),
            ..FileConfig::default()
        };
        let config = AskConfig::resolve_with_env(args_with_model(), file, None).unwrap();
        assert_eq!(config.ollama_url, DEFAULT_OLLAMA_URL);
    }
}
