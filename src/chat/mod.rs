//! The askme application layer.
//!
//! This module sits on top of the provider, relay and rendering layers and provides:
//!
//! - [`AskArgs`], [`FileConfig`] and [`AskConfig`]: CLI arguments, the config file and their merge
//! - [`ChatSession`] and [`classify`]: interactive conversations and input classification
//! - [`parse_command`]: slash command parsing
//! - [`build_context`]: project context mode

mod commands;
mod config;
mod context;
mod session;

pub use crate::render::{Banner, PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{AskArgs, AskConfig, FileConfig, MISTRAL_API_KEY_ENV};
pub use context::{CONTEXT_HEADER, build_context, context_system_prompt};
pub use session::{ChatSession, FAREWELL, Input, SessionState, Step, WELCOME, classify};
