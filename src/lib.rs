// Public modules
pub mod chat;
pub mod client;
pub mod decode;
pub mod error;
pub mod observability;
pub mod providers;
pub mod relay;
pub mod render;
pub mod spinner;
pub mod turn;
pub mod types;

// Re-exports
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use providers::{Provider, ProviderSettings, connect};
pub use relay::{FirstEvent, RelayOptions, RelayReceiver, spawn_relay};
pub use render::{PlainTextRenderer, Renderer};
pub use spinner::Spinner;
pub use turn::{TurnDisplay, stream_turn};
pub use types::*;
