// Public modules
pub mod chat_turn;
pub mod conversation;
pub mod provider_kind;
pub mod provider_request;
pub mod stream_fragment;

// Re-exports
pub use chat_turn::{ChatTurn, Role};
pub use conversation::Conversation;
pub use provider_kind::ProviderKind;
pub use provider_request::{ProviderRequest, RequestPayload};
pub use stream_fragment::StreamFragment;
