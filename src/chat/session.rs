//! Interactive chat sessions.
//!
//! A [`ChatSession`] owns the conversation history and runs one turn at a time.  The history
//! only ever grows by whole exchanges: a failed or cancelled turn leaves it untouched.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chat::commands::{ChatCommand, help_text, parse_command};
use crate::observability::{CHAT_TURN_ERRORS, CHAT_TURNS};
use crate::providers::Provider;
use crate::relay::RelayOptions;
use crate::render::Renderer;
use crate::turn::{TurnDisplay, stream_turn};
use crate::{Conversation, ProviderRequest, Result};

/// Printed when interactive mode starts.
pub const WELCOME: &str = "Entering chat mode (type 'exit' or 'quit' to stop).";

/// Printed when interactive mode ends.
pub const FAREWELL: &str = "Exiting chat mode.";

/// Where a session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the user.
    Idle,
    /// A request is in flight.
    Awaiting,
}

/// What a line of user input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Nothing to do.
    Ignored,
    /// The user wants to leave.
    Exit,
    /// A slash command.
    Command(ChatCommand),
    /// A prompt for the provider.
    Prompt(String),
}

/// Classify one line of user input.
pub fn classify(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Ignored;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Input::Exit;
    }
    match parse_command(line) {
        Some(ChatCommand::Quit) => Input::Exit,
        Some(command) => Input::Command(command),
        None => Input::Prompt(line.to_string()),
    }
}

/// Whether the session should keep reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Read the next line.
    Continue,
    /// Leave the loop.
    Exit,
}

/// An interactive conversation with one provider and model.
pub struct ChatSession {
    provider: Arc<dyn Provider>,
    model: String,
    history: Conversation,
    state: SessionState,
    deadline: Option<Duration>,
    spinner: bool,
}

impl ChatSession {
    /// Start a session.  A non-empty `system` prompt seeds the history with one system turn.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        system: Option<String>,
    ) -> Self {
        let history = match system {
            Some(system) => Conversation::with_system(system),
            None => Conversation::new(),
        };
        Self {
            provider,
            model: model.into(),
            history,
            state: SessionState::Idle,
            deadline: None,
            spinner: false,
        }
    }

    /// Give up on any response that takes longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Show a spinner on stdout while waiting for the first fragment.
    pub fn with_spinner(mut self, spinner: bool) -> Self {
        self.spinner = spinner;
        self
    }

    /// The conversation so far.
    pub fn history(&self) -> &Conversation {
        &self.history
    }

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The model in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forget everything but the seed turns.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Send `input` as the next user turn and stream the reply to `renderer`.
    ///
    /// On success the exchange is appended to the history and the reply is returned.
    pub async fn send(
        &mut self,
        input: &str,
        cancel: CancellationToken,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let request = ProviderRequest::conversation(&self.model, self.history.with_user(input))?;
        let options = RelayOptions::new()
            .with_cancel(cancel)
            .with_deadline(self.deadline);
        let display = if self.spinner {
            TurnDisplay::quiet().with_spinner(io::stdout())
        } else {
            TurnDisplay::quiet()
        };

        CHAT_TURNS.click();
        self.state = SessionState::Awaiting;
        let result = stream_turn(self.provider.clone(), request, options, display, renderer).await;
        self.state = SessionState::Idle;

        match result {
            Ok(reply) => {
                self.history.push_exchange(input, reply.as_str());
                Ok(reply)
            }
            Err(err) => {
                CHAT_TURN_ERRORS.click();
                tracing::debug!(error = %err, "turn failed; history unchanged");
                Err(err)
            }
        }
    }

    /// Handle one line of input, reporting any failure through `renderer`.
    pub async fn handle_line(
        &mut self,
        line: &str,
        cancel: CancellationToken,
        renderer: &mut dyn Renderer,
    ) -> Step {
        match classify(line) {
            Input::Ignored => Step::Continue,
            Input::Exit => Step::Exit,
            Input::Command(command) => {
                self.run_command(command, renderer);
                Step::Continue
            }
            Input::Prompt(prompt) => {
                if let Err(err) = self.send(&prompt, cancel, renderer).await {
                    if err.is_cancelled() {
                        renderer.print_interrupted();
                    } else {
                        renderer.print_error(&err.to_string());
                    }
                }
                Step::Continue
            }
        }
    }

    fn run_command(&mut self, command: ChatCommand, renderer: &mut dyn Renderer) {
        match command {
            ChatCommand::Clear => {
                self.clear();
                renderer.print_info("Conversation cleared.");
            }
            ChatCommand::History => {
                let turns = self.history.turns();
                if turns.is_empty() {
                    renderer.print_info("(no messages yet)");
                }
                for turn in turns {
                    renderer.print_info(&format!("{}: {}", turn.role(), turn.content()));
                }
            }
            ChatCommand::Help => {
                for line in help_text().lines() {
                    renderer.print_info(&format!("    {line}"));
                }
            }
            ChatCommand::Quit => {}
            ChatCommand::Invalid(message) => renderer.print_error(&message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::tests::ScriptedProvider;
    use crate::turn::tests::CapturingRenderer;
    use crate::{ChatTurn, Error, Role, StreamFragment};

    fn session(provider: ScriptedProvider) -> ChatSession {
        ChatSession::new(Arc::new(provider), "m", None)
    }

    #[test]
    fn classify_input() {
        assert_eq!(classify("   "), Input::Ignored);
        assert_eq!(classify("exit"), Input::Exit);
        assert_eq!(classify("  QUIT "), Input::Exit);
        assert_eq!(classify("/exit"), Input::Exit);
        assert_eq!(classify("/clear"), Input::Command(ChatCommand::Clear));
        assert_eq!(classify(" hello "), Input::Prompt("hello".to_string()));
        assert_eq!(classify("exit now"), Input::Prompt("exit now".to_string()));
    }

    #[tokio::test]
    async fn successful_turn_appends_exchange() {
        let mut chat = session(ScriptedProvider::texts(&["wor", "ld"]));
        let mut renderer = CapturingRenderer::default();
        let step = chat
            .handle_line("hello", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(step, Step::Continue);
        assert_eq!(renderer.text, "world");
        assert_eq!(
            chat.history().turns(),
            &[ChatTurn::user("hello"), ChatTurn::assistant("world")]
        );
        assert_eq!(chat.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn exit_sends_nothing() {
        let mut chat = session(ScriptedProvider {
            script: vec![],
            refuse: Some(Error::provider(500, "should not be called")),
            hang: false,
        });
        let mut renderer = CapturingRenderer::default();
        let step = chat
            .handle_line("Exit", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(step, Step::Exit);
        assert!(chat.history().is_empty());
        assert!(renderer.errors.is_empty());
    }

    #[tokio::test]
    async fn empty_input_is_ignored() {
        let mut chat = session(ScriptedProvider::texts(&["x"]));
        let mut renderer = CapturingRenderer::default();
        let step = chat
            .handle_line("   ", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(step, Step::Continue);
        assert!(chat.history().is_empty());
        assert!(renderer.text.is_empty());
    }

    #[tokio::test]
    async fn failed_turn_leaves_history_alone() {
        let mut chat = session(ScriptedProvider {
            script: vec![
                Ok(StreamFragment::text("par")),
                Err(Error::decode("bad line", None)),
            ],
            refuse: None,
            hang: false,
        });
        let mut renderer = CapturingRenderer::default();
        let step = chat
            .handle_line("hello", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(step, Step::Continue);
        assert!(chat.history().is_empty());
        assert_eq!(renderer.text, "par");
        assert_eq!(renderer.errors.len(), 1);
    }

    #[tokio::test]
    async fn cancelled_turn_is_reported_as_interrupted() {
        let mut provider = ScriptedProvider::texts(&["slow"]);
        provider.script.pop();
        provider.hang = true;
        let mut chat = session(provider);
        let mut renderer = CapturingRenderer::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        chat.handle_line("hello", cancel, &mut renderer).await;
        assert_eq!(renderer.interrupted, 1);
        assert!(renderer.errors.is_empty());
        assert!(chat.history().is_empty());
    }

    #[tokio::test]
    async fn role_seeds_history_and_survives_clear() {
        let mut chat = ChatSession::new(
            Arc::new(ScriptedProvider::texts(&["ok"])),
            "m",
            Some("be terse".to_string()),
        );
        let mut renderer = CapturingRenderer::default();
        chat.handle_line("hi", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(chat.history().len(), 3);
        assert_eq!(chat.history().turns()[0].role(), Role::System);

        chat.handle_line("/clear", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(chat.history().turns(), &[ChatTurn::system("be terse")]);
        assert_eq!(renderer.info, vec!["Conversation cleared."]);
    }

    #[tokio::test]
    async fn history_command_lists_turns() {
        let mut chat = session(ScriptedProvider::texts(&["world"]));
        let mut renderer = CapturingRenderer::default();
        chat.handle_line("hello", CancellationToken::new(), &mut renderer)
            .await;
        chat.handle_line("/history", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(renderer.info, vec!["user: hello", "assistant: world"]);
    }

    #[tokio::test]
    async fn unknown_command_is_an_error_line() {
        let mut chat = session(ScriptedProvider::texts(&["x"]));
        let mut renderer = CapturingRenderer::default();
        chat.handle_line("/frobnicate", CancellationToken::new(), &mut renderer)
            .await;
        assert_eq!(renderer.errors.len(), 1);
        assert!(chat.history().is_empty());
    }
}
