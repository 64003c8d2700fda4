//! One request/response turn, from dispatch to the last printed fragment.
//!
//! The spinner runs from dispatch until the first event of the relay.  It is stopped, and its
//! line erased, before anything else reaches the renderer.

use std::io::Write;
use std::sync::Arc;

use crate::providers::Provider;
use crate::relay::{FirstEvent, RelayOptions, spawn_relay};
use crate::render::Renderer;
use crate::spinner::Spinner;
use crate::{ProviderRequest, Result};

/// Presentation knobs for a single turn.
#[derive(Default)]
pub struct TurnDisplay {
    /// Where to draw the spinner, if anywhere.
    pub spinner: Option<Box<dyn Write + Send>>,
    /// A question to echo once the answer starts.
    pub question: Option<String>,
}

impl TurnDisplay {
    /// No spinner and no echoed question.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Draw the spinner on `writer`.
    pub fn with_spinner<W: Write + Send + 'static>(mut self, writer: W) -> Self {
        self.spinner = Some(Box::new(writer));
        self
    }

    /// Echo `question` ahead of the answer.
    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }
}

/// Run one turn and return the full response text.
///
/// Every fragment is handed to `renderer` as it arrives.  On error, whatever was already printed
/// stays printed and the error is returned for the caller to report.
pub async fn stream_turn(
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    options: RelayOptions,
    display: TurnDisplay,
    renderer: &mut dyn Renderer,
) -> Result<String> {
    let mut relay = spawn_relay(provider, request, options);
    let spinner = display.spinner.map(Spinner::start);
    let first = relay.first().await;
    if let Some(spinner) = spinner {
        spinner.stop().await;
    }

    let mut response = String::new();
    match first {
        FirstEvent::Error(err) => return Err(err),
        FirstEvent::Closed => {
            tracing::debug!("response closed without text");
        }
        FirstEvent::Fragment(text) => {
            if let Some(question) = &display.question {
                renderer.print_question(question);
            }
            renderer.print_text(&text);
            response.push_str(&text);
            while let Some(text) = relay.next().await {
                renderer.print_text(&text);
                response.push_str(&text);
            }
        }
    }
    relay.finish(|text| {
        renderer.print_text(text);
        response.push_str(text);
    })
    .await?;
    renderer.finish_response();
    Ok(response)
}
