//! The handoff between the network task and the display loop.
//!
//! [`spawn_relay`] starts one task that sends the request, decodes the response and pushes each
//! fragment's text into an ordered channel.  That task is the only writer of the text channel
//! and of the error signal; the [`RelayReceiver`] it returns is the only reader of both.
//!
//! The producer closes the text channel by dropping its sender when it finishes, which happens
//! after a terminal fragment, at end of body, or on error.  An error is placed on the error
//! signal *before* the text channel closes, so a consumer that sees the close can always pick
//! the error up right away.

use std::future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::observability::{RELAY_CANCELLATIONS, RELAY_ERRORS, STREAM_DURATION, STREAM_TTFF};
use crate::providers::Provider;
use crate::{Error, ProviderRequest, Result};

/// How a relayed request may be cut short.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    /// Cancelling this token aborts the request with [`Error::Cancelled`].
    pub cancel: CancellationToken,
    /// Abort the request with [`Error::Cancelled`] if it has not finished by then.
    pub deadline: Option<Duration>,
}

impl RelayOptions {
    /// Options that never cancel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `cancel` as the cancellation token.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Set a deadline for the whole request.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// The first thing the consumer hears about a request.
#[derive(Debug)]
pub enum FirstEvent {
    /// Text arrived.
    Fragment(String),
    /// The request failed before producing any text.
    Error(Error),
    /// The stream closed without producing any text.
    Closed,
}

enum Woke {
    Text(Option<String>),
    Error(Option<Error>),
}

/// The consumer end of a relay.
pub struct RelayReceiver {
    text: mpsc::UnboundedReceiver<String>,
    error: Option<oneshot::Receiver<Error>>,
    task: JoinHandle<()>,
}

impl RelayReceiver {
    /// Wait for the first of: a fragment, an error, or the close.
    pub async fn first(&mut self) -> FirstEvent {
        loop {
            let Some(error) = self.error.as_mut() else {
                return match self.text.recv().await {
                    Some(text) => FirstEvent::Fragment(text),
                    None => FirstEvent::Closed,
                };
            };
            let woke = tokio::select! {
                biased;
                text = self.text.recv() => Woke::Text(text),
                err = error => Woke::Error(err.ok()),
            };
            match woke {
                Woke::Text(Some(text)) => return FirstEvent::Fragment(text),
                Woke::Text(None) => {
                    return match self.take_error().await {
                        Some(err) => FirstEvent::Error(err),
                        None => FirstEvent::Closed,
                    };
                }
                Woke::Error(Some(err)) => {
                    self.error = None;
                    return FirstEvent::Error(err);
                }
                Woke::Error(None) => {
                    // The producer finished cleanly; only the text channel matters now.
                    self.error = None;
                }
            }
        }
    }

    /// The next fragment in arrival order, or `None` once the producer has closed the relay.
    pub async fn next(&mut self) -> Option<String> {
        self.text.recv().await
    }

    /// Drain whatever is left and report how the request ended.
    ///
    /// Text still queued is handed to `sink` in order before the outcome is returned.
    pub async fn finish(mut self, mut sink: impl FnMut(&str)) -> Result<()> {
        while let Some(text) = self.text.recv().await {
            sink(&text);
        }
        match self.take_error().await {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn take_error(&mut self) -> Option<Error> {
        match self.error.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }
}

impl Drop for RelayReceiver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start relaying `request` through `provider`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_relay(
    provider: Arc<dyn Provider>,
    request: ProviderRequest,
    options: RelayOptions,
) -> RelayReceiver {
    let (text_tx, text_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = oneshot::channel();

    let task = tokio::spawn(async move {
        let started = Instant::now();
        let deadline = async {
            match options.deadline {
                Some(deadline) => tokio::time::sleep(deadline).await,
                None => future::pending().await,
            }
        };
        let result = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => Err(Error::cancelled("request cancelled")),
            _ = deadline => Err(Error::cancelled(format!(
                "no complete response within {:?}",
                options.deadline.unwrap_or_default()
            ))),
            result = pump(provider.as_ref(), &request, &text_tx, started) => result,
        };
        STREAM_DURATION.add(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => tracing::debug!(provider = %provider.kind(), "relay closed"),
            Err(err) => {
                if err.is_cancelled() {
                    RELAY_CANCELLATIONS.click();
                } else {
                    RELAY_ERRORS.click();
                }
                tracing::warn!(provider = %provider.kind(), error = %err, "relay failed");
                let _ = error_tx.send(err);
            }
        }
        drop(text_tx);
    });

    RelayReceiver {
        text: text_rx,
        error: Some(error_rx),
        task,
    }
}

async fn pump(
    provider: &dyn Provider,
    request: &ProviderRequest,
    text_tx: &mpsc::UnboundedSender<String>,
    started: Instant,
) -> Result<()> {
    let mut fragments = provider.send(request).await?;
    let mut first = true;
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        if fragment.is_final {
            break;
        }
        if fragment.text.is_empty() {
            continue;
        }
        if first {
            STREAM_TTFF.add(started.elapsed().as_secs_f64());
            first = false;
        }
        if text_tx.send(fragment.text).is_err() {
            tracing::debug!("relay consumer went away");
            break;
        }
    }
    Ok(())
}
