//! Decoding of newline-delimited JSON response streams.
//!
//! Both providers answer with one JSON object per line.  Ollama writes the object directly;
//! Mistral may put a `data: ` style prefix in front of it and interleaves keep-alive lines that
//! carry no JSON at all.  This module frames the byte stream into lines and turns every line
//! into zero or more [`StreamFragment`]s.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};

use crate::observability::{DECODE_ERRORS, STREAM_BYTES, STREAM_FRAGMENTS};
use crate::providers::{mistral, ollama};
use crate::{Error, Result, StreamFragment};

/// How each line of a response body is laid out.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireFormat {
    /// The whole line is a `{response, done}` object.
    Ndjson,
    /// The line holds a `{choices: [...]}` object starting at its first `{`.
    Prefixed,
}

/// What one line of the body said.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineRecord {
    /// Text carried by the line, if any.
    pub text: Option<String>,
    /// Whether the line ends the stream.
    pub done: bool,
}

impl WireFormat {
    /// Decode a single line with its terminator already removed.
    ///
    /// Returns `Ok(None)` for lines that carry nothing and should be skipped.
    pub fn decode_line(&self, line: &str) -> Result<Option<LineRecord>> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        match self {
            WireFormat::Ndjson => ollama::decode_line(line).map(Some),
            WireFormat::Prefixed => match line.find('{') {
                Some(start) => mistral::decode_line(&line[start..]).map(Some),
                None => Ok(None),
            },
        }
    }
}

struct DecoderState<S> {
    stream: S,
    buffer: Vec<u8>,
    pending: VecDeque<StreamFragment>,
    eof: bool,
    finished: bool,
}

impl<S> DecoderState<S> {
    /// Decode one framed line into the pending queue.
    fn absorb(&mut self, format: WireFormat, line: &[u8]) -> Result<()> {
        let line = std::str::from_utf8(line).map_err(|e| {
            Error::decode(
                format!("invalid UTF-8 in response line: {e}"),
                Some(Box::new(e)),
            )
        })?;
        let line = line.strip_suffix('\r').unwrap_or(line);
        let Some(record) = format.decode_line(line)? else {
            return Ok(());
        };
        if let Some(text) = record.text.filter(|t| !t.is_empty()) {
            STREAM_FRAGMENTS.click();
            STREAM_BYTES.count(text.len() as u64);
            self.pending.push_back(StreamFragment::text(text));
        }
        if record.done {
            self.pending.push_back(StreamFragment::terminal());
            self.finished = true;
        }
        Ok(())
    }

    /// Pull the next complete line out of the buffer, or the unterminated tail at end of body.
    fn next_line(&mut self) -> Option<Vec<u8>> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            return Some(line);
        }
        if self.eof && !self.buffer.is_empty() {
            return Some(std::mem::take(&mut self.buffer));
        }
        None
    }
}

/// Turn a response body into a stream of fragments.
///
/// The stream yields text fragments in arrival order, then the terminal fragment if the
/// provider sent one, then ends.  The first decoding error is yielded once and ends the stream;
/// nothing after a malformed line is read.  A body that ends without a terminal record simply
/// ends the stream.
pub fn decode_lines<S>(
    byte_stream: S,
    format: WireFormat,
) -> impl Stream<Item = Result<StreamFragment>>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    let state = DecoderState {
        stream: byte_stream,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        eof: false,
        finished: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((Ok(fragment), state));
            }
            if state.finished {
                return None;
            }

            if let Some(line) = state.next_line() {
                if let Err(e) = state.absorb(format, &line) {
                    DECODE_ERRORS.click();
                    state.finished = true;
                    state.pending.clear();
                    return Some((Err(e), state));
                }
                continue;
            }
            if state.eof {
                return None;
            }

            match state.stream.next().await {
                Some(Ok(bytes)) => state.buffer.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => state.eof = true,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(chunks: &[&'static str]) -> impl Stream<Item = Result<Bytes>> + Unpin {
        stream::iter(
            chunks
                .iter()
                .map(|c| Ok(Bytes::from_static(c.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(
        chunks: &[&'static str],
        format: WireFormat,
    ) -> Vec<Result<StreamFragment>> {
        decode_lines(body(chunks), format).collect().await
    }

    fn texts(items: &[Result<StreamFragment>]) -> Vec<String> {
        items
            .iter()
            .filter_map(|i| i.as_ref().ok())
            .filter(|f| !f.is_final)
            .map(|f| f.text.clone())
            .collect()
    }

    #[tokio::test]
    async fn ollama_lines_then_terminal() {
        let items = collect(
            &["{\"response\":\"Hel\",\"done\":false}\n{\"response\":\"lo\",\"done\":true}\n"],
            WireFormat::Ndjson,
        )
        .await;
        assert_eq!(texts(&items), vec!["Hel", "lo"]);
        assert_eq!(items.len(), 3);
        assert!(matches!(items.last(), Some(Ok(f)) if f.is_final));
    }

    #[tokio::test]
    async fn ollama_stops_reading_after_done() {
        let items = collect(
            &["{\"response\":\"a\",\"done\":true}\n{\"response\":\"b\",\"done\":false}\n"],
            WireFormat::Ndjson,
        )
        .await;
        assert_eq!(texts(&items), vec!["a"]);
    }

    #[tokio::test]
    async fn line_split_across_chunks() {
        let items = collect(
            &["{\"respon", "se\":\"Hi\",\"do", "ne\":false}\n", "{\"done\":true}\n"],
            WireFormat::Ndjson,
        )
        .await;
        assert_eq!(texts(&items), vec!["Hi"]);
        assert!(items.iter().all(|i| i.is_ok()));
    }

    #[tokio::test]
    async fn blank_lines_and_crlf_are_skipped() {
        let items = collect(
            &["\n\r\n{\"response\":\"x\",\"done\":false}\r\n\n"],
            WireFormat::Ndjson,
        )
        .await;
        assert_eq!(texts(&items), vec!["x"]);
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn end_of_body_without_done_is_a_normal_close() {
        let items = collect(&["{\"response\":\"x\",\"done\":false}"], WireFormat::Ndjson).await;
        assert_eq!(texts(&items), vec!["x"]);
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn mistral_prefixed_and_bare_lines() {
        let items = collect(
            &[
                "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"},\"finish_reason\":null}]}\n",
                "{\"choices\":[{\"delta\":{\"content\":\"!\"},\"finish_reason\":\"stop\"}]}\n",
            ],
            WireFormat::Prefixed,
        )
        .await;
        assert_eq!(texts(&items), vec!["Hi", "!"]);
        assert!(matches!(items.last(), Some(Ok(f)) if f.is_final));
    }

    #[tokio::test]
    async fn mistral_empty_choices_and_keepalives_are_skipped() {
        let items = collect(
            &[
                ": keep-alive\n",
                "data: {\"choices\":[]}\n",
                "data: [DONE]\n",
            ],
            WireFormat::Prefixed,
        )
        .await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn mistral_other_finish_reasons_do_not_terminate() {
        let items = collect(
            &[
                "data: {\"choices\":[{\"delta\":{\"content\":\"a\"},\"finish_reason\":\"length\"}]}\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"b\"},\"finish_reason\":null}]}\n",
            ],
            WireFormat::Prefixed,
        )
        .await;
        assert_eq!(texts(&items), vec!["a", "b"]);
        assert!(items.iter().all(|i| matches!(i, Ok(f) if !f.is_final)));
    }

    #[tokio::test]
    async fn malformed_line_yields_one_error_and_stops() {
        let items = collect(
            &[
                "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"},\"finish_reason\":null}]}\n",
                "data: {not json\n",
                "data: {\"choices\":[{\"delta\":{\"content\":\"never\"},\"finish_reason\":null}]}\n",
            ],
            WireFormat::Prefixed,
        )
        .await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(f) if f.text == "ok"));
        assert!(matches!(&items[1], Err(e) if e.is_decode()));
    }

    #[tokio::test]
    async fn ollama_garbage_line_is_a_decode_error() {
        let items = collect(&["hello there\n"], WireFormat::Ndjson).await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(e) if e.is_decode()));
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_decode_error() {
        let stream = stream::iter(vec![Ok(Bytes::from_static(b"\xff\xfe\n"))]);
        let items: Vec<_> = decode_lines(stream, WireFormat::Ndjson).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(&items[0], Err(e) if e.is_decode()));
    }

    #[tokio::test]
    async fn transport_error_ends_the_stream() {
        let stream = stream::iter(vec![
            Ok(Bytes::from_static(b"{\"response\":\"a\",\"done\":false}\n")),
            Err(Error::transport("connection reset", None)),
            Ok(Bytes::from_static(b"{\"response\":\"b\",\"done\":false}\n")),
        ]);
        let items: Vec<_> = decode_lines(stream, WireFormat::Ndjson).collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[1], Err(e) if e.is_transport()));
    }

    #[test]
    fn decode_line_skips_lines_without_brace() {
        assert_eq!(WireFormat::Prefixed.decode_line("event: ping").unwrap(), None);
        assert_eq!(WireFormat::Ndjson.decode_line("   ").unwrap(), None);
    }
}
