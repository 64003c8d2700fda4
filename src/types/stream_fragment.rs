/// One decoded record of a response stream.
///
/// Non-final fragments carry generated text.  A final fragment marks the end of the stream and
/// may carry no text at all; the producer closes the relay once it sees one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    /// The incremental text.
    pub text: String,
    /// Whether this fragment terminates the stream.
    pub is_final: bool,
}

impl StreamFragment {
    /// A fragment carrying generated text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
        }
    }

    /// The terminal fragment.
    pub fn terminal() -> Self {
        Self {
            text: String::new(),
            is_final: true,
        }
    }
}
