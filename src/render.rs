//! Output rendering for streamed responses.
//!
//! The [`Renderer`] trait is the only way the rest of the crate writes to the terminal's
//! standard output.  [`PlainTextRenderer`] is the stock implementation.

use std::io::{self, Write};

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for the orange used on the header border.
const ANSI_ORANGE: &str = "\x1b[38;5;214m";

/// What the startup header shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    /// The provider name.
    pub provider: String,
    /// The model identifier.
    pub model: String,
    /// Whether project context mode is on.
    pub context_mode: bool,
}

impl Banner {
    fn lines(&self) -> [String; 3] {
        [
            format!("Provider: {}", self.provider),
            format!("Model: {}", self.model),
            format!("Context Mode: {}", self.context_mode),
        ]
    }
}

/// Trait for rendering a response as it streams in.
pub trait Renderer: Send {
    /// Print a chunk of response text.
    ///
    /// This is called once per fragment, in arrival order.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print the question being answered, ahead of its answer.
    fn print_question(&mut self, question: &str) {
        self.print_info(&format!("Question: {question}"));
    }

    /// Print the startup header.
    fn print_banner(&mut self, banner: &Banner);

    /// Called when a response completes.
    fn finish_response(&mut self);

    /// Called when a response is cut short by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    out: Box<dyn Write + Send>,
    use_color: bool,
    at_line_start: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::to_writer(io::stdout(), use_color)
    }

    /// Creates a renderer writing to `out`.
    pub fn to_writer<W: Write + Send + 'static>(out: W, use_color: bool) -> Self {
        Self {
            out: Box::new(out),
            use_color,
            at_line_start: true,
        }
    }

    /// Flushes so streamed content shows up immediately.
    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        self.at_line_start = text.ends_with('\n');
    }

    fn break_line(&mut self) {
        if !self.at_line_start {
            self.write("\n");
        }
    }

    fn styled(&self, style: &str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_text(&mut self, text: &str) {
        self.write(text);
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        self.break_line();
        let line = self.styled(ANSI_RED, &format!("Error: {error}"));
        self.write(&line);
        self.write("\n");
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.break_line();
        let line = self.styled(ANSI_DIM, info);
        self.write(&line);
        self.write("\n");
        self.flush();
    }

    fn print_question(&mut self, question: &str) {
        self.break_line();
        let label = self.styled(ANSI_BOLD, "Question:");
        self.write(&format!("{label} {question}\n\n"));
        self.flush();
    }

    fn print_banner(&mut self, banner: &Banner) {
        self.break_line();
        let lines = banner.lines();
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let rule = "─".repeat(width);
        let top = self.styled(ANSI_ORANGE, &format!("╭{rule}╮"));
        let side = self.styled(ANSI_ORANGE, "│");
        let bottom = self.styled(ANSI_ORANGE, &format!("╰{rule}╯"));
        let mut out = format!("{top}\n");
        for line in &lines {
            let pad = width - 1 - line.chars().count();
            out.push_str(&format!("{side} {line}{:pad$}{side}\n", ""));
        }
        out.push_str(&bottom);
        out.push('\n');
        self.write(&out);
        self.flush();
    }

    fn finish_response(&mut self) {
        self.break_line();
        self.flush();
    }

    fn print_interrupted(&mut self) {
        self.break_line();
        self.write("[interrupted]\n");
        self.flush();
    }
}
