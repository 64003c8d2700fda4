//! A one-line "still working" animation.
//!
//! The spinner owns its line of the terminal while it runs.  [`Spinner::stop`] does not return
//! until the animation task has erased that line and exited, so whatever is printed next never
//! interleaves with a spinner frame.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// The frames, in order.
pub const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];

/// Time between frames.
pub const TICK: Duration = Duration::from_millis(100);

/// Default text shown next to the glyph.
pub const LABEL: &str = "Generating response";

/// ANSI: return to column 0 and clear the line.
const ERASE_LINE: &str = "\r\x1b[2K";

/// A running spinner.
pub struct Spinner {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the default label.  Must be called from within a tokio runtime.
    pub fn start<W: Write + Send + 'static>(writer: W) -> Self {
        Self::with_label(writer, LABEL)
    }

    /// Start a spinner showing `label`.
    pub fn with_label<W: Write + Send + 'static>(mut writer: W, label: impl Into<String>) -> Self {
        let label = label.into();
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            let mut frame = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let _ = write!(writer, "\r{} {label}", FRAMES[frame]);
                        let _ = writer.flush();
                        frame = (frame + 1) % FRAMES.len();
                    }
                }
            }
            let _ = write!(writer, "{ERASE_LINE}");
            let _ = writer.flush();
        });
        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop the animation and wait until its line has been erased.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Run `future` with a spinner on `writer`, stopping the spinner before returning.
    ///
    /// ```
    /// # tokio_test::block_on(async {
    /// let answer = askme::Spinner::run_until(std::io::sink(), async { 42 }).await;
    /// assert_eq!(answer, 42);
    /// # });
    /// ```
    pub async fn run_until<W, F>(writer: W, future: F) -> F::Output
    where
        W: Write + Send + 'static,
        F: Future,
    {
        let spinner = Self::start(writer);
        let output = future.await;
        spinner.stop().await;
        output
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// A writer whose output can be inspected after it has been moved into a task.
    #[derive(Clone, Default)]
    pub(crate) struct SharedBuf(pub(crate) Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cycles_frames_then_erases() {
        let buf = SharedBuf::default();
        let spinner = Spinner::start(buf.clone());
        tokio::time::sleep(Duration::from_millis(350)).await;
        spinner.stop().await;

        let out = buf.contents();
        assert!(out.starts_with("\r| Generating response\r/ Generating response"));
        assert!(out.ends_with(ERASE_LINE));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_written_after_stop() {
        let buf = SharedBuf::default();
        let spinner = Spinner::start(buf.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;
        spinner.stop().await;
        let len = buf.contents().len();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(buf.contents().len(), len);
    }

    #[tokio::test(start_paused = true)]
    async fn run_until_stops_before_returning() {
        let buf = SharedBuf::default();
        let value = Spinner::run_until(buf.clone(), async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            42
        })
        .await;
        assert_eq!(value, 42);
        assert!(buf.contents().ends_with(ERASE_LINE));
    }

    #[tokio::test]
    async fn immediate_stop_still_erases() {
        let buf = SharedBuf::default();
        Spinner::with_label(buf.clone(), "Thinking").stop().await;
        assert!(buf.contents().ends_with(ERASE_LINE));
    }
}
