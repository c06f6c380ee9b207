//! Drain worker: the single consumer of the capture frame channel.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use signbridge_stt::StreamingRecognizer;

/// How long the worker blocks waiting for a frame before re-checking.
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Transcript state shared between the worker and the controller.
///
/// `accumulated` only ever grows by finalized text; `partial` is the
/// current interim hypothesis and is rewritten freely.
#[derive(Debug, Default)]
pub(crate) struct Transcript {
    pub(crate) accumulated: String,
    pub(crate) partial: String,
}

impl Transcript {
    /// Append finalized text with single-space normalization.
    fn commit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if !self.accumulated.is_empty() {
            self.accumulated.push(' ');
        }
        self.accumulated.push_str(text);
    }
}

/// Consume frames until the capture side disconnects, then flush.
///
/// A recognizer error on one frame is logged and the frame skipped; the
/// session keeps running. The final flush happens after disconnect so
/// `stop` can join this thread and read a settled transcript.
pub(crate) fn drain_loop(
    frames: Receiver<Vec<i16>>,
    mut recognizer: Box<dyn StreamingRecognizer>,
    transcript: Arc<Mutex<Transcript>>,
) {
    loop {
        match frames.recv_timeout(DRAIN_INTERVAL) {
            Ok(frame) => match recognizer.accept_frame(&frame) {
                Ok(Some(result)) if result.is_final => {
                    let mut t = transcript.lock().expect("transcript mutex poisoned");
                    t.commit(&result.text);
                    t.partial.clear();
                }
                Ok(Some(result)) => {
                    let mut t = transcript.lock().expect("transcript mutex poisoned");
                    t.partial = result.text;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "recognizer rejected frame, continuing");
                }
            },
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    match recognizer.finalize() {
        Ok(text) => {
            let mut t = transcript.lock().expect("transcript mutex poisoned");
            t.commit(&text);
            t.partial.clear();
        }
        Err(e) => {
            tracing::warn!(error = %e, "final flush failed");
            let mut t = transcript.lock().expect("transcript mutex poisoned");
            t.partial.clear();
        }
    }
    tracing::debug!("drain worker finished");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_normalizes_spacing() {
        let mut t = Transcript::default();
        t.commit("  hello ");
        t.commit("world");
        t.commit("   ");
        assert_eq!(t.accumulated, "hello world");
    }

    #[test]
    fn test_commit_skips_empty_text() {
        let mut t = Transcript::default();
        t.commit("");
        assert_eq!(t.accumulated, "");
        t.commit("one");
        t.commit("");
        assert_eq!(t.accumulated, "one");
    }
}
