use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use rodio::{Decoder, OutputStream, Sink};

use crate::SpeechError;

/// Plays a finished audio file on the host output device.
pub trait AudioPlayer: Send + Sync {
    /// Blocks until playback completes.
    fn play_wav(&self, path: &Path) -> crate::Result<()>;
}

/// Default-output-device playback via rodio.
pub struct RodioPlayer;

impl AudioPlayer for RodioPlayer {
    fn play_wav(&self, path: &Path) -> crate::Result<()> {
        let (_stream, handle) = OutputStream::try_default()
            .map_err(|e| SpeechError::Playback(format!("failed to open output device: {e}")))?;
        let sink = Sink::try_new(&handle)
            .map_err(|e| SpeechError::Playback(format!("failed to create sink: {e}")))?;

        let file = File::open(path)
            .map_err(|e| SpeechError::Playback(format!("failed to open audio file: {e}")))?;
        let source = Decoder::new(BufReader::new(file))
            .map_err(|e| SpeechError::Playback(format!("failed to decode audio: {e}")))?;

        sink.append(source);
        sink.sleep_until_end();
        Ok(())
    }
}
