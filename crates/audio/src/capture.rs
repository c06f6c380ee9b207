use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::{FRAME_SAMPLES, SAMPLE_RATE};

/// Frames the drain worker can fall behind before the callback starts
/// dropping audio (32 frames = 16 seconds at the default frame size).
const DEFAULT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Default)]
pub struct CaptureConfig {
    /// Input device name; `None` selects the host default.
    pub device: Option<String>,
}

/// A live microphone capture stream.
///
/// Audio arrives on the OS audio callback, is downmixed to mono, resampled
/// to 16kHz and re-chunked into fixed [`FRAME_SAMPLES`]-sample i16 frames
/// pushed into a bounded channel. The callback never blocks: when the
/// consumer falls behind, frames are dropped and counted.
///
/// cpal streams are not `Send`, so the stream lives on its own thread and
/// is torn down when `MicCapture` is dropped.
pub struct MicCapture {
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    receiver: Option<Receiver<Vec<i16>>>,
    dropped_frames: Arc<AtomicU64>,
}

impl MicCapture {
    pub fn open(config: CaptureConfig) -> crate::Result<Self> {
        let (frame_tx, frame_rx) = bounded::<Vec<i16>>(DEFAULT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);
        let (ready_tx, ready_rx) = bounded::<crate::Result<()>>(1);

        let dropped_frames = Arc::new(AtomicU64::new(0));
        let dropped = dropped_frames.clone();

        let thread = std::thread::spawn(move || {
            let host = cpal::default_host();
            let stream = match crate::device::input_device(&host, config.device.as_deref())
                .and_then(|device| build_capture_stream(&device, frame_tx, dropped))
            {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            // Park until MicCapture drops its end; the stream (and with it
            // the frame sender) is dropped on the way out, which disconnects
            // the frame channel and lets the consumer drain and finish.
            let _ = shutdown_rx.recv();
            drop(stream);
            tracing::debug!("capture stream closed");
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                shutdown_tx: Some(shutdown_tx),
                thread: Some(thread),
                receiver: Some(frame_rx),
                dropped_frames,
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(crate::AudioError::StreamError(
                    "capture thread exited before the stream came up".to_string(),
                ))
            }
        }
    }

    /// Take the frame receiver out of this capture (can only be called once).
    ///
    /// The receiver supports blocking `recv()` and `recv_timeout()` for
    /// efficient single-consumer use without polling.
    pub fn take_receiver(&mut self) -> Option<Receiver<Vec<i16>>> {
        self.receiver.take()
    }

    /// Frames dropped because the consumer fell behind.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.receiver.take();
        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        let dropped = self.dropped_frames.load(Ordering::Relaxed);
        if dropped > 0 {
            tracing::warn!(dropped, "capture closed with dropped frames");
        }
    }
}

fn build_capture_stream(
    device: &cpal::Device,
    tx: Sender<Vec<i16>>,
    dropped: Arc<AtomicU64>,
) -> crate::Result<cpal::Stream> {
    let config = device.default_input_config().map_err(|e| {
        crate::AudioError::StreamError(format!("failed to get default config: {e}"))
    })?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    tracing::info!(
        device = device.name().as_deref().unwrap_or("unknown"),
        sample_rate,
        channels,
        "opening capture stream"
    );

    let pipeline = Arc::new(Mutex::new(FramePipeline::new(sample_rate)));

    let stream = match config.sample_format() {
        SampleFormat::F32 => {
            let pipeline = pipeline.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[f32], _| {
                    if let Ok(mut p) = pipeline.lock() {
                        p.push(data, channels, &tx, &dropped);
                    }
                },
                |err| tracing::error!("capture stream error: {}", err),
                None,
            )?
        }
        SampleFormat::I16 => {
            let pipeline = pipeline.clone();
            device.build_input_stream(
                &config.into(),
                move |data: &[i16], _| {
                    let float: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                    if let Ok(mut p) = pipeline.lock() {
                        p.push(&float, channels, &tx, &dropped);
                    }
                },
                |err| tracing::error!("capture stream error: {}", err),
                None,
            )?
        }
        format => {
            return Err(crate::AudioError::StreamError(format!(
                "unsupported sample format: {format:?}"
            )));
        }
    };

    stream
        .play()
        .map_err(|e| crate::AudioError::StreamError(format!("failed to start stream: {e}")))?;

    Ok(stream)
}

/// Mono downmix, resample to 16kHz and re-chunk into fixed i16 frames.
struct FramePipeline {
    resampler: Option<SincResampler>,
    source_rate: u32,
    pending: Vec<i16>,
}

impl FramePipeline {
    fn new(source_rate: u32) -> Self {
        let resampler = if source_rate != SAMPLE_RATE {
            SincResampler::new(source_rate, SAMPLE_RATE)
        } else {
            None
        };
        Self {
            resampler,
            source_rate,
            pending: Vec::with_capacity(FRAME_SAMPLES),
        }
    }

    fn push(
        &mut self,
        samples: &[f32],
        channels: usize,
        tx: &Sender<Vec<i16>>,
        dropped: &AtomicU64,
    ) {
        let mono = if channels > 1 {
            to_mono(samples, channels)
        } else {
            samples.to_vec()
        };

        let at_16k = match self.resampler.as_mut() {
            Some(r) => r.process(&mono),
            None if self.source_rate != SAMPLE_RATE => {
                resample_linear(&mono, self.source_rate, SAMPLE_RATE)
            }
            None => mono,
        };

        for &sample in &at_16k {
            let clamped = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
            self.pending.push(clamped);
            if self.pending.len() == FRAME_SAMPLES {
                let frame = std::mem::replace(&mut self.pending, Vec::with_capacity(FRAME_SAMPLES));
                match tx.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        let n = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        if n == 1 || n % 64 == 0 {
                            tracing::warn!(dropped = n, "frame channel full, dropping audio");
                        }
                    }
                    // Receiver is gone; the stream is being torn down.
                    Err(TrySendError::Disconnected(_)) => {}
                }
            }
        }
    }
}

#[inline]
fn to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    let mut output = Vec::with_capacity(samples.len() / channels);
    let inv_channels = 1.0 / channels as f32;
    for chunk in samples.chunks_exact(channels) {
        let sum: f32 = chunk.iter().sum();
        output.push(sum * inv_channels);
    }
    output
}

/// Linear interpolation resampling (fallback when the sinc resampler
/// cannot be constructed for a rate pair).
fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let ratio = to_rate as f64 / from_rate as f64;
    let new_len = (samples.len() as f64 * ratio) as usize;
    let mut output = Vec::with_capacity(new_len);
    for i in 0..new_len {
        let src_idx = i as f64 / ratio;
        let idx = src_idx.floor() as usize;
        let frac = src_idx.fract() as f32;
        let sample = if idx + 1 < samples.len() {
            samples[idx] * (1.0 - frac) + samples[idx + 1] * frac
        } else if idx < samples.len() {
            samples[idx]
        } else {
            0.0
        };
        output.push(sample);
    }
    output
}

use rubato::{FftFixedIn, Resampler as RubatoResampler};

/// Wrapper for the rubato sinc resampler with buffering for variable
/// callback sizes.
struct SincResampler {
    resampler: FftFixedIn<f32>,
    input_buffer: Vec<f32>,
    chunk_size: usize,
}

impl SincResampler {
    fn new(from_rate: u32, to_rate: u32) -> Option<Self> {
        let chunk_size = 256;
        let resampler =
            FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, 1).ok()?;
        Some(Self {
            resampler,
            input_buffer: Vec::with_capacity(chunk_size * 2),
            chunk_size,
        })
    }

    fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        self.input_buffer.extend_from_slice(samples);

        let mut output = Vec::new();
        while self.input_buffer.len() >= self.chunk_size {
            let chunk: Vec<f32> = self.input_buffer.drain(..self.chunk_size).collect();
            if let Ok(resampled) = self.resampler.process(&[chunk], None) {
                if !resampled.is_empty() {
                    output.extend_from_slice(&resampled[0]);
                }
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_frames(pipeline: &mut FramePipeline, samples: &[f32]) -> Vec<Vec<i16>> {
        let (tx, rx) = bounded(16);
        let dropped = AtomicU64::new(0);
        pipeline.push(samples, 1, &tx, &dropped);
        drop(tx);
        rx.into_iter().collect()
    }

    #[test]
    fn test_chunks_into_fixed_frames() {
        let mut pipeline = FramePipeline::new(SAMPLE_RATE);
        let frames = collect_frames(&mut pipeline, &vec![0.0; FRAME_SAMPLES * 2 + 100]);
        assert_eq!(frames.len(), 2);
        assert!(frames.iter().all(|f| f.len() == FRAME_SAMPLES));
        // The 100-sample remainder stays pending for the next callback.
        assert_eq!(pipeline.pending.len(), 100);
    }

    #[test]
    fn test_i16_conversion_clamps() {
        let mut pipeline = FramePipeline::new(SAMPLE_RATE);
        let mut samples = vec![2.0f32; FRAME_SAMPLES];
        samples[0] = -2.0;
        samples[1] = 0.5;
        let frames = collect_frames(&mut pipeline, &samples);
        assert_eq!(frames[0][0], -32767);
        assert_eq!(frames[0][1], 16383);
        assert_eq!(frames[0][2], 32767);
    }

    #[test]
    fn test_full_channel_drops_and_counts() {
        let mut pipeline = FramePipeline::new(SAMPLE_RATE);
        let (tx, rx) = bounded(1);
        let dropped = AtomicU64::new(0);
        pipeline.push(&vec![0.0; FRAME_SAMPLES * 3], 1, &tx, &dropped);
        assert_eq!(rx.len(), 1);
        assert_eq!(dropped.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_stereo_downmix() {
        let samples = vec![1.0, 0.0, 0.5, 0.5];
        assert_eq!(to_mono(&samples, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn test_linear_resample_halves_length() {
        let samples = vec![0.0f32; 32000];
        let out = resample_linear(&samples, 32000, 16000);
        assert_eq!(out.len(), 16000);
    }
}
