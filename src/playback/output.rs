use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::oneshot;
use tracing::{info, warn};

use super::decode::DecodedAudio;
use crate::error::{ConsultError, Result};

/// Output seam for decoded audio.
///
/// `play` always starts from the beginning; playing while already playing
/// restarts, it never queues.
#[async_trait::async_trait]
pub trait PlaybackBackend: Send + Sync {
    async fn play(&mut self, audio: &DecodedAudio) -> Result<()>;

    /// Stop playback and release the output stream. Idempotent.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Playback through the default cpal output device.
///
/// The cpal stream is not `Send`, so each playback runs on a worker thread
/// that owns the stream; the thread exiting releases the device.
pub struct DeviceOutput {
    worker: Option<PlaybackWorker>,
}

struct PlaybackWorker {
    stop_flag: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl DeviceOutput {
    pub fn new() -> Self {
        Self { worker: None }
    }

    fn shutdown_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop_flag.store(true, Ordering::Release);
            if worker.handle.join().is_err() {
                warn!("Playback worker panicked");
            }
        }
    }
}

impl Default for DeviceOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for DeviceOutput {
    async fn play(&mut self, audio: &DecodedAudio) -> Result<()> {
        // Restart semantics: tear down any current playback first.
        self.shutdown_worker();

        let samples = Arc::new(audio.samples.clone());
        let sample_rate = audio.sample_rate;
        let channels = audio.channels;

        let stop_flag = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = oneshot::channel();

        let thread_stop = Arc::clone(&stop_flag);
        let thread_done = Arc::clone(&done);
        let handle = std::thread::spawn(move || {
            run_playback(samples, sample_rate, channels, thread_stop, thread_done, ready_tx);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Playback started ({}Hz, {}ch)", sample_rate, channels);
                self.worker = Some(PlaybackWorker {
                    stop_flag,
                    done,
                    handle,
                });
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ConsultError::Playback(
                    "playback worker exited before startup".to_string(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        self.shutdown_worker();
    }

    fn is_playing(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|w| !w.done.load(Ordering::Acquire))
    }

    fn name(&self) -> &str {
        "device-output"
    }
}

fn run_playback(
    samples: Arc<Vec<i16>>,
    sample_rate: u32,
    channels: u16,
    stop_flag: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let host = cpal::default_host();
    let device = match host.default_output_device() {
        Some(device) => device,
        None => {
            let _ = ready_tx.send(Err(ConsultError::Playback(
                "no output device available".to_string(),
            )));
            return;
        }
    };

    let config = cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let total = samples.len();
    let mut position = 0usize;
    let callback_done = Arc::clone(&done);

    let stream = match device.build_output_stream(
        &config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for slot in data.iter_mut() {
                if position < total {
                    *slot = samples[position] as f32 / i16::MAX as f32;
                    position += 1;
                } else {
                    *slot = 0.0;
                    callback_done.store(true, Ordering::Release);
                }
            }
        },
        |err| {
            warn!("Output stream error: {}", err);
        },
        None,
    ) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(ConsultError::Playback(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(ConsultError::Playback(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    while !stop_flag.load(Ordering::Acquire) && !done.load(Ordering::Acquire) {
        std::thread::sleep(Duration::from_millis(50));
    }

    done.store(true, Ordering::Release);

    // Dropping the stream releases the device.
    drop(stream);
}

/// Discards audio. Used in headless environments and tests.
#[derive(Debug, Default)]
pub struct NullOutput {
    plays: usize,
}

impl NullOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of play calls accepted so far
    pub fn plays(&self) -> usize {
        self.plays
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for NullOutput {
    async fn play(&mut self, audio: &DecodedAudio) -> Result<()> {
        self.plays += 1;
        info!(
            "Discarding playback of {:.1}s of audio (null output)",
            audio.duration_seconds()
        );
        Ok(())
    }

    fn stop(&mut self) {}

    fn is_playing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "null-output"
    }
}
