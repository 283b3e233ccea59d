use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::{ConsultError, Result};

/// Microphone capture via the default cpal input device.
///
/// The cpal stream is not `Send`, so it lives on a dedicated worker thread;
/// the thread exiting is what releases the device. Frames follow the device
/// callback granularity and arrive in callback order.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    async fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.stop_flag.store(true, Ordering::Release);
            let joined = tokio::task::spawn_blocking(move || worker.join()).await;
            if joined.map(|r| r.is_err()).unwrap_or(true) {
                warn!("Capture worker did not shut down cleanly");
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        // A stale worker means a previous session was not stopped; release
        // it before opening the device again.
        self.join_worker().await;

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = oneshot::channel();

        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);
        let config = self.config.clone();

        let worker = std::thread::spawn(move || {
            let stream = match open_input_stream(&config, frame_tx) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    stream
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            while !stop_flag.load(Ordering::Acquire) {
                std::thread::sleep(Duration::from_millis(50));
            }

            // Dropping the stream releases the device; the frame sender
            // drops with this scope, which closes the channel.
            drop(stream);
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("Microphone capture started");
                self.worker = Some(worker);
                Ok(frame_rx)
            }
            Ok(Err(e)) => {
                let _ = worker.join();
                Err(e)
            }
            Err(_) => {
                let _ = worker.join();
                Err(ConsultError::PermissionDenied(
                    "capture worker exited before startup".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        if self.worker.is_some() {
            info!("Stopping microphone capture");
            self.join_worker().await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some() && !self.stop_flag.load(Ordering::Acquire)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

/// Open the default input device and start streaming frames into `frames`.
///
/// Any failure to acquire the device is reported as `PermissionDenied`:
/// from the pipeline's perspective a missing device and a refused grant are
/// the same recoverable condition.
fn open_input_stream(
    config: &CaptureConfig,
    frames: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host.default_input_device().ok_or_else(|| {
        ConsultError::PermissionDenied("no input device available".to_string())
    })?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!("Opening input device: {}", device_name);

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let sample_rate = config.sample_rate;
    let channels = config.channels;
    let mut emitted_samples: u64 = 0;

    let stream = device
        .build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s * i16::MAX as f32) as i16)
                    .collect();

                let timestamp_ms =
                    emitted_samples * 1000 / (sample_rate as u64 * channels as u64);
                emitted_samples += samples.len() as u64;

                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                };

                // Frames are dropped if the receiver is gone or saturated;
                // capture itself keeps running until stopped.
                let _ = frames.try_send(frame);
            },
            |err| {
                warn!("Input stream error: {}", err);
            },
            None,
        )
        .map_err(|e| ConsultError::PermissionDenied(e.to_string()))?;

    stream
        .play()
        .map_err(|e| ConsultError::PermissionDenied(e.to_string()))?;

    Ok(stream)
}
