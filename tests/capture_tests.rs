// Integration tests for the recorder state machine
//
// These tests verify that recorded frames are concatenated in arrival
// order, that the capture stream is released exactly once per session, and
// that permission denial leaves no partial session behind.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use consult_client::capture::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, Recorder,
    RecorderState,
};
use consult_client::error::{ConsultError, Result};
use consult_client::AudioClip;
use tempfile::TempDir;
use tokio::sync::mpsc;

/// Capture backend that replays a fixed frame script, counting lifecycle
/// calls so tests can assert on the release-exactly-once invariant.
struct ScriptedBackend {
    frames: Vec<AudioFrame>,
    deny: bool,
    fail_stop: bool,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    capturing: bool,
}

impl ScriptedBackend {
    fn new(frames: Vec<AudioFrame>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let starts = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let backend = Self {
            frames,
            deny: false,
            fail_stop: false,
            starts: Arc::clone(&starts),
            stops: Arc::clone(&stops),
            capturing: false,
        };
        (backend, starts, stops)
    }
}

#[async_trait::async_trait]
impl CaptureBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.deny {
            return Err(ConsultError::PermissionDenied("access refused".to_string()));
        }

        let (tx, rx) = mpsc::channel(100);
        for frame in self.frames.clone() {
            tx.send(frame).await.expect("script channel closed early");
        }
        // tx drops here: the channel closes once every frame is consumed

        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.capturing = false;
        if self.fail_stop {
            return Err(ConsultError::PermissionDenied("stop failed".to_string()));
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
    AudioFrame {
        samples,
        sample_rate: 16000,
        channels: 1,
        timestamp_ms,
    }
}

fn clip_samples(clip: &AudioClip) -> Vec<i16> {
    let reader = hound::WavReader::new(Cursor::new(clip.data.clone()))
        .expect("finalized clip should be a valid WAV payload");
    reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .expect("finalized clip samples should read back")
}

#[tokio::test]
async fn test_finalized_clip_concatenates_frames_in_order() {
    let frames = vec![
        frame(vec![1, 2, 3], 0),
        frame(vec![4, 5], 100),
        frame(vec![6, 7, 8, 9], 200),
    ];
    let (backend, _, _) = ScriptedBackend::new(frames);
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    recorder.start_recording().await.unwrap();
    let clip = recorder
        .stop_recording()
        .await
        .unwrap()
        .expect("a recording was active");

    assert_eq!(clip.mime_type, "audio/wav");
    assert!(clip.name.starts_with("recording-"));
    assert!(clip.name.ends_with(".wav"));
    assert_eq!(
        clip_samples(&clip),
        vec![1, 2, 3, 4, 5, 6, 7, 8, 9],
        "payload must equal the ordered concatenation of all frames"
    );
}

#[tokio::test]
async fn test_stop_before_any_frame_yields_empty_valid_clip() {
    let (backend, _, _) = ScriptedBackend::new(Vec::new());
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    recorder.start_recording().await.unwrap();
    let clip = recorder
        .stop_recording()
        .await
        .unwrap()
        .expect("a recording was active");

    assert_eq!(clip_samples(&clip).len(), 0, "empty clip is valid, not an error");
    assert_eq!(recorder.state(), RecorderState::Idle);
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() {
    let (backend, _, stops) = ScriptedBackend::new(Vec::new());
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    let clip = recorder.stop_recording().await.unwrap();

    assert!(clip.is_none());
    assert_eq!(stops.load(Ordering::SeqCst), 0, "no session, nothing to release");
}

#[tokio::test]
async fn test_stream_released_exactly_once_per_session() {
    let (backend, starts, stops) = ScriptedBackend::new(vec![frame(vec![1], 0)]);
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    recorder.start_recording().await.unwrap();
    recorder.stop_recording().await.unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // A second stop has no session to release
    recorder.stop_recording().await.unwrap();
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // The device is free for a subsequent session
    recorder.start_recording().await.unwrap();
    recorder.stop_recording().await.unwrap();
    assert_eq!(starts.load(Ordering::SeqCst), 2);
    assert_eq!(stops.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_stop_yields_clip_even_when_backend_stop_fails() {
    let (mut backend, _, stops) = ScriptedBackend::new(vec![frame(vec![10, 20], 0)]);
    backend.fail_stop = true;
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    recorder.start_recording().await.unwrap();
    let clip = recorder.stop_recording().await.unwrap();

    assert!(clip.is_some(), "finalization proceeds past a failed stop");
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.state(), RecorderState::Idle);

    // And the recorder accepts a new session afterwards
    recorder.start_recording().await.unwrap();
    assert_eq!(recorder.state(), RecorderState::Recording);
}

#[tokio::test]
async fn test_start_while_recording_is_ignored() {
    let (backend, starts, _) = ScriptedBackend::new(vec![frame(vec![1], 0)]);
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    recorder.start_recording().await.unwrap();
    recorder.start_recording().await.unwrap();

    assert_eq!(starts.load(Ordering::SeqCst), 1, "second start must not reopen the stream");
    assert_eq!(recorder.state(), RecorderState::Recording);
}

#[tokio::test]
async fn test_permission_denied_retains_no_partial_session() {
    let (mut backend, _, stops) = ScriptedBackend::new(Vec::new());
    backend.deny = true;
    let mut recorder = Recorder::new(Box::new(backend), CaptureConfig::default());

    let err = recorder.start_recording().await.unwrap_err();
    assert!(matches!(err, ConsultError::PermissionDenied(_)));
    assert_eq!(recorder.state(), RecorderState::Idle);

    // Nothing was opened, so nothing needs releasing
    assert!(recorder.stop_recording().await.unwrap().is_none());
    assert_eq!(stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_file_backend_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let wav_path = temp_dir.path().join("question.wav");

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let source_samples: Vec<i16> = (0..4800).map(|i| (i % 97) as i16).collect();
    let mut writer = hound::WavWriter::create(&wav_path, spec).unwrap();
    for &sample in &source_samples {
        writer.write_sample(sample).unwrap();
    }
    writer.finalize().unwrap();

    let backend = CaptureBackendFactory::create(
        CaptureSource::File(wav_path),
        CaptureConfig::default(),
    )
    .unwrap();
    let mut recorder = Recorder::new(backend, CaptureConfig::default());

    recorder.start_recording().await.unwrap();

    // Give the file feeder time to replay the whole file before stopping
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let clip = recorder
        .stop_recording()
        .await
        .unwrap()
        .expect("a recording was active");

    assert_eq!(
        clip_samples(&clip),
        source_samples,
        "file-sourced clip must reproduce the file's samples in order"
    );
}
