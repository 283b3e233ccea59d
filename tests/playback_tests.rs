// Integration tests for response-audio decoding and playback ownership
//
// These tests verify the mandatory base64 → container → PCM decode path and
// the one-resource-at-a-time contract of the playback manager.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::Engine;

use consult_client::error::Result;
use consult_client::playback::{
    decode_transport_audio, DecodedAudio, PlaybackBackend, PlaybackManager,
};
use consult_client::ConsultError;

/// Output backend that only counts calls; playback is not audible in tests.
struct CountingOutput {
    plays: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl CountingOutput {
    fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let plays = Arc::new(AtomicUsize::new(0));
        let stops = Arc::new(AtomicUsize::new(0));
        let output = Self {
            plays: Arc::clone(&plays),
            stops: Arc::clone(&stops),
        };
        (output, plays, stops)
    }
}

#[async_trait::async_trait]
impl PlaybackBackend for CountingOutput {
    async fn play(&mut self, _audio: &DecodedAudio) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Base64 WAV payload carrying the given samples, the way the service
/// encodes its spoken replies.
fn encoded_payload(samples: &[i16]) -> String {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &sample in samples {
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }

    base64::engine::general_purpose::STANDARD.encode(cursor.into_inner())
}

#[test]
fn test_decode_recovers_every_sample() {
    let samples: Vec<i16> = (0..1600).map(|i| ((i * 7) % 311) as i16 - 155).collect();
    let payload = encoded_payload(&samples);

    let decoded = decode_transport_audio(&payload).unwrap();

    assert_eq!(decoded.sample_rate, 16000);
    assert_eq!(decoded.channels, 1);
    assert_eq!(decoded.samples.len(), samples.len());
    assert_eq!(decoded.samples, samples);
}

#[test]
fn test_decode_rejects_invalid_base64() {
    let err = decode_transport_audio("!!! not base64 !!!").unwrap_err();
    assert!(matches!(err, ConsultError::Decode(_)));
}

#[test]
fn test_decode_rejects_non_audio_bytes() {
    let payload = base64::engine::general_purpose::STANDARD.encode(b"just some text, no container");
    let err = decode_transport_audio(&payload).unwrap_err();
    assert!(matches!(err, ConsultError::Decode(_)));
}

#[tokio::test]
async fn test_failed_decode_creates_no_resource() {
    let (output, _, _) = CountingOutput::new();
    let mut manager = PlaybackManager::new(Box::new(output));

    assert!(manager.load_from_encoded("corrupted").is_err());

    assert!(!manager.has_resource());
    assert!(manager.resource_id().is_none());
}

#[tokio::test]
async fn test_failed_decode_keeps_prior_resource() {
    let (output, _, _) = CountingOutput::new();
    let mut manager = PlaybackManager::new(Box::new(output));

    let id = manager.load_from_encoded(&encoded_payload(&[1, 2, 3])).unwrap();
    assert!(manager.load_from_encoded("corrupted").is_err());

    assert_eq!(manager.resource_id(), Some(id), "prior resource survives a bad load");
}

#[tokio::test]
async fn test_load_releases_prior_resource_before_replacing() {
    let (output, _, stops) = CountingOutput::new();
    let mut manager = PlaybackManager::new(Box::new(output));

    let first = manager.load_from_encoded(&encoded_payload(&[1, 2, 3])).unwrap();
    let second = manager.load_from_encoded(&encoded_payload(&[4, 5, 6])).unwrap();

    assert_ne!(first, second);
    assert_eq!(manager.resource_id(), Some(second));
    assert_eq!(stops.load(Ordering::SeqCst), 1, "first resource released exactly once");
}

#[tokio::test]
async fn test_play_restarts_and_release_stops() {
    let (output, plays, stops) = CountingOutput::new();
    let mut manager = PlaybackManager::new(Box::new(output));

    manager.load_from_encoded(&encoded_payload(&[1, 2, 3])).unwrap();

    manager.play().await.unwrap();
    manager.play().await.unwrap();
    assert_eq!(plays.load(Ordering::SeqCst), 2, "replay restarts, it does not queue");

    manager.release();
    assert!(!manager.has_resource());
    assert_eq!(stops.load(Ordering::SeqCst), 1);

    // Releasing again is harmless
    manager.release();
    assert_eq!(stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_play_without_resource_is_an_error() {
    let (output, plays, _) = CountingOutput::new();
    let mut manager = PlaybackManager::new(Box::new(output));

    let err = manager.play().await.unwrap_err();

    assert!(matches!(err, ConsultError::Playback(_)));
    assert_eq!(plays.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_the_manager_releases_its_resource() {
    let (output, _, stops) = CountingOutput::new();

    {
        let mut manager = PlaybackManager::new(Box::new(output));
        manager.load_from_encoded(&encoded_payload(&[7, 8, 9])).unwrap();
    }

    assert_eq!(stops.load(Ordering::SeqCst), 1, "drop releases the held resource");
}

#[test]
fn test_decoded_duration() {
    let decoded = decode_transport_audio(&encoded_payload(&vec![0i16; 16000])).unwrap();
    assert!((decoded.duration_seconds() - 1.0).abs() < 0.001, "16000 samples at 16kHz is one second");
}
