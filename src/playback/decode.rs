use std::io::Cursor;

use base64::Engine;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as FormatError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

use crate::error::{ConsultError, Result};

/// Interleaved 16-bit PCM decoded from a transport payload.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Decode the base64 transport encoding to raw container bytes.
pub fn decode_base64_audio(payload: &str) -> Result<Vec<u8>> {
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| ConsultError::Decode(format!("invalid base64 payload: {e}")))
}

/// Decode container-framed audio bytes (MP3, WAV, OGG, ...) to PCM.
pub fn decode_audio_bytes(bytes: Vec<u8>) -> Result<DecodedAudio> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| ConsultError::Decode(format!("unrecognized audio payload: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ConsultError::Decode("no decodable audio track".to_string()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| ConsultError::Decode(format!("unsupported codec: {e}")))?;

    let mut samples = Vec::new();
    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(FormatError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(FormatError::ResetRequired) => break,
            Err(e) => return Err(ConsultError::Decode(format!("corrupt audio payload: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| ConsultError::Decode(format!("corrupt audio payload: {e}")))?;

        let spec = *decoded.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count() as u16;

        let mut buffer = SampleBuffer::<i16>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if sample_rate == 0 || channels == 0 {
        return Err(ConsultError::Decode(
            "payload carries no audio parameters".to_string(),
        ));
    }

    info!(
        "Decoded response audio: {} samples, {}Hz, {}ch",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
    })
}

/// Base64 → container → PCM in one step. This is the mandatory decode on
/// the playback path; nothing plays a transport payload directly.
pub fn decode_transport_audio(payload: &str) -> Result<DecodedAudio> {
    decode_audio_bytes(decode_base64_audio(payload)?)
}
