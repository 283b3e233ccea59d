pub mod decode;
pub mod manager;
pub mod output;

pub use decode::{decode_audio_bytes, decode_base64_audio, decode_transport_audio, DecodedAudio};
pub use manager::{PlaybackManager, PlaybackResource};
pub use output::{DeviceOutput, NullOutput, PlaybackBackend};
