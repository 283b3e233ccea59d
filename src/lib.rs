pub mod capture;
pub mod config;
pub mod controller;
pub mod error;
pub mod playback;
pub mod staging;
pub mod transport;

pub use capture::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource, FileBackend,
    MicrophoneBackend, Recorder, RecorderState,
};
pub use config::Config;
pub use controller::{ConsultationController, ConsultationOutcome, ControllerState, ControllerStats};
pub use error::ConsultError;
pub use playback::{
    DecodedAudio, DeviceOutput, NullOutput, PlaybackBackend, PlaybackManager, PlaybackResource,
};
pub use staging::{AudioClip, ImageAsset, InputStaging};
pub use transport::{
    ConsultationApi, ConsultationClient, ConsultationReply, SpeechReply, SpeechRequest,
};
