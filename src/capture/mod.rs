pub mod backend;
pub mod file;
pub mod microphone;
pub mod recorder;

pub use backend::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
pub use file::FileBackend;
pub use microphone::MicrophoneBackend;
pub use recorder::{Recorder, RecorderState};
