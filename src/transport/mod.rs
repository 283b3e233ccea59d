pub mod client;
pub mod messages;

pub use client::{ConsultationApi, ConsultationClient};
pub use messages::{
    AnalysisReply, ConsultationReply, ErrorReply, SpeechReply, SpeechRequest, TranscriptionReply,
};
