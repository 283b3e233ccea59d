use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub endpoints: EndpointConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Full-consultation endpoint (multipart POST)
    pub consultation_url: String,
    /// Speech-synthesis endpoint (JSON POST)
    pub speech_url: String,
    /// Dedicated transcription endpoint (multipart POST)
    pub transcription_url: String,
    /// Dedicated image-analysis endpoint (multipart POST)
    pub image_analysis_url: String,
    /// Language passed to speech synthesis
    pub speech_language: String,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "consult-client".to_string(),
            },
            endpoints: EndpointConfig::default(),
            audio: AudioConfig {
                sample_rate: 16000,
                channels: 1,
            },
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            consultation_url: "http://localhost:5000/api/ai/full-consultation".to_string(),
            speech_url: "http://localhost:5000/api/ai/text-to-speech".to_string(),
            transcription_url: "http://localhost:5000/api/ai/transcribe".to_string(),
            image_analysis_url: "http://localhost:5000/api/ai/image-analysis".to_string(),
            speech_language: "en".to_string(),
            request_timeout_secs: 60,
        }
    }
}
