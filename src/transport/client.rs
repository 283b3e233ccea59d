use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::info;

use super::messages::{
    AnalysisReply, ConsultationReply, ErrorReply, SpeechReply, SpeechRequest, TranscriptionReply,
};
use crate::config::EndpointConfig;
use crate::error::{ConsultError, Result};
use crate::staging::{AudioClip, ImageAsset};

/// The controller's view of the consultation service. Tests substitute a
/// scripted implementation.
#[async_trait]
pub trait ConsultationApi: Send + Sync {
    /// Submit whichever of {audio, image} are staged as one multipart
    /// request. At least one part must be present.
    async fn submit_full_consultation(
        &self,
        audio: Option<AudioClip>,
        image: Option<ImageAsset>,
    ) -> Result<ConsultationReply>;

    /// Ask the service to voice `text`. Returns the base64 audio payload.
    async fn synthesize_speech(&self, text: &str, language: &str) -> Result<String>;
}

/// HTTP client for the consultation service endpoints.
pub struct ConsultationClient {
    http: reqwest::Client,
    endpoints: EndpointConfig,
}

impl ConsultationClient {
    pub fn new(endpoints: EndpointConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoints.request_timeout_secs))
            .build()
            .map_err(|e| ConsultError::Transport(e.to_string()))?;

        Ok(Self { http, endpoints })
    }

    /// Dedicated transcription endpoint: one `audio` part in, text out.
    pub async fn transcribe_audio(&self, clip: AudioClip) -> Result<TranscriptionReply> {
        info!("Submitting {} for transcription", clip.name);

        let form = attach_part(Form::new(), "audio", clip.data, clip.name, &clip.mime_type)?;
        let response = self
            .http
            .post(&self.endpoints.transcription_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConsultError::Transport(e.to_string()))?;

        parse_reply(response).await
    }

    /// Dedicated image-analysis endpoint: one `image` part plus an optional
    /// analysis prompt.
    pub async fn analyze_image(
        &self,
        image: ImageAsset,
        query: Option<&str>,
    ) -> Result<AnalysisReply> {
        info!("Submitting {} for analysis", image.name);

        let mut form = attach_part(Form::new(), "image", image.data, image.name, &image.mime_type)?;
        if let Some(query) = query {
            form = form.text("query", query.to_string());
        }

        let response = self
            .http
            .post(&self.endpoints.image_analysis_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConsultError::Transport(e.to_string()))?;

        parse_reply(response).await
    }
}

#[async_trait]
impl ConsultationApi for ConsultationClient {
    async fn submit_full_consultation(
        &self,
        audio: Option<AudioClip>,
        image: Option<ImageAsset>,
    ) -> Result<ConsultationReply> {
        if audio.is_none() && image.is_none() {
            return Err(ConsultError::MissingInput);
        }

        let mut form = Form::new();
        let mut parts: Vec<&str> = Vec::new();

        if let Some(clip) = audio {
            form = attach_part(form, "audio", clip.data, clip.name, &clip.mime_type)?;
            parts.push("audio");
        }
        if let Some(asset) = image {
            form = attach_part(form, "image", asset.data, asset.name, &asset.mime_type)?;
            parts.push("image");
        }

        info!("Submitting consultation ({})", parts.join("+"));

        let response = self
            .http
            .post(&self.endpoints.consultation_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConsultError::Transport(e.to_string()))?;

        let reply: ConsultationReply = parse_reply(response).await?;

        info!(
            "Consultation reply received (transcription: {}, analysis: {}, audio: {})",
            reply.transcription.is_some(),
            reply.analysis.is_some(),
            reply.has_response_audio()
        );

        Ok(reply)
    }

    async fn synthesize_speech(&self, text: &str, language: &str) -> Result<String> {
        info!("Requesting speech synthesis ({} chars, {})", text.len(), language);

        let request = SpeechRequest {
            text: text.to_string(),
            language: language.to_string(),
        };

        let response = self
            .http
            .post(&self.endpoints.speech_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ConsultError::Transport(e.to_string()))?;

        let reply: SpeechReply = parse_reply(response).await?;
        Ok(reply.audio)
    }
}

fn attach_part(
    form: Form,
    field: &str,
    data: Vec<u8>,
    file_name: String,
    mime_type: &str,
) -> Result<Form> {
    let part = Part::bytes(data)
        .file_name(file_name)
        .mime_str(mime_type)
        .map_err(|e| ConsultError::Transport(format!("invalid mime type: {e}")))?;

    Ok(form.part(field.to_string(), part))
}

/// Turn a response into its JSON body, or into `Service` carrying the
/// endpoint's own error message verbatim.
async fn parse_reply<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let message = match response.json::<ErrorReply>().await {
            Ok(body) => body.error,
            Err(_) => format!("endpoint returned {status}"),
        };
        return Err(ConsultError::Service { message });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ConsultError::Transport(format!("invalid response body: {e}")))
}
