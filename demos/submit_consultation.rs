// Example: Run one full consultation against a live endpoint
//
// This example demonstrates the complete pipeline:
// 1. Record a question from the microphone, or stage a clip from disk
// 2. Optionally stage an image alongside it
// 3. Submit everything as one multipart consultation request
// 4. Print the transcription and analysis from the reply
// 5. Decode and play the spoken response, if one came back
//
// Usage: cargo run --example submit_consultation -- --audio question.wav --image rash.png
//        cargo run --example submit_consultation -- --record 5 --image rash.png
//
// The endpoint defaults to a local consultation service on port 5000.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use consult_client::{
    AudioClip, CaptureBackendFactory, CaptureConfig, CaptureSource, ConsultationClient,
    ConsultationController, Config, DeviceOutput, ImageAsset, Recorder,
};
use tokio::time::sleep;
use tracing::{info, warn, Level};

#[derive(Parser)]
#[command(name = "submit_consultation")]
#[command(about = "Submit one audio/image consultation and play the reply")]
struct Args {
    /// Audio clip to submit
    #[arg(short, long)]
    audio: Option<String>,

    /// Record this many seconds from the microphone instead of --audio
    #[arg(short, long)]
    record: Option<u64>,

    /// Image to submit
    #[arg(short, long)]
    image: Option<String>,

    /// Config file to load endpoint addresses from
    #[arg(short, long)]
    config: Option<String>,

    /// Seconds to keep the process alive for playback
    #[arg(short, long, default_value = "30")]
    playback_wait: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    info!("Consult Client - Full Consultation Example");
    info!("Consultation endpoint: {}", cfg.endpoints.consultation_url);

    let api = Arc::new(ConsultationClient::new(cfg.endpoints.clone())?);
    let controller = ConsultationController::new(
        api,
        Box::new(DeviceOutput::new()),
        cfg.endpoints.speech_language.clone(),
    );

    // Capture live, or stage whatever the user supplied
    if let Some(seconds) = args.record {
        let backend =
            CaptureBackendFactory::create(CaptureSource::Microphone, CaptureConfig::default())?;
        controller
            .attach_recorder(Recorder::new(backend, CaptureConfig::default()))
            .await;

        info!("Recording for {} seconds, speak now...", seconds);
        controller.start_recording().await?;
        sleep(Duration::from_secs(seconds)).await;
        controller.stop_recording().await?;
    } else if let Some(path) = &args.audio {
        controller.stage_audio(AudioClip::from_path(path)?).await;
    }
    if let Some(path) = &args.image {
        controller.stage_image(ImageAsset::from_path(path)?).await;
    }

    if !controller.can_submit().await {
        warn!("Nothing staged; pass --audio and/or --image");
        return Ok(());
    }

    info!("Submitting consultation...");
    controller.submit().await?;

    let outcome = match controller.outcome().await {
        Some(outcome) => outcome,
        None => {
            warn!("No outcome recorded");
            return Ok(());
        }
    };

    if let Some(transcription) = &outcome.transcription {
        info!("Transcription: {}", transcription);
    }
    if let Some(analysis) = &outcome.analysis {
        info!("Analysis: {}", analysis);
    }
    if let Some(response_text) = &outcome.response_text {
        info!("Spoken reply text: {}", response_text);
    }

    if outcome.playback_ready {
        info!("Playing spoken reply...");
        controller.replay().await?;
        sleep(Duration::from_secs(args.playback_wait)).await;
    } else {
        info!("No spoken reply to play");
    }

    // Release the staged inputs and the playback resource
    controller.reset().await;

    info!("Consultation complete");

    Ok(())
}
