use anyhow::Result;
use consult_client::{AudioClip, Config, InputStaging};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = if std::path::Path::new("config/consult-client.toml").exists() {
        Config::load("config/consult-client")?
    } else {
        Config::default()
    };

    info!("Consult Client v0.1.0");
    info!("Loaded config: {}", cfg.service.name);
    info!("Consultation endpoint: {}", cfg.endpoints.consultation_url);
    info!("Speech endpoint: {}", cfg.endpoints.speech_url);

    // Stage a fixture clip if one exists, to sanity-check the input path
    let fixture_path = "tests/fixtures/sample-question.wav";
    if std::path::Path::new(fixture_path).exists() {
        let clip = AudioClip::from_path(fixture_path)?;

        info!("Successfully loaded fixture clip!");
        info!("Name: {}", clip.name);
        info!("Mime type: {}", clip.mime_type);
        info!("Size: {} bytes", clip.data.len());

        let mut staging = InputStaging::new();
        staging.set_audio(clip);
        info!("Ready to submit: {}", staging.can_submit());
    } else {
        info!("No fixture clip found at {}", fixture_path);
        info!("Run the submit_consultation example for a live consultation");
    }

    Ok(())
}
