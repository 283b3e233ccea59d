use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// A finite, named audio payload, either a finalized recording or a file
/// picked by the user. Immutable once created.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub name: String,
}

impl AudioClip {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    /// Direct file selection path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;

        info!("Loaded audio file: {} ({} bytes)", path.display(), data.len());

        Ok(Self {
            data,
            mime_type: audio_mime_for(path),
            name: display_name(path),
        })
    }
}

/// An image payload picked by the user. Immutable once created.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub name: String,
}

impl ImageAsset {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read image file: {}", path.display()))?;

        info!("Loaded image file: {} ({} bytes)", path.display(), data.len());

        Ok(Self {
            data,
            mime_type: image_mime_for(path),
            name: display_name(path),
        })
    }
}

/// Holds at most one pending audio clip and at most one pending image.
///
/// Both slots are replace-on-write: staging a new value drops the previous
/// one without inspecting it.
#[derive(Debug, Default)]
pub struct InputStaging {
    audio: Option<AudioClip>,
    image: Option<ImageAsset>,
}

impl InputStaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_audio(&mut self, clip: AudioClip) {
        self.audio = Some(clip);
    }

    pub fn set_image(&mut self, asset: ImageAsset) {
        self.image = Some(asset);
    }

    pub fn clear(&mut self) {
        self.audio = None;
        self.image = None;
    }

    /// True iff at least one slot is non-empty. A submission attempted while
    /// this is false is rejected before any transport call.
    pub fn can_submit(&self) -> bool {
        self.audio.is_some() || self.image.is_some()
    }

    pub fn audio(&self) -> Option<&AudioClip> {
        self.audio.as_ref()
    }

    pub fn image(&self) -> Option<&ImageAsset> {
        self.image.as_ref()
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string())
}

fn audio_mime_for(path: &Path) -> String {
    match extension(path).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn image_mime_for(path: &Path) -> String {
    match extension(path).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
    .to_string()
}

fn extension(path: &Path) -> Option<String> {
    path.extension().map(|e| e.to_string_lossy().to_lowercase())
}
