//! Audio payloads for the transcription capability.

use std::path::Path;

use crate::core::dispatch::DispatchError;

pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/wav";

#[derive(Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl std::fmt::Debug for AudioClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioClip")
            .field("bytes", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, DispatchError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|err| DispatchError::Io(format!("{}: {err}", path.display())))?;
        Ok(Self::new(bytes, content_type_for_path(path)))
    }

    /// Reads the clip named by a text field. Blank input means nothing was
    /// supplied.
    pub async fn from_user_path(raw: &str) -> Result<Option<Self>, DispatchError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        Self::from_path(Path::new(trimmed)).await.map(Some)
    }
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("wav") | Some("wave") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("webm") => "audio/webm",
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => DEFAULT_AUDIO_CONTENT_TYPE,
    }
}
