//! Acceptance rules for user-supplied files.

use std::path::Path;

use crate::error::UploadError;

pub const DEFAULT_MAX_MB: u64 = 50;
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "m4a", "aac", "ogg"];

#[derive(Clone, Debug)]
pub struct UploadPolicy {
    pub max_bytes: u64,
    pub extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::with_max_mb(DEFAULT_MAX_MB)
    }
}

impl UploadPolicy {
    pub fn with_max_mb(max_mb: u64) -> Self {
        Self {
            max_bytes: max_mb * 1024 * 1024,
            extensions: AUDIO_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Check a file before reading or decoding it. `mime` is only enforced when
    /// the caller knows it (HTTP uploads); local files are judged by extension.
    pub fn validate(&self, name: &str, mime: Option<&str>, size: u64) -> Result<(), UploadError> {
        if size == 0 {
            return Err(UploadError::Missing);
        }
        if size > self.max_bytes {
            return Err(self.too_large(size));
        }

        let mime_ok = mime.map_or(true, |m| m.trim().to_ascii_lowercase().starts_with("audio/"));
        if !mime_ok || !self.has_audio_extension(name) {
            return Err(UploadError::NotAudio { name: name.to_string() });
        }

        Ok(())
    }

    pub fn too_large(&self, size: u64) -> UploadError {
        UploadError::TooLarge {
            size,
            max_mb: self.max_bytes / (1024 * 1024),
        }
    }

    pub fn has_audio_extension(&self, name: &str) -> bool {
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }
}
