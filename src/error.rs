use thiserror::Error;

/// Failure to turn an encoded byte stream into samples.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unsupported or corrupt audio stream: {0}")]
    Format(#[from] symphonia::core::errors::Error),

    #[error("no decodable audio track found")]
    NoTrack,

    #[error("audio stream does not declare a sample rate")]
    UnknownSampleRate,

    #[error("audio stream contains no samples")]
    NoSamples,

    #[error("failed to read audio input: {0}")]
    Io(#[from] std::io::Error),
}

/// Rejection at the upload boundary. The message is shown to the user as is.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No audio file uploaded")]
    Missing,

    #[error("File too large. Maximum size is {max_mb}MB.")]
    TooLarge { size: u64, max_mb: u64 },

    #[error("Only audio files are allowed!")]
    NotAudio { name: String },
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("sample buffer is empty")]
    EmptyBuffer,

    #[error("invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl AnalysisError {
    /// Single line suitable for the results surface.
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Decode(_) | AnalysisError::EmptyBuffer | AnalysisError::InvalidSampleRate(_) => {
                "Error processing audio file. Please try a different format.".to_string()
            }
            AnalysisError::Upload(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_messages_are_user_facing() {
        let err = AnalysisError::from(UploadError::TooLarge { size: 60 << 20, max_mb: 50 });
        assert_eq!(err.user_message(), "File too large. Maximum size is 50MB.");

        let err = AnalysisError::from(UploadError::NotAudio { name: "notes.txt".into() });
        assert_eq!(err.user_message(), "Only audio files are allowed!");
    }

    #[test]
    fn decode_failures_share_one_message() {
        let a = AnalysisError::from(DecodeError::NoSamples);
        let b = AnalysisError::EmptyBuffer;
        assert_eq!(a.user_message(), b.user_message());
        assert!(a.user_message().starts_with("Error processing audio file"));
    }
}
