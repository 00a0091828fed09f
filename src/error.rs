use thiserror::Error;

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while uploading or saving product media
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Image upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Saving product images failed: {reason}")]
    SaveFailed { reason: String },

    #[error("Media backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl MediaError {
    /// Create an upload failure with a reason
    pub fn upload_failed<S: Into<String>>(reason: S) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    /// Create a save failure with a reason
    pub fn save_failed<S: Into<String>>(reason: S) -> Self {
        Self::SaveFailed {
            reason: reason.into(),
        }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }
}
