use std::fmt;

/// Why an upload was refused before it was read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhotoRejection {
    BadType,
    TooLarge,
}

impl PhotoRejection {
    pub fn message(self) -> &'static str {
        match self {
            PhotoRejection::BadType => "Please select a valid image file (JPEG, PNG, WebP)",
            PhotoRejection::TooLarge => "File size must be less than 5MB",
        }
    }
}

impl fmt::Display for PhotoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("photo rejected: {0}")]
    PhotoRejected(PhotoRejection),

    #[error("could not read photo: {0}")]
    PhotoReadFailed(String),

    #[error("no rendered document is mounted as '{0}'")]
    RenderTargetMissing(String),

    #[error("PDF generation failed: {0}")]
    PdfGenerationFailed(String),

    #[error("an export is already in progress")]
    ExportAlreadyInProgress,

    #[error("submission failed: {0}")]
    SubmissionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid record JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The single message shown to the user when this error reaches the host.
    pub fn user_message(&self) -> String {
        match self {
            Error::PhotoRejected(reason) => reason.message().to_string(),
            Error::PhotoReadFailed(_) => "Could not read the selected photo".to_string(),
            Error::RenderTargetMissing(_) | Error::PdfGenerationFailed(_) => {
                "Failed to generate PDF. Please try again.".to_string()
            }
            Error::ExportAlreadyInProgress => "A PDF is already being generated".to_string(),
            Error::SubmissionFailed(_) => "Failed to submit form. Please try again.".to_string(),
            Error::Io(e) => format!("File error: {e}"),
            Error::Json(e) => format!("Invalid record: {e}"),
        }
    }
}
