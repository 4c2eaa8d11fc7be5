// Analysis Error Taxonomy
// Every failure a run can end with, plus the single-flight rejection

use crate::models::{ErrorInfo, ErrorKind};
use thiserror::Error;

pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to analyze document. Please try again.";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Input is empty")]
    EmptyInput,
    #[error("Unsupported file type: {filename} ({mime_type})")]
    UnsupportedFileType { filename: String, mime_type: String },
    #[error("Failed to read file: {0}")]
    FileReadError(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Upstream error: {status} - {body}")]
    UpstreamError { status: u16, body: String },
    #[error("Malformed upstream response: {0}")]
    MalformedUpstreamResponse(String),
    #[error("Model reply is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("Model reply violates the report schema at `{field}`")]
    SchemaViolation { field: String },
    #[error("An analysis is already running")]
    AnalysisInProgress,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::EmptyInput => ErrorKind::EmptyInput,
            AnalysisError::UnsupportedFileType { .. } => ErrorKind::UnsupportedFileType,
            AnalysisError::FileReadError(_) => ErrorKind::FileReadError,
            AnalysisError::NetworkError(_) => ErrorKind::NetworkError,
            AnalysisError::UpstreamError { status, .. } => {
                ErrorKind::UpstreamError { status: *status }
            }
            AnalysisError::MalformedUpstreamResponse(_) => ErrorKind::MalformedUpstreamResponse,
            AnalysisError::InvalidJson(_) => ErrorKind::InvalidJson,
            AnalysisError::SchemaViolation { field } => ErrorKind::SchemaViolation {
                field: field.clone(),
            },
            AnalysisError::AnalysisInProgress => ErrorKind::AnalysisInProgress,
        }
    }

    /// The notice shown to the user. Pipeline failures collapse into one message.
    pub fn user_message(&self, from_file: bool) -> String {
        match self {
            AnalysisError::EmptyInput if from_file => "The uploaded file is empty".to_string(),
            AnalysisError::EmptyInput => "Please enter some text to analyze".to_string(),
            AnalysisError::UnsupportedFileType { .. } => {
                "Please upload a PDF, TXT, or DOCX file".to_string()
            }
            AnalysisError::AnalysisInProgress => {
                "An analysis is already running. Please wait for it to finish.".to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn to_info(&self, from_file: bool) -> ErrorInfo {
        ErrorInfo {
            kind: self.kind(),
            message: self.user_message(from_file),
            detail: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_errors_share_generic_message() {
        let errors = [
            AnalysisError::NetworkError("refused".to_string()),
            AnalysisError::UpstreamError { status: 500, body: String::new() },
            AnalysisError::MalformedUpstreamResponse("no content".to_string()),
            AnalysisError::InvalidJson("eof".to_string()),
            AnalysisError::SchemaViolation { field: "strengths".to_string() },
        ];
        for err in errors {
            assert_eq!(err.user_message(false), GENERIC_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn test_info_keeps_distinct_kind() {
        let info = AnalysisError::UpstreamError {
            status: 503,
            body: "overloaded".to_string(),
        }
        .to_info(false);
        assert_eq!(info.kind, ErrorKind::UpstreamError { status: 503 });
        assert!(info.detail.contains("overloaded"));
        assert_eq!(info.message, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_empty_input_message_depends_on_source() {
        assert_eq!(
            AnalysisError::EmptyInput.user_message(false),
            "Please enter some text to analyze"
        );
        assert_eq!(
            AnalysisError::EmptyInput.user_message(true),
            "The uploaded file is empty"
        );
    }
}
