// Content Analyzer Data Models
// Input, payload, request, report and session shapes shared across services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

// ============ Input Source ============

/// Where the bytes of an uploaded file come from.
#[derive(Debug, Clone)]
pub enum FileContent {
    Bytes(Vec<u8>),
    /// Read lazily, exactly once, when the run normalizes its input.
    Path(PathBuf),
}

impl FileContent {
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            FileContent::Bytes(bytes) => Ok(bytes.clone()),
            FileContent::Path(path) => std::fs::read(path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInput {
    pub filename: String,
    pub mime_type: String,
    #[serde(skip)]
    pub content: FileContent,
}

impl FileInput {
    pub fn from_bytes(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content: FileContent::Bytes(bytes),
        }
    }

    pub fn from_path(filename: impl Into<String>, mime_type: impl Into<String>, path: PathBuf) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            content: FileContent::Path(path),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InputSource {
    Text { content: String },
    File(FileInput),
}

impl InputSource {
    pub fn text(content: impl Into<String>) -> Self {
        InputSource::Text {
            content: content.into(),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, InputSource::File(_))
    }
}

// ============ Normalized Payloads ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryDocumentPayload {
    pub media_type: String,
    pub base64_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedPayload {
    Text(TextPayload),
    Document(BinaryDocumentPayload),
}

// ============ Model Request ============

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequest {
    pub model: String,
    pub max_tokens: u32,
    pub instruction: String,
    /// Present only when the payload is a binary document.
    pub attachment: Option<BinaryDocumentPayload>,
}

// ============ Analysis Report ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiLikelihood {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

fn parse_level(value: &str) -> Option<u8> {
    match value {
        "low" => Some(0),
        "medium" => Some(1),
        "high" => Some(2),
        _ => None,
    }
}

impl AiLikelihood {
    pub fn parse(value: &str) -> Option<Self> {
        parse_level(value).map(|lvl| match lvl {
            0 => AiLikelihood::Low,
            1 => AiLikelihood::Medium,
            _ => AiLikelihood::High,
        })
    }
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        parse_level(value).map(|lvl| match lvl {
            0 => Severity::Low,
            1 => Severity::Medium,
            _ => Severity::High,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedItem {
    pub issue: String,
    pub severity: Severity,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedFindings {
    pub vocabulary_patterns: String,
    pub sentence_structure: String,
    pub coherence_flow: String,
    pub authenticity: String,
}

/// Validated model verdict. Built only by the response parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub ai_likelihood: AiLikelihood,
    /// 0..=100
    pub confidence_score: u8,
    pub overall_assessment: String,
    pub strengths: Vec<String>,
    pub fix_recommendations: Vec<String>,
    pub flagged_items: Vec<FlaggedItem>,
    pub detailed_findings: DetailedFindings,
}

// ============ Session ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ErrorKind {
    EmptyInput,
    UnsupportedFileType,
    FileReadError,
    NetworkError,
    UpstreamError { status: u16 },
    MalformedUpstreamResponse,
    InvalidJson,
    SchemaViolation { field: String },
    AnalysisInProgress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    /// User-facing notice.
    pub message: String,
    /// Diagnostics only, never rendered.
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSession {
    pub run_id: Option<Uuid>,
    pub input: Option<InputSource>,
    pub status: SessionStatus,
    pub result: Option<AnalysisReport>,
    pub error: Option<ErrorInfo>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing_is_exact() {
        assert_eq!(AiLikelihood::parse("high"), Some(AiLikelihood::High));
        assert_eq!(AiLikelihood::parse("low"), Some(AiLikelihood::Low));
        assert_eq!(AiLikelihood::parse("High"), None);
        assert_eq!(AiLikelihood::parse(" low "), None);
        assert_eq!(Severity::parse("medium"), Some(Severity::Medium));
        assert_eq!(Severity::parse("MEDIUM"), None);
        assert_eq!(Severity::parse("critical"), None);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = AnalysisReport {
            ai_likelihood: AiLikelihood::Medium,
            confidence_score: 55,
            overall_assessment: "mixed".to_string(),
            strengths: vec![],
            fix_recommendations: vec![],
            flagged_items: vec![FlaggedItem {
                issue: "stock phrase".to_string(),
                severity: Severity::Low,
                location: "intro".to_string(),
            }],
            detailed_findings: DetailedFindings {
                vocabulary_patterns: "a".to_string(),
                sentence_structure: "b".to_string(),
                coherence_flow: "c".to_string(),
                authenticity: "d".to_string(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["aiLikelihood"], "medium");
        assert_eq!(json["confidenceScore"], 55);
        assert_eq!(json["flaggedItems"][0]["severity"], "low");
        assert_eq!(json["detailedFindings"]["coherenceFlow"], "c");
    }

    #[test]
    fn test_session_snapshot_omits_file_bytes() {
        let session = AnalysisSession {
            input: Some(InputSource::File(FileInput::from_bytes(
                "essay.txt",
                "text/plain",
                b"secret body".to_vec(),
            ))),
            ..Default::default()
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["status"], "idle");
        assert_eq!(json["input"]["kind"], "file");
        assert_eq!(json["input"]["filename"], "essay.txt");
        assert!(json["input"].get("content").is_none());
    }
}
