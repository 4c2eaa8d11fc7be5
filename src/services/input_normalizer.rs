// Input Normalizer
// Turns pasted text or an uploaded file into one of the two payload shapes
// the model request understands: inline text or a base64 document attachment.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;
use crate::models::{BinaryDocumentPayload, FileInput, InputSource, NormalizedPayload, TextPayload};

pub const PDF_MIME: &str = "application/pdf";
pub const PLAIN_TEXT_MIME: &str = "text/plain";
pub const LEGACY_DOC_MIME: &str = "application/msword";
pub const MODERN_DOC_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const GENERIC_MIME: &str = "application/octet-stream";

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    PlainText,
    WordDocx,
    /// Accepted by the file picker but there is no decoder for it.
    WordLegacy,
}

/// Decide the format from the declared mime type. Text extensions are accepted
/// under any mime; other extensions only count when the mime is missing or generic.
pub fn classify_file(mime_type: &str, filename: &str) -> Option<DocumentFormat> {
    let mime = mime_essence(mime_type);
    match mime.as_str() {
        PDF_MIME => return Some(DocumentFormat::Pdf),
        PLAIN_TEXT_MIME => return Some(DocumentFormat::PlainText),
        MODERN_DOC_MIME => return Some(DocumentFormat::WordDocx),
        LEGACY_DOC_MIME => return Some(DocumentFormat::WordLegacy),
        _ => {}
    }

    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())?;

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Some(DocumentFormat::PlainText);
    }
    if !mime.is_empty() && mime != GENERIC_MIME {
        return None;
    }

    match ext.as_str() {
        "pdf" => Some(DocumentFormat::Pdf),
        "docx" => Some(DocumentFormat::WordDocx),
        "doc" => Some(DocumentFormat::WordLegacy),
        _ => None,
    }
}

/// `Text/Plain; charset=utf-8` -> `text/plain`
fn mime_essence(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Normalize one input source. The file, if any, is read exactly once.
pub fn normalize(source: &InputSource) -> Result<NormalizedPayload, AnalysisError> {
    match source {
        InputSource::Text { content } => {
            if content.trim().is_empty() {
                return Err(AnalysisError::EmptyInput);
            }
            debug!("[NORMALIZER] text input chars={}", content.chars().count());
            Ok(NormalizedPayload::Text(TextPayload {
                text: content.clone(),
            }))
        }
        InputSource::File(file) => normalize_file(file),
    }
}

fn normalize_file(file: &FileInput) -> Result<NormalizedPayload, AnalysisError> {
    match classify_file(&file.mime_type, &file.filename) {
        Some(DocumentFormat::Pdf) => {
            let bytes = read_file(file, DocumentFormat::Pdf)?;
            Ok(NormalizedPayload::Document(BinaryDocumentPayload {
                media_type: PDF_MIME.to_string(),
                base64_data: BASE64.encode(&bytes),
            }))
        }
        Some(DocumentFormat::PlainText) => {
            let bytes = read_file(file, DocumentFormat::PlainText)?;
            text_payload(decode_text(&bytes))
        }
        Some(DocumentFormat::WordDocx) => {
            let bytes = read_file(file, DocumentFormat::WordDocx)?;
            text_payload(extract_docx_text(&bytes)?)
        }
        Some(DocumentFormat::WordLegacy) | None => Err(unsupported(file)),
    }
}

fn read_file(file: &FileInput, format: DocumentFormat) -> Result<Vec<u8>, AnalysisError> {
    let bytes = file
        .content
        .read()
        .map_err(|e| AnalysisError::FileReadError(format!("{}: {}", file.filename, e)))?;

    if bytes.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    info!(
        "[NORMALIZER] file input name={} format={:?} bytes={}",
        file.filename,
        format,
        bytes.len()
    );
    Ok(bytes)
}

fn unsupported(file: &FileInput) -> AnalysisError {
    warn!(
        "[NORMALIZER] rejected file type mime={} name={}",
        file.mime_type, file.filename
    );
    AnalysisError::UnsupportedFileType {
        filename: file.filename.clone(),
        mime_type: file.mime_type.clone(),
    }
}

fn text_payload(text: String) -> Result<NormalizedPayload, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok(NormalizedPayload::Text(TextPayload { text }))
}

/// UTF-8 decode with replacement characters, dropping a leading byte-order mark.
fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes).into_owned();
    match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    }
}

/// Pull paragraph and table text out of a .docx archive.
fn extract_docx_text(bytes: &[u8]) -> Result<String, AnalysisError> {
    let doc = docx_rs::read_docx(bytes)
        .map_err(|e| AnalysisError::FileReadError(format!("Failed to parse DOCX: {}", e)))?;

    let mut output = String::new();
    for child in &doc.document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                push_paragraph_text(para, &mut output);
                output.push('\n');
            }
            docx_rs::DocumentChild::Table(table) => {
                for row in &table.rows {
                    let docx_rs::TableChild::TableRow(tr) = row;
                    let mut cells = Vec::new();
                    for cell in &tr.cells {
                        let docx_rs::TableRowChild::TableCell(tc) = cell;
                        let mut cell_text = String::new();
                        for content in &tc.children {
                            if let docx_rs::TableCellContent::Paragraph(para) = content {
                                push_paragraph_text(para, &mut cell_text);
                            }
                        }
                        cells.push(cell_text);
                    }
                    output.push_str(&cells.join(" | "));
                    output.push('\n');
                }
            }
            _ => {}
        }
    }

    debug!("[NORMALIZER] docx extracted chars={}", output.chars().count());
    Ok(output)
}

fn push_paragraph_text(para: &docx_rs::Paragraph, output: &mut String) {
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => push_run_text(run, output),
            docx_rs::ParagraphChild::Hyperlink(link) => {
                for inner in &link.children {
                    if let docx_rs::ParagraphChild::Run(run) = inner {
                        push_run_text(run, output);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &docx_rs::Run, output: &mut String) {
    for run_child in &run.children {
        match run_child {
            docx_rs::RunChild::Text(text) => output.push_str(&text.text),
            docx_rs::RunChild::Tab(_) => output.push('\t'),
            docx_rs::RunChild::Break(_) => output.push('\n'),
            _ => {}
        }
    }
}
