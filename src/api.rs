// Presentation-facing commands
// Thin wrappers the UI layer calls; errors come back as the user-facing notice.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::models::{AnalysisReport, AnalysisSession, FileInput, InputSource};
use crate::services::{
    get_api_key, load_default_config, AnalysisOrchestrator, AnthropicGateway, AppConfig,
    PromptBuilder,
};

/// Wire the HTTP gateway and prompt settings from config into an orchestrator.
pub fn build_orchestrator(config: &AppConfig) -> Result<AnalysisOrchestrator, String> {
    let gateway = AnthropicGateway::from_config(config, get_api_key())
        .map_err(|e| format!("Failed to create model client: {}", e))?;
    info!(
        "[API] orchestrator ready model={} max_tokens={}",
        config.model, config.max_tokens
    );
    Ok(AnalysisOrchestrator::new(
        Arc::new(gateway),
        PromptBuilder::new(config.model.clone(), config.max_tokens),
    ))
}

/// Orchestrator from the config file in the default location.
pub fn build_default_orchestrator() -> Result<AnalysisOrchestrator, String> {
    build_orchestrator(&load_default_config())
}

/// The file-picker analogue: name and mime type from the path, bytes read at analysis time.
/// A missing or unreadable path surfaces as a failed run, not here.
pub fn load_file_source(path: &Path) -> InputSource {
    let filename = path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string());
    let mime_type = mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default();

    InputSource::File(FileInput::from_path(filename, mime_type, path.to_path_buf()))
}

pub async fn analyze_text(orchestrator: &AnalysisOrchestrator, text: String) -> Result<AnalysisReport, String> {
    orchestrator
        .start(InputSource::text(text))
        .await
        .map_err(|e| e.user_message(false))
}

pub async fn analyze_file(orchestrator: &AnalysisOrchestrator, path: &Path) -> Result<AnalysisReport, String> {
    orchestrator
        .start(load_file_source(path))
        .await
        .map_err(|e| e.user_message(true))
}

pub async fn retry_analysis(orchestrator: &AnalysisOrchestrator) -> Result<AnalysisReport, String> {
    let from_file = orchestrator
        .session()
        .input
        .as_ref()
        .map_or(false, InputSource::is_file);
    orchestrator
        .retry()
        .await
        .map_err(|e| e.user_message(from_file))
}

pub fn get_session(orchestrator: &AnalysisOrchestrator) -> AnalysisSession {
    orchestrator.session()
}

pub fn reset_session(orchestrator: &AnalysisOrchestrator) -> Result<(), String> {
    orchestrator.reset().map_err(|e| e.user_message(false))
}
