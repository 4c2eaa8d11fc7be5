// Model Gateway
// Sends one analysis request to the Anthropic messages endpoint and classifies failures

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::error::AnalysisError;
use crate::models::ModelRequest;
use crate::services::config_store::AppConfig;

pub const ANTHROPIC_DEFAULT_URL: &str = "https://api.anthropic.com/v1/messages";
pub const ANTHROPIC_DEFAULT_VERSION: &str = "2023-06-01";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
}

impl From<ProviderError> for AnalysisError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::HttpError(e) => AnalysisError::NetworkError(e.to_string()),
            ProviderError::ApiError { status, message } => AnalysisError::UpstreamError {
                status,
                body: message,
            },
            ProviderError::MissingContent => {
                AnalysisError::MalformedUpstreamResponse("missing text content block".to_string())
            }
            ProviderError::JsonError(e) => AnalysisError::MalformedUpstreamResponse(e),
        }
    }
}

/// The remote model capability: prompt plus optional document in, reply text out.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Exactly one upstream call, no retries. Returns the first text block unparsed.
    async fn send(&self, request: &ModelRequest) -> Result<String, AnalysisError>;
}

// ============ Wire format ============

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: MessageContent,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Document { source: DocumentSource },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize)]
struct DocumentSource {
    #[serde(rename = "type")]
    kind: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Option<Vec<ResponseBlock>>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
}

impl From<&ModelRequest> for MessagesRequest {
    fn from(request: &ModelRequest) -> Self {
        let content = match &request.attachment {
            None => MessageContent::Text(request.instruction.clone()),
            Some(doc) => MessageContent::Blocks(vec![
                ContentBlock::Document {
                    source: DocumentSource {
                        kind: "base64".to_string(),
                        media_type: doc.media_type.clone(),
                        data: doc.base64_data.clone(),
                    },
                },
                ContentBlock::Text {
                    text: request.instruction.clone(),
                },
            ]),
        };

        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content,
            }],
        }
    }
}

/// First text block of a messages response body.
fn extract_first_text(body: &str) -> Result<String, ProviderError> {
    let data: MessagesResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::JsonError(e.to_string()))?;

    data.content
        .unwrap_or_default()
        .into_iter()
        .filter(|block| block.kind.as_deref().map_or(true, |k| k == "text"))
        .find_map(|block| block.text)
        .ok_or(ProviderError::MissingContent)
}

// ============ HTTP gateway ============

pub struct AnthropicGateway {
    client: Client,
    url: String,
    api_key: Option<String>,
    anthropic_version: String,
}

impl AnthropicGateway {
    pub fn with_client(client: Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key,
            anthropic_version: ANTHROPIC_DEFAULT_VERSION.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(proxy) = config.proxy.as_ref().filter(|p| p.enabled) {
            if let Some(url) = proxy.url.as_deref() {
                builder = builder.proxy(reqwest::Proxy::all(url)?);
            }
        }

        Ok(Self {
            anthropic_version: config.anthropic_version.clone(),
            ..Self::with_client(builder.build()?, config.api_url.clone(), api_key)
        })
    }

    async fn call_messages_api(&self, request: &ModelRequest) -> Result<String, ProviderError> {
        let body = MessagesRequest::from(request);
        let start = Instant::now();

        let mut http = self
            .client
            .post(&self.url)
            .header("anthropic-version", &self.anthropic_version)
            .header("Content-Type", "application/json");
        if let Some(key) = self.api_key.as_deref() {
            http = http.header("x-api-key", key);
        }

        let response = http.json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let text = response.text().await?;
        let content = extract_first_text(&text)?;

        info!(
            "[GATEWAY] model={} status={} latency_ms={} reply_chars={}",
            request.model,
            status.as_u16(),
            start.elapsed().as_millis(),
            content.chars().count()
        );

        Ok(content)
    }
}

#[async_trait]
impl ModelGateway for AnthropicGateway {
    async fn send(&self, request: &ModelRequest) -> Result<String, AnalysisError> {
        self.call_messages_api(request).await.map_err(|e| {
            warn!("[GATEWAY] request failed model={}: {}", request.model, e);
            AnalysisError::from(e)
        })
    }
}

/// Credential for the messages endpoint, from the environment.
pub fn get_api_key() -> Option<String> {
    for key in ["ANTHROPIC_API_KEY", "CONTENT_ANALYZER_API_KEY"] {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}
