// Content Analyzer Core Services
// normalize -> build prompt -> call model -> parse report, sequenced by the orchestrator

pub mod config_store;
pub mod input_normalizer;
pub mod orchestrator;
pub mod prompt_builder;
pub mod providers;
pub mod response_parser;

pub use config_store::{load_default_config, AppConfig, ConfigStore, ProxyConfig};
pub use input_normalizer::{classify_file, normalize, DocumentFormat};
pub use orchestrator::AnalysisOrchestrator;
pub use prompt_builder::{InstructionTemplate, PromptBuilder, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
pub use providers::{get_api_key, AnthropicGateway, ModelGateway, ProviderError};
pub use response_parser::{parse as parse_report, strip_code_fences};
