// Prompt Builder
// Merges the fixed analysis instruction with a normalized payload into a model request

use crate::models::{ModelRequest, NormalizedPayload};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Output schema the model must answer with.
const OUTPUT_SCHEMA: &str = r#"{
  "aiLikelihood": "low|medium|high",
  "confidenceScore": 0-100,
  "overallAssessment": "brief summary",
  "strengths": ["strength 1", "strength 2", "strength 3"],
  "fixRecommendations": ["recommendation 1", "recommendation 2", "recommendation 3"],
  "flaggedItems": [
    {"issue": "issue description", "severity": "low|medium|high", "location": "where in document"},
    {"issue": "issue description", "severity": "low|medium|high", "location": "where in document"}
  ],
  "detailedFindings": {
    "vocabularyPatterns": "analysis of word choice",
    "sentenceStructure": "analysis of sentence patterns",
    "coherenceFlow": "analysis of logical flow",
    "authenticity": "analysis of personal voice"
  }
}"#;

const SIGNALS: &[&str] = &[
    "Repetitive sentence structures",
    "Overly formal or generic language",
    "Lack of personal voice or specific examples",
    "Uniform paragraph lengths",
    "Predictable transitions",
    "Absence of minor grammatical variations that humans make",
];

/// The non-editable analysis instruction, split so the document text can be
/// placed inline or left out when it travels as an attachment.
#[derive(Debug, Clone, Copy)]
pub struct InstructionTemplate {
    pub task: &'static str,
    pub schema_intro: &'static str,
    pub output_schema: &'static str,
    pub cardinality_hint: &'static str,
    pub signals_intro: &'static str,
    pub signals: &'static [&'static str],
    pub closing: &'static str,
}

impl InstructionTemplate {
    pub const DEFAULT: InstructionTemplate = InstructionTemplate {
        task: "Analyze this document for AI-generated content patterns.",
        schema_intro: "Provide a detailed analysis in JSON format with the following structure:",
        output_schema: OUTPUT_SCHEMA,
        cardinality_hint: "Include at least 3 strengths, at least 3 fix recommendations and at least 2 flagged items.",
        signals_intro: "Look for indicators like:",
        signals: SIGNALS,
        closing: "Respond ONLY with the JSON object, no other text.",
    };

    /// Render the instruction, with the document inlined when given.
    pub fn render(&self, document: Option<&str>) -> String {
        let mut out = String::from(self.task);
        if let Some(text) = document {
            out.push_str(" Document content:\n\n");
            out.push_str(text);
            out.push_str("\n\n");
        } else {
            out.push(' ');
        }
        out.push_str(self.schema_intro);
        out.push_str("\n\n");
        out.push_str(self.output_schema);
        out.push_str("\n\n");
        out.push_str(self.cardinality_hint);
        out.push_str("\n\n");
        out.push_str(self.signals_intro);
        out.push('\n');
        for signal in self.signals {
            out.push_str("- ");
            out.push_str(signal);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(self.closing);
        out
    }
}

impl Default for InstructionTemplate {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    model: String,
    max_tokens: u32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, DEFAULT_MAX_TOKENS)
    }
}

impl PromptBuilder {
    pub fn new(model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_tokens,
        }
    }

    pub fn build(&self, payload: &NormalizedPayload, template: &InstructionTemplate) -> ModelRequest {
        let (instruction, attachment) = match payload {
            NormalizedPayload::Text(text) => (template.render(Some(&text.text)), None),
            NormalizedPayload::Document(doc) => (template.render(None), Some(doc.clone())),
        };

        ModelRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            instruction,
            attachment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BinaryDocumentPayload, TextPayload};

    #[test]
    fn test_text_payload_inlined() {
        let payload = NormalizedPayload::Text(TextPayload {
            text: "A note written on the train.".to_string(),
        });
        let req = PromptBuilder::default().build(&payload, &InstructionTemplate::DEFAULT);

        assert_eq!(req.model, DEFAULT_MODEL);
        assert_eq!(req.max_tokens, 4000);
        assert!(req.attachment.is_none());
        assert!(req.instruction.contains("Document content:\n\nA note written on the train."));
        assert!(req.instruction.contains("\"detailedFindings\""));
        assert!(req.instruction.ends_with("Respond ONLY with the JSON object, no other text."));
    }

    #[test]
    fn test_document_payload_attached_not_inlined() {
        let doc = BinaryDocumentPayload {
            media_type: "application/pdf".to_string(),
            base64_data: "JVBERi0=".to_string(),
        };
        let req = PromptBuilder::default()
            .build(&NormalizedPayload::Document(doc.clone()), &InstructionTemplate::DEFAULT);

        assert_eq!(req.attachment, Some(doc));
        assert!(!req.instruction.contains("Document content:"));
        assert!(!req.instruction.contains("JVBERi0="));
        assert!(req.instruction.contains("\"aiLikelihood\": \"low|medium|high\""));
    }

    #[test]
    fn test_instruction_lists_every_signal() {
        let rendered = InstructionTemplate::DEFAULT.render(None);
        for signal in SIGNALS {
            assert!(rendered.contains(&format!("- {}", signal)));
        }
        assert!(rendered.contains("at least 2 flagged items"));
    }

    #[test]
    fn test_configured_model_and_budget() {
        let payload = NormalizedPayload::Text(TextPayload { text: "x".to_string() });
        let req = PromptBuilder::new("claude-test", 1234).build(&payload, &InstructionTemplate::default());
        assert_eq!(req.model, "claude-test");
        assert_eq!(req.max_tokens, 1234);
    }
}
