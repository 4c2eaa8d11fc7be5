// Response Parser
// Cleans the model reply and validates it into an AnalysisReport, all or nothing.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::models::{AiLikelihood, AnalysisReport, DetailedFindings, FlaggedItem, Severity};

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fenced block pattern")
    })
}

fn fence_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("fence marker pattern"))
}

/// Drop code-fence markers around the payload. A fenced block holding an
/// object wins over any prose around it.
pub fn strip_code_fences(raw: &str) -> String {
    if let Some(inner) = fenced_block_re()
        .captures_iter(raw)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|inner| inner.contains('{'))
    {
        return inner.trim().to_string();
    }
    fence_marker_re().replace_all(raw, "").trim().to_string()
}

/// Slice the outermost JSON object out of the cleaned reply.
fn extract_json(content: &str) -> Result<&str, AnalysisError> {
    if content.starts_with('{') && content.ends_with('}') {
        return Ok(content);
    }
    match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&content[start..=end]),
        _ => Err(AnalysisError::InvalidJson(
            "no JSON object in model reply".to_string(),
        )),
    }
}

/// Parse a raw model reply into a fully validated report.
pub fn parse(raw: &str) -> Result<AnalysisReport, AnalysisError> {
    let cleaned = strip_code_fences(raw);
    let json_str = extract_json(&cleaned)?;
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        warn!("[PARSER] reply is not JSON: {}", e);
        AnalysisError::InvalidJson(e.to_string())
    })?;

    let report = validate(&value).map_err(|e| {
        warn!("[PARSER] {}", e);
        e
    })?;
    debug!(
        "[PARSER] report ok likelihood={:?} confidence={} flagged={}",
        report.ai_likelihood,
        report.confidence_score,
        report.flagged_items.len()
    );
    Ok(report)
}

fn violation(field: impl Into<String>) -> AnalysisError {
    AnalysisError::SchemaViolation {
        field: field.into(),
    }
}

fn required<'a>(obj: &'a Map<String, Value>, name: &str, path: &str) -> Result<&'a Value, AnalysisError> {
    match obj.get(name) {
        Some(Value::Null) | None => Err(violation(path)),
        Some(v) => Ok(v),
    }
}

fn string_at(obj: &Map<String, Value>, name: &str, path: &str) -> Result<String, AnalysisError> {
    required(obj, name, path)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| violation(path))
}

fn object_at<'a>(obj: &'a Map<String, Value>, name: &str, path: &str) -> Result<&'a Map<String, Value>, AnalysisError> {
    required(obj, name, path)?
        .as_object()
        .ok_or_else(|| violation(path))
}

fn array_at<'a>(obj: &'a Map<String, Value>, name: &str) -> Result<&'a Vec<Value>, AnalysisError> {
    required(obj, name, name)?
        .as_array()
        .ok_or_else(|| violation(name))
}

fn string_list(obj: &Map<String, Value>, name: &str) -> Result<Vec<String>, AnalysisError> {
    array_at(obj, name)?
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| violation(format!("{}[{}]", name, i)))
        })
        .collect()
}

fn confidence(obj: &Map<String, Value>) -> Result<u8, AnalysisError> {
    const FIELD: &str = "confidenceScore";
    let value = required(obj, FIELD, FIELD)?;
    let score = match value.as_u64() {
        Some(n) => n as f64,
        None => value
            .as_f64()
            .filter(|f| f.fract() == 0.0)
            .ok_or_else(|| violation(FIELD))?,
    };
    if !(0.0..=100.0).contains(&score) {
        return Err(violation(FIELD));
    }
    Ok(score as u8)
}

fn flagged_items(obj: &Map<String, Value>) -> Result<Vec<FlaggedItem>, AnalysisError> {
    const FIELD: &str = "flaggedItems";
    array_at(obj, FIELD)?
        .iter()
        .enumerate()
        .map(|(i, item)| -> Result<FlaggedItem, AnalysisError> {
            let prefix = format!("{}[{}]", FIELD, i);
            let item = item.as_object().ok_or_else(|| violation(&prefix))?;
            let issue = string_at(item, "issue", &format!("{}.issue", prefix))?;
            let severity_path = format!("{}.severity", prefix);
            let severity = Severity::parse(&string_at(item, "severity", &severity_path)?)
                .ok_or_else(|| violation(&severity_path))?;
            let location = string_at(item, "location", &format!("{}.location", prefix))?;
            Ok(FlaggedItem {
                issue,
                severity,
                location,
            })
        })
        .collect()
}

fn detailed_findings(obj: &Map<String, Value>) -> Result<DetailedFindings, AnalysisError> {
    const FIELD: &str = "detailedFindings";
    let findings = object_at(obj, FIELD, FIELD)?;
    let sub = |name: &str| string_at(findings, name, &format!("{}.{}", FIELD, name));
    Ok(DetailedFindings {
        vocabulary_patterns: sub("vocabularyPatterns")?,
        sentence_structure: sub("sentenceStructure")?,
        coherence_flow: sub("coherenceFlow")?,
        authenticity: sub("authenticity")?,
    })
}

/// Field-by-field check in declaration order; the first problem is reported.
fn validate(value: &Value) -> Result<AnalysisReport, AnalysisError> {
    let obj = value.as_object().ok_or_else(|| violation("$"))?;

    let likelihood_raw = string_at(obj, "aiLikelihood", "aiLikelihood")?;
    let ai_likelihood =
        AiLikelihood::parse(&likelihood_raw).ok_or_else(|| violation("aiLikelihood"))?;
    let confidence_score = confidence(obj)?;
    let overall_assessment = string_at(obj, "overallAssessment", "overallAssessment")?;
    let strengths = string_list(obj, "strengths")?;
    let fix_recommendations = string_list(obj, "fixRecommendations")?;
    let flagged_items = flagged_items(obj)?;
    let detailed_findings = detailed_findings(obj)?;

    Ok(AnalysisReport {
        ai_likelihood,
        confidence_score,
        overall_assessment,
        strengths,
        fix_recommendations,
        flagged_items,
        detailed_findings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID_REPLY: &str = r#"{"aiLikelihood":"low","confidenceScore":12,"overallAssessment":"...", "strengths":["a","b","c"], "fixRecommendations":["x","y","z"], "flaggedItems":[], "detailedFindings":{"vocabularyPatterns":"...","sentenceStructure":"...","coherenceFlow":"...","authenticity":"..."}}"#;

    const REQUIRED_FIELDS: [&str; 7] = [
        "aiLikelihood",
        "confidenceScore",
        "overallAssessment",
        "strengths",
        "fixRecommendations",
        "flaggedItems",
        "detailedFindings",
    ];

    fn full_reply() -> Value {
        json!({
            "aiLikelihood": "high",
            "confidenceScore": 87,
            "overallAssessment": "Reads like a template.",
            "strengths": ["clear", "organized", "concise"],
            "fixRecommendations": ["add anecdotes", "vary length", "cut filler"],
            "flaggedItems": [
                {"issue": "stock transition", "severity": "medium", "location": "paragraph 2"},
                {"issue": "uniform cadence", "severity": "high", "location": "throughout"}
            ],
            "detailedFindings": {
                "vocabularyPatterns": "generic",
                "sentenceStructure": "uniform",
                "coherenceFlow": "predictable",
                "authenticity": "low personal voice"
            }
        })
    }

    #[test]
    fn test_valid_reply_parses() {
        let report = parse(VALID_REPLY).unwrap();
        assert_eq!(report.ai_likelihood, AiLikelihood::Low);
        assert_eq!(report.confidence_score, 12);
        assert_eq!(report.strengths, vec!["a", "b", "c"]);
        assert_eq!(report.fix_recommendations, vec!["x", "y", "z"]);
        assert!(report.flagged_items.is_empty());
        assert_eq!(report.detailed_findings.authenticity, "...");
    }

    #[test]
    fn test_fenced_reply_equals_clean_reply() {
        let clean = parse(VALID_REPLY).unwrap();
        let variants = [
            format!("```json\n{}\n```", VALID_REPLY),
            format!("```\n{}\n```", VALID_REPLY),
            format!("Sure! ```json\n{}\n```", VALID_REPLY),
            format!("  \n{}\n\n", VALID_REPLY),
        ];
        for raw in variants {
            assert_eq!(parse(&raw).unwrap(), clean, "reply: {}", raw);
        }
    }

    #[test]
    fn test_prose_only_is_invalid_json() {
        assert!(matches!(
            parse("I cannot analyze this document."),
            Err(AnalysisError::InvalidJson(_))
        ));
        assert!(matches!(
            parse("```json\n{\"aiLikelihood\": \"low\",\n```"),
            Err(AnalysisError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for field in REQUIRED_FIELDS {
            let mut reply = full_reply();
            reply.as_object_mut().unwrap().remove(field);
            assert_eq!(
                parse(&reply.to_string()),
                Err(AnalysisError::SchemaViolation {
                    field: field.to_string()
                }),
                "missing {}",
                field
            );
        }
    }

    #[test]
    fn test_null_field_counts_as_missing() {
        let mut reply = full_reply();
        reply["overallAssessment"] = Value::Null;
        assert_eq!(
            parse(&reply.to_string()),
            Err(violation("overallAssessment"))
        );
    }

    #[test]
    fn test_out_of_domain_enums_rejected() {
        let mut reply = full_reply();
        reply["aiLikelihood"] = json!("certain");
        assert_eq!(parse(&reply.to_string()), Err(violation("aiLikelihood")));

        let mut reply = full_reply();
        reply["flaggedItems"][1]["severity"] = json!("critical");
        assert_eq!(
            parse(&reply.to_string()),
            Err(violation("flaggedItems[1].severity"))
        );
    }

    #[test]
    fn test_enum_case_variants_rejected() {
        let mut reply = full_reply();
        reply["aiLikelihood"] = json!("HIGH");
        assert_eq!(parse(&reply.to_string()), Err(violation("aiLikelihood")));

        let mut reply = full_reply();
        reply["flaggedItems"][0]["severity"] = json!(" Medium ");
        assert_eq!(
            parse(&reply.to_string()),
            Err(violation("flaggedItems[0].severity"))
        );
    }

    #[test]
    fn test_confidence_bounds() {
        for bad in [json!(101), json!(-3), json!(42.5), json!("85")] {
            let mut reply = full_reply();
            reply["confidenceScore"] = bad;
            assert_eq!(parse(&reply.to_string()), Err(violation("confidenceScore")));
        }
        let mut reply = full_reply();
        reply["confidenceScore"] = json!(100.0);
        assert_eq!(parse(&reply.to_string()).unwrap().confidence_score, 100);
    }

    #[test]
    fn test_nested_findings_field_named() {
        let mut reply = full_reply();
        reply["detailedFindings"]
            .as_object_mut()
            .unwrap()
            .remove("coherenceFlow");
        assert_eq!(
            parse(&reply.to_string()),
            Err(violation("detailedFindings.coherenceFlow"))
        );
    }

    #[test]
    fn test_non_string_list_entry_rejected() {
        let mut reply = full_reply();
        reply["strengths"] = json!(["fine", 3]);
        assert_eq!(parse(&reply.to_string()), Err(violation("strengths[1]")));
    }

    #[test]
    fn test_unrelated_object_is_schema_violation() {
        assert_eq!(parse("[1, 2, {\"a\": 1}]"), Err(violation("aiLikelihood")));
    }
}
