// src/models/result.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Structured answer to a solve request.
/// Field names follow the JSON shape the model is asked to produce.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolutionResult {
    #[serde(deserialize_with = "lenient_text")]
    pub topic: String,
    #[serde(deserialize_with = "lenient_text")]
    pub explanation: String,
    /// Markdown, usually with pipe tables.
    #[serde(deserialize_with = "lenient_text")]
    pub solution: String,
    #[serde(deserialize_with = "lenient_text")]
    pub working_notes: String,
    #[serde(deserialize_with = "lenient_text")]
    pub tips: String,
    #[serde(deserialize_with = "lenient_text")]
    pub marks_breakdown: String,
}

impl SolutionResult {
    /// Result used when the model reply holds no usable JSON.
    pub fn freeform(raw: &str) -> Self {
        Self {
            topic: "Accountancy".to_string(),
            solution: raw.to_string(),
            ..Self::default()
        }
    }
}

/// Structured evaluation of a student's answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckResult {
    #[serde(deserialize_with = "lenient_number")]
    pub score: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub max_marks: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub percentage: f64,
    #[serde(deserialize_with = "lenient_text")]
    pub overall_feedback: String,
    pub mistakes: Vec<Mistake>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub correct_parts: Vec<String>,
    pub marking_breakdown: Vec<MarkingStep>,
    #[serde(deserialize_with = "lenient_text_list")]
    pub improvement_tips: Vec<String>,
}

impl CheckResult {
    pub fn freeform(raw: &str, max_marks: f64) -> Self {
        Self {
            max_marks,
            overall_feedback: raw.to_string(),
            ..Self::default()
        }
    }

    /// Fills in totals the model left out.
    pub fn normalize(mut self, requested_max_marks: f64) -> Self {
        if self.max_marks <= 0.0 {
            self.max_marks = requested_max_marks;
        }
        if self.percentage <= 0.0 && self.score > 0.0 && self.max_marks > 0.0 {
            self.percentage = (self.score * 100.0 / self.max_marks).round();
        }
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Mistake {
    #[serde(deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(deserialize_with = "lenient_text")]
    pub correction: String,
    #[serde(deserialize_with = "lenient_number")]
    pub marks_lost: f64,
}

/// One row of the marking breakdown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarkingStep {
    #[serde(deserialize_with = "lenient_text")]
    pub step: String,
    #[serde(deserialize_with = "lenient_number")]
    pub marks_available: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub marks_awarded: f64,
    #[serde(deserialize_with = "lenient_text")]
    pub comment: String,
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

/// Accepts strings, and renders numbers, arrays or objects as text.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(deserializer)?))
}

fn lenient_text_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_to_text).collect(),
        other => vec![value_to_text(other)],
    })
}

/// Accepts numbers or numeric strings such as `"3.5"`; anything else is zero.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn solution_fields_default_when_missing() {
        let parsed: SolutionResult =
            serde_json::from_value(json!({"topic": "Partnership", "solution": "| a |"})).unwrap();
        assert_eq!(parsed.topic, "Partnership");
        assert_eq!(parsed.working_notes, "");
    }

    #[test]
    fn solution_accepts_non_string_fields() {
        let parsed: SolutionResult = serde_json::from_value(json!({
            "tips": ["Show working", "Use ₹"],
            "marksBreakdown": {"entry": 1}
        }))
        .unwrap();
        assert_eq!(parsed.tips, "Show working\nUse ₹");
        assert_eq!(parsed.marks_breakdown, "{\"entry\":1}");
    }

    #[test]
    fn check_numbers_accept_strings() {
        let parsed: CheckResult = serde_json::from_value(json!({
            "score": "3.5",
            "maxMarks": 5,
            "markingBreakdown": [{"step": "Debit cash", "marksAvailable": "1", "marksAwarded": 1}]
        }))
        .unwrap();
        assert_eq!(parsed.score, 3.5);
        assert_eq!(parsed.max_marks, 5.0);
        assert_eq!(parsed.marking_breakdown[0].marks_available, 1.0);
    }

    #[test]
    fn normalize_fills_totals() {
        let result = CheckResult {
            score: 4.0,
            ..CheckResult::default()
        }
        .normalize(5.0);
        assert_eq!(result.max_marks, 5.0);
        assert_eq!(result.percentage, 80.0);
    }

    #[test]
    fn serializes_camel_case() {
        let value = serde_json::to_value(CheckResult::freeform("raw", 5.0)).unwrap();
        assert_eq!(value["maxMarks"], 5.0);
        assert_eq!(value["overallFeedback"], "raw");
        assert_eq!(value["improvementTips"], json!([]));
    }
}
