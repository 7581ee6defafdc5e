//! Outbound frame sent to the client

use crate::cost::CostRecord;
use serde::Serialize;
use serde_json::Value;

/// What produced a frame; not serialized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameKind {
    /// A validated template
    #[default]
    Template,
    /// A question with no buttons (model follow-up or generated suggestion)
    Followup,
    /// Fixed text that bypasses dedup (URL rejection)
    Notice,
    /// Fixed text after a failed model call or unusable output
    Fallback,
}

/// Token counts and cost of the call behind a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total_cost: f64,
}

impl From<&CostRecord> for TokenUsage {
    fn from(record: &CostRecord) -> Self {
        Self {
            input: record.input_tokens,
            output: record.output_tokens,
            total_cost: record.total_cost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub content: String,
    pub buttons: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    /// Texts of buttons dropped by the limit policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits_applied: Option<Vec<String>>,
    #[serde(skip)]
    pub kind: FrameKind,
}

impl OutboundFrame {
    pub fn new(kind: FrameKind, content: impl Into<String>, buttons: Vec<Value>) -> Self {
        Self {
            content: content.into(),
            buttons,
            total_spent: None,
            tokens: None,
            limits_applied: None,
            kind,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_minimal_frame_shape() {
        let frame = OutboundFrame::new(FrameKind::Notice, "hello", vec![]);
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"content": "hello", "buttons": []}));
    }

    #[test]
    fn test_cost_fields() {
        let record = CostRecord {
            input_tokens: 100,
            output_tokens: 20,
            input_cost: 0.5,
            output_cost: 0.25,
            total_cost: 0.75,
        };
        let mut frame = OutboundFrame::new(FrameKind::Template, "x", vec![json!({"type": "QUICK_REPLY", "text": "Hi"})]);
        frame.total_spent = Some(1.5);
        frame.tokens = Some(TokenUsage::from(&record));
        frame.limits_applied = Some(vec!["Third link".to_string()]);

        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["total_spent"], json!(1.5));
        assert_eq!(value["tokens"], json!({"input": 100, "output": 20, "total_cost": 0.75}));
        assert_eq!(value["limits_applied"], json!(["Third link"]));
        assert!(value.get("kind").is_none());
    }
}
