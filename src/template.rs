//! Message templates: the structured `{Body, Buttons}` payload the model
//! drafts, plus the sanitizer and validator that recover it from raw text.

mod button;
mod sanitize;
mod url;
mod validate;

#[cfg(test)]
mod proptests;

#[allow(unused_imports)] // Public API re-exports
pub use button::{Button, ButtonKind, ButtonSchema, UrlType};
pub use sanitize::{sanitize, SanitizeError};
#[allow(unused_imports)] // Public API re-exports
pub use url::{normalize_url, NormalizedUrl, UrlError, INVALID_URL_PROMPT};
#[allow(unused_imports)] // Public API re-exports
pub use validate::{
    enforce_limits, validate, validate_with, ButtonLimits, DroppedButton, LimitReason, SchemaError,
    ValidatedMessage,
};

use serde::Serialize;

/// A template as the model speaks it: body text plus ordered buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMessage {
    #[serde(rename = "Body")]
    pub body: String,
    #[serde(rename = "Buttons")]
    pub buttons: Vec<Button>,
}

impl TemplateMessage {
    pub fn new(body: impl Into<String>, buttons: Vec<Button>) -> Self {
        Self {
            body: body.into(),
            buttons,
        }
    }

    /// Body-only message, used for notices and follow-up questions
    pub fn text_only(body: impl Into<String>) -> Self {
        Self::new(body, Vec::new())
    }

    /// Render in the model's own JSON dialect, for history and prompts
    pub fn to_model_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.body.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_json_uses_capitalized_keys() {
        let msg = TemplateMessage::new(
            "Hi {{1}}",
            vec![Button::QuickReply {
                text: "Stop".to_string(),
            }],
        );
        let value: serde_json::Value = serde_json::from_str(&msg.to_model_json()).unwrap();
        assert_eq!(value["Body"], "Hi {{1}}");
        assert_eq!(value["Buttons"][0]["type"], "QUICK_REPLY");
    }
}
