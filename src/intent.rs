//! Classify a reply to a suggestion as accept, decline or neither
//!
//! A secondary model call, best effort like title generation: every failure
//! degrades to [`Intent::Neutral`] and the message is handled as ordinary
//! input.

use crate::llm::{LlmRequest, Usage};
use crate::runtime::{CallKind, ModelGateway};
use crate::system_prompt;
use crate::template::sanitize;
use serde_json::Value;

/// Replies longer than this are truncated before classification
const MAX_REPLY_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl Intent {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

/// Classification result plus the token usage of the call, if one completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntentOutcome {
    pub intent: Intent,
    pub usage: Option<Usage>,
}

/// Ask the model whether `reply` accepts the offer in `suggestion`.
pub async fn classify_intent(gateway: &ModelGateway, suggestion: &str, reply: &str) -> IntentOutcome {
    let reply: String = reply.chars().take(MAX_REPLY_CHARS).collect();
    let request = LlmRequest {
        max_tokens: Some(32),
        ..LlmRequest::single(
            system_prompt::intent_prompt(),
            system_prompt::intent_request(suggestion, &reply),
        )
    };

    match gateway.invoke(&request, CallKind::Auxiliary).await {
        Ok(response) => {
            let intent = extract_intent(&response.text).unwrap_or_else(|| {
                tracing::warn!(raw = %response.text, "Unusable intent classification, treating as neutral");
                Intent::Neutral
            });
            tracing::debug!(intent = ?intent, "Classified suggestion reply");
            IntentOutcome {
                intent,
                usage: Some(response.usage),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e.message, kind = ?e.kind, "Intent classification failed");
            IntentOutcome::default()
        }
    }
}

/// Pull `intent` out of the first object that carries it
fn extract_intent(raw: &str) -> Option<Intent> {
    let values = sanitize(raw).ok()?;
    values.iter().find_map(|value| {
        let obj = value.as_object()?;
        let field = obj
            .get("intent")
            .or_else(|| {
                obj.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("intent"))
                    .map(|(_, v)| v)
            })
            .and_then(Value::as_str)?;
        Intent::parse(field)
    })
}
