//! Follow-up suggestions after a template is sent
//!
//! One extra model call proposes a single refinement as a question with no
//! buttons. Best effort: failures are reported to the caller for logging
//! and never block the turn.

use crate::llm::{LlmError, LlmRequest, Usage};
use crate::runtime::{CallKind, ModelGateway};
use crate::system_prompt;
use crate::template::{sanitize, validate, SanitizeError, SchemaError, TemplateMessage};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum FollowupError {
    #[error("follow-up call failed: {0}")]
    Model(#[from] LlmError),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("follow-up suggestion has an empty body")]
    EmptyBody,
}

/// The suggestion (or why there is none) plus usage if the call completed
#[derive(Debug, Clone)]
pub struct FollowupAttempt {
    pub usage: Option<Usage>,
    pub result: Result<TemplateMessage, FollowupError>,
}

/// Ask for one improvement to `template`.
pub async fn generate_followup(gateway: &ModelGateway, template: &TemplateMessage) -> FollowupAttempt {
    let request = LlmRequest {
        max_tokens: Some(256),
        ..LlmRequest::single(
            system_prompt::followup_prompt(),
            system_prompt::followup_request(template),
        )
    };

    match gateway.invoke(&request, CallKind::Auxiliary).await {
        Ok(response) => FollowupAttempt {
            usage: Some(response.usage),
            result: parse_suggestion(&response.text),
        },
        Err(e) => FollowupAttempt {
            usage: None,
            result: Err(e.into()),
        },
    }
}

/// First well-formed object wins; any buttons the model added are dropped.
fn parse_suggestion(raw: &str) -> Result<TemplateMessage, FollowupError> {
    let values = sanitize(raw)?;
    let mut first_error = None;
    for value in &values {
        match validate(value) {
            Ok(validated) => {
                let body = validated.message.body.trim();
                if body.is_empty() {
                    return Err(FollowupError::EmptyBody);
                }
                return Ok(TemplateMessage::text_only(body));
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.map_or(FollowupError::Sanitize(SanitizeError::Unparseable), Into::into))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::MockLlmClient;
    use crate::runtime::GatewayLimits;
    use crate::template::Button;
    use std::sync::Arc;

    #[test]
    fn test_parse_forces_empty_buttons() {
        let suggestion = parse_suggestion(
            r#"{"Body": "Would you like to add a Shop Now button?", "Buttons": [{"type": "QUICK_REPLY", "text": "Yes"}]}"#,
        )
        .unwrap();
        assert_eq!(suggestion.body, "Would you like to add a Shop Now button?");
        assert!(suggestion.buttons.is_empty());
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(parse_suggestion("no json"), Err(FollowupError::Sanitize(_))));
        assert!(matches!(
            parse_suggestion(r#"{"Body": "hi"}"#),
            Err(FollowupError::Schema(_))
        ));
        assert!(matches!(
            parse_suggestion(r#"{"Body": "  ", "Buttons": []}"#),
            Err(FollowupError::EmptyBody)
        ));
    }

    #[tokio::test]
    async fn test_generate_followup_sends_template() {
        let mock = Arc::new(MockLlmClient::new("mock"));
        mock.queue_with_usage(
            "```json\n{\"Body\": \"Want a COPY_CODE button for the coupon?\", \"Buttons\": []}\n```",
            Usage::new(120, 18),
        );
        let gateway = ModelGateway::new(mock.clone(), GatewayLimits::default());
        let template = TemplateMessage::new("Use code {{1}}", vec![Button::quick_reply("Thanks")]);

        let attempt = generate_followup(&gateway, &template).await;
        assert_eq!(attempt.usage, Some(Usage::new(120, 18)));
        assert_eq!(
            attempt.result.unwrap().body,
            "Want a COPY_CODE button for the coupon?"
        );

        let request = &mock.recorded_requests()[0];
        assert!(request.messages[0].text.contains("Use code {{1}}"));
        assert!(request.json_output);
    }

    #[tokio::test]
    async fn test_model_failure_has_no_usage() {
        let mock = Arc::new(MockLlmClient::new("mock"));
        mock.queue_error(LlmError::rate_limit("slow down"));
        let gateway = ModelGateway::new(mock, GatewayLimits::default());

        let attempt = generate_followup(&gateway, &TemplateMessage::text_only("hi")).await;
        assert!(attempt.usage.is_none());
        assert!(matches!(attempt.result, Err(FollowupError::Model(_))));
    }
}
