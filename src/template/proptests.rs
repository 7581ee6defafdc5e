//! Property-based tests for sanitizing and validating model output
//!
//! - Fenced output recovers the same value as the unwrapped text
//! - Two concatenated objects come back as exactly two values
//! - Missing `Body` or `Buttons` is always a schema error
//! - URL truncation keeps exactly the cap, in original relative order

use super::*;
use proptest::prelude::*;
use serde_json::{json, Value};

// ============================================================================
// Strategies
// ============================================================================

/// Body text including braces and placeholders that could confuse a splitter
fn arb_body() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 _.!?,{}]{0,60}"
}

fn arb_button_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(|t| json!({"type": "QUICK_REPLY", "text": t})),
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(|t| json!({
            "type": "URL", "text": t, "url": "https://example.com", "urlType": "static"
        })),
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(|t| json!({
            "type": "PHONE_NUMBER", "text": t, "phone_number": "+14155550100"
        })),
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(|t| json!({"type": "COPY_CODE", "text": t, "example": []})),
    ]
}

fn arb_message_value() -> impl Strategy<Value = Value> {
    (arb_body(), proptest::collection::vec(arb_button_value(), 0..6))
        .prop_map(|(body, buttons)| json!({"Body": body, "Buttons": buttons}))
}

fn arb_fence_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("json".to_string()),
        Just("JSON".to_string()),
        "[a-z]{1,8}",
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_fence_is_transparent(msg in arb_message_value(), tag in arb_fence_tag(), pretty in any::<bool>()) {
        let text = if pretty {
            serde_json::to_string_pretty(&msg).unwrap()
        } else {
            serde_json::to_string(&msg).unwrap()
        };
        let plain = sanitize(&text).unwrap();
        let fenced = sanitize(&format!("```{tag}\n{text}\n```")).unwrap();
        prop_assert_eq!(&plain, &fenced);
        prop_assert_eq!(plain, vec![msg]);
    }

    #[test]
    fn prop_concatenation_splits_into_two(a in arb_message_value(), b in arb_message_value()) {
        let raw = format!(
            "{}{}",
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        let values = sanitize(&raw).unwrap();
        prop_assert_eq!(values, vec![a, b]);
    }

    #[test]
    fn prop_missing_required_field_is_error(msg in arb_message_value(), drop_body in any::<bool>()) {
        let mut msg = msg;
        let key = if drop_body { "Body" } else { "Buttons" };
        msg.as_object_mut().unwrap().remove(key);
        let err = validate(&msg).unwrap_err();
        prop_assert_eq!(err.field, key);
    }

    #[test]
    fn prop_url_truncation_keeps_first_two(
        url_texts in proptest::collection::vec("[a-z]{1,10}", 3..8),
        replies in proptest::collection::vec("[a-z]{1,10}", 0..5),
        interleave in any::<u64>(),
    ) {
        // Interleave quick replies between the URL buttons deterministically
        let mut buttons = Vec::new();
        let mut replies = replies.into_iter();
        for (i, text) in url_texts.iter().enumerate() {
            if (interleave >> (i % 64)) & 1 == 1 {
                if let Some(r) = replies.next() {
                    buttons.push(json!({"type": "QUICK_REPLY", "text": r}));
                }
            }
            buttons.push(json!({"type": "URL", "text": text, "url": "https://a.io", "urlType": "static"}));
        }
        buttons.extend(replies.map(|r| json!({"type": "QUICK_REPLY", "text": r})));

        let validated = validate(&json!({"Body": "b", "Buttons": buttons})).unwrap();
        let kept_urls: Vec<&str> = validated
            .message
            .buttons
            .iter()
            .filter(|b| b.kind() == ButtonKind::Url)
            .map(Button::text)
            .collect();
        let expected: Vec<&str> = url_texts.iter().take(2).map(String::as_str).collect();
        prop_assert_eq!(kept_urls, expected);
        prop_assert_eq!(validated.dropped.len(), url_texts.len() - 2);
    }

    #[test]
    fn prop_limits_never_exceeded(msg in proptest::collection::vec(arb_button_value(), 0..20)) {
        let validated = validate(&json!({"Body": "b", "Buttons": msg})).unwrap();
        let buttons = &validated.message.buttons;
        let count = |k: ButtonKind| buttons.iter().filter(|b| b.kind() == k).count();
        prop_assert!(buttons.len() <= 10);
        prop_assert!(count(ButtonKind::Url) <= 2);
        prop_assert!(count(ButtonKind::PhoneNumber) <= 1);
        prop_assert!(count(ButtonKind::CopyCode) <= 1);
    }
}
