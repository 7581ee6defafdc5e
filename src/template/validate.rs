//! Schema and button-limit policy
//!
//! Missing structure is an error; too many buttons is not. Buttons past a
//! cap are dropped in model order and reported back so the caller can tell
//! the user which ones were cut.

use super::{Button, ButtonKind, TemplateMessage};
use serde_json::{Map, Value};
use thiserror::Error;

/// A required field is absent or has the wrong shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema error at {field}: {reason}")]
pub struct SchemaError {
    pub field: String,
    pub reason: String,
}

impl SchemaError {
    pub fn missing(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: "missing".to_string(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Per-type and total button caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonLimits {
    pub total: usize,
    pub url: usize,
    pub phone_number: usize,
    pub copy_code: usize,
}

impl Default for ButtonLimits {
    fn default() -> Self {
        Self {
            total: 10,
            url: 2,
            phone_number: 1,
            copy_code: 1,
        }
    }
}

impl ButtonLimits {
    /// Cap for a single type; quick replies are bounded only by the total
    pub fn cap_for(&self, kind: ButtonKind) -> usize {
        match kind {
            ButtonKind::Url => self.url,
            ButtonKind::PhoneNumber => self.phone_number,
            ButtonKind::CopyCode => self.copy_code,
            ButtonKind::QuickReply => self.total,
        }
    }
}

/// Why a button was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitReason {
    TypeCap(ButtonKind),
    TotalCap,
}

/// A button removed by limit enforcement, with its position in the
/// model's original list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedButton {
    pub index: usize,
    pub button: Button,
    pub reason: LimitReason,
}

/// A well-formed message plus whatever truncation was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMessage {
    pub message: TemplateMessage,
    pub dropped: Vec<DroppedButton>,
}

impl ValidatedMessage {
    pub fn limits_applied(&self) -> bool {
        !self.dropped.is_empty()
    }
}

/// Validate against the default limits
pub fn validate(value: &Value) -> Result<ValidatedMessage, SchemaError> {
    validate_with(value, &ButtonLimits::default())
}

pub fn validate_with(value: &Value, limits: &ButtonLimits) -> Result<ValidatedMessage, SchemaError> {
    let obj = value
        .as_object()
        .ok_or_else(|| SchemaError::invalid("$", "expected a JSON object"))?;

    let body = lookup(obj, "Body")
        .ok_or_else(|| SchemaError::missing("Body"))?
        .as_str()
        .ok_or_else(|| SchemaError::invalid("Body", "expected a string"))?
        .to_string();

    let raw_buttons = lookup(obj, "Buttons")
        .ok_or_else(|| SchemaError::missing("Buttons"))?
        .as_array()
        .ok_or_else(|| SchemaError::invalid("Buttons", "expected an array"))?;

    let buttons = raw_buttons
        .iter()
        .enumerate()
        .map(|(i, v)| Button::from_value(v, i))
        .collect::<Result<Vec<_>, _>>()?;

    let (kept, dropped) = enforce_limits(buttons, limits);
    Ok(ValidatedMessage {
        message: TemplateMessage::new(body, kept),
        dropped,
    })
}

/// Keep buttons in order until their type cap or the total cap is hit
pub fn enforce_limits(buttons: Vec<Button>, limits: &ButtonLimits) -> (Vec<Button>, Vec<DroppedButton>) {
    let mut kept: Vec<Button> = Vec::with_capacity(buttons.len().min(limits.total));
    let mut dropped = Vec::new();
    let mut counts = [0usize; 4];

    for (index, button) in buttons.into_iter().enumerate() {
        let kind = button.kind();
        let slot = kind_slot(kind);
        let reason = if counts[slot] >= limits.cap_for(kind) {
            Some(LimitReason::TypeCap(kind))
        } else if kept.len() >= limits.total {
            Some(LimitReason::TotalCap)
        } else {
            None
        };

        match reason {
            Some(reason) => dropped.push(DroppedButton {
                index,
                button,
                reason,
            }),
            None => {
                counts[slot] += 1;
                kept.push(button);
            }
        }
    }

    (kept, dropped)
}

fn kind_slot(kind: ButtonKind) -> usize {
    match kind {
        ButtonKind::Url => 0,
        ButtonKind::PhoneNumber => 1,
        ButtonKind::CopyCode => 2,
        ButtonKind::QuickReply => 3,
    }
}

/// Exact key first, then a case-insensitive match (`body`, `BUTTONS`)
fn lookup<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).or_else(|| {
        obj.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}
