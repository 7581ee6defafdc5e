//! Typed interactive buttons
//!
//! The canonical schema has four button types. Older model prompts used a
//! two-type schema (`Quick Reply` / `Call to Action`); those tags are always
//! accepted on input and upgraded, and can be rendered back on output when
//! the client runs in [`ButtonSchema::Legacy`] mode.

use super::SchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Whether a URL button's address is fixed or carries a `{{1}}` suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlType {
    #[default]
    Static,
    Dynamic,
}

/// An interactive button attached to a template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Button {
    Url {
        text: String,
        url: String,
        #[serde(rename = "urlType")]
        url_type: UrlType,
        /// Sample values; only meaningful for dynamic URLs
        #[serde(skip_serializing_if = "Vec::is_empty")]
        example: Vec<String>,
    },
    PhoneNumber {
        text: String,
        phone_number: String,
    },
    CopyCode {
        text: String,
        /// Placeholder field, always present and always empty
        example: Vec<String>,
    },
    QuickReply {
        text: String,
    },
}

/// Discriminant of [`Button`], used for per-type limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Url,
    PhoneNumber,
    CopyCode,
    QuickReply,
}

impl ButtonKind {
    pub fn label(self) -> &'static str {
        match self {
            ButtonKind::Url => "URL",
            ButtonKind::PhoneNumber => "PHONE_NUMBER",
            ButtonKind::CopyCode => "COPY_CODE",
            ButtonKind::QuickReply => "QUICK_REPLY",
        }
    }
}

/// Which button schema the client speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonSchema {
    #[default]
    FourType,
    Legacy,
}

impl ButtonSchema {
    pub fn parse(s: &str) -> Option<Self> {
        match normalize_tag(s).as_str() {
            "fourtype" | "four" | "v2" => Some(Self::FourType),
            "legacy" | "twotype" | "two" | "v1" => Some(Self::Legacy),
            _ => None,
        }
    }

    /// Render buttons for the outbound frame
    pub fn render(self, buttons: &[Button]) -> Vec<Value> {
        match self {
            ButtonSchema::FourType => buttons
                .iter()
                .map(|b| serde_json::to_value(b).unwrap_or(Value::Null))
                .collect(),
            ButtonSchema::Legacy => buttons.iter().map(Button::to_legacy_value).collect(),
        }
    }
}

impl Button {
    pub fn quick_reply(text: impl Into<String>) -> Self {
        Button::QuickReply { text: text.into() }
    }

    pub fn static_url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Button::Url {
            text: text.into(),
            url: url.into(),
            url_type: UrlType::Static,
            example: Vec::new(),
        }
    }

    pub fn kind(&self) -> ButtonKind {
        match self {
            Button::Url { .. } => ButtonKind::Url,
            Button::PhoneNumber { .. } => ButtonKind::PhoneNumber,
            Button::CopyCode { .. } => ButtonKind::CopyCode,
            Button::QuickReply { .. } => ButtonKind::QuickReply,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Button::Url { text, .. }
            | Button::PhoneNumber { text, .. }
            | Button::CopyCode { text, .. }
            | Button::QuickReply { text } => text,
        }
    }

    /// Parse one entry of a model's `Buttons` array.
    ///
    /// Type tags are matched case-insensitively with spaces, dashes and
    /// underscores ignored, and common key spellings are tolerated.
    pub fn from_value(value: &Value, index: usize) -> Result<Self, SchemaError> {
        let field = |name: &str| format!("Buttons[{index}].{name}");

        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::invalid(format!("Buttons[{index}]"), "not an object"))?;

        let tag = lookup_str(obj, &["type", "Type"])
            .ok_or_else(|| SchemaError::missing(field("type")))?;
        let text = lookup_str(obj, &["text", "Text"])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SchemaError::missing(field("text")))?
            .to_string();

        let phone = lookup_str(obj, &["phone_number", "phoneNumber", "phone"]);

        match normalize_tag(tag).as_str() {
            "quickreply" | "reply" => Ok(Button::QuickReply { text }),
            "copycode" | "copy" => Ok(Button::CopyCode {
                text,
                example: Vec::new(),
            }),
            "phonenumber" | "phone" | "call" => {
                let phone_number = phone
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| SchemaError::missing(field("phone_number")))?;
                Ok(Button::PhoneNumber {
                    text,
                    phone_number: phone_number.trim().to_string(),
                })
            }
            "calltoaction" | "cta" => match phone.filter(|p| !p.trim().is_empty()) {
                Some(phone_number) => Ok(Button::PhoneNumber {
                    text,
                    phone_number: phone_number.trim().to_string(),
                }),
                None => Self::url_from_object(obj, text, index),
            },
            "url" | "website" | "visitwebsite" => Self::url_from_object(obj, text, index),
            _ => Err(SchemaError::invalid(
                field("type"),
                format!("unknown button type {tag:?}"),
            )),
        }
    }

    fn url_from_object(obj: &Map<String, Value>, text: String, index: usize) -> Result<Self, SchemaError> {
        let url = lookup_str(obj, &["url", "URL", "Url"])
            .unwrap_or_default()
            .trim()
            .to_string();

        let url_type = match lookup_str(obj, &["urlType", "url_type", "UrlType"]) {
            None => UrlType::Static,
            Some(raw) => match normalize_tag(raw).as_str() {
                "static" => UrlType::Static,
                "dynamic" => UrlType::Dynamic,
                _ => {
                    return Err(SchemaError::invalid(
                        format!("Buttons[{index}].urlType"),
                        format!("expected static or dynamic, got {raw:?}"),
                    ))
                }
            },
        };

        let example: Vec<String> = obj
            .get("example")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if url_type == UrlType::Dynamic && example.is_empty() {
            return Err(SchemaError::missing(format!("Buttons[{index}].example")));
        }

        Ok(Button::Url {
            text,
            url,
            url_type,
            example: if url_type == UrlType::Dynamic {
                example
            } else {
                Vec::new()
            },
        })
    }

    /// Two-type rendering for clients on the older schema
    pub fn to_legacy_value(&self) -> Value {
        match self {
            Button::Url { text, url, .. } => json!({
                "type": "Call to Action",
                "text": text,
                "url": url,
            }),
            Button::PhoneNumber { text, phone_number } => json!({
                "type": "Call to Action",
                "text": text,
                "phone_number": phone_number,
            }),
            Button::CopyCode { text, .. } | Button::QuickReply { text } => json!({
                "type": "Quick Reply",
                "text": text,
            }),
        }
    }
}

fn lookup_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_str))
}

fn normalize_tag(tag: &str) -> String {
    tag.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
