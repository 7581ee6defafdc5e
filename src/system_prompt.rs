//! Instructions handed to the model
//!
//! Three prompts live here: the template designer that sits at the top of
//! every session history, the one-shot intent classifier, and the follow-up
//! suggestion prompt built from the template that was just sent.

use crate::template::{ButtonLimits, ButtonSchema, TemplateMessage};
use std::fmt::Write;

const DESIGNER_ROLE: &str = r#"You design WhatsApp business message templates together with the user.

Every reply you give is a single JSON object and nothing else:
{"Body": "<message text>", "Buttons": [<button>, ...]}

Body rules:
- Write the message the business will send, not a description of it.
- Use numbered placeholders {{1}}, {{2}}, ... for customer-specific values such as names, dates, amounts and codes.
- Keep it friendly and short. Emoji are welcome when they suit the tone.

When you need information from the user before you can produce a template (a missing URL, a phone number, a discount value), reply with your question as the Body and an empty Buttons array.

When the user supplies a URL, use it exactly as given."#;

const FOUR_TYPE_BUTTONS: &str = r#"Buttons use these shapes:
- {"type": "URL", "text": "...", "url": "https://...", "urlType": "static"}
- {"type": "URL", "text": "...", "url": "https://example.com/{{1}}", "urlType": "dynamic", "example": ["https://example.com/summer"]}
- {"type": "PHONE_NUMBER", "text": "...", "phone_number": "+15550100"}
- {"type": "COPY_CODE", "text": "...", "example": []}
- {"type": "QUICK_REPLY", "text": "..."}"#;

const LEGACY_BUTTONS: &str = r#"Buttons use these shapes:
- {"type": "Quick Reply", "text": "..."}
- {"type": "Call to Action", "text": "...", "url": "https://..."}
- {"type": "Call to Action", "text": "...", "phone_number": "+15550100"}"#;

const INTENT_PROMPT: &str = r#"You read a chat reply and decide whether it accepts, declines, or ignores an offer the assistant just made.

Answer with one JSON object and nothing else: {"intent": "positive"}, {"intent": "negative"} or {"intent": "neutral"}.

- positive: the user agrees ("yes", "sure", "go ahead", "add it please").
- negative: the user declines ("no", "not now", "skip it", "no thanks").
- neutral: anything else, including new requests or questions."#;

const FOLLOWUP_PROMPT: &str = r#"You help improve WhatsApp message templates. Given the template below, suggest exactly one small improvement the user might want, phrased as a short question (for example "Would you like to add a Shop Now button?").

Reply with one JSON object and nothing else: {"Body": "<your question>", "Buttons": []}
The Buttons array must always be empty."#;

/// System prompt for the template designer conversation
pub fn template_designer_prompt(schema: ButtonSchema, limits: &ButtonLimits) -> String {
    let mut prompt = String::from(DESIGNER_ROLE);
    prompt.push_str("\n\n");
    prompt.push_str(match schema {
        ButtonSchema::FourType => FOUR_TYPE_BUTTONS,
        ButtonSchema::Legacy => LEGACY_BUTTONS,
    });

    let _ = write!(
        prompt,
        "\n\nButton limits: at most {} buttons in total, at most {} URL buttons, \
         at most {} phone number button and at most {} copy code button. \
         Every other button is a quick reply. If the user asks for more than \
         the limits allow, keep the first ones and tell them in the Body that \
         the rest were left out.",
        limits.total, limits.url, limits.phone_number, limits.copy_code
    );
    prompt
}

/// System prompt for classifying a reply to a suggestion
pub fn intent_prompt() -> &'static str {
    INTENT_PROMPT
}

/// User turn for the intent classifier
pub fn intent_request(suggestion: &str, reply: &str) -> String {
    format!("Assistant offer:\n{suggestion}\n\nUser reply:\n{reply}")
}

/// System prompt for the follow-up suggestion call
pub fn followup_prompt() -> &'static str {
    FOLLOWUP_PROMPT
}

/// User turn for the follow-up call, carrying the template just sent
pub fn followup_request(template: &TemplateMessage) -> String {
    let mut request = String::from("Current template:\n");
    request.push_str(&template.to_model_json());
    request
}
