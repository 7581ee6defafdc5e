//! Dedup and emission control
//!
//! A candidate goes out only if its body or its buttons differ from what
//! the client already has. Equality is structural and order-sensitive.

use crate::rules::RuleTable;
use crate::template::{Button, TemplateMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Emit,
    Suppress,
}

/// What the client was last sent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastSent {
    body: Option<String>,
    buttons: Option<Vec<Button>>,
}

impl LastSent {
    /// Decide whether `candidate` is new. On [`Emission::Emit`] both fields
    /// are replaced together.
    pub fn offer(&mut self, candidate: &TemplateMessage) -> Emission {
        let same_body = self.body.as_deref() == Some(candidate.body.as_str());
        let same_buttons = self.buttons.as_deref() == Some(candidate.buttons.as_slice());
        if same_body && same_buttons {
            return Emission::Suppress;
        }
        self.body = Some(candidate.body.clone());
        self.buttons = Some(candidate.buttons.clone());
        Emission::Emit
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Last sent buttons; empty when nothing was sent yet
    pub fn buttons(&self) -> &[Button] {
        self.buttons.as_deref().unwrap_or_default()
    }
}

/// A buttonless message whose body asks the user for something is a
/// follow-up turn rather than a template.
pub fn is_followup_turn(rules: &RuleTable, message: &TemplateMessage) -> bool {
    message.buttons.is_empty() && rules.is_followup_body(&message.body)
}
