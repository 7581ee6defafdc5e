//! Session state: history, last-sent fields and the cost ledger

use super::LastSent;
use crate::cost::{CostLedger, CostRecord};
use crate::llm::{LlmMessage, LlmRequest, SystemContent};
use crate::template::TemplateMessage;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One history entry; never modified after it is appended
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Conversation state for one connection
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    history: Vec<Turn>,
    last_sent: LastSent,
    /// Most recent primary template, the base for button edits
    last_template: Option<TemplateMessage>,
    ledger: CostLedger,
    awaiting_followup: bool,
}

impl Session {
    /// New session whose history starts with the system turn
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: vec![Turn {
                role: Role::System,
                text: system_prompt.into(),
            }],
            last_sent: LastSent::default(),
            last_template: None,
            ledger: CostLedger::new(),
            awaiting_followup: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(Turn {
            role: Role::User,
            text: text.into(),
        });
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.history.push(Turn {
            role: Role::Assistant,
            text: text.into(),
        });
    }

    pub fn last_sent(&self) -> &LastSent {
        &self.last_sent
    }

    pub fn last_sent_mut(&mut self) -> &mut LastSent {
        &mut self.last_sent
    }

    pub fn last_template(&self) -> Option<&TemplateMessage> {
        self.last_template.as_ref()
    }

    pub fn set_last_template(&mut self, template: TemplateMessage) {
        self.last_template = Some(template);
    }

    pub fn awaiting_followup(&self) -> bool {
        self.awaiting_followup
    }

    pub fn set_awaiting_followup(&mut self, awaiting: bool) {
        self.awaiting_followup = awaiting;
    }

    pub fn record_cost(&mut self, record: &CostRecord) {
        self.ledger.record(record);
    }

    pub fn total_spent(&self) -> f64 {
        self.ledger.total_spent()
    }

    pub fn ledger(&self) -> &CostLedger {
        &self.ledger
    }

    /// The whole history as a model request. The system turn becomes the
    /// system instruction; later turns keep their order.
    pub fn model_request(&self, max_tokens: Option<u32>) -> LlmRequest {
        let mut system = Vec::new();
        let mut messages = Vec::with_capacity(self.history.len());
        for turn in &self.history {
            match turn.role {
                Role::System => system.push(SystemContent::new(turn.text.clone())),
                Role::User => messages.push(LlmMessage::user(turn.text.clone())),
                Role::Assistant => messages.push(LlmMessage::assistant(turn.text.clone())),
            }
        }
        LlmRequest {
            system,
            messages,
            max_tokens,
            json_output: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageRole, Pricing, Usage};

    #[test]
    fn test_system_turn_first_and_only() {
        let mut session = Session::new("designer");
        session.push_user("Create a sale template");
        session.push_assistant(r#"{"Body": "Sale!", "Buttons": []}"#);

        let history = session.history();
        assert_eq!(history[0].role, Role::System);
        assert_eq!(history.iter().filter(|t| t.role == Role::System).count(), 1);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_model_request_layout() {
        let mut session = Session::new("designer");
        session.push_user("hi");
        session.push_assistant("hello");
        session.push_user("again");

        let request = session.model_request(Some(512));
        assert_eq!(request.system_text(), "designer");
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, MessageRole::User);
        assert_eq!(request.messages[1].role, MessageRole::Assistant);
        assert_eq!(request.max_tokens, Some(512));
        assert!(request.json_output);
    }

    #[test]
    fn test_ledger_accumulates() {
        let mut session = Session::new("designer");
        let pricing = Pricing {
            input_per_million: 1.0,
            output_per_million: 2.0,
        };
        let a = CostRecord::compute(Usage::new(1_000_000, 0), pricing, 1.0);
        let b = CostRecord::compute(Usage::new(0, 500_000), pricing, 1.0);
        session.record_cost(&a);
        session.record_cost(&b);
        assert!((session.total_spent() - 2.0).abs() < 1e-9);
        assert_eq!(session.ledger().calls(), 2);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        assert_ne!(Session::new("a").id(), Session::new("a").id());
    }
}
