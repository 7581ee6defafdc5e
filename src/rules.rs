//! Phrase rules that steer the conversation
//!
//! A small, ordered table mapping case-insensitive patterns to actions.
//! Adding a phrasing is a table edit; control flow only asks
//! [`RuleTable::matches`].

use regex::{Regex, RegexBuilder};
use std::sync::Arc;

/// What a matching phrase means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleAction {
    /// Outbound body proposes adding something ("Would you like to add ...?")
    SuggestionOffer,
    /// Outbound body asks the user for a web address
    AsksForUrl,
    /// Outbound body asks the user for missing details
    RequestsInfo,
    /// User asks to drop every button from the template
    RemoveButtons,
    /// User text looks like an address: a scheme, `www.`, or a known TLD
    LooksLikeAddress,
}

/// One compiled entry
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Regex,
    pub action: RuleAction,
}

/// Ordered rule table
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

const BUILTIN_RULES: &[(&str, RuleAction)] = &[
    (r"\b(would|do) you (like|want) (me )?to (add|include)\b", RuleAction::SuggestionOffer),
    (r"\b(shall|should) (i|we) (add|include)\b", RuleAction::SuggestionOffer),
    (r"\bhow about adding\b", RuleAction::SuggestionOffer),
    (r"\bwant me to (add|include)\b", RuleAction::SuggestionOffer),
    (
        r"\b(provide|share|enter|type|send|give)\b.*\b(url|link|website|web address)\b",
        RuleAction::AsksForUrl,
    ),
    (r"\b(url|link|website)\b[^.!]*\?", RuleAction::AsksForUrl),
    (
        r"\b(please|kindly) (provide|share|tell|specify|confirm|enter|send)\b",
        RuleAction::RequestsInfo,
    ),
    (r"\b(could|can|would) you (please )?(provide|share|tell|specify|confirm)\b", RuleAction::RequestsInfo),
    (r"\bwhat (is|are|would|should)\b", RuleAction::RequestsInfo),
    (r"\?\s*$", RuleAction::RequestsInfo),
    (
        r"\b(remove|delete|drop|clear|get rid of)\b.*\b(all )?(the )?buttons\b",
        RuleAction::RemoveButtons,
    ),
    (r"\b(no|without) (any )?buttons\b", RuleAction::RemoveButtons),
    (r"^(?:https?://|www\.)\S+$", RuleAction::LooksLikeAddress),
    (
        r"^[a-z0-9-]+(?:\.[a-z0-9-]+)*\.(?:com|net|org|in|co|io|ai|app|dev|shop|store|online|site|info|biz|me|us|uk|ca|au|de|xyz)(?:[:/?#,;]\S*)?$",
        RuleAction::LooksLikeAddress,
    ),
];

impl RuleTable {
    /// Build a table from `(pattern, action)` entries
    pub fn from_entries<'a>(
        entries: impl IntoIterator<Item = (&'a str, RuleAction)>,
    ) -> Result<Self, regex::Error> {
        let rules = entries
            .into_iter()
            .map(|(pattern, action)| {
                let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
                Ok(Rule { pattern, action })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// The built-in phrase table
    pub fn builtin() -> Result<Arc<Self>, regex::Error> {
        Self::from_entries(BUILTIN_RULES.iter().copied()).map(Arc::new)
    }

    /// Does any rule for `action` match `text`?
    pub fn matches(&self, action: RuleAction, text: &str) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.action == action && rule.pattern.is_match(text))
    }

    /// Actions whose rules match `text`, in table order without repeats
    pub fn actions_for(&self, text: &str) -> Vec<RuleAction> {
        let mut actions = Vec::new();
        for rule in &self.rules {
            if !actions.contains(&rule.action) && rule.pattern.is_match(text) {
                actions.push(rule.action);
            }
        }
        actions
    }

    /// A message with no buttons whose body asks the user for something is
    /// a follow-up turn, not a template.
    pub fn is_followup_body(&self, body: &str) -> bool {
        [
            RuleAction::RequestsInfo,
            RuleAction::AsksForUrl,
            RuleAction::SuggestionOffer,
        ]
        .into_iter()
        .any(|action| self.matches(action, body))
    }
}
