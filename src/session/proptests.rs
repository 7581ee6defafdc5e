//! Property-based tests for dedup and routing
//!
//! - Offering the same message twice emits exactly once
//! - Changing one button's text always emits again
//! - Rejected addresses never reach the model

use super::*;
use crate::rules::RuleTable;
use crate::template::{Button, TemplateMessage};
use proptest::prelude::*;

fn arb_button() -> impl Strategy<Value = Button> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(Button::quick_reply),
        "[a-zA-Z][a-zA-Z ]{0,19}".prop_map(|t| Button::static_url(t, "https://example.com")),
    ]
}

fn arb_message() -> impl Strategy<Value = TemplateMessage> {
    ("[a-zA-Z0-9 {}!]{0,60}", proptest::collection::vec(arb_button(), 0..6))
        .prop_map(|(body, buttons)| TemplateMessage::new(body, buttons))
}

proptest! {
    #[test]
    fn prop_repeat_is_suppressed(msg in arb_message()) {
        let mut last = LastSent::default();
        prop_assert_eq!(last.offer(&msg), Emission::Emit);
        prop_assert_eq!(last.offer(&msg), Emission::Suppress);
        prop_assert_eq!(last.body(), Some(msg.body.as_str()));
        prop_assert_eq!(last.buttons(), msg.buttons.as_slice());
    }

    #[test]
    fn prop_button_text_change_emits(
        msg in arb_message().prop_filter("needs a button", |m| !m.buttons.is_empty()),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut last = LastSent::default();
        last.offer(&msg);

        let mut changed = msg.clone();
        let i = pick.index(changed.buttons.len());
        let text = format!("{}!", changed.buttons[i].text());
        changed.buttons[i] = Button::quick_reply(text);
        prop_assert_eq!(last.offer(&changed), Emission::Emit);
    }

    #[test]
    fn prop_separated_addresses_rejected(
        hosts in proptest::collection::vec("[a-z]{2,8}\\.(com|in|org)", 2..4),
        sep in prop_oneof![Just(","), Just(";"), Just(", ")],
    ) {
        let rules = RuleTable::builtin().unwrap();
        let asked = "Please provide the URL for the button.";
        let text = hosts.join(sep);
        let route = route_inbound(&rules, Some(asked), true, true, &text);
        prop_assert!(matches!(route, Route::UrlReply(Err(_))), "{:?}", route);
    }
}
