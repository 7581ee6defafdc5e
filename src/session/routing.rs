//! Decide how an inbound message is handled before any model call

use crate::rules::{RuleAction, RuleTable};
use crate::template::{normalize_url, NormalizedUrl, UrlError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Strip every button from the last template, no model call
    RemoveButtons,
    /// Reply to an outstanding offer; classify intent first
    SuggestionReply { suggestion: String },
    /// The message is an address for a URL button
    UrlReply(Result<NormalizedUrl, UrlError>),
    /// Ordinary input for the template designer
    Generate,
}

/// Route `text` given what the client was last sent.
///
/// A reply counts as an answer to an offer only while a follow-up is
/// outstanding, and it is checked before any address handling so that
/// "yes" to an offer of a website button is classified, not parsed. An
/// address typed in answer to an offer is still an address. While the last
/// body asks for a URL, any message with a dot or without whitespace is
/// treated as the address. Otherwise only text that looks like a bare
/// address is.
pub fn route_inbound(
    rules: &RuleTable,
    last_sent_body: Option<&str>,
    has_template: bool,
    awaiting_followup: bool,
    text: &str,
) -> Route {
    let text = text.trim();

    if has_template && rules.matches(RuleAction::RemoveButtons, text) {
        return Route::RemoveButtons;
    }

    let looks_like_address = rules.matches(RuleAction::LooksLikeAddress, text);

    if let Some(body) = last_sent_body.filter(|_| awaiting_followup) {
        if !looks_like_address && rules.matches(RuleAction::SuggestionOffer, body) {
            return Route::SuggestionReply {
                suggestion: body.to_string(),
            };
        }
    }

    let awaiting_url = last_sent_body.is_some_and(|body| rules.matches(RuleAction::AsksForUrl, body));
    let single_token = !text.is_empty() && !text.contains(char::is_whitespace);
    let url_reply = if awaiting_url {
        text.contains('.') || single_token
    } else {
        looks_like_address
    };
    if url_reply {
        return Route::UrlReply(normalize_url(text));
    }

    Route::Generate
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> std::sync::Arc<RuleTable> {
        RuleTable::builtin().unwrap()
    }

    #[test]
    fn test_plain_message_generates() {
        assert_eq!(
            route_inbound(&rules(), None, false, false, "Create a sale template"),
            Route::Generate
        );
    }

    #[test]
    fn test_bad_address_rejected_without_context() {
        let route = route_inbound(&rules(), None, false, false, "www.google.in,aaas.in,aaaaa");
        assert!(matches!(route, Route::UrlReply(Err(_))));
    }

    #[test]
    fn test_bare_host_corrected() {
        let route = route_inbound(&rules(), None, true, false, "amazon.in");
        let Route::UrlReply(Ok(url)) = route else {
            panic!("expected url reply, got {route:?}");
        };
        assert_eq!(url.url, "https://amazon.in");
        assert!(url.corrected);
    }

    #[test]
    fn test_awaiting_url_takes_single_token() {
        let asked = "Please provide the website URL for the 'Shop Now' button.";
        let route = route_inbound(&rules(), Some(asked), true, true, "mystore");
        assert!(matches!(route, Route::UrlReply(Err(_))));

        let route = route_inbound(&rules(), Some(asked), true, true, "https://a.com https://b.com");
        assert!(matches!(route, Route::UrlReply(Err(_))));

        let route = route_inbound(&rules(), Some(asked), true, true, "skip that button please");
        assert_eq!(route, Route::Generate);
    }

    #[test]
    fn test_suggestion_reply() {
        let offer = "Would you like to add a call-to-action button?";
        assert_eq!(
            route_inbound(&rules(), Some(offer), true, true, "yes please"),
            Route::SuggestionReply {
                suggestion: offer.to_string()
            }
        );
        // an offer the user already answered is not reopened
        assert_eq!(
            route_inbound(&rules(), Some(offer), true, false, "yes please"),
            Route::Generate
        );
    }

    #[test]
    fn test_one_word_answer_to_website_offer() {
        let offer = "Do you want me to include a Visit Website button?";
        for answer in ["yes", "sure", "no"] {
            assert_eq!(
                route_inbound(&rules(), Some(offer), true, true, answer),
                Route::SuggestionReply {
                    suggestion: offer.to_string()
                },
                "{answer}"
            );
        }
        // an address given in answer to the offer is still an address
        let route = route_inbound(&rules(), Some(offer), true, true, "www.mystore.in");
        assert!(matches!(route, Route::UrlReply(Ok(_))), "{route:?}");
    }

    #[test]
    fn test_remove_buttons_needs_template() {
        assert_eq!(
            route_inbound(&rules(), Some("Sale!"), true, false, "remove all buttons"),
            Route::RemoveButtons
        );
        assert_eq!(
            route_inbound(&rules(), None, false, false, "remove all buttons"),
            Route::Generate
        );
    }
}
