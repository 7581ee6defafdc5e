//! Session orchestrator
//!
//! Runs one inbound message through routing, the model, the sanitizer and
//! validator, dedup, the optional follow-up call and cost attribution.
//! Every failure ends in a fixed frame or in silence; the only error that
//! leaves [`Orchestrator::handle`] is a closed client channel.

use super::{
    is_followup_turn, route_inbound, Emission, FrameKind, OutboundFrame, Route, Session,
    TokenUsage,
};
use crate::cost::{CostRecord, FxRates};
use crate::followup::generate_followup;
use crate::intent::{classify_intent, Intent};
use crate::llm::{LlmError, LlmErrorKind, Pricing, Usage};
use crate::rules::RuleTable;
use crate::runtime::{CallKind, ModelGateway};
use crate::system_prompt;
use crate::template::{
    enforce_limits, sanitize, validate_with, Button, ButtonLimits, ButtonSchema, DroppedButton,
    LimitReason, SanitizeError, SchemaError, TemplateMessage,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

pub const TIMEOUT_FALLBACK: &str = "⏳ The model took too long to respond. Please try again.";
pub const ERROR_FALLBACK: &str =
    "⚠️ An error occurred while generating this response. Please try again.";
pub const PARSE_FALLBACK: &str = "⚠️ Sorry, I couldn't process that. Please try again.";
pub const DECLINE_ACK: &str = "No problem! Let me know if you'd like any other changes.";

/// Buttons added when the user accepts a suggestion
const ACCEPT_URL_TEXT: &str = "Visit Website";
const ACCEPT_REPLY_TEXT: &str = "Contact Us";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("model call failed: {0}")]
    Model(#[from] LlmError),
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("client connection closed")]
    Closed,
}

impl TurnError {
    fn fallback_text(&self) -> &'static str {
        match self {
            TurnError::Model(e) if e.kind == LlmErrorKind::Timeout => TIMEOUT_FALLBACK,
            TurnError::Model(_) | TurnError::Closed => ERROR_FALLBACK,
            TurnError::Sanitize(_) | TurnError::Schema(_) => PARSE_FALLBACK,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub schema: ButtonSchema,
    pub limits: ButtonLimits,
    pub followups: bool,
    pub cost_tracking: bool,
    /// USD per million tokens for every call this orchestrator makes
    pub pricing: Pricing,
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            schema: ButtonSchema::default(),
            limits: ButtonLimits::default(),
            followups: true,
            cost_tracking: true,
            pricing: Pricing {
                input_per_million: 0.30,
                output_per_million: 2.50,
            },
            max_tokens: None,
        }
    }
}

pub struct Orchestrator {
    gateway: Arc<ModelGateway>,
    rates: Arc<FxRates>,
    rules: Arc<RuleTable>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<ModelGateway>,
        rates: Arc<FxRates>,
        rules: Arc<RuleTable>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            gateway,
            rates,
            rules,
            settings,
        }
    }

    /// Fresh session seeded with the template designer prompt
    pub fn new_session(&self) -> Session {
        Session::new(system_prompt::template_designer_prompt(
            self.settings.schema,
            &self.settings.limits,
        ))
    }

    /// Process one inbound user message to completion.
    pub async fn handle(
        &self,
        session: &mut Session,
        text: &str,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!(session_id = %session.id(), "Ignoring empty message");
            return Ok(());
        }

        tracing::debug!(
            session_id = %session.id(),
            matched = ?self.rules.actions_for(text),
            "Rule matches"
        );
        let route = route_inbound(
            &self.rules,
            session.last_sent().body(),
            session.last_template().is_some(),
            session.awaiting_followup(),
            text,
        );
        tracing::info!(
            session_id = %session.id(),
            chars = text.len(),
            route = route_name(&route),
            "Inbound message"
        );

        match route {
            Route::RemoveButtons => self.remove_buttons(session, text, out).await,
            Route::SuggestionReply { suggestion } => {
                self.suggestion_reply(session, &suggestion, text, out).await
            }
            Route::UrlReply(Ok(url)) => {
                if url.corrected {
                    tracing::info!(session_id = %session.id(), url = %url.url, "Added missing scheme");
                }
                self.generate(session, &url.url, out).await
            }
            Route::UrlReply(Err(e)) => {
                tracing::info!(session_id = %session.id(), error = %e, "Rejected address");
                let notice = TemplateMessage::text_only(e.prompt());
                let frame = self.frame(session, FrameKind::Notice, &notice, None);
                send(out, frame).await
            }
            Route::Generate => self.generate(session, text, out).await,
        }
    }

    /// Primary template generation over the whole history
    async fn generate(
        &self,
        session: &mut Session,
        text: &str,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        session.push_user(text);
        let request = session.model_request(self.settings.max_tokens);

        let response = match self.gateway.invoke(&request, CallKind::Primary).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(
                    session_id = %session.id(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Primary model call failed"
                );
                let err = TurnError::Model(e);
                let frame = self.fallback_frame(session, &err, session.last_sent().buttons());
                return send(out, frame).await;
            }
        };

        let cost = self.charge(session, response.usage).await;
        session.push_assistant(response.text.clone());

        match self.emit_templates(session, &response.text, cost, out).await {
            Ok(Some(primary)) if self.settings.followups => {
                self.followup(session, &primary, out).await
            }
            Ok(_) => Ok(()),
            Err(TurnError::Closed) => Err(TurnError::Closed),
            Err(err) => {
                tracing::warn!(
                    session_id = %session.id(),
                    error = %err,
                    raw = %response.text,
                    "Unusable model output"
                );
                let frame = self.fallback_frame(session, &err, &[]);
                send(out, frame).await
            }
        }
    }

    /// Validate and emit every object in `raw`, in order.
    ///
    /// Returns the primary template that went out, unless the same response
    /// also carried a follow-up question of its own.
    async fn emit_templates(
        &self,
        session: &mut Session,
        raw: &str,
        cost: Option<CostRecord>,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<Option<TemplateMessage>, TurnError> {
        let values = sanitize(raw)?;
        let mut cost = cost;
        let mut first_error = None;
        let mut any_valid = false;
        let mut saw_followup = false;
        let mut emitted_primary = None;

        for value in &values {
            let validated = match validate_with(value, &self.settings.limits) {
                Ok(validated) => validated,
                Err(e) => {
                    tracing::warn!(session_id = %session.id(), error = %e, "Dropping invalid message");
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            any_valid = true;

            if validated.limits_applied() {
                log_dropped(session, &validated.dropped);
            }
            let limits_applied = dropped_texts(&validated.dropped);
            let message = validated.message;
            let followup = is_followup_turn(&self.rules, &message);
            if followup {
                saw_followup = true;
                session.set_awaiting_followup(true);
            } else {
                session.set_last_template(message.clone());
                session.set_awaiting_followup(false);
            }

            let kind = if followup {
                FrameKind::Followup
            } else {
                FrameKind::Template
            };
            let emission = self
                .emit(session, kind, &message, cost.as_ref(), limits_applied, out)
                .await?;
            if emission == Emission::Emit {
                cost = None;
                if !followup {
                    emitted_primary = Some(message);
                }
            }
        }

        if !any_valid {
            return Err(first_error.map_or(TurnError::Sanitize(SanitizeError::Unparseable), Into::into));
        }
        Ok(if saw_followup { None } else { emitted_primary })
    }

    /// Best-effort refinement question after a primary template
    async fn followup(
        &self,
        session: &mut Session,
        primary: &TemplateMessage,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        let attempt = generate_followup(&self.gateway, primary).await;
        let cost = match attempt.usage {
            Some(usage) => self.charge(session, usage).await,
            None => None,
        };

        let suggestion = match attempt.result {
            Ok(suggestion) => suggestion,
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "Follow-up suggestion skipped");
                return Ok(());
            }
        };

        if self
            .emit(session, FrameKind::Followup, &suggestion, cost.as_ref(), None, out)
            .await?
            == Emission::Emit
        {
            session.push_assistant(suggestion.to_model_json());
            session.set_awaiting_followup(true);
        }
        Ok(())
    }

    async fn suggestion_reply(
        &self,
        session: &mut Session,
        suggestion: &str,
        text: &str,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        let outcome = classify_intent(&self.gateway, suggestion, text).await;
        let cost = match outcome.usage {
            Some(usage) => self.charge(session, usage).await,
            None => None,
        };
        tracing::info!(session_id = %session.id(), intent = ?outcome.intent, "Suggestion reply");

        match (outcome.intent, session.last_template().cloned()) {
            (Intent::Positive, Some(template)) => {
                self.accept_suggestion(session, template, text, cost, out).await
            }
            (Intent::Negative, _) => {
                session.push_user(text);
                let ack = TemplateMessage::text_only(DECLINE_ACK);
                session.push_assistant(ack.to_model_json());
                session.set_awaiting_followup(false);
                self.emit(session, FrameKind::Notice, &ack, cost.as_ref(), None, out)
                    .await
                    .map(|_| ())
            }
            _ => self.generate(session, text, out).await,
        }
    }

    /// Append the fixed button pair to the last template without a model call
    async fn accept_suggestion(
        &self,
        session: &mut Session,
        template: TemplateMessage,
        text: &str,
        cost: Option<CostRecord>,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        session.push_user(text);

        let mut buttons = template.buttons;
        buttons.push(Button::static_url(ACCEPT_URL_TEXT, ""));
        buttons.push(Button::quick_reply(ACCEPT_REPLY_TEXT));
        let (kept, dropped) = enforce_limits(buttons, &self.settings.limits);
        let message = TemplateMessage::new(template.body, kept);

        session.push_assistant(message.to_model_json());
        session.set_last_template(message.clone());
        session.set_awaiting_followup(false);
        self.emit(
            session,
            FrameKind::Template,
            &message,
            cost.as_ref(),
            dropped_texts(&dropped),
            out,
        )
        .await?;

        let missing_address = message
            .buttons
            .iter()
            .find(|b| matches!(b, Button::Url { url, .. } if url.is_empty()));
        if let Some(button) = missing_address {
            let ask = TemplateMessage::text_only(format!(
                "Please provide a valid URL for the '{}' button.",
                button.text()
            ));
            session.push_assistant(ask.to_model_json());
            session.set_awaiting_followup(true);
            self.emit(session, FrameKind::Followup, &ask, None, None, out)
                .await?;
        }
        Ok(())
    }

    /// Drop every button from the last template
    async fn remove_buttons(
        &self,
        session: &mut Session,
        text: &str,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<(), TurnError> {
        let Some(template) = session.last_template().cloned() else {
            return self.generate(session, text, out).await;
        };

        session.push_user(text);
        let stripped = TemplateMessage::text_only(template.body);
        session.push_assistant(stripped.to_model_json());
        session.set_last_template(stripped.clone());
        session.set_awaiting_followup(false);
        self.emit(session, FrameKind::Template, &stripped, None, None, out)
            .await
            .map(|_| ())
    }

    /// Pass `message` through dedup and send it if it is new
    async fn emit(
        &self,
        session: &mut Session,
        kind: FrameKind,
        message: &TemplateMessage,
        cost: Option<&CostRecord>,
        limits_applied: Option<Vec<String>>,
        out: &mpsc::Sender<OutboundFrame>,
    ) -> Result<Emission, TurnError> {
        let emission = session.last_sent_mut().offer(message);
        match emission {
            Emission::Emit => {
                let mut frame = self.frame(session, kind, message, cost);
                frame.limits_applied = limits_applied;
                send(out, frame).await?;
            }
            Emission::Suppress => {
                tracing::debug!(session_id = %session.id(), "Suppressed duplicate message");
            }
        }
        Ok(emission)
    }

    /// Price a completed call and add it to the session total
    async fn charge(&self, session: &mut Session, usage: Usage) -> Option<CostRecord> {
        if !self.settings.cost_tracking {
            return None;
        }
        let fx_rate = self.rates.current().await;
        let record = CostRecord::compute(usage, self.settings.pricing, fx_rate);
        session.record_cost(&record);
        tracing::info!(
            session_id = %session.id(),
            model = %self.gateway.model_id(),
            input_tokens = record.input_tokens,
            output_tokens = record.output_tokens,
            total_cost = record.total_cost,
            total_spent = session.total_spent(),
            "Recorded model cost"
        );
        Some(record)
    }

    fn frame(
        &self,
        session: &Session,
        kind: FrameKind,
        message: &TemplateMessage,
        cost: Option<&CostRecord>,
    ) -> OutboundFrame {
        let mut frame = OutboundFrame::new(
            kind,
            message.body.clone(),
            self.settings.schema.render(&message.buttons),
        );
        if self.settings.cost_tracking {
            frame.total_spent = Some(session.total_spent());
            frame.tokens = cost.map(TokenUsage::from);
        }
        frame
    }

    fn fallback_frame(&self, session: &Session, err: &TurnError, buttons: &[Button]) -> OutboundFrame {
        let message = TemplateMessage::new(err.fallback_text(), buttons.to_vec());
        self.frame(session, FrameKind::Fallback, &message, None)
    }
}

async fn send(out: &mpsc::Sender<OutboundFrame>, frame: OutboundFrame) -> Result<(), TurnError> {
    out.send(frame).await.map_err(|_| TurnError::Closed)
}

fn dropped_texts(dropped: &[DroppedButton]) -> Option<Vec<String>> {
    if dropped.is_empty() {
        None
    } else {
        Some(dropped.iter().map(|d| d.button.text().to_string()).collect())
    }
}

fn log_dropped(session: &Session, dropped: &[DroppedButton]) {
    for d in dropped {
        let cap = match d.reason {
            LimitReason::TypeCap(kind) => kind.label(),
            LimitReason::TotalCap => "TOTAL",
        };
        tracing::info!(
            session_id = %session.id(),
            index = d.index,
            text = d.button.text(),
            cap,
            "Button dropped by limit policy"
        );
    }
}

fn route_name(route: &Route) -> &'static str {
    match route {
        Route::RemoveButtons => "remove_buttons",
        Route::SuggestionReply { .. } => "suggestion_reply",
        Route::UrlReply(Ok(_)) => "url_reply",
        Route::UrlReply(Err(_)) => "url_rejected",
        Route::Generate => "generate",
    }
}
