//! Process configuration, read once from the environment
//!
//! Unset variables take their defaults. Values that do not parse also fall
//! back to the default, with a warning naming the variable.

use crate::cost::{DEFAULT_CURRENCY, DEFAULT_FALLBACK_RATE, DEFAULT_FX_URL};
use crate::llm::{LlmConfig, Pricing};
use crate::runtime::GatewayLimits;
use crate::template::ButtonSchema;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8765;
const DEFAULT_FX_TTL_SECS: u64 = 3600;

/// Exchange-rate lookup settings
#[derive(Debug, Clone, PartialEq)]
pub struct FxConfig {
    /// Lookup endpoint; empty disables lookups and pins the fallback rate
    pub url: String,
    pub currency: String,
    pub fallback: f64,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub llm: LlmConfig,
    pub gateway: GatewayLimits,
    pub followups: bool,
    pub cost_tracking: bool,
    pub button_schema: ButtonSchema,
    pub fx: FxConfig,
    /// USD per million input tokens, overriding the model's list price
    pub input_rate: Option<f64>,
    pub output_rate: Option<f64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = GatewayLimits::default();
        let secs = |key: &str, default: Duration| {
            Duration::from_secs(parse_or(&lookup, key, default.as_secs()))
        };

        let button_schema = match lookup("COPILOT_BUTTON_SCHEMA") {
            Some(raw) => ButtonSchema::parse(&raw).unwrap_or_else(|| {
                tracing::warn!(key = "COPILOT_BUTTON_SCHEMA", value = %raw, "Unrecognized value, using default");
                ButtonSchema::default()
            }),
            None => ButtonSchema::default(),
        };

        Self {
            host: lookup("COPILOT_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&lookup, "COPILOT_PORT", DEFAULT_PORT),
            llm: LlmConfig::from_lookup(&lookup),
            gateway: GatewayLimits {
                primary_timeout: secs("COPILOT_MODEL_TIMEOUT_SECS", defaults.primary_timeout),
                auxiliary_timeout: secs("COPILOT_AUX_TIMEOUT_SECS", defaults.auxiliary_timeout),
                worker_limit: parse_or(&lookup, "COPILOT_WORKER_LIMIT", defaults.worker_limit),
            },
            followups: flag_or(&lookup, "COPILOT_FOLLOWUPS", true),
            cost_tracking: flag_or(&lookup, "COPILOT_COST_TRACKING", true),
            button_schema,
            fx: FxConfig {
                url: lookup("COPILOT_FX_URL").unwrap_or_else(|| DEFAULT_FX_URL.to_string()),
                currency: lookup("COPILOT_FX_CURRENCY")
                    .filter(|c| !c.trim().is_empty())
                    .map_or_else(|| DEFAULT_CURRENCY.to_string(), |c| c.trim().to_ascii_uppercase()),
                fallback: parse_or(&lookup, "COPILOT_FX_FALLBACK", DEFAULT_FALLBACK_RATE),
                ttl: Duration::from_secs(parse_or(&lookup, "COPILOT_FX_TTL_SECS", DEFAULT_FX_TTL_SECS)),
            },
            input_rate: parse_opt(&lookup, "COPILOT_INPUT_RATE"),
            output_rate: parse_opt(&lookup, "COPILOT_OUTPUT_RATE"),
        }
    }

    /// Model list price with any configured overrides applied
    pub fn pricing(&self, base: Pricing) -> Pricing {
        Pricing {
            input_per_million: self.input_rate.unwrap_or(base.input_per_million),
            output_per_million: self.output_rate.unwrap_or(base.output_per_million),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_opt<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Unparseable value, ignoring");
            None
        }
    }
}

fn parse_or<T: FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "Unparseable value, using default");
        default
    })
}

fn flag_or(lookup: impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            tracing::warn!(key, value = %raw, "Unparseable flag, using default");
            default
        }
    }
}
