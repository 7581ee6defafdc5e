//! Centralized model definitions for all LLM providers
//!
//! Each definition carries the USD list price the cost ledger bills against.

use super::gemini::GeminiModel;
use super::openai::OpenAIModel;
use super::{GeminiService, LlmService, OpenAIService};
use std::sync::Arc;

/// LLM provider enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gemini,
    OpenAI,
}

impl Provider {
    /// Get the display name for this provider
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Google Gemini",
            Provider::OpenAI => "OpenAI",
        }
    }

    /// Get the environment variable name for this provider's API key
    pub fn api_key_env_var(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

/// Token pricing in USD per million tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Model definition with metadata
#[derive(Debug, Clone)]
pub struct ModelDef {
    /// User-facing model ID (e.g., "gemini-2.5-flash")
    pub id: &'static str,
    /// Provider for this model
    pub provider: Provider,
    /// Human-readable description
    pub description: &'static str,
    pub pricing: Pricing,
    /// Factory function to create the service
    pub factory: fn(&str, Option<&str>) -> Result<Arc<dyn LlmService>, String>,
}

/// Get all available model definitions
pub fn all_models() -> &'static [ModelDef] {
    &[
        ModelDef {
            id: "gemini-2.5-flash",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Flash (fast, default)",
            pricing: Pricing {
                input_per_million: 0.30,
                output_per_million: 2.50,
            },
            factory: |api_key, gateway| {
                if api_key.is_empty() {
                    return Err("gemini-2.5-flash requires GEMINI_API_KEY or gateway".to_string());
                }
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini25Flash,
                    gateway,
                )))
            },
        },
        ModelDef {
            id: "gemini-2.5-pro",
            provider: Provider::Gemini,
            description: "Gemini 2.5 Pro (most capable, slower)",
            pricing: Pricing {
                input_per_million: 1.25,
                output_per_million: 10.00,
            },
            factory: |api_key, gateway| {
                if api_key.is_empty() {
                    return Err("gemini-2.5-pro requires GEMINI_API_KEY or gateway".to_string());
                }
                Ok(Arc::new(GeminiService::new(
                    api_key.to_string(),
                    GeminiModel::Gemini25Pro,
                    gateway,
                )))
            },
        },
        ModelDef {
            id: "gpt-4o-mini",
            provider: Provider::OpenAI,
            description: "GPT-4o Mini (cheap, fast)",
            pricing: Pricing {
                input_per_million: 0.15,
                output_per_million: 0.60,
            },
            factory: |api_key, gateway| {
                if api_key.is_empty() {
                    return Err("gpt-4o-mini requires OPENAI_API_KEY or gateway".to_string());
                }
                Ok(Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4oMini,
                    gateway,
                )))
            },
        },
        ModelDef {
            id: "gpt-4o",
            provider: Provider::OpenAI,
            description: "GPT-4o (balanced)",
            pricing: Pricing {
                input_per_million: 2.50,
                output_per_million: 10.00,
            },
            factory: |api_key, gateway| {
                if api_key.is_empty() {
                    return Err("gpt-4o requires OPENAI_API_KEY or gateway".to_string());
                }
                Ok(Arc::new(OpenAIService::new(
                    api_key.to_string(),
                    OpenAIModel::GPT4o,
                    gateway,
                )))
            },
        },
    ]
}

/// Look up a model definition by ID
pub fn find_model(id: &str) -> Option<&'static ModelDef> {
    all_models().iter().find(|m| m.id == id)
}
