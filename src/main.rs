//! Converse Copilot - WhatsApp template design assistant
//!
//! A WebSocket backend that turns free-form requests into validated message
//! templates by driving a generative model, one session per connection.

mod api;
mod config;
mod cost;
mod followup;
mod intent;
mod llm;
mod rules;
mod runtime;
mod session;
mod system_prompt;
mod template;

use api::{create_router, AppState};
use config::AppConfig;
use cost::{FrankfurterRates, FxRates};
use llm::ModelRegistry;
use rules::RuleTable;
use runtime::{ModelGateway, RegistryLlmClient};
use session::{Orchestrator, OrchestratorSettings};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "converse_copilot=info,tower_http=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));
    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set GEMINI_API_KEY, OPENAI_API_KEY or LLM_GATEWAY.");
    }

    // Shared worker pool in front of the default model
    let client = RegistryLlmClient::new(
        llm_registry.clone(),
        llm_registry.default_model_id().to_string(),
    );
    let gateway = Arc::new(ModelGateway::new(Arc::new(client), config.gateway));

    // Exchange rates for cost display
    let rates = Arc::new(if config.fx.url.trim().is_empty() {
        FxRates::fixed(config.fx.fallback)
    } else {
        let source = FrankfurterRates::new(&config.fx.url, &config.fx.currency);
        FxRates::new(Arc::new(source), config.fx.fallback, config.fx.ttl)
    });

    let base_pricing = llm_registry
        .default_pricing()
        .unwrap_or_else(|| OrchestratorSettings::default().pricing);
    let settings = OrchestratorSettings {
        schema: config.button_schema,
        followups: config.followups,
        cost_tracking: config.cost_tracking,
        pricing: config.pricing(base_pricing),
        ..OrchestratorSettings::default()
    };
    tracing::info!(
        schema = ?settings.schema,
        followups = settings.followups,
        cost_tracking = settings.cost_tracking,
        currency = %config.fx.currency,
        fx_fallback = rates.fallback(),
        worker_limit = config.gateway.worker_limit,
        "Orchestrator configured"
    );

    let orchestrator = Arc::new(Orchestrator::new(
        gateway,
        rates,
        RuleTable::builtin()?,
        settings,
    ));

    // Create application state
    let state = AppState::new(orchestrator, llm_registry);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Converse Copilot listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
