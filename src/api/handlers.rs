//! HTTP request handlers

use super::types::ModelsResponse;
use super::ws::ws_upgrade;
use super::AppState;
use axum::{extract::State, routing::get, Json, Router};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // One session per socket
        .route("/ws", get(ws_upgrade))
        // Model info
        .route("/api/models", get(list_models))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Model Info
// ============================================================

async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models = state.llm_registry.available_model_info();

    Json(ModelsResponse {
        models,
        default: state.llm_registry.default_model_id().to_string(),
    })
}

// ============================================================
// Version
// ============================================================

async fn get_version() -> &'static str {
    concat!("converse-copilot ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::FxRates;
    use crate::llm::{LlmConfig, ModelRegistry};
    use crate::rules::RuleTable;
    use crate::runtime::testing::MockLlmClient;
    use crate::runtime::{GatewayLimits, ModelGateway};
    use crate::session::{Orchestrator, OrchestratorSettings};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state(config: &LlmConfig) -> AppState {
        let gateway = ModelGateway::new(
            Arc::new(MockLlmClient::new("mock")),
            GatewayLimits::default(),
        );
        let orchestrator = Orchestrator::new(
            Arc::new(gateway),
            Arc::new(FxRates::fixed(1.0)),
            RuleTable::builtin().unwrap(),
            OrchestratorSettings::default(),
        );
        AppState::new(Arc::new(orchestrator), Arc::new(ModelRegistry::new(config)))
    }

    async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_models_endpoint() {
        let config = LlmConfig {
            gemini_api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let (status, body) = get_body(create_router(state(&config)), "/api/models").await;
        assert_eq!(status, StatusCode::OK);

        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["default"], "gemini-2.5-flash");
        let models = value["models"].as_array().unwrap();
        assert_eq!(models.len(), 2);
        assert!(models[0]["input_per_million"].is_number());
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let (status, body) =
            get_body(create_router(state(&LlmConfig::default())), "/version").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("converse-copilot "));
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let (status, _) = get_body(create_router(state(&LlmConfig::default())), "/ws").await;
        assert!(status.is_client_error());
    }
}
