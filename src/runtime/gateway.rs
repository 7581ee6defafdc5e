//! Bounded model worker pool
//!
//! One gateway is shared by every session. A semaphore caps the number of
//! in-flight provider calls and a deadline covers both waiting for a permit
//! and the call itself, so a saturated pool surfaces as a timeout rather
//! than an unbounded wait.

use super::LlmClient;
use crate::llm::{LlmError, LlmRequest, LlmResponse};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Which deadline applies to a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    /// Template generation for the user's message
    Primary,
    /// Intent classification and follow-up suggestions
    Auxiliary,
}

#[derive(Debug, Clone, Copy)]
pub struct GatewayLimits {
    pub primary_timeout: Duration,
    pub auxiliary_timeout: Duration,
    pub worker_limit: usize,
}

impl Default for GatewayLimits {
    fn default() -> Self {
        Self {
            primary_timeout: Duration::from_secs(30),
            auxiliary_timeout: Duration::from_secs(15),
            worker_limit: 4,
        }
    }
}

pub struct ModelGateway {
    client: Arc<dyn LlmClient>,
    permits: Semaphore,
    limits: GatewayLimits,
}

impl ModelGateway {
    pub fn new(client: Arc<dyn LlmClient>, limits: GatewayLimits) -> Self {
        Self {
            client,
            permits: Semaphore::new(limits.worker_limit.max(1)),
            limits,
        }
    }

    pub fn model_id(&self) -> &str {
        self.client.model_id()
    }

    /// Run one model call under the worker limit and the deadline for `kind`
    pub async fn invoke(
        &self,
        request: &LlmRequest,
        kind: CallKind,
    ) -> Result<LlmResponse, LlmError> {
        let budget = match kind {
            CallKind::Primary => self.limits.primary_timeout,
            CallKind::Auxiliary => self.limits.auxiliary_timeout,
        };

        let call = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| LlmError::unknown("Model worker pool closed"))?;
            self.client.complete(request).await
        };

        if let Ok(result) = tokio::time::timeout(budget, call).await {
            result
        } else {
            tracing::warn!(
                model = %self.client.model_id(),
                kind = ?kind,
                timeout_ms = %budget.as_millis(),
                "Model call timed out"
            );
            Err(LlmError::timeout(format!(
                "Model call exceeded {}ms",
                budget.as_millis()
            )))
        }
    }
}
