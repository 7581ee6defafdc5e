//! Runtime plumbing between sessions and model providers
//!
//! Sessions never talk to a provider directly: every call goes through the
//! process-wide [`ModelGateway`], which bounds concurrency and applies the
//! per-call deadline.

mod gateway;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use gateway::{CallKind, GatewayLimits, ModelGateway};
pub use traits::*;
