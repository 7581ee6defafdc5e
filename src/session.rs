//! Per-connection conversation sessions
//!
//! A [`Session`] is owned by exactly one connection handler and passed by
//! `&mut` through the [`Orchestrator`] pipeline. Nothing here is shared
//! between connections.

mod emission;
mod frame;
mod orchestrator;
mod routing;
mod state;

#[cfg(test)]
mod proptests;

pub use emission::{is_followup_turn, Emission, LastSent};
pub use frame::{FrameKind, OutboundFrame, TokenUsage};
pub use orchestrator::{Orchestrator, OrchestratorSettings, TurnError};
pub use routing::{route_inbound, Route};
#[allow(unused_imports)] // Public API re-exports
pub use state::{Role, Session, Turn};
