//! State-synchronization core for the RAG chat client.
//!
//! One [`Store`] holds the app, chat and documents sections. Every
//! network-backed operation of [`ChatClient`] runs through the
//! orchestrator, which gives it a loading/error lifecycle on its section
//! and publishes a [`ClientEvent`] when it finishes. Consumers read
//! snapshots and call operations; only the crate dispatches actions.

use serde::Serialize;

pub mod action;
pub mod actions;
pub mod error;
pub mod gateway;
pub mod orchestrator;
pub mod reducer;
pub mod state;
pub mod store;

pub use action::Action;
pub use actions::{ChatClient, MAX_CHAT_MESSAGE_CHARS};
pub use error::ClientError;
pub use gateway::{ApiGateway, GatewayConfig, HttpGateway};
pub use state::{
    AppState, ChatState, DocumentsState, GlobalState, LoadingPatch, LoadingState, Section,
};
pub use store::{Store, StoreUpdate};

/// Outcome notifications for presentation layers (toasts, status lines).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    OperationSucceeded {
        section: Section,
        operation: &'static str,
        notice: Option<&'static str>,
    },
    OperationFailed {
        section: Section,
        operation: &'static str,
        error: String,
    },
    ConnectionChanged {
        connected: bool,
    },
}
