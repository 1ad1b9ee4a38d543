use std::sync::Arc;

use crate::auth::AccessKeyVerifier;
use crate::bot::BotResponder;
use crate::notify::Notifier;
use crate::router::ConnectionStates;
use crate::village::VillageRegistry;
use crate::ws::{ConnectionRegistry, VillageGroups};

/// Shared application state passed to all handlers via axum State extractor.
/// Every registry and collaborator is constructed once at startup and
/// injected here; nothing lives in statics.
#[derive(Clone)]
pub struct AppState {
    /// Live WebSocket connections by connection id
    pub connections: ConnectionRegistry,
    /// Village-scoped broadcast-group subscriptions (agents)
    pub groups: Arc<VillageGroups>,
    /// Lazily created per-tenant sessions
    pub villages: Arc<VillageRegistry>,
    /// Explicit per-connection state machine
    pub states: ConnectionStates,
    /// Agent access-key verification collaborator
    pub access_keys: Arc<dyn AccessKeyVerifier>,
    /// Consumer-join notification collaborator
    pub notifier: Arc<dyn Notifier>,
    /// First-reply bot collaborator
    pub bot: Arc<dyn BotResponder>,
    /// Display name given to villages created on first join
    pub default_village_name: String,
}
