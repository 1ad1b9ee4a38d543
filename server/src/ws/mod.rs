pub mod actor;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Opaque identity of one live client transport session.
/// Assigned at upgrade, invalid after disconnect.
pub type ConnectionId = uuid::Uuid;

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Connection registry: tracks the one live transport handle per connection id.
pub type ConnectionRegistry = Arc<DashMap<ConnectionId, ConnectionSender>>;

/// Create a new empty connection registry.
pub fn new_connection_registry() -> ConnectionRegistry {
    Arc::new(DashMap::new())
}

/// Village-scoped broadcast groups: which connections are subscribed to which
/// village tag. Agents are subscribed on join; subscriptions are dropped when
/// the connection closes.
#[derive(Debug, Default)]
pub struct VillageGroups {
    members: DashMap<String, HashSet<ConnectionId>>,
}

impl VillageGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, village_id: &str, conn_id: ConnectionId) {
        self.members
            .entry(village_id.to_string())
            .or_default()
            .insert(conn_id);
    }

    pub fn is_subscribed(&self, village_id: &str, conn_id: ConnectionId) -> bool {
        self.members
            .get(village_id)
            .map(|set| set.contains(&conn_id))
            .unwrap_or(false)
    }

    /// Drop every subscription held by a connection (disconnect cleanup).
    pub fn leave_all(&self, conn_id: ConnectionId) {
        for mut entry in self.members.iter_mut() {
            entry.value_mut().remove(&conn_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn subscribe_and_leave_all() {
        let groups = VillageGroups::new();
        let conn = Uuid::new_v4();

        groups.subscribe("v1", conn);
        groups.subscribe("v2", conn);
        assert!(groups.is_subscribed("v1", conn));
        assert!(groups.is_subscribed("v2", conn));
        assert!(!groups.is_subscribed("v3", conn));

        groups.leave_all(conn);
        assert!(!groups.is_subscribed("v1", conn));
        assert!(!groups.is_subscribed("v2", conn));
    }

    #[test]
    fn subscribe_is_idempotent() {
        let groups = VillageGroups::new();
        let conn = Uuid::new_v4();

        groups.subscribe("v1", conn);
        groups.subscribe("v1", conn);
        assert!(groups.is_subscribed("v1", conn));

        groups.leave_all(conn);
        assert!(!groups.is_subscribed("v1", conn));
    }
}
