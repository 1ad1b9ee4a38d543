//! Village domain state: one isolated chat namespace per tenant, holding the
//! consumer waitlist and the active agent/consumer rooms.

pub mod registry;
pub mod room;
pub mod session;

pub use registry::{VillageHandle, VillageRegistry};
pub use room::{Room, RoomAgent};
pub use session::Village;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::ConnectionId;

/// An anonymous visitor waiting for (or matched with) an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumer {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub email: String,
    pub initial_message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    Bot,
    Agent,
}

/// A relayed chat message. Transient; nothing in this process persists it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub created_at: DateTime<Utc>,
    pub sender_id: String,
    pub sender_name: String,
}

impl ChatMessage {
    /// Build a message authored by the assistant bot.
    pub fn from_bot(content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content,
            kind: MessageType::Bot,
            created_at: Utc::now(),
            sender_id: "bot".to_string(),
            sender_name: "Assistant".to_string(),
        }
    }
}
