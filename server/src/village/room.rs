//! A room is a live matched pairing of exactly one agent and one consumer,
//! plus the message/typing relay scoped to that pair.

use chrono::Utc;
use uuid::Uuid;

use super::{ChatMessage, Consumer, MessageType};
use crate::ws::protocol::{self, ServerEvent};
use crate::ws::{ConnectionId, ConnectionRegistry};

/// The agent half of a room. Agents have no pool of their own; this record is
/// the only place an agent's identity lives besides the connection-state map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAgent {
    pub connection_id: ConnectionId,
    pub display_name: String,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub room_id: String,
    pub agent: RoomAgent,
    pub consumer: Consumer,
}

impl Room {
    pub fn holds(&self, conn_id: ConnectionId) -> bool {
        self.agent.connection_id == conn_id || self.consumer.connection_id == conn_id
    }

    /// Stamp sender role/name onto a new message. Any sender that is not the
    /// room's agent is treated as the consumer.
    pub fn build_message(&self, sender_id: ConnectionId, content: &str) -> ChatMessage {
        let from_agent = sender_id == self.agent.connection_id;
        ChatMessage {
            id: Uuid::new_v4().to_string(),
            content: content.to_string(),
            kind: if from_agent {
                MessageType::Agent
            } else {
                MessageType::User
            },
            created_at: Utc::now(),
            sender_id: sender_id.to_string(),
            sender_name: if from_agent {
                self.agent.display_name.clone()
            } else {
                self.consumer.display_name.clone()
            },
        }
    }

    /// Relay a chat message to both participants. The sender receives its own
    /// echo; clients render from the relayed copy, not the local input.
    pub fn relay_message(
        &self,
        connections: &ConnectionRegistry,
        sender_id: ConnectionId,
        content: &str,
    ) -> ChatMessage {
        let message = self.build_message(sender_id, content);
        let event = ServerEvent::Message(message.clone());
        protocol::send_to(connections, self.agent.connection_id, &event);
        protocol::send_to(connections, self.consumer.connection_id, &event);
        message
    }

    /// Relay a typing indicator to the counterpart only.
    pub fn relay_typing(
        &self,
        connections: &ConnectionRegistry,
        sender_id: ConnectionId,
        is_typing: bool,
    ) {
        let (target, tagged_sender) = if sender_id == self.agent.connection_id {
            (self.consumer.connection_id, self.agent.connection_id)
        } else {
            (self.agent.connection_id, self.consumer.connection_id)
        };
        protocol::send_to(
            connections,
            target,
            &ServerEvent::Typing {
                is_typing,
                sender_id: tagged_sender,
            },
        );
    }
}
