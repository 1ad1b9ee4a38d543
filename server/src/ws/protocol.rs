//! JSON wire protocol: event envelopes exchanged over the WebSocket.
//!
//! Every frame is a text frame holding `{"event": <name>, "data": ..., "requestId"?: ...}`.
//! The optional `requestId` correlates a request with its acknowledgement
//! (currently only `createRoom` -> `createRoom:ack`).

use axum::extract::ws::Message;
use serde::{Deserialize, Serialize};

use crate::error::RouterError;
use crate::village::{ChatMessage, Consumer};
use crate::ws::{ConnectionId, ConnectionRegistry, ConnectionSender};

/// Participant role carried in `join` and echoed in `joinedVillage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Consumer,
    Agent,
}

/// Inbound frame: tagged event plus optional ack correlation id.
#[derive(Debug, Deserialize)]
pub struct ClientEnvelope {
    #[serde(default, rename = "requestId")]
    pub request_id: Option<String>,
    #[serde(flatten)]
    pub event: ClientEvent,
}

/// Events a client may send. Disconnect is the transport close, not an event.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    Join(JoinRequest),
    #[serde(rename_all = "camelCase")]
    GetConsumers { village_id: String },
    #[serde(rename_all = "camelCase")]
    CreateRoom {
        village_id: String,
        consumer_id: ConnectionId,
    },
    #[serde(rename_all = "camelCase")]
    Message {
        village_id: String,
        room_id: String,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        village_id: String,
        room_id: String,
        is_typing: bool,
    },
    #[serde(rename_all = "camelCase")]
    EndChat { village_id: String, room_id: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    pub village_id: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
}

/// Events the server emits. `consumers:get` and `createRoom:ack` keep their
/// product event names rather than camelCase.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Sent once when the socket opens so the client learns its server-assigned id.
    #[serde(rename_all = "camelCase")]
    Connected { connection_id: ConnectionId },
    Error { message: String },
    #[serde(rename_all = "camelCase")]
    JoinedVillage {
        village_id: String,
        name: String,
        role: Role,
    },
    #[serde(rename = "consumers:get")]
    ConsumersGet { consumers: Vec<Consumer> },
    #[serde(rename_all = "camelCase")]
    RoomCreated { room_id: String },
    #[serde(rename = "createRoom:ack", rename_all = "camelCase")]
    CreateRoomAck { room_id: String, consumer: Consumer },
    Message(ChatMessage),
    #[serde(rename_all = "camelCase")]
    Typing {
        is_typing: bool,
        sender_id: ConnectionId,
    },
    BotResponse(ChatMessage),
    BotTyping(bool),
    BotError { message: String },
}

#[derive(Serialize)]
struct ServerEnvelope<'a> {
    #[serde(rename = "requestId", skip_serializing_if = "Option::is_none")]
    request_id: Option<&'a str>,
    #[serde(flatten)]
    event: &'a ServerEvent,
}

/// Encode a server event as a WebSocket text frame.
pub fn encode(request_id: Option<&str>, event: &ServerEvent) -> Option<Message> {
    let envelope = ServerEnvelope { request_id, event };
    match serde_json::to_string(&envelope) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode server event");
            None
        }
    }
}

/// Send an event down one connection's outbound channel.
pub fn send(tx: &ConnectionSender, event: &ServerEvent) {
    if let Some(msg) = encode(None, event) {
        let _ = tx.send(msg);
    }
}

/// Send an event with an echoed ack correlation id.
pub fn send_ack(tx: &ConnectionSender, request_id: Option<&str>, event: &ServerEvent) {
    if let Some(msg) = encode(request_id, event) {
        let _ = tx.send(msg);
    }
}

/// Send an event to a connection by id. Dropped silently if the connection is gone.
pub fn send_to(registry: &ConnectionRegistry, conn_id: ConnectionId, event: &ServerEvent) {
    if let Some(tx) = registry.get(&conn_id) {
        if let Some(msg) = encode(None, event) {
            let _ = tx.send(msg);
        }
    }
}

/// Surface a router error as an `error` event on the triggering connection.
pub fn send_error(tx: &ConnectionSender, err: &RouterError) {
    send(
        tx,
        &ServerEvent::Error {
            message: err.to_string(),
        },
    );
}
