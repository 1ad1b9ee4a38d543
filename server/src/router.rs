//! Session router: the protocol state machine. Receives inbound events from
//! any connection, validates role-specific preconditions, mutates village
//! state under the owning village lock, and emits outbound events to the
//! relevant connections.
//!
//! The two collaborator awaits (access-key verification, bot generation) run
//! outside any village lock, so a slow collaborator only delays its own
//! connection's outbound sequence.

use dashmap::DashMap;
use std::sync::Arc;

use crate::error::RouterError;
use crate::notify::ConsumerJoinNotice;
use crate::state::AppState;
use crate::village::{ChatMessage, Consumer, RoomAgent, Village};
use crate::ws::protocol::{self, ClientEnvelope, ClientEvent, JoinRequest, Role, ServerEvent};
use crate::ws::{ConnectionId, ConnectionSender};

/// Where a connection currently stands. Updated on every transition, always
/// inside the owning village's lock scope, so the membership invariant (a
/// connection occupies at most one of waitlist/agent-slot/consumer-slot) is
/// checkable against this map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Unjoined,
    Waitlisted {
        village_id: String,
    },
    IdleAgent {
        village_id: String,
        display_name: String,
    },
    InRoom {
        village_id: String,
        room_id: String,
        role: Role,
        display_name: String,
    },
}

pub type ConnectionStates = Arc<DashMap<ConnectionId, ConnectionState>>;

pub fn new_connection_states() -> ConnectionStates {
    Arc::new(DashMap::new())
}

fn current_state(state: &AppState, conn_id: ConnectionId) -> ConnectionState {
    state
        .states
        .get(&conn_id)
        .map(|entry| entry.value().clone())
        .unwrap_or(ConnectionState::Unjoined)
}

/// Dispatch one decoded inbound event.
pub async fn handle_event(
    state: &AppState,
    conn_id: ConnectionId,
    tx: &ConnectionSender,
    envelope: ClientEnvelope,
) {
    match envelope.event {
        ClientEvent::Join(req) => handle_join(state, conn_id, tx, req).await,
        ClientEvent::GetConsumers { village_id } => {
            handle_get_consumers(state, tx, &village_id).await
        }
        ClientEvent::CreateRoom {
            village_id,
            consumer_id,
        } => {
            handle_create_room(
                state,
                conn_id,
                tx,
                &village_id,
                consumer_id,
                envelope.request_id.as_deref(),
            )
            .await
        }
        ClientEvent::Message {
            village_id,
            room_id,
            message,
        } => handle_message(state, conn_id, &village_id, &room_id, &message).await,
        ClientEvent::Typing {
            village_id,
            room_id,
            is_typing,
        } => handle_typing(state, conn_id, &village_id, &room_id, is_typing).await,
        ClientEvent::EndChat {
            village_id,
            room_id,
        } => handle_end_chat(state, &village_id, &room_id).await,
    }
}

async fn handle_join(state: &AppState, conn_id: ConnectionId, tx: &ConnectionSender, req: JoinRequest) {
    if req.village_id.is_empty() {
        return protocol::send_error(tx, &RouterError::MissingVillage);
    }
    match req.role {
        Role::Consumer => handle_consumer_join(state, conn_id, tx, req).await,
        Role::Agent => handle_agent_join(state, conn_id, tx, req).await,
    }
}

async fn handle_consumer_join(
    state: &AppState,
    conn_id: ConnectionId,
    tx: &ConnectionSender,
    req: JoinRequest,
) {
    let handle = state
        .villages
        .get_or_create(&req.village_id, &state.default_village_name);

    // Validate and enqueue atomically under the village lock.
    let enqueued = {
        let mut village = handle.lock().await;
        enqueue_consumer(state, &mut village, conn_id, &req)
    };
    let (email, message) = match enqueued {
        Ok(fields) => fields,
        Err(err) => return protocol::send_error(tx, &err),
    };

    tracing::info!(
        connection_id = %conn_id,
        village_id = %req.village_id,
        name = %req.name,
        "Consumer joined waitlist"
    );

    // Fire-and-forget: the join flow never waits on notification delivery.
    let notifier = state.notifier.clone();
    let notice = ConsumerJoinNotice {
        name: req.name.clone(),
        email,
        message: message.clone(),
        village_id: req.village_id.clone(),
    };
    tokio::spawn(async move {
        notifier.consumer_joined(notice).await;
    });

    // Initial bot reply. The typing-off signal fires on every path out.
    protocol::send(tx, &ServerEvent::BotTyping(true));
    match state.bot.generate_reply(&message).await {
        Ok(reply) => {
            protocol::send(tx, &ServerEvent::BotResponse(ChatMessage::from_bot(reply)));
        }
        Err(err) => {
            tracing::warn!(
                connection_id = %conn_id,
                error = %err,
                "Bot reply generation failed"
            );
            protocol::send(
                tx,
                &ServerEvent::BotError {
                    message: "Failed to get bot response".to_string(),
                },
            );
        }
    }
    protocol::send(tx, &ServerEvent::BotTyping(false));

    protocol::send(
        tx,
        &ServerEvent::JoinedVillage {
            village_id: req.village_id,
            name: req.name,
            role: Role::Consumer,
        },
    );
}

fn enqueue_consumer(
    state: &AppState,
    village: &mut Village,
    conn_id: ConnectionId,
    req: &JoinRequest,
) -> Result<(String, String), RouterError> {
    if village.waitlist_user(conn_id).is_some() {
        return Err(RouterError::DuplicateConsumer);
    }
    if current_state(state, conn_id) != ConnectionState::Unjoined {
        return Err(RouterError::AlreadyJoined);
    }
    let (email, message) = match (&req.email, &req.message) {
        (Some(email), Some(message)) if !email.is_empty() && !message.is_empty() => {
            (email.clone(), message.clone())
        }
        _ => return Err(RouterError::MissingConsumerFields),
    };

    village.join_consumer(Consumer {
        connection_id: conn_id,
        display_name: req.name.clone(),
        email: email.clone(),
        initial_message: message.clone(),
    });
    state.states.insert(
        conn_id,
        ConnectionState::Waitlisted {
            village_id: req.village_id.clone(),
        },
    );
    Ok((email, message))
}

async fn handle_agent_join(
    state: &AppState,
    conn_id: ConnectionId,
    tx: &ConnectionSender,
    req: JoinRequest,
) {
    let Some(access_key) = req.access_key.as_deref() else {
        return protocol::send_error(tx, &RouterError::MissingAccessKey);
    };

    // Awaited before touching any village state; errors reject (fail-closed).
    match state.access_keys.verify(access_key, &req.village_id).await {
        Ok(true) => {}
        Ok(false) => return protocol::send_error(tx, &RouterError::InvalidAccessKey),
        Err(err) => {
            tracing::warn!(
                connection_id = %conn_id,
                village_id = %req.village_id,
                error = %err,
                "Access key verification failed"
            );
            return protocol::send_error(tx, &RouterError::InvalidAccessKey);
        }
    }

    let handle = state
        .villages
        .get_or_create(&req.village_id, &state.default_village_name);
    let consumers = {
        let village = handle.lock().await;
        match current_state(state, conn_id) {
            ConnectionState::Unjoined | ConnectionState::IdleAgent { .. } => {}
            _ => return protocol::send_error(tx, &RouterError::AlreadyJoined),
        }
        state.states.insert(
            conn_id,
            ConnectionState::IdleAgent {
                village_id: req.village_id.clone(),
                display_name: req.name.clone(),
            },
        );
        village.waitlist_snapshot()
    };
    state.groups.subscribe(&req.village_id, conn_id);

    tracing::info!(
        connection_id = %conn_id,
        village_id = %req.village_id,
        name = %req.name,
        "Agent joined"
    );

    protocol::send(tx, &ServerEvent::ConsumersGet { consumers });
    protocol::send(
        tx,
        &ServerEvent::JoinedVillage {
            village_id: req.village_id,
            name: req.name,
            role: Role::Agent,
        },
    );
}

async fn handle_get_consumers(state: &AppState, tx: &ConnectionSender, village_id: &str) {
    let Some(handle) = state.villages.get(village_id) else {
        return;
    };
    let consumers = handle.lock().await.waitlist_snapshot();
    protocol::send(tx, &ServerEvent::ConsumersGet { consumers });
}

async fn handle_create_room(
    state: &AppState,
    conn_id: ConnectionId,
    tx: &ConnectionSender,
    village_id: &str,
    consumer_id: ConnectionId,
    request_id: Option<&str>,
) {
    // Agent recognition goes through the explicit state machine.
    let agent_name = match current_state(state, conn_id) {
        ConnectionState::IdleAgent {
            village_id: joined,
            display_name,
        } if joined == village_id => display_name,
        ConnectionState::InRoom {
            village_id: joined,
            role: Role::Agent,
            display_name,
            ..
        } if joined == village_id => display_name,
        _ => return protocol::send_error(tx, &RouterError::NoAgentFound),
    };
    let Some(handle) = state.villages.get(village_id) else {
        return protocol::send_error(tx, &RouterError::NoAgentFound);
    };

    let mut village = handle.lock().await;

    // An agent holds at most one room: tear down the old one first, which
    // returns its consumer to the waitlist.
    if let Some(old_room_id) = village.agent_room_id(conn_id) {
        if let Some(old_room) = village.delete_room(&old_room_id) {
            state.states.insert(
                old_room.consumer.connection_id,
                ConnectionState::Waitlisted {
                    village_id: village_id.to_string(),
                },
            );
            tracing::info!(
                connection_id = %conn_id,
                room_id = %old_room_id,
                "Pre-empted existing room for new match"
            );
        }
    }

    let agent = RoomAgent {
        connection_id: conn_id,
        display_name: agent_name.clone(),
    };
    match village.make_room(agent, consumer_id) {
        Some((room_id, consumer)) => {
            state.states.insert(
                conn_id,
                ConnectionState::InRoom {
                    village_id: village_id.to_string(),
                    room_id: room_id.clone(),
                    role: Role::Agent,
                    display_name: agent_name,
                },
            );
            state.states.insert(
                consumer.connection_id,
                ConnectionState::InRoom {
                    village_id: village_id.to_string(),
                    room_id: room_id.clone(),
                    role: Role::Consumer,
                    display_name: consumer.display_name.clone(),
                },
            );
            tracing::info!(
                connection_id = %conn_id,
                room_id = %room_id,
                consumer_id = %consumer.connection_id,
                "Room created"
            );
            protocol::send(
                tx,
                &ServerEvent::RoomCreated {
                    room_id: room_id.clone(),
                },
            );
            protocol::send_ack(
                tx,
                request_id,
                &ServerEvent::CreateRoomAck { room_id, consumer },
            );
        }
        None => protocol::send_error(tx, &RouterError::RoomCreationFailed),
    }
}

async fn handle_message(
    state: &AppState,
    conn_id: ConnectionId,
    village_id: &str,
    room_id: &str,
    message: &str,
) {
    let Some(handle) = state.villages.get(village_id) else {
        tracing::debug!(village_id = %village_id, "Dropping message for unknown village");
        return;
    };
    let village = handle.lock().await;
    let Some(room) = village.room(room_id) else {
        tracing::debug!(room_id = %room_id, "Dropping message for unknown room");
        return;
    };
    room.relay_message(&state.connections, conn_id, message);
}

async fn handle_typing(
    state: &AppState,
    conn_id: ConnectionId,
    village_id: &str,
    room_id: &str,
    is_typing: bool,
) {
    let Some(handle) = state.villages.get(village_id) else {
        return;
    };
    let village = handle.lock().await;
    let Some(room) = village.room(room_id) else {
        return;
    };
    room.relay_typing(&state.connections, conn_id, is_typing);
}

async fn handle_end_chat(state: &AppState, village_id: &str, room_id: &str) {
    let Some(handle) = state.villages.get(village_id) else {
        return;
    };
    let mut village = handle.lock().await;
    let Some(room) = village.delete_room(room_id) else {
        return;
    };
    state.states.insert(
        room.agent.connection_id,
        ConnectionState::IdleAgent {
            village_id: village_id.to_string(),
            display_name: room.agent.display_name.clone(),
        },
    );
    state.states.insert(
        room.consumer.connection_id,
        ConnectionState::Waitlisted {
            village_id: village_id.to_string(),
        },
    );
    tracing::info!(room_id = %room_id, village_id = %village_id, "Chat ended");
}

/// Disconnect cleanup, run when a connection's actor stops. Sweeps every
/// village: drops the connection from the waitlist, then deletes any room it
/// occupies. Room deletion re-enqueues the room's consumer record whether or
/// not that consumer is the one who disconnected; a consumer dropping
/// mid-chat therefore reappears on the waitlist.
pub async fn handle_disconnect(state: &AppState, conn_id: ConnectionId) {
    for handle in state.villages.handles() {
        let mut village = handle.lock().await;
        village.remove_from_waitlist(conn_id);

        let Some(room_id) = village.room_id_holding(conn_id) else {
            continue;
        };
        let Some(room) = village.delete_room(&room_id) else {
            continue;
        };
        if room.agent.connection_id == conn_id {
            state.states.insert(
                room.consumer.connection_id,
                ConnectionState::Waitlisted {
                    village_id: village.village_id.clone(),
                },
            );
        } else {
            state.states.insert(
                room.agent.connection_id,
                ConnectionState::IdleAgent {
                    village_id: village.village_id.clone(),
                    display_name: room.agent.display_name.clone(),
                },
            );
        }
        tracing::info!(
            connection_id = %conn_id,
            room_id = %room_id,
            village_id = %village.village_id,
            "Room closed by disconnect"
        );
    }
    state.groups.leave_all(conn_id);
    state.states.remove(&conn_id);
}
