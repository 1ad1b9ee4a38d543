//! Per-tenant session state: the consumer waitlist and active rooms.
//!
//! All mutation happens behind the per-village mutex handed out by the
//! registry, so methods here can stay plain synchronous code.

use uuid::Uuid;

use super::{Consumer, Room, RoomAgent};
use crate::ws::ConnectionId;

#[derive(Debug)]
pub struct Village {
    pub village_id: String,
    pub display_name: String,
    waitlist: Vec<Consumer>,
    rooms: Vec<Room>,
}

impl Village {
    pub fn new(village_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            village_id: village_id.into(),
            display_name: display_name.into(),
            waitlist: Vec::new(),
            rooms: Vec::new(),
        }
    }

    /// Append a consumer to the waitlist. Callers are responsible for the
    /// duplicate check; this also backs re-enqueueing on room deletion.
    pub fn join_consumer(&mut self, consumer: Consumer) {
        self.waitlist.push(consumer);
    }

    pub fn waitlist_user(&self, conn_id: ConnectionId) -> Option<&Consumer> {
        self.waitlist
            .iter()
            .find(|c| c.connection_id == conn_id)
    }

    pub fn waitlist_snapshot(&self) -> Vec<Consumer> {
        self.waitlist.clone()
    }

    pub fn waitlist_len(&self) -> usize {
        self.waitlist.len()
    }

    /// Remove a connection from the waitlist, returning its record if present.
    pub fn remove_from_waitlist(&mut self, conn_id: ConnectionId) -> Option<Consumer> {
        let idx = self
            .waitlist
            .iter()
            .position(|c| c.connection_id == conn_id)?;
        Some(self.waitlist.remove(idx))
    }

    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room_len(&self) -> usize {
        self.rooms.len()
    }

    /// Room id of the room this agent currently owns, if any.
    pub fn agent_room_id(&self, conn_id: ConnectionId) -> Option<String> {
        self.rooms
            .iter()
            .find(|r| r.agent.connection_id == conn_id)
            .map(|r| r.room_id.clone())
    }

    /// Room id of any room holding this connection in either slot.
    pub fn room_id_holding(&self, conn_id: ConnectionId) -> Option<String> {
        self.rooms
            .iter()
            .find(|r| r.holds(conn_id))
            .map(|r| r.room_id.clone())
    }

    /// Match an agent with a waitlisted consumer: removes the consumer from
    /// the waitlist and opens a room with a fresh id. Returns `None` (and
    /// leaves both collections untouched) if the consumer is not waitlisted.
    pub fn make_room(
        &mut self,
        agent: RoomAgent,
        consumer_id: ConnectionId,
    ) -> Option<(String, Consumer)> {
        let consumer = self.remove_from_waitlist(consumer_id)?;
        let room_id = Uuid::new_v4().to_string();
        self.rooms.push(Room {
            room_id: room_id.clone(),
            agent,
            consumer: consumer.clone(),
        });
        Some((room_id, consumer))
    }

    /// Close a room and unconditionally return its consumer record to the
    /// waitlist. Ending a chat re-queues the visitor rather than discarding
    /// them; this holds for every deletion path, including disconnects.
    pub fn delete_room(&mut self, room_id: &str) -> Option<Room> {
        let idx = self.rooms.iter().position(|r| r.room_id == room_id)?;
        let room = self.rooms.remove(idx);
        self.join_consumer(room.consumer.clone());
        Some(room)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumer(name: &str) -> Consumer {
        Consumer {
            connection_id: Uuid::new_v4(),
            display_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            initial_message: "Hi".to_string(),
        }
    }

    fn agent() -> RoomAgent {
        RoomAgent {
            connection_id: Uuid::new_v4(),
            display_name: "Bob".to_string(),
        }
    }

    /// A connection id must appear in at most one slot across the village.
    fn membership_count(village: &Village, conn_id: ConnectionId) -> usize {
        let in_waitlist = village.waitlist_user(conn_id).is_some() as usize;
        let in_rooms = village
            .rooms()
            .iter()
            .filter(|r| r.holds(conn_id))
            .count();
        in_waitlist + in_rooms
    }

    #[test]
    fn make_room_moves_consumer_out_of_waitlist() {
        let mut village = Village::new("v1", "Village ABC");
        let alice = consumer("Alice");
        let alice_id = alice.connection_id;
        village.join_consumer(alice);

        let (room_id, matched) = village.make_room(agent(), alice_id).unwrap();
        assert_eq!(matched.connection_id, alice_id);
        assert_eq!(village.waitlist_len(), 0);
        assert_eq!(village.room_len(), 1);
        assert!(village.room(&room_id).is_some());
        assert_eq!(membership_count(&village, alice_id), 1);
    }

    #[test]
    fn make_room_with_unknown_consumer_changes_nothing() {
        let mut village = Village::new("v1", "Village ABC");
        village.join_consumer(consumer("Alice"));

        assert!(village.make_room(agent(), Uuid::new_v4()).is_none());
        assert_eq!(village.waitlist_len(), 1);
        assert_eq!(village.room_len(), 0);
    }

    #[test]
    fn delete_room_requeues_identical_consumer() {
        let mut village = Village::new("v1", "Village ABC");
        let alice = consumer("Alice");
        let alice_id = alice.connection_id;
        village.join_consumer(alice.clone());
        let (room_id, _) = village.make_room(agent(), alice_id).unwrap();

        let deleted = village.delete_room(&room_id).unwrap();
        assert_eq!(deleted.room_id, room_id);
        assert_eq!(village.room_len(), 0);
        assert_eq!(village.waitlist_len(), 1);
        // The re-enqueued record carries the original data unchanged.
        assert_eq!(village.waitlist_user(alice_id), Some(&alice));
    }

    #[test]
    fn delete_unknown_room_is_noop() {
        let mut village = Village::new("v1", "Village ABC");
        village.join_consumer(consumer("Alice"));

        assert!(village.delete_room("nope").is_none());
        assert_eq!(village.waitlist_len(), 1);
        assert_eq!(village.room_len(), 0);
    }

    #[test]
    fn room_lookup_by_occupant() {
        let mut village = Village::new("v1", "Village ABC");
        let alice = consumer("Alice");
        let alice_id = alice.connection_id;
        let bob = agent();
        let bob_id = bob.connection_id;
        village.join_consumer(alice);
        let (room_id, _) = village.make_room(bob, alice_id).unwrap();

        assert_eq!(village.agent_room_id(bob_id), Some(room_id.clone()));
        assert_eq!(village.agent_room_id(alice_id), None);
        assert_eq!(village.room_id_holding(alice_id), Some(room_id.clone()));
        assert_eq!(village.room_id_holding(bob_id), Some(room_id));
    }

    #[test]
    fn remove_from_waitlist_returns_record() {
        let mut village = Village::new("v1", "Village ABC");
        let alice = consumer("Alice");
        let alice_id = alice.connection_id;
        village.join_consumer(alice.clone());
        village.join_consumer(consumer("Carol"));

        assert_eq!(village.remove_from_waitlist(alice_id), Some(alice));
        assert_eq!(village.waitlist_len(), 1);
        assert_eq!(village.remove_from_waitlist(alice_id), None);
    }
}
