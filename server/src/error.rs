//! Router error taxonomy. Every variant is local to the triggering
//! connection: the `Display` string becomes the outbound `error` payload and
//! the event loop keeps serving everyone else.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// `join` without a village id.
    #[error("Missing role or villageId")]
    MissingVillage,

    /// Consumer `join` from a connection already on the waitlist.
    #[error("Consumer Already Exists")]
    DuplicateConsumer,

    /// Consumer `join` without the required email or initial message.
    #[error("Consumer Email and Message are required")]
    MissingConsumerFields,

    /// Agent `join` without an access key.
    #[error("Access Key is required")]
    MissingAccessKey,

    /// Access key rejected, or verification failed (fail-closed).
    #[error("Invalid Access Key")]
    InvalidAccessKey,

    /// A joined connection tried to join again in a conflicting role.
    #[error("Connection already joined")]
    AlreadyJoined,

    /// `createRoom` from a connection the router does not know as an agent.
    #[error("No Agent Found")]
    NoAgentFound,

    /// `createRoom` targeting a consumer no longer on the waitlist.
    #[error("Unable to create room")]
    RoomCreationFailed,
}
