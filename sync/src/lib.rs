#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! State synchronisation between authoritative sessions and remote clients.
//!
//! Each room runs one [`SessionHost`] on its own tokio task. Client
//! messages reach the room over an unbounded channel and are drained once
//! per tick; replies go only to the sender while every client of the room
//! receives the same [`Delta`].

mod delta;
mod host;
pub mod protocol;
mod runtime;
mod transport;

pub use delta::DeltaTracker;
pub use host::{Outbox, SessionHost};
pub use protocol::{
    decode_client, ClientMessage, Codec, CodecError, Delta, EntityRef, EntityUpdate,
    ServerMessage,
};
pub use runtime::{Lobby, LobbyConfig, LobbyError, RoomHandle, DEFAULT_GRACE_PERIOD};
pub use transport::{serve, ConnectionError};
