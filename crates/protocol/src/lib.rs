//! Wire protocol shared by every hubline front end.
//!
//! Two broadcast channels carry all traffic between front ends and the hub.
//! Each message is a text [`Frame`] of the form `<address>::<payload>`, where
//! the address is a client identity or the broadcast token `ALL`. Receivers
//! filter client-side; there is no transport-level isolation.
//!
//! The HTTP gateway uses a second framing, [`SessionFrame`]
//! (`<session>||<payload>`), for its own traffic and response bodies.

pub mod frame;
pub mod keys;
pub mod sentinel;

pub use {
    frame::{Address, Frame, FrameError, Identity, SessionFrame},
    keys::Keyspace,
    sentinel::{ControlSentinel, classify},
};

/// Separator between address and payload on the bus.
pub const FRAME_DELIMITER: &str = "::";

/// Address token accepted by every client.
pub const BROADCAST_ADDRESS: &str = "ALL";

/// Separator between session and payload in gateway traffic.
pub const SESSION_DELIMITER: &str = "||";

/// Name of the station record every client must resolve at startup.
pub const STATION_ID_RECORD: &str = "STATIONID";

/// Payload prefix for a fatal hub error.
pub const FATAL_MARKER: &str = "***";

/// Payload prefix for an orderly hub shutdown.
pub const SHUTDOWN_MARKER: &str = "**";
