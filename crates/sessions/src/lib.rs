//! Web session tokens and the in-memory registry that tracks them.
//!
//! A session is an opaque token correlating one browser's requests; the hub
//! owns everything else about the conversation.

pub mod id;
pub mod registry;

pub use {
    id::{SessionId, SessionIdError},
    registry::{SessionEntry, SessionRegistry},
};
