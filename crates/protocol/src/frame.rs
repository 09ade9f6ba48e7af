use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{BROADCAST_ADDRESS, FRAME_DELIMITER, SESSION_DELIMITER};

// ── Identity ─────────────────────────────────────────────────────────────────

/// Process-unique client number handed out by the shared counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub u64);

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Address ──────────────────────────────────────────────────────────────────

/// Destination (or origin) of a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Identity(Identity),
    Broadcast,
    /// Anything else seen on the wire. Never accepted by a client filter.
    Other(String),
}

impl Address {
    pub fn parse(raw: &str) -> Self {
        if raw == BROADCAST_ADDRESS {
            return Self::Broadcast;
        }
        // Only canonical decimal text maps to an identity so that encoding
        // the parsed address reproduces the wire bytes.
        let canonical = !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && (raw == "0" || !raw.starts_with('0'));
        match raw.parse::<u64>() {
            Ok(n) if canonical => Self::Identity(Identity(n)),
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether a client holding `identity` should see frames sent here.
    pub fn accepts(&self, identity: Identity) -> bool {
        match self {
            Self::Broadcast => true,
            Self::Identity(id) => *id == identity,
            Self::Other(_) => false,
        }
    }
}

impl From<Identity> for Address {
    fn from(id: Identity) -> Self {
        Self::Identity(id)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity(id) => write!(f, "{id}"),
            Self::Broadcast => f.write_str(BROADCAST_ADDRESS),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("frame has no '::' delimiter: {0:?}")]
    MissingDelimiter(String),

    #[error("session frame has no '||' delimiter: {0:?}")]
    MissingSessionDelimiter(String),
}

// ── Frame ────────────────────────────────────────────────────────────────────

/// An addressed unit of text on the bus: `<address>::<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub address: Address,
    pub payload: String,
}

impl Frame {
    pub fn new(address: impl Into<Address>, payload: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            payload: payload.into(),
        }
    }

    pub fn broadcast(payload: impl Into<String>) -> Self {
        Self::new(Address::Broadcast, payload)
    }

    pub fn encode(&self) -> String {
        format!("{}{FRAME_DELIMITER}{}", self.address, self.payload)
    }

    /// Split on the first delimiter only; the payload may contain more.
    pub fn decode(raw: &str) -> Result<Self, FrameError> {
        let (address, payload) = raw
            .split_once(FRAME_DELIMITER)
            .ok_or_else(|| FrameError::MissingDelimiter(raw.to_string()))?;
        Ok(Self {
            address: Address::parse(address),
            payload: payload.to_string(),
        })
    }
}

// ── SessionFrame ─────────────────────────────────────────────────────────────

/// Gateway framing: `<session>||<payload>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFrame {
    pub session: String,
    pub payload: String,
}

impl SessionFrame {
    pub fn new(session: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            session: session.into(),
            payload: payload.into(),
        }
    }

    pub fn encode(&self) -> String {
        format!("{}{SESSION_DELIMITER}{}", self.session, self.payload)
    }

    pub fn decode(raw: &str) -> Result<Self, FrameError> {
        let (session, payload) = raw
            .split_once(SESSION_DELIMITER)
            .ok_or_else(|| FrameError::MissingSessionDelimiter(raw.to_string()))?;
        Ok(Self::new(session, payload))
    }
}
