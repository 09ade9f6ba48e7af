use crate::{FATAL_MARKER, SHUTDOWN_MARKER};

/// Control event carried in an inbound payload prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSentinel {
    /// Ordinary conversational content.
    None,
    /// The hub is shutting down; display and exit with status 0.
    Shutdown,
    /// The hub hit a fatal error; display and exit nonzero.
    Fatal,
}

/// Classify a payload. The fatal marker shares its first two characters with
/// the shutdown marker, so it must be tested first.
pub fn classify(payload: &str) -> ControlSentinel {
    if payload.starts_with(FATAL_MARKER) {
        ControlSentinel::Fatal
    } else if payload.starts_with(SHUTDOWN_MARKER) {
        ControlSentinel::Shutdown
    } else {
        ControlSentinel::None
    }
}
