//! Client side of the bus protocol.
//!
//! Startup:
//! 1. [`identity::allocate`] and [`station::resolve`] run concurrently
//! 2. [`startup::bootstrap`] joins them into a [`StartupContext`]
//! 3. [`ChannelRelay`] publishes frames and delivers the inbound frames
//!    addressed to this client

pub mod identity;
pub mod reconnect;
pub mod relay;
pub mod startup;
pub mod station;

#[cfg(test)]
pub(crate) mod test_support;

use hubline_bus::BusError;

pub use {
    reconnect::ReconnectConfig,
    relay::{ChannelRelay, Inbound, accept_frame},
    startup::{StartupContext, bootstrap},
    station::{StationConfig, StationRecord},
};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Missing or malformed station configuration. Always fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The bus could not be reached.
    #[error("connectivity error: {0}")]
    Connectivity(#[from] BusError),
}
