//! HTTP gateway: maps web requests onto hub conversations.
//!
//! Lifecycle:
//! 1. Build a [`HubService`](hub::HubService), static or relayed over the bus
//! 2. Build the router from the [`Route`](routes::Route) table
//! 3. Serve, pruning idle sessions in the background
//!
//! Responses for text requests use session framing (`<session>||<answer>`).
//! Failures are bare status codes with empty bodies.

pub mod error;
pub mod hub;
pub mod relay_hub;
pub mod routes;
pub mod server;
pub mod state;

pub use {
    error::GatewayError,
    hub::{HubError, HubService, JsonAnswer, StaticHub},
    relay_hub::RelayHub,
    routes::Route,
    server::{build_gateway_app, start_gateway},
    state::GatewayState,
};
