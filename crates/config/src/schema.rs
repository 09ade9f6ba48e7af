//! Config schema types (bus, gateway, console, reconnect).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HublineConfig {
    pub bus: BusConfig,
    pub gateway: GatewayConfig,
    pub console: ConsoleConfig,
    pub reconnect: ReconnectSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusBackend {
    #[default]
    Redis,
    /// In-process bus; only useful for demos and tests.
    Memory,
}

/// Where the bus lives and how its keys are named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    pub backend: BusBackend,
    pub url: String,
    /// Prefix of every key and channel, e.g. `alixia:channel:text:to`.
    pub app: String,
    /// Counter entity name: `<app>:<entity>:next_<entity>`.
    pub entity: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            backend: BusBackend::Redis,
            url: "redis://127.0.0.1:6379".into(),
            app: "alixia".into(),
            entity: "alixian".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HubMode {
    /// Answer from configured canned responses.
    #[default]
    Static,
    /// Forward text over the bus and wait for the hub's reply.
    Relay,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
    pub hub: HubMode,
    /// How long a relayed request waits for the hub.
    pub reply_timeout_ms: u64,
    /// Answer returned when the hub has nothing better to say.
    pub default_answer: String,
    /// HTML served on the landing route. Uses the built-in page when unset.
    pub landing_page: Option<String>,
    /// Sessions idle for longer than this are forgotten.
    pub session_idle_secs: u64,
    /// Base64 media payloads keyed by media id.
    pub media: HashMap<String, String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 1337,
            hub: HubMode::Static,
            reply_timeout_ms: 10_000,
            default_answer: "hi there".into(),
            landing_page: None,
            session_idle_secs: 3600,
            media: HashMap::new(),
        }
    }
}

/// Which address console frames carry toward the hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutboundAddress {
    /// The broadcast token; the handshake payload carries the identity.
    #[default]
    Broadcast,
    /// The client's own identity, for hubs that read the sender from the address.
    Identity,
}

/// Interactive console settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub prompt: String,
    pub hub_label: String,
    pub user_label: String,
    pub outbound_address: OutboundAddress,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".into(),
            hub_label: "Alixia".into(),
            user_label: "Me".into(),
            outbound_address: OutboundAddress::Broadcast,
        }
    }
}

/// Backoff for re-establishing a lost bus subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_factor: f64,
    /// Unset retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 15_000,
            backoff_factor: 2.0,
            max_attempts: None,
        }
    }
}
