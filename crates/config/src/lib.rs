//! Configuration loading, validation, and env substitution.
//!
//! Config files: `hubline.toml`, `hubline.yaml`, or `hubline.json`
//! Searched in `./` then `~/.config/hubline/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config, load_or_discover, to_toml},
    schema::{
        BusBackend, BusConfig, ConsoleConfig, GatewayConfig, HubMode, HublineConfig,
        OutboundAddress, ReconnectSettings,
    },
};
