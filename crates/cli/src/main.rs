mod station_commands;

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    clap::{Parser, Subcommand},
    hubline_bus::{Bus, MemoryBus, RedisBus},
    hubline_config::{BusBackend, BusConfig, HubMode, HublineConfig, ReconnectSettings},
    hubline_console::run_console,
    hubline_gateway::{HubService, RelayHub, StaticHub, start_gateway},
    hubline_protocol::Keyspace,
    hubline_relay::ReconnectConfig,
    tokio::io::BufReader,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "hubline", about = "hubline: terminal and web front ends for a bus-connected hub")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file. Defaults to hubline.{toml,yaml,json} in ./ or ~/.config/hubline/.
    #[arg(long, global = true, env = "HUBLINE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the hub from this terminal.
    Console,
    /// Start the HTTP gateway.
    Gateway {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Station configuration management.
    Station {
        #[command(subcommand)]
        action: station_commands::StationAction,
    },
    /// Print the effective configuration.
    Config,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // stdout belongs to the console conversation.
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn reconnect_config(settings: &ReconnectSettings) -> ReconnectConfig {
    ReconnectConfig {
        initial_delay: Duration::from_millis(settings.initial_delay_ms),
        max_delay: Duration::from_millis(settings.max_delay_ms),
        backoff_factor: settings.backoff_factor,
        max_attempts: settings.max_attempts,
    }
}

async fn connect_bus(config: &BusConfig) -> anyhow::Result<Arc<dyn Bus>> {
    match config.backend {
        BusBackend::Redis => {
            let bus = RedisBus::connect(&config.url).await?;
            info!(url = %config.url, "connected to bus");
            Ok(Arc::new(bus))
        },
        BusBackend::Memory => {
            warn!("using the in-process bus; no hub can reach this process");
            Ok(Arc::new(MemoryBus::new()))
        },
    }
}

async fn build_hub(
    config: &HublineConfig,
    keyspace: &Keyspace,
) -> anyhow::Result<Arc<dyn HubService>> {
    let fallback = StaticHub::from_config(&config.gateway);
    match config.gateway.hub {
        HubMode::Static => Ok(Arc::new(fallback)),
        HubMode::Relay => {
            let bus = connect_bus(&config.bus).await?;
            let hub = RelayHub::start(
                bus,
                keyspace.clone(),
                Duration::from_millis(config.gateway.reply_timeout_ms),
                fallback,
                reconnect_config(&config.reconnect),
            )
            .await?;
            Ok(Arc::new(hub))
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "hubline starting");

    let config = hubline_config::load_or_discover(cli.config.as_deref())?;
    let keyspace = Keyspace::new(config.bus.app.as_str(), config.bus.entity.as_str());

    match cli.command {
        Commands::Console => {
            let bus = connect_bus(&config.bus).await?;
            let reason = run_console(
                bus,
                &keyspace,
                config.console.clone(),
                reconnect_config(&config.reconnect),
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            // A pending blocking stdin read would keep the runtime alive.
            std::process::exit(reason.code());
        },
        Commands::Gateway { bind, port } => {
            let mut gateway = config.gateway.clone();
            if let Some(bind) = bind {
                gateway.bind = bind;
            }
            if let Some(port) = port {
                gateway.port = port;
            }
            let hub = build_hub(&config, &keyspace).await?;
            start_gateway(&gateway, keyspace.app(), hub).await
        },
        Commands::Station { action } => {
            let bus = connect_bus(&config.bus).await?;
            station_commands::handle_station(action, bus.as_ref(), &keyspace).await
        },
        Commands::Config => {
            print!("{}", hubline_config::to_toml(&config)?);
            Ok(())
        },
    }
}
