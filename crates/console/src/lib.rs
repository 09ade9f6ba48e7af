//! Interactive console front end.
//!
//! Startup runs the relay bootstrap barrier, subscribes to the hub, sends the
//! handshake frame and then hands control to [`ConsoleLoop`], which interleaves
//! hub messages with lines typed by the user until the hub says goodbye or the
//! input ends.

pub mod repl;

use std::sync::Arc;

use {
    hubline_bus::Bus,
    hubline_config::ConsoleConfig,
    hubline_protocol::Keyspace,
    hubline_relay::{ChannelRelay, ReconnectConfig, RelayError, bootstrap},
    tokio::io::{AsyncBufRead, AsyncWrite},
    tracing::info,
};

pub use repl::ConsoleLoop;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the console loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The hub sent a shutdown sentinel.
    Shutdown,
    /// The hub sent a fatal sentinel.
    Fatal,
    /// Local input reached end of file.
    InputClosed,
}

impl ExitReason {
    /// Process exit code for this outcome.
    pub fn code(self) -> i32 {
        match self {
            Self::Shutdown | Self::InputClosed => 0,
            Self::Fatal => 1,
        }
    }
}

/// Bootstrap, connect and run a console session over `input` and `output`.
pub async fn run_console<R, W>(
    bus: Arc<dyn Bus>,
    keyspace: &Keyspace,
    config: ConsoleConfig,
    reconnect: ReconnectConfig,
    input: R,
    output: W,
) -> Result<ExitReason, ConsoleError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let context = bootstrap(bus.as_ref(), keyspace).await?;
    let relay = ChannelRelay::for_context(bus, &context).with_reconnect(reconnect);
    let inbound = relay.subscribe().await?;

    let mut console = ConsoleLoop::new(relay, context.station_id, config, output);
    console.handshake().await?;
    let reason = console.run(input, inbound).await?;
    info!(?reason, "console finished");
    Ok(reason)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {
        super::*,
        futures::StreamExt,
        hubline_bus::{MemoryBus, Subscription},
        hubline_relay::{StationConfig, station},
        tokio::io::{AsyncWriteExt, BufReader},
    };

    async fn next_message(sub: &mut Subscription) -> String {
        tokio::time::timeout(Duration::from_secs(2), sub.next())
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn exit_codes() {
        assert_eq!(ExitReason::Shutdown.code(), 0);
        assert_eq!(ExitReason::InputClosed.code(), 0);
        assert_eq!(ExitReason::Fatal.code(), 1);
    }

    #[tokio::test]
    async fn full_session_from_bootstrap_to_shutdown() {
        let keys = Keyspace::default();
        let bus = Arc::new(MemoryBus::new());
        let config = StationConfig::parse_properties("STATIONID=kitchen\n").unwrap();
        station::store(bus.as_ref(), &keys, &config).await.unwrap();
        let mut hub = bus.subscribe(&keys.outbound_channel()).await.unwrap();

        let (mut typing, input) = tokio::io::duplex(256);
        let shared: Arc<dyn Bus> = Arc::clone(&bus) as Arc<dyn Bus>;
        let console_keys = keys.clone();
        let console = tokio::spawn(async move {
            run_console(
                shared,
                &console_keys,
                ConsoleConfig::default(),
                ReconnectConfig::default(),
                BufReader::new(input),
                Vec::new(),
            )
            .await
        });

        assert_eq!(next_message(&mut hub).await, "ALL::1::kitchen");
        typing.write_all(b"hello\n").await.unwrap();
        assert_eq!(next_message(&mut hub).await, "ALL::hello");

        bus.publish(&keys.inbound_channel(), "1::**see you")
            .await
            .unwrap();
        let reason = tokio::time::timeout(Duration::from_secs(2), console)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reason, ExitReason::Shutdown);
    }

    #[tokio::test]
    async fn startup_fails_without_station() {
        let bus: Arc<dyn Bus> = Arc::new(MemoryBus::new());
        let result = run_console(
            bus,
            &Keyspace::default(),
            ConsoleConfig::default(),
            ReconnectConfig::default(),
            &b""[..],
            Vec::new(),
        )
        .await;
        assert!(matches!(
            result,
            Err(ConsoleError::Relay(RelayError::Configuration(_)))
        ));
    }
}
