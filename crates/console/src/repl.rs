use {
    hubline_config::{ConsoleConfig, OutboundAddress},
    hubline_protocol::{ControlSentinel, Frame, classify},
    hubline_relay::{ChannelRelay, Inbound, RelayError},
    tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    tracing::{debug, error, warn},
};

use crate::{ConsoleError, ExitReason};

/// One logical thread of control over hub frames and local input lines.
pub struct ConsoleLoop<W> {
    relay: ChannelRelay,
    station_id: String,
    config: ConsoleConfig,
    out: W,
}

impl<W: AsyncWrite + Unpin> ConsoleLoop<W> {
    pub fn new(relay: ChannelRelay, station_id: String, config: ConsoleConfig, out: W) -> Self {
        Self {
            relay,
            station_id,
            config,
            out,
        }
    }

    /// Frame announcing this client and its station to the hub.
    pub fn handshake_frame(&self) -> Frame {
        let identity = self.relay.identity();
        match self.config.outbound_address {
            OutboundAddress::Identity => Frame::new(identity, self.station_id.as_str()),
            OutboundAddress::Broadcast => {
                Frame::broadcast(format!("{identity}::{}", self.station_id))
            },
        }
    }

    /// Frame carrying one line of user input.
    pub fn outbound_frame(&self, line: &str) -> Frame {
        match self.config.outbound_address {
            OutboundAddress::Identity => Frame::new(self.relay.identity(), line),
            OutboundAddress::Broadcast => Frame::broadcast(line),
        }
    }

    /// Announce this client and show the first prompt. A failure here is
    /// still part of startup and is returned.
    pub async fn handshake(&mut self) -> Result<(), ConsoleError> {
        self.relay.publish_frame(&self.handshake_frame()).await?;
        self.prompt().await?;
        Ok(())
    }

    /// Run until a terminal sentinel arrives or `input` ends.
    pub async fn run<R>(&mut self, input: R, mut inbound: Inbound) -> Result<ExitReason, ConsoleError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut inbound_open = true;

        loop {
            tokio::select! {
                frame = inbound.recv(), if inbound_open => match frame {
                    Some(frame) => {
                        if let Some(reason) = self.show_inbound(&frame.payload).await? {
                            return Ok(reason);
                        }
                    },
                    None => {
                        warn!("hub connection lost; messages from the hub will no longer arrive");
                        inbound_open = false;
                    },
                },
                line = lines.next_line() => match line? {
                    Some(line) => self.send_line(&line).await?,
                    None => {
                        debug!("input closed");
                        return Ok(ExitReason::InputClosed);
                    },
                },
            }
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn show_inbound(&mut self, payload: &str) -> Result<Option<ExitReason>, ConsoleError> {
        let label = &self.config.hub_label;
        self.out
            .write_all(format!("\r{label}: {payload}\n").as_bytes())
            .await?;
        match classify(payload) {
            ControlSentinel::Fatal => {
                self.out.flush().await?;
                error!(payload, "hub reported a fatal error");
                Ok(Some(ExitReason::Fatal))
            },
            ControlSentinel::Shutdown => {
                self.out.flush().await?;
                Ok(Some(ExitReason::Shutdown))
            },
            ControlSentinel::None => {
                self.prompt().await?;
                Ok(None)
            },
        }
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ConsoleError> {
        if line.trim().is_empty() {
            return Ok(self.prompt().await?);
        }
        if let Err(e) = self.relay.publish_frame(&self.outbound_frame(line)).await {
            log_send_failure(&e);
        }
        let label = &self.config.user_label;
        self.out
            .write_all(format!("{label}: {line}\n").as_bytes())
            .await?;
        Ok(self.prompt().await?)
    }

    async fn prompt(&mut self) -> std::io::Result<()> {
        self.out.write_all(self.config.prompt.as_bytes()).await?;
        self.out.flush().await
    }
}

fn log_send_failure(e: &RelayError) {
    warn!(error = %e, "failed to send input to the hub");
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use {
        super::*,
        futures::StreamExt,
        hubline_bus::{Bus, MemoryBus},
        hubline_protocol::{Identity, Keyspace},
        hubline_relay::ReconnectConfig,
        tokio::io::BufReader,
    };

    fn console(bus: &Arc<MemoryBus>, mode: OutboundAddress) -> ConsoleLoop<Vec<u8>> {
        let shared: Arc<dyn Bus> = Arc::clone(bus) as Arc<dyn Bus>;
        let relay = ChannelRelay::new(shared, Keyspace::default(), Identity(7));
        let config = ConsoleConfig {
            outbound_address: mode,
            ..ConsoleConfig::default()
        };
        ConsoleLoop::new(relay, "kitchen".into(), config, Vec::new())
    }

    fn output(console: ConsoleLoop<Vec<u8>>) -> String {
        String::from_utf8(console.into_output()).unwrap()
    }

    async fn run_for(
        console: &mut ConsoleLoop<Vec<u8>>,
        input: &'static [u8],
        inbound: Inbound,
    ) -> ExitReason {
        tokio::time::timeout(Duration::from_secs(2), console.run(input, inbound))
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn frames_follow_the_outbound_mode() {
        let bus = Arc::new(MemoryBus::new());
        let direct = console(&bus, OutboundAddress::Identity);
        assert_eq!(direct.handshake_frame().encode(), "7::kitchen");
        assert_eq!(direct.outbound_frame("hi::there").encode(), "7::hi::there");

        let broadcast = console(&bus, OutboundAddress::Broadcast);
        assert_eq!(broadcast.handshake_frame().encode(), "ALL::7::kitchen");
        assert_eq!(broadcast.outbound_frame("hi").encode(), "ALL::hi");
    }

    #[tokio::test]
    async fn handshake_publishes_and_prompts() {
        let bus = Arc::new(MemoryBus::new());
        let mut hub = bus
            .subscribe(&Keyspace::default().outbound_channel())
            .await
            .unwrap();
        let mut console = console(&bus, OutboundAddress::Identity);
        console.handshake().await.unwrap();
        assert_eq!(hub.next().await.as_deref(), Some("7::kitchen"));
        assert_eq!(output(console), "> ");
    }

    #[tokio::test]
    async fn input_lines_are_published_and_echoed() {
        let bus = Arc::new(MemoryBus::new());
        let mut hub = bus
            .subscribe(&Keyspace::default().outbound_channel())
            .await
            .unwrap();
        let mut console = console(&bus, OutboundAddress::Identity);
        let inbound = console.relay.subscribe().await.unwrap();

        let reason = run_for(&mut console, b"hello\n\n**not a sentinel\n", inbound).await;

        assert_eq!(reason, ExitReason::InputClosed);
        assert_eq!(hub.next().await.as_deref(), Some("7::hello"));
        assert_eq!(hub.next().await.as_deref(), Some("7::**not a sentinel"));
        assert_eq!(
            output(console),
            "Me: hello\n> > Me: **not a sentinel\n> "
        );
    }

    #[tokio::test]
    async fn inbound_messages_are_shown_then_prompted() {
        let bus = Arc::new(MemoryBus::new());
        let keys = Keyspace::default();
        let mut console = console(&bus, OutboundAddress::Identity);
        let inbound = console.relay.subscribe().await.unwrap();
        for raw in ["7::hello there", "3::not mine", "ALL::**closing time"] {
            bus.publish(&keys.inbound_channel(), raw).await.unwrap();
        }

        let (_typing, input) = tokio::io::duplex(64);
        let reason = tokio::time::timeout(
            Duration::from_secs(2),
            console.run(BufReader::new(input), inbound),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(reason, ExitReason::Shutdown);
        assert_eq!(
            output(console),
            "\rAlixia: hello there\n> \rAlixia: **closing time\n"
        );
    }

    #[tokio::test]
    async fn fatal_sentinel_ends_with_failure() {
        let bus = Arc::new(MemoryBus::new());
        let keys = Keyspace::default();
        let mut console = console(&bus, OutboundAddress::Identity);
        let inbound = console.relay.subscribe().await.unwrap();
        bus.publish(&keys.inbound_channel(), "7::***hub crashed")
            .await
            .unwrap();

        let (_typing, input) = tokio::io::duplex(64);
        let reason = console.run(BufReader::new(input), inbound).await.unwrap();
        assert_eq!(reason, ExitReason::Fatal);
        assert_eq!(reason.code(), 1);
        assert_eq!(output(console), "\rAlixia: ***hub crashed\n");
    }

    #[tokio::test]
    async fn lost_hub_connection_keeps_reading_input() {
        let bus = Arc::new(MemoryBus::new());
        let keys = Keyspace::default();
        let mut console = console(&bus, OutboundAddress::Identity);
        console.relay = console.relay.clone().with_reconnect(ReconnectConfig {
            max_attempts: Some(0),
            ..ReconnectConfig::default()
        });
        let inbound = console.relay.subscribe().await.unwrap();
        bus.disconnect(&keys.inbound_channel()).await;

        let (mut typing, input) = tokio::io::duplex(64);
        let writer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            typing.write_all(b"anyone?\n").await.unwrap();
        });
        let reason = tokio::time::timeout(
            Duration::from_secs(2),
            console.run(BufReader::new(input), inbound),
        )
        .await
        .unwrap()
        .unwrap();
        writer.await.unwrap();

        assert_eq!(reason, ExitReason::InputClosed);
        assert_eq!(output(console), "Me: anyone?\n> ");
    }

    #[tokio::test]
    async fn unheard_input_is_still_echoed() {
        let bus = Arc::new(MemoryBus::new());
        let mut console = console(&bus, OutboundAddress::Broadcast);
        let inbound = console.relay.subscribe().await.unwrap();
        // Nobody listens on the outbound channel.
        let reason = run_for(&mut console, b"into the void\n", inbound).await;
        assert_eq!(reason, ExitReason::InputClosed);
        assert_eq!(output(console), "Me: into the void\n> ");
    }
}
