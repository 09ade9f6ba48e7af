use std::sync::Arc;

use {
    futures::StreamExt,
    hubline_bus::{Bus, Subscription},
    hubline_protocol::{Address, Frame, Identity, Keyspace, SessionFrame},
    tokio::{sync::mpsc, task::JoinHandle},
    tracing::{debug, info, trace, warn},
};

use crate::{RelayError, reconnect::ReconnectConfig, startup::StartupContext};

const INBOUND_BUFFER: usize = 64;

/// Decode one raw inbound message and keep it only if it is addressed to
/// `identity` or to everyone. Malformed messages are dropped with a warning.
///
/// The gateway's `session||answer` replies share the inbound channel and are
/// dropped here too; their warning carries `session_reply = true`.
pub fn accept_frame(raw: &str, identity: Identity) -> Option<Frame> {
    match Frame::decode(raw) {
        Ok(frame) if frame.address.accepts(identity) => Some(frame),
        Ok(frame) => {
            trace!(address = %frame.address, "frame for another client");
            None
        },
        Err(e) => {
            warn!(error = %e, session_reply = is_session_reply(raw), "dropping malformed frame");
            None
        },
    }
}

/// Gateway traffic: `session||payload` without an address.
fn is_session_reply(raw: &str) -> bool {
    SessionFrame::decode(raw).is_ok()
}

/// Publishes addressed frames on the outbound channel and filters the shared
/// inbound channel down to this client's traffic.
#[derive(Clone)]
pub struct ChannelRelay {
    bus: Arc<dyn Bus>,
    keyspace: Keyspace,
    identity: Identity,
    reconnect: ReconnectConfig,
}

impl ChannelRelay {
    pub fn new(bus: Arc<dyn Bus>, keyspace: Keyspace, identity: Identity) -> Self {
        Self {
            bus,
            keyspace,
            identity,
            reconnect: ReconnectConfig::default(),
        }
    }

    pub fn for_context(bus: Arc<dyn Bus>, context: &StartupContext) -> Self {
        Self::new(bus, context.keyspace.clone(), context.identity)
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Serialize `address::payload` and send it toward the hub.
    pub async fn publish(
        &self,
        address: impl Into<Address>,
        payload: &str,
    ) -> Result<(), RelayError> {
        self.publish_frame(&Frame::new(address, payload)).await
    }

    pub async fn publish_frame(&self, frame: &Frame) -> Result<(), RelayError> {
        let channel = self.keyspace.outbound_channel();
        self.bus.publish(&channel, &frame.encode()).await?;
        trace!(channel = %channel, address = %frame.address, "frame published");
        Ok(())
    }

    /// Subscribe to the inbound channel. The returned [`Inbound`] yields the
    /// accepted frames in arrival order. A subscription that ends later is
    /// re-established with backoff; only the first attempt is reported as an
    /// error.
    pub async fn subscribe(&self) -> Result<Inbound, RelayError> {
        let channel = self.keyspace.inbound_channel();
        let subscription = self.bus.subscribe(&channel).await?;
        info!(channel = %channel, identity = %self.identity, "subscribed to hub");

        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);
        let reader = tokio::spawn(read_loop(
            Arc::clone(&self.bus),
            channel,
            self.identity,
            subscription,
            tx,
            self.reconnect.clone(),
        ));
        Ok(Inbound { rx, reader })
    }
}

/// Frames accepted by a [`ChannelRelay`] subscription.
pub struct Inbound {
    rx: mpsc::Receiver<Frame>,
    reader: JoinHandle<()>,
}

impl Inbound {
    /// Next accepted frame; `None` once the relay has given up on the bus.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }
}

impl Drop for Inbound {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    bus: Arc<dyn Bus>,
    channel: String,
    identity: Identity,
    mut subscription: Subscription,
    tx: mpsc::Sender<Frame>,
    reconnect: ReconnectConfig,
) {
    loop {
        while let Some(raw) = subscription.next().await {
            let Some(frame) = accept_frame(&raw, identity) else {
                continue;
            };
            if tx.send(frame).await.is_err() {
                debug!(channel = %channel, "inbound receiver dropped");
                return;
            }
        }
        warn!(channel = %channel, "inbound subscription ended");
        match resubscribe(bus.as_ref(), &channel, &reconnect, &tx).await {
            Some(next) => subscription = next,
            None => return,
        }
    }
}

async fn resubscribe(
    bus: &dyn Bus,
    channel: &str,
    reconnect: &ReconnectConfig,
    tx: &mpsc::Sender<Frame>,
) -> Option<Subscription> {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        if reconnect.exhausted(attempt) {
            warn!(channel, attempts = attempt - 1, "giving up on inbound subscription");
            return None;
        }
        let delay = reconnect.delay_for_attempt(attempt);
        info!(
            channel,
            attempt,
            delay_secs = format_args!("{:.2}", delay.as_secs_f64()),
            "resubscribing"
        );
        tokio::select! {
            _ = tx.closed() => return None,
            _ = tokio::time::sleep(delay) => {},
        }
        match bus.subscribe(channel).await {
            Ok(subscription) => {
                info!(channel, attempt, "resubscribed");
                return Some(subscription);
            },
            Err(e) => warn!(channel, attempt, error = %e, "resubscribe failed"),
        }
    }
}
