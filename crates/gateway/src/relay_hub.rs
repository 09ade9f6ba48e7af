use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use {
    async_trait::async_trait,
    futures::StreamExt,
    hubline_bus::{Bus, Subscription},
    hubline_protocol::{Keyspace, SessionFrame},
    hubline_relay::ReconnectConfig,
    hubline_sessions::SessionId,
    tokio::{sync::oneshot, task::JoinHandle},
    tracing::{debug, info, trace, warn},
};

use crate::hub::{HubError, HubService, JsonAnswer, StaticHub};

// ── Pending replies ──────────────────────────────────────────────────────────

/// A request waiting for the hub's `session||answer`.
struct PendingReply {
    request_id: u64,
    sender: oneshot::Sender<String>,
    created_at: Instant,
}

/// An abandoned request whose answer may still arrive.
struct Orphan {
    request_id: u64,
    expires_at: Instant,
}

/// Per-session correlation state.
#[derive(Default)]
struct SessionQueue {
    /// Waiters, oldest first.
    waiters: VecDeque<PendingReply>,
    orphans: Vec<Orphan>,
}

impl SessionQueue {
    fn is_idle(&self) -> bool {
        self.waiters.is_empty() && self.orphans.is_empty()
    }

    fn expire_orphans(&mut self, now: Instant) {
        self.orphans.retain(|o| o.expires_at > now);
    }

    /// The next reply belongs to the oldest outstanding request. `None` when
    /// that request was abandoned and its answer is to be dropped.
    fn claim_reply(&mut self) -> Option<PendingReply> {
        let oldest_orphan = self
            .orphans
            .iter()
            .enumerate()
            .min_by_key(|(_, o)| o.request_id)
            .map(|(index, o)| (index, o.request_id));
        let oldest_waiter = self.waiters.front().map(|w| w.request_id);
        match oldest_orphan {
            Some((index, orphan)) if oldest_waiter.is_none_or(|w| orphan < w) => {
                self.orphans.swap_remove(index);
                None
            },
            _ => self.waiters.pop_front(),
        }
    }
}

/// Drop lapsed orphans and the sessions left with nothing pending.
fn expire_orphans(pending: &mut HashMap<SessionId, SessionQueue>, now: Instant) {
    pending.retain(|_, queue| {
        queue.expire_orphans(now);
        !queue.is_idle()
    });
}

type PendingMap = Arc<Mutex<HashMap<SessionId, SessionQueue>>>;

fn lock(pending: &PendingMap) -> MutexGuard<'_, HashMap<SessionId, SessionQueue>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Removes its request from the pending map when the request ends, however
/// it ends. A request abandoned after it reached the hub leaves an orphan so
/// the late answer is not handed to the session's next request.
struct PendingGuard {
    pending: PendingMap,
    session: SessionId,
    request_id: u64,
    orphan_window: Option<Duration>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        let mut pending = lock(&self.pending);
        let Some(queue) = pending.get_mut(&self.session) else {
            return;
        };
        let before = queue.waiters.len();
        queue.waiters.retain(|p| p.request_id != self.request_id);
        let abandoned = queue.waiters.len() < before;
        if abandoned && let Some(window) = self.orphan_window {
            queue.orphans.push(Orphan {
                request_id: self.request_id,
                expires_at: Instant::now() + window,
            });
            debug!(
                session = %self.session,
                request_id = self.request_id,
                "request abandoned before the hub answered"
            );
        }
        if queue.is_idle() {
            pending.remove(&self.session);
        }
    }
}

// ── RelayHub ─────────────────────────────────────────────────────────────────

/// Forwards web text to the hub over the bus as `session||text` and waits for
/// the matching `session||answer`. Media and the landing page come from the
/// static fallback.
///
/// Replies carry no request id, so they are matched to a session's requests in
/// order. A request that times out or is cancelled after reaching the hub
/// consumes the session's next reply within one timeout window; an answer
/// later than that still reaches whichever request is waiting.
pub struct RelayHub {
    bus: Arc<dyn Bus>,
    keyspace: Keyspace,
    timeout: Duration,
    fallback: StaticHub,
    pending: PendingMap,
    seq: AtomicU64,
    reader: JoinHandle<()>,
}

impl RelayHub {
    /// Subscribe to hub replies and start routing them to waiting requests.
    pub async fn start(
        bus: Arc<dyn Bus>,
        keyspace: Keyspace,
        timeout: Duration,
        fallback: StaticHub,
        reconnect: ReconnectConfig,
    ) -> Result<Self, HubError> {
        let channel = keyspace.inbound_channel();
        let subscription = bus.subscribe(&channel).await?;
        info!(channel = %channel, timeout_ms = timeout.as_millis() as u64, "relaying web sessions to hub");

        let pending = PendingMap::default();
        let reader = tokio::spawn(read_replies(
            Arc::clone(&bus),
            channel,
            subscription,
            Arc::clone(&pending),
            reconnect,
        ));
        Ok(Self {
            bus,
            keyspace,
            timeout,
            fallback,
            pending,
            seq: AtomicU64::new(0),
            reader,
        })
    }

    /// Number of requests still waiting for the hub.
    #[cfg(test)]
    fn pending_count(&self) -> usize {
        lock(&self.pending).values().map(|q| q.waiters.len()).sum()
    }

    async fn ask(&self, session: &SessionId, text: &str) -> Result<String, HubError> {
        let request_id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            expire_orphans(&mut pending, Instant::now());
            pending
                .entry(session.clone())
                .or_default()
                .waiters
                .push_back(PendingReply {
                    request_id,
                    sender,
                    created_at: Instant::now(),
                });
        }
        let mut guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            session: session.clone(),
            request_id,
            // A publish cancelled midway may still have reached the hub.
            orphan_window: Some(self.timeout),
        };

        let frame = SessionFrame::new(session.as_str(), text).encode();
        if let Err(e) = self
            .bus
            .publish(&self.keyspace.outbound_channel(), &frame)
            .await
        {
            guard.orphan_window = None;
            return Err(e.into());
        }
        trace!(session = %session, request_id, "text relayed to hub");

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(_)) => Err(HubError::Closed),
            Err(_) => {
                warn!(session = %session, request_id, "hub reply timed out");
                Err(HubError::Timeout(self.timeout))
            },
        }
    }
}

impl Drop for RelayHub {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[async_trait]
impl HubService for RelayHub {
    async fn text_answer(
        &self,
        session: &SessionId,
        text: Option<&str>,
    ) -> Result<String, HubError> {
        match text {
            Some(text) => self.ask(session, text).await,
            None => self.fallback.text_answer(session, None).await,
        }
    }

    async fn json_answer(&self, session: &SessionId, text: &str) -> Result<JsonAnswer, HubError> {
        self.ask(session, text).await.map(JsonAnswer::message)
    }

    async fn media_answer(&self, key: &str) -> Result<Vec<u8>, HubError> {
        self.fallback.media_answer(key).await
    }

    fn landing_page(&self) -> String {
        self.fallback.landing_page()
    }
}

// ── Reply reader ─────────────────────────────────────────────────────────────

async fn read_replies(
    bus: Arc<dyn Bus>,
    channel: String,
    mut subscription: Subscription,
    pending: PendingMap,
    reconnect: ReconnectConfig,
) {
    loop {
        while let Some(raw) = subscription.next().await {
            deliver(&pending, &raw);
        }
        warn!(channel = %channel, "hub reply subscription ended");
        match resubscribe(bus.as_ref(), &channel, &reconnect).await {
            Some(next) => subscription = next,
            None => {
                // Dropping the senders fails every waiter with `Closed`.
                lock(&pending).clear();
                return;
            },
        }
    }
}

async fn resubscribe(
    bus: &dyn Bus,
    channel: &str,
    reconnect: &ReconnectConfig,
) -> Option<Subscription> {
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        if reconnect.exhausted(attempt) {
            warn!(channel, attempts = attempt - 1, "giving up on hub replies");
            return None;
        }
        tokio::time::sleep(reconnect.delay_for_attempt(attempt)).await;
        match bus.subscribe(channel).await {
            Ok(subscription) => {
                info!(channel, attempt, "resubscribed to hub replies");
                return Some(subscription);
            },
            Err(e) => warn!(channel, attempt, error = %e, "resubscribe failed"),
        }
    }
}

/// Hand one inbound message to the oldest waiter of its session. Console
/// traffic shares the channel and does not parse as a session reply.
fn deliver(pending: &PendingMap, raw: &str) {
    let Ok(frame) = SessionFrame::decode(raw) else {
        trace!("ignoring non-session message");
        return;
    };
    let Ok(session) = SessionId::parse(&frame.session) else {
        trace!("ignoring message with unusable session");
        return;
    };

    let waiter = {
        let mut pending = lock(pending);
        let Some(queue) = pending.get_mut(&session) else {
            trace!(session = %session, "reply without a waiting request");
            return;
        };
        queue.expire_orphans(Instant::now());
        let waiter = queue.claim_reply();
        if waiter.is_none() {
            debug!(session = %session, "dropping answer to an abandoned request");
        }
        if queue.is_idle() {
            pending.remove(&session);
        }
        waiter
    };

    let Some(waiter) = waiter else {
        return;
    };
    debug!(
        session = %session,
        request_id = waiter.request_id,
        elapsed_ms = waiter.created_at.elapsed().as_millis() as u64,
        "hub replied"
    );
    if waiter.sender.send(frame.payload).is_err() {
        debug!(session = %session, "requester went away before the reply");
    }
}
