use std::collections::HashMap;

use {
    async_trait::async_trait,
    futures::StreamExt,
    tokio::sync::{Mutex, broadcast},
    tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError},
    tracing::{debug, warn},
};

use crate::{Bus, BusError, Subscription};

const DEFAULT_CAPACITY: usize = 256;

/// In-process bus with Redis-like semantics: messages published while nobody
/// is subscribed are lost, and counters are stored as decimal strings.
pub struct MemoryBus {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    values: Mutex<HashMap<String, String>>,
    capacity: usize,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// `capacity` bounds how far a slow subscriber may lag before it starts
    /// losing messages.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            values: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// End every open subscription on `channel`, as a dropped server
    /// connection would.
    pub async fn disconnect(&self, channel: &str) {
        if self.channels.lock().await.remove(channel).is_some() {
            debug!(channel, "memory bus channel disconnected");
        }
    }

    /// Number of live subscribers on `channel`.
    pub async fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .await
            .get(channel)
            .map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl Bus for MemoryBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BusError> {
        let channels = self.channels.lock().await;
        if let Some(tx) = channels.get(channel) {
            // An error only means there are no receivers right now.
            let _ = tx.send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BusError> {
        let rx = {
            let mut channels = self.channels.lock().await;
            channels
                .entry(channel.to_string())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };
        let channel = channel.to_string();
        let stream = BroadcastStream::new(rx).filter_map(move |item| {
            let channel = channel.clone();
            async move {
                match item {
                    Ok(message) => Some(message),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, skipped, "subscriber lagged, messages lost");
                        None
                    },
                }
            }
        });
        Ok(Box::pin(stream))
    }

    async fn incr(&self, key: &str) -> Result<i64, BusError> {
        let mut values = self.values.lock().await;
        let current = match values.get(key) {
            Some(raw) => raw
                .parse::<i64>()
                .map_err(|_| BusError::NotAnInteger(key.to_string()))?,
            None => 0,
        };
        let next = current
            .checked_add(1)
            .ok_or_else(|| BusError::NotAnInteger(key.to_string()))?;
        values.insert(key.to_string(), next.to_string());
        Ok(next)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
