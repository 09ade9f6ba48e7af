use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    hubline_bus::{Bus, BusError, MemoryBus, Subscription},
    hubline_protocol::Keyspace,
    tokio::sync::Mutex,
};

use crate::station::StationConfig;

/// Memory bus seeded with a valid station record.
pub(crate) async fn seeded_bus(keyspace: &Keyspace, station_id: &str) -> Arc<MemoryBus> {
    let bus = Arc::new(MemoryBus::new());
    let mut config = StationConfig::default();
    config.insert("STATIONID", station_id);
    bus.set(&keyspace.station_key(), &config.to_json().unwrap())
        .await
        .unwrap();
    bus
}

/// Wraps a bus, delaying the startup operations and recording the order in
/// which they complete.
pub(crate) struct DelayedBus {
    pub inner: Arc<MemoryBus>,
    pub incr_delay: Duration,
    pub get_delay: Duration,
    pub completed: Mutex<Vec<&'static str>>,
}

impl DelayedBus {
    pub fn new(inner: Arc<MemoryBus>, incr_delay: Duration, get_delay: Duration) -> Self {
        Self {
            inner,
            incr_delay,
            get_delay,
            completed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Bus for DelayedBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BusError> {
        self.inner.publish(channel, message).await
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BusError> {
        self.inner.subscribe(channel).await
    }

    async fn incr(&self, key: &str) -> Result<i64, BusError> {
        tokio::time::sleep(self.incr_delay).await;
        let value = self.inner.incr(key).await;
        self.completed.lock().await.push("incr");
        value
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        tokio::time::sleep(self.get_delay).await;
        let value = self.inner.get(key).await;
        self.completed.lock().await.push("get");
        value
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
        self.inner.set(key, value).await
    }
}

/// A bus whose server is never reachable.
pub(crate) struct OfflineBus;

fn offline() -> BusError {
    BusError::Unavailable("connection refused".into())
}

#[async_trait]
impl Bus for OfflineBus {
    async fn publish(&self, _channel: &str, _message: &str) -> Result<(), BusError> {
        Err(offline())
    }

    async fn subscribe(&self, _channel: &str) -> Result<Subscription, BusError> {
        Err(offline())
    }

    async fn incr(&self, _key: &str) -> Result<i64, BusError> {
        Err(offline())
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, BusError> {
        Err(offline())
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), BusError> {
        Err(offline())
    }
}
