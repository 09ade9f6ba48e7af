use {
    async_trait::async_trait,
    futures::StreamExt,
    redis::{AsyncCommands, Client, aio::MultiplexedConnection},
    tracing::{debug, info, warn},
};

use crate::{Bus, BusError, Subscription};

/// Redis-backed bus. Commands share one multiplexed connection; every
/// subscription opens its own pub/sub connection.
pub struct RedisBus {
    client: Client,
    conn: MultiplexedConnection,
}

impl RedisBus {
    /// Open the command connection. Fails fast when the server is
    /// unreachable so startup can abort.
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url, "connected to redis");
        Ok(Self { client, conn })
    }
}

#[async_trait]
impl Bus for RedisBus {
    async fn publish(&self, channel: &str, message: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let receivers: i64 = conn.publish(channel, message).await?;
        debug!(channel, receivers, "published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, BusError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(channel).await?;
        debug!(channel, "subscribed");
        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    warn!(channel = %msg.get_channel_name(), error = %e, "dropping non-text message");
                    None
                },
            }
        });
        Ok(Box::pin(stream))
    }

    async fn incr(&self, key: &str) -> Result<i64, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.incr(key, 1).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BusError> {
        let mut conn = self.conn.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let () = conn.set(key, value).await?;
        Ok(())
    }
}
