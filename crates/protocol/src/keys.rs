/// Bus key and channel names for one deployment.
///
/// Layout: `<app>:channel:text:to`, `<app>:channel:text:from`,
/// `<app>:jsonstation`, `<app>:<entity>:next_<entity>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    app: String,
    entity: String,
}

impl Keyspace {
    pub fn new(app: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            entity: entity.into(),
        }
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    /// Front ends publish here; the hub subscribes.
    pub fn outbound_channel(&self) -> String {
        format!("{}:channel:text:to", self.app)
    }

    /// The hub publishes here; front ends subscribe.
    pub fn inbound_channel(&self) -> String {
        format!("{}:channel:text:from", self.app)
    }

    pub fn station_key(&self) -> String {
        format!("{}:jsonstation", self.app)
    }

    pub fn counter_key(&self) -> String {
        format!("{0}:{1}:next_{1}", self.app, self.entity)
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self::new("alixia", "alixian")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let keys = Keyspace::default();
        assert_eq!(keys.outbound_channel(), "alixia:channel:text:to");
        assert_eq!(keys.inbound_channel(), "alixia:channel:text:from");
        assert_eq!(keys.station_key(), "alixia:jsonstation");
        assert_eq!(keys.counter_key(), "alixia:alixian:next_alixian");
    }

    #[test]
    fn custom_prefix() {
        let keys = Keyspace::new("demo", "client");
        assert_eq!(keys.app(), "demo");
        assert_eq!(keys.counter_key(), "demo:client:next_client");
        assert_eq!(keys.outbound_channel(), "demo:channel:text:to");
    }
}
