//! Station configuration: the machine-local `{Name, Value}` records every
//! client reads at startup, and the import path that writes them.

use {
    hubline_bus::Bus,
    hubline_protocol::{Keyspace, STATION_ID_RECORD},
    serde::{Deserialize, Serialize},
    tracing::{debug, info},
};

use crate::RelayError;

/// One `{Name, Value}` pair as stored on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// Ordered station records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationConfig {
    records: Vec<StationRecord>,
}

impl StationConfig {
    pub fn from_json(raw: &str) -> Result<Self, RelayError> {
        let records: Vec<StationRecord> = serde_json::from_str(raw)
            .map_err(|e| RelayError::Configuration(format!("malformed station records: {e}")))?;
        Ok(Self { records })
    }

    pub fn to_json(&self) -> Result<String, RelayError> {
        serde_json::to_string(&self.records)
            .map_err(|e| RelayError::Configuration(format!("serialize station records: {e}")))
    }

    /// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped. An
    /// empty `STATIONID=` gets a freshly generated UUID.
    pub fn parse_properties(text: &str) -> Result<Self, RelayError> {
        let mut config = Self::default();
        for (index, line) in text.lines().enumerate() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, value) = line.split_once('=').ok_or_else(|| {
                RelayError::Configuration(format!(
                    "line {}: expected KEY=VALUE, got {line:?}",
                    index + 1
                ))
            })?;
            if name == STATION_ID_RECORD && value.is_empty() {
                let generated = uuid::Uuid::new_v4().to_string();
                debug!(station = %generated, "generated station id");
                config.insert(name, generated);
            } else {
                config.insert(name, value);
            }
        }
        Ok(config)
    }

    /// First record named `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.value.as_str())
    }

    /// Replace an existing record in place, or append.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.records.iter_mut().find(|r| r.name == name) {
            Some(record) => record.value = value,
            None => self.records.push(StationRecord { name, value }),
        }
    }

    pub fn records(&self) -> &[StationRecord] {
        &self.records
    }

    pub fn station_id(&self) -> Result<&str, RelayError> {
        match self.get(STATION_ID_RECORD) {
            Some(id) if !id.is_empty() => Ok(id),
            Some(_) => Err(RelayError::Configuration(format!(
                "{STATION_ID_RECORD} record is empty"
            ))),
            None => Err(RelayError::Configuration(format!(
                "no {STATION_ID_RECORD} record; import the station configuration first"
            ))),
        }
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        self.station_id().map(|_| ())
    }
}

/// Fetch and parse the station records.
pub async fn load(bus: &dyn Bus, keyspace: &Keyspace) -> Result<StationConfig, RelayError> {
    let key = keyspace.station_key();
    let raw = bus.get(&key).await?.ok_or_else(|| {
        RelayError::Configuration(format!(
            "station key '{key}' not found; import the station configuration first"
        ))
    })?;
    StationConfig::from_json(&raw)
}

/// Resolve this machine's station id.
pub async fn resolve(bus: &dyn Bus, keyspace: &Keyspace) -> Result<String, RelayError> {
    let config = load(bus, keyspace).await?;
    let id = config.station_id()?.to_string();
    debug!(station = %id, "resolved station");
    Ok(id)
}

/// Validate and write the station records.
pub async fn store(
    bus: &dyn Bus,
    keyspace: &Keyspace,
    config: &StationConfig,
) -> Result<(), RelayError> {
    config.validate()?;
    let key = keyspace.station_key();
    bus.set(&key, &config.to_json()?).await?;
    info!(key = %key, records = config.records().len(), "stored station configuration");
    Ok(())
}
