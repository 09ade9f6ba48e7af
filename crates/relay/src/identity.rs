use {
    hubline_bus::Bus,
    hubline_protocol::{Identity, Keyspace},
    tracing::debug,
};

use crate::RelayError;

/// Take the next client identity from the shared counter.
///
/// The increment is atomic on the bus, so concurrent callers in any number of
/// processes never receive the same value.
pub async fn allocate(bus: &dyn Bus, keyspace: &Keyspace) -> Result<Identity, RelayError> {
    let key = keyspace.counter_key();
    let value = bus.incr(&key).await?;
    let id = u64::try_from(value)
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            RelayError::Configuration(format!("counter '{key}' produced invalid identity {value}"))
        })?;
    debug!(identity = id, key = %key, "allocated identity");
    Ok(Identity(id))
}
