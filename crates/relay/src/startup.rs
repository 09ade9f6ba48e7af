use {
    hubline_bus::Bus,
    hubline_protocol::{Identity, Keyspace},
    tracing::info,
};

use crate::{RelayError, identity, station};

/// Everything a client learns before it may talk to the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupContext {
    pub identity: Identity,
    pub station_id: String,
    pub keyspace: Keyspace,
}

/// Startup barrier: allocate the identity and resolve the station
/// concurrently, and return once both are done, whichever finishes first.
/// The first failure aborts startup.
pub async fn bootstrap(bus: &dyn Bus, keyspace: &Keyspace) -> Result<StartupContext, RelayError> {
    let (identity, station_id) = tokio::try_join!(
        identity::allocate(bus, keyspace),
        station::resolve(bus, keyspace),
    )?;
    info!(identity = %identity, station = %station_id, "startup complete");
    Ok(StartupContext {
        identity,
        station_id,
        keyspace: keyspace.clone(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {
        super::*,
        crate::test_support::{DelayedBus, OfflineBus, seeded_bus},
        hubline_bus::MemoryBus,
    };

    async fn run_with_delays(incr: u64, get: u64) -> (StartupContext, Vec<&'static str>) {
        let keys = Keyspace::default();
        let bus = DelayedBus::new(
            seeded_bus(&keys, "station-a").await,
            Duration::from_millis(incr),
            Duration::from_millis(get),
        );
        let context = bootstrap(&bus, &keys).await.unwrap();
        let order = bus.completed.lock().await.clone();
        (context, order)
    }

    #[tokio::test]
    async fn identity_first_then_station() {
        let (context, order) = run_with_delays(0, 60).await;
        assert_eq!(order, vec!["incr", "get"]);
        assert_eq!(context.identity, Identity(1));
        assert_eq!(context.station_id, "station-a");
    }

    #[tokio::test]
    async fn station_first_then_identity() {
        let (context, order) = run_with_delays(60, 0).await;
        assert_eq!(order, vec!["get", "incr"]);
        assert_eq!(context.identity, Identity(1));
        assert_eq!(context.station_id, "station-a");
    }

    #[tokio::test]
    async fn completion_order_does_not_change_the_result() {
        let (a, _) = run_with_delays(0, 40).await;
        let (b, _) = run_with_delays(40, 0).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn operations_overlap() {
        let started = tokio::time::Instant::now();
        run_with_delays(150, 150).await;
        // Run back to back they would need at least 300ms.
        assert!(started.elapsed() < Duration::from_millis(290));
    }

    #[tokio::test]
    async fn missing_station_fails_startup() {
        let bus = MemoryBus::new();
        let err = bootstrap(&bus, &Keyspace::default()).await.unwrap_err();
        assert!(matches!(err, RelayError::Configuration(_)));
    }

    #[tokio::test]
    async fn unreachable_bus_fails_startup() {
        let err = bootstrap(&OfflineBus, &Keyspace::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Connectivity(_)));
    }
}
