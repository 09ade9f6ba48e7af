use std::path::{Path, PathBuf};

use {
    anyhow::{Context, Result},
    clap::Subcommand,
    hubline_bus::Bus,
    hubline_protocol::Keyspace,
    hubline_relay::{StationConfig, station},
};

#[derive(Subcommand)]
pub enum StationAction {
    /// Import station records from a KEY=VALUE file.
    Import {
        /// Properties file; an empty STATIONID= gets a generated id.
        path: PathBuf,
    },
    /// Print the stored station records.
    Show,
}

pub async fn handle_station(action: StationAction, bus: &dyn Bus, keyspace: &Keyspace) -> Result<()> {
    match action {
        StationAction::Import { path } => {
            let config = import(bus, keyspace, &path).await?;
            println!(
                "Imported {} records into {} (station {})",
                config.records().len(),
                keyspace.station_key(),
                config.station_id()?
            );
            Ok(())
        },
        StationAction::Show => {
            for line in show(bus, keyspace).await? {
                println!("{line}");
            }
            Ok(())
        },
    }
}

async fn import(bus: &dyn Bus, keyspace: &Keyspace, path: &Path) -> Result<StationConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config = StationConfig::parse_properties(&text)?;
    station::store(bus, keyspace, &config).await?;
    Ok(config)
}

async fn show(bus: &dyn Bus, keyspace: &Keyspace) -> Result<Vec<String>> {
    let config = station::load(bus, keyspace).await?;
    Ok(config
        .records()
        .iter()
        .map(|r| format!("{}={}", r.name, r.value))
        .collect())
}

#[cfg(test)]
mod tests {
    use {super::*, hubline_bus::MemoryBus};

    #[tokio::test]
    async fn import_then_show() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.properties");
        std::fs::write(&path, "# kitchen box\nSTATIONID=kitchen\n\nLOCALE=en_US\n").unwrap();

        let bus = MemoryBus::new();
        let keys = Keyspace::default();
        let config = import(&bus, &keys, &path).await.unwrap();
        assert_eq!(config.station_id().unwrap(), "kitchen");

        assert_eq!(show(&bus, &keys).await.unwrap(), vec![
            "STATIONID=kitchen".to_string(),
            "LOCALE=en_US".to_string(),
        ]);
    }

    #[tokio::test]
    async fn import_without_station_id_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("station.properties");
        std::fs::write(&path, "LOCALE=en_US\n").unwrap();

        let bus = MemoryBus::new();
        let keys = Keyspace::default();
        assert!(import(&bus, &keys, &path).await.is_err());
        assert!(bus.get(&keys.station_key()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn show_before_import_fails() {
        assert!(show(&MemoryBus::new(), &Keyspace::default()).await.is_err());
    }
}
