use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::HublineConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "hubline.toml",
    "hubline.yaml",
    "hubline.yml",
    "hubline.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<HublineConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./hubline.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/hubline/hubline.{toml,yaml,yml,json}` (user-global)
///
/// Returns `HublineConfig::default()` if no config file is found or the file
/// found cannot be parsed.
pub fn discover_and_load() -> HublineConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return HublineConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            HublineConfig::default()
        },
    }
}

/// Load `explicit` when given (errors are returned), otherwise discover.
pub fn load_or_discover(explicit: Option<&Path>) -> anyhow::Result<HublineConfig> {
    match explicit {
        Some(path) => load_config(path),
        None => Ok(discover_and_load()),
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    first_existing(local.chain(global))
}

fn first_existing(candidates: impl IntoIterator<Item = PathBuf>) -> Option<PathBuf> {
    candidates.into_iter().find(|p| p.exists())
}

/// Returns the user-global config directory, `~/.config/hubline/`.
pub fn config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().join(".config").join("hubline"))
}

/// Render the effective configuration as TOML.
pub fn to_toml(config: &HublineConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<HublineConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BusBackend, HubMode, OutboundAddress};

    #[test]
    fn loads_toml_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hubline.toml");
        std::fs::write(
            &path,
            r#"
[bus]
app = "demo"

[gateway]
port = 8080
hub = "relay"

[console]
outbound_address = "identity"
"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.bus.app, "demo");
        assert_eq!(cfg.bus.entity, "alixian");
        assert_eq!(cfg.bus.backend, BusBackend::Redis);
        assert_eq!(cfg.gateway.port, 8080);
        assert_eq!(cfg.gateway.hub, HubMode::Relay);
        assert_eq!(cfg.gateway.bind, "127.0.0.1");
        assert_eq!(cfg.console.outbound_address, OutboundAddress::Identity);
        assert_eq!(cfg.console.prompt, "> ");
    }

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("hubline.yaml");
        std::fs::write(&yaml, "bus:\n  backend: memory\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().bus.backend, BusBackend::Memory);

        let json = dir.path().join("hubline.json");
        std::fs::write(&json, r#"{"gateway":{"media":{"logo":"aGk="}}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.gateway.media.get("logo").map(String::as_str), Some("aGk="));
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hubline.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_or_discover(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn first_existing_respects_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        std::fs::write(&b, "").unwrap();
        assert_eq!(first_existing([a.clone(), b.clone()]), Some(b.clone()));
        std::fs::write(&a, "").unwrap();
        assert_eq!(first_existing([a.clone(), b]), Some(a));
    }

    #[test]
    fn defaults_render_as_toml() {
        let rendered = to_toml(&HublineConfig::default()).unwrap();
        let parsed: HublineConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, HublineConfig::default());
    }

    #[test]
    fn console_broadcasts_unless_configured_otherwise() {
        let cfg = parse_config("[console]\nprompt = \"$ \"\n", Path::new("hubline.toml")).unwrap();
        assert_eq!(cfg.console.prompt, "$ ");
        assert_eq!(cfg.console.outbound_address, OutboundAddress::Broadcast);
        assert_eq!(
            HublineConfig::default().console.outbound_address,
            OutboundAddress::Broadcast
        );
    }
}
