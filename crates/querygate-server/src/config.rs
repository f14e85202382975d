use querygate_core::GatewayConfig;
use std::path::{Path, PathBuf};

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "querygate.toml";

pub fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
    }
    let cfg = GatewayConfig::load(path)?;
    Ok(cfg)
}

/// Resolve the config path: explicit flag, then `QUERYGATE_CONFIG`, then the default.
pub fn config_path(flag: Option<PathBuf>) -> PathBuf {
    if let Some(p) = flag {
        return p;
    }
    if let Ok(p) = std::env::var("QUERYGATE_CONFIG") {
        return PathBuf::from(p);
    }
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_flag_wins() {
        assert_eq!(
            config_path(Some(PathBuf::from("/etc/querygate.toml"))),
            PathBuf::from("/etc/querygate.toml")
        );
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = load_config(Path::new("/nonexistent/querygate.toml")).unwrap();
        assert_eq!(cfg.auth.users_table, "users");
    }
}
