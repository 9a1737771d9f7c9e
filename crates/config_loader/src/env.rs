//! Environment overrides and default file locations

use std::path::{Path, PathBuf};
use std::str::FromStr;

use contracts::{ContractError, ServiceConfig};

/// Searched in order when no explicit path is given
pub const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/adsb-ingest/config.toml",
    "./config/config.toml",
    "./config.toml",
];

pub const ENV_FEED_HOST: &str = "DUMP1090_HOST";
pub const ENV_FEED_PORT: &str = "DUMP1090_PORT";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_POOL_SIZE: &str = "DB_POOL_SIZE";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// First existing default config file, if any
pub fn find_default_config() -> Option<PathBuf> {
    find_in(DEFAULT_CONFIG_PATHS.iter().map(Path::new))
}

fn find_in<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> Option<PathBuf> {
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .map(Path::to_path_buf)
}

/// Apply overrides from the process environment
pub fn apply_env_overrides(config: &mut ServiceConfig) -> Result<(), ContractError> {
    apply_overrides_with(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary key lookup
///
/// Empty values are ignored. A value that does not parse as the target
/// type is a validation error naming the variable.
pub fn apply_overrides_with<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ContractError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(host) = get(ENV_FEED_HOST) {
        config.feed.host = host.trim().to_string();
    }
    if let Some(port) = get(ENV_FEED_PORT) {
        config.feed.port = parse_var(ENV_FEED_PORT, &port)?;
    }
    if let Some(url) = get(ENV_DATABASE_URL) {
        config.database.url = url;
    }
    if let Some(size) = get(ENV_POOL_SIZE) {
        config.database.pool_size = parse_var(ENV_POOL_SIZE, &size)?;
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        config.logging.level = level.trim().to_lowercase();
    }

    Ok(())
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ContractError> {
    raw.trim().parse().map_err(|_| {
        ContractError::config_validation(format!("env:{key}"), format!("cannot parse '{raw}'"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = ServiceConfig::default();
        apply_overrides_with(
            &mut config,
            lookup(&[
                ("DUMP1090_HOST", "piaware.lan"),
                ("DUMP1090_PORT", "30103"),
                ("DATABASE_URL", "sqlite:///var/lib/adsb.db"),
                ("DB_POOL_SIZE", "8"),
                ("LOG_LEVEL", "DEBUG"),
            ]),
        )
        .unwrap();

        assert_eq!(config.feed.endpoint(), "piaware.lan:30103");
        assert_eq!(config.database.url, "sqlite:///var/lib/adsb.db");
        assert_eq!(config.database.pool_size, 8);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = ServiceConfig::default();
        config.feed.host = "from-file".into();
        apply_overrides_with(&mut config, lookup(&[("DUMP1090_HOST", "")])).unwrap();
        assert_eq!(config.feed.host, "from-file");
    }

    #[test]
    fn test_bad_numeric_override() {
        let mut config = ServiceConfig::default();
        let err = apply_overrides_with(&mut config, lookup(&[("DUMP1090_PORT", "thirty")]))
            .unwrap_err();
        match err {
            ContractError::ConfigValidation { field, .. } => assert_eq!(field, "env:DUMP1090_PORT"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_find_in_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let second = dir.path().join("b.toml");
        std::fs::write(&second, "").unwrap();
        let first = dir.path().join("a.toml");

        let found = find_in([first.as_path(), second.as_path()]);
        assert_eq!(found, Some(second));
    }
}
