//! Configuration of publishers and catalogs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use emyz_core::{
    DEF_ECATAL_BEACON_PORT, DEF_ECATAL_DEACTIVATE_INTERVAL, DEF_ECATAL_IDLE_INTERVAL,
    DEF_ECATAL_PUBLISH_INTERVAL, DEF_ECATAL_PUBSUB_PORT, DEF_EFUNGI_BEACON_INTERVAL,
    DEF_EFUNGI_ECATAL_FORGET_INTERVAL, DEF_EFUNGI_PUBSUB_PORT,
};

/// Efunguz configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EfunguzConfig {
    /// Port of the publish channel; also the port announced in beacons
    pub pubsub_port: u16,
    /// Interval between beacons to catalogs
    pub beacon_interval: Duration,
    /// Age after which a catalog vote no longer counts (`None` = never)
    pub forget_interval: Option<Duration>,
    /// Initially authorized subscriber keys (empty = everyone)
    pub whitelist_keys: Vec<String>,
}

impl Default for EfunguzConfig {
    fn default() -> Self {
        EfunguzConfig {
            pubsub_port: DEF_EFUNGI_PUBSUB_PORT,
            beacon_interval: DEF_EFUNGI_BEACON_INTERVAL,
            forget_interval: Some(DEF_EFUNGI_ECATAL_FORGET_INTERVAL),
            whitelist_keys: Vec::new(),
        }
    }
}

/// Beacon whitelist entry of a catalog
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedKey {
    pub key: String,
    #[serde(default)]
    pub comment: String,
}

impl SeedKey {
    pub fn new(key: impl Into<String>, comment: impl Into<String>) -> Self {
        SeedKey {
            key: key.into(),
            comment: comment.into(),
        }
    }
}

/// Ecataloguz configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub beacon_port: u16,
    pub pubsub_port: u16,
    /// Silence after which a record loses its address (zero = never)
    pub deactivate_interval: Duration,
    /// Interval between directory publications
    pub publish_interval: Duration,
    /// Sleep between passes of [`crate::Ecataloguz::run`]
    pub idle_interval: Duration,
    /// Keys allowed to beacon (empty = everyone); each seeds a record
    pub beacon_whitelist: Vec<SeedKey>,
    /// Keys allowed to read the directory (empty = everyone)
    pub pubsub_whitelist: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            beacon_port: DEF_ECATAL_BEACON_PORT,
            pubsub_port: DEF_ECATAL_PUBSUB_PORT,
            deactivate_interval: DEF_ECATAL_DEACTIVATE_INTERVAL,
            publish_interval: DEF_ECATAL_PUBLISH_INTERVAL,
            idle_interval: DEF_ECATAL_IDLE_INTERVAL,
            beacon_whitelist: Vec::new(),
            pubsub_whitelist: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let efunguz = EfunguzConfig::default();
        assert_eq!(efunguz.pubsub_port, 60847);
        assert_eq!(efunguz.beacon_interval, Duration::from_secs(2));
        assert_eq!(efunguz.forget_interval, Some(Duration::from_secs(60)));

        let catalog = CatalogConfig::default();
        assert_eq!(catalog.beacon_port, 51947);
        assert_eq!(catalog.pubsub_port, 53791);
        assert_eq!(catalog.deactivate_interval, Duration::from_secs(60));
        assert_eq!(catalog.publish_interval, Duration::from_secs(1));
        assert_eq!(catalog.idle_interval, Duration::from_millis(10));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EfunguzConfig = serde_json::from_str(r#"{"pubsub_port": 1234}"#).unwrap();
        assert_eq!(config.pubsub_port, 1234);
        assert_eq!(config.beacon_interval, DEF_EFUNGI_BEACON_INTERVAL);

        let config: CatalogConfig = serde_json::from_str(
            r#"{"beacon_whitelist": [{"key": "abc", "comment": "farm"}, {"key": "def"}]}"#,
        )
        .unwrap();
        assert_eq!(config.beacon_whitelist[0], SeedKey::new("abc", "farm"));
        assert_eq!(config.beacon_whitelist[1].comment, "");
        assert_eq!(config.pubsub_port, DEF_ECATAL_PUBSUB_PORT);
    }

    #[test]
    fn test_roundtrip_json() {
        let config = CatalogConfig {
            deactivate_interval: Duration::ZERO,
            pubsub_whitelist: vec!["k".into()],
            ..CatalogConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<CatalogConfig>(&json).unwrap(), config);
    }
}
