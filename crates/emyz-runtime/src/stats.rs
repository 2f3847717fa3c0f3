//! Runtime counters

use serde::Serialize;

/// Efunguz counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EfunguzStats {
    pub updates: u64,
    pub auth_allowed: u64,
    pub auth_denied: u64,
    pub beacons_sent: u64,
    pub etales_emitted: u64,
    pub directory_entries_applied: u64,
    pub malformed_dropped: u64,
}

/// Ehypha counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EhyphaStats {
    pub etales_received: u64,
    /// Messages for paused or unknown topics
    pub etales_skipped: u64,
    pub malformed_dropped: u64,
    pub reconnects: u64,
}

/// Ecataloguz counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub updates: u64,
    pub auth_allowed: u64,
    pub auth_denied: u64,
    pub beacons_received: u64,
    pub malformed_dropped: u64,
    pub records_deactivated: u64,
    pub publish_rounds: u64,
    pub directory_entries_published: u64,
}
