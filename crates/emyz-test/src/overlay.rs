//! Overlay of simulated peers and catalogs
//!
//! Every participant gets its own context on a virtual host `10.0.0.n`
//! of one [`MemoryNetwork`]; all of them read the same [`ManualClock`].

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rand::Rng;

use emyz_core::{Clock, EmyzResult, ManualClock, MicroTime};
use emyz_crypto::KeyPair;
use emyz_runtime::{CatalogConfig, Ecataloguz, Efunguz, EfunguzConfig};
use emyz_transport::{Connpoint, MemoryNetwork};

/// Start of the simulated timeline
pub const OVERLAY_EPOCH: MicroTime = MicroTime(1_644_700_000_000_000);

/// Address of virtual host `n`
pub fn host_ip(n: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(10, 0, 0, n))
}

/// Random payload of `len` bytes
pub fn random_payload(len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    rand::thread_rng().fill(&mut data[..]);
    Bytes::from(data)
}

/// A simulated peer
pub struct TestPeer {
    pub keys: KeyPair,
    pub host: IpAddr,
    pub efunguz: Efunguz,
}

impl TestPeer {
    /// Public key as used by other peers' handles
    pub fn key(&self) -> &str {
        self.keys.public_key().as_str()
    }

    /// Where other peers reach the publish channel
    pub fn connpoint(&self) -> String {
        Connpoint::new(self.host, self.efunguz.config().pubsub_port).to_string()
    }
}

/// A simulated catalog
pub struct TestCatalog {
    pub keys: KeyPair,
    pub host: IpAddr,
    pub catalog: Ecataloguz,
}

impl TestCatalog {
    pub fn key(&self) -> &str {
        self.keys.public_key().as_str()
    }

    /// Where peers send beacons
    pub fn beacon_connpoint(&self) -> String {
        Connpoint::new(self.host, self.catalog.config().beacon_port).to_string()
    }

    /// Where peers read the directory
    pub fn directory_connpoint(&self) -> String {
        Connpoint::new(self.host, self.catalog.config().pubsub_port).to_string()
    }
}

/// Network and clock shared by a scenario
pub struct Overlay {
    network: MemoryNetwork,
    clock: Arc<ManualClock>,
}

impl Overlay {
    pub fn new() -> Self {
        Overlay {
            network: MemoryNetwork::new(),
            clock: Arc::new(ManualClock::new(OVERLAY_EPOCH)),
        }
    }

    pub fn network(&self) -> &MemoryNetwork {
        &self.network
    }

    pub fn now(&self) -> MicroTime {
        self.clock.now()
    }

    pub fn advance(&self, duration: Duration) {
        self.clock.advance(duration);
    }

    /// New peer with fresh keys on host `n`
    pub fn peer(&self, n: u8, config: EfunguzConfig) -> EmyzResult<TestPeer> {
        self.peer_with_keys(n, KeyPair::generate(), config)
    }

    /// New peer with the given keys, e.g. a peer that moved to host `n`
    pub fn peer_with_keys(
        &self,
        n: u8,
        keys: KeyPair,
        config: EfunguzConfig,
    ) -> EmyzResult<TestPeer> {
        let host = host_ip(n);
        let efunguz = Efunguz::with_clock(
            Arc::new(self.network.context(host)),
            keys.secret_key(),
            config,
            self.clock.clone(),
        )?;
        Ok(TestPeer { keys, host, efunguz })
    }

    /// New catalog with fresh keys on host `n`
    pub fn catalog(&self, n: u8, config: CatalogConfig) -> EmyzResult<TestCatalog> {
        self.catalog_with_keys(n, KeyPair::generate(), config)
    }

    /// New catalog with the given keys, for configs that refer to them
    pub fn catalog_with_keys(
        &self,
        n: u8,
        keys: KeyPair,
        config: CatalogConfig,
    ) -> EmyzResult<TestCatalog> {
        let host = host_ip(n);
        let catalog = Ecataloguz::with_clock(
            Arc::new(self.network.context(host)),
            keys.secret_key(),
            config,
            self.clock.clone(),
        )?;
        Ok(TestCatalog { keys, host, catalog })
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `passes` rounds of `update()` over all peers, then all catalogs,
/// without moving the clock
pub fn pump(peers: &mut [&mut TestPeer], catalogs: &mut [&mut TestCatalog], passes: usize) {
    for _ in 0..passes {
        for peer in peers.iter_mut() {
            peer.efunguz.update();
        }
        for catalog in catalogs.iter_mut() {
            catalog.catalog.update();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_participants() {
        let overlay = Overlay::new();
        let peer = overlay.peer(1, EfunguzConfig::default()).unwrap();
        let catalog = overlay.catalog(100, CatalogConfig::default()).unwrap();

        assert_eq!(peer.connpoint(), "tcp://10.0.0.1:60847");
        assert_eq!(catalog.beacon_connpoint(), "tcp://10.0.0.100:51947");
        assert_eq!(catalog.directory_connpoint(), "tcp://10.0.0.100:53791");
        assert_eq!(peer.key().len(), 40);
        assert_eq!(overlay.now(), OVERLAY_EPOCH);
    }

    #[test]
    fn test_advance_moves_shared_clock() {
        let overlay = Overlay::new();
        overlay.advance(Duration::from_millis(1500));
        assert_eq!(overlay.now().micros_since(OVERLAY_EPOCH), 1_500_000);
    }

    #[test]
    fn test_random_payload_len() {
        assert_eq!(random_payload(0).len(), 0);
        assert_eq!(random_payload(3072).len(), 3072);
    }
}
