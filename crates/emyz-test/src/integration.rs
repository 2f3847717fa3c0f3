//! End-to-end scenarios
//!
//! Each scenario builds a small overlay, drives it with `update()` and
//! the manual clock, and records every check that did not hold.

use std::time::Duration;

use bytes::Bytes;

use emyz_core::{ChannelRole, EmyzResult, PeerKey, Status};
use emyz_crypto::KeyPair;
use emyz_runtime::{CatalogConfig, EfunguzConfig, RecordState, SeedKey};
use emyz_transport::LinkState;

use crate::overlay::{pump, random_payload, Overlay, TestCatalog, TestPeer};

const TOPIC: &str = "life";

/// Outcome of one scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    pub name: &'static str,
    pub checks: usize,
    pub failures: Vec<String>,
}

impl ScenarioResult {
    pub fn new(name: &'static str) -> Self {
        ScenarioResult {
            name,
            checks: 0,
            failures: Vec::new(),
        }
    }

    /// Record a check
    pub fn check(&mut self, holds: bool, what: impl Into<String>) {
        self.checks += 1;
        if !holds {
            self.failures.push(what.into());
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

// ============================================================================
// SETUPS
// ============================================================================

/// Alice beacons to a catalog; Bob reads its directory and follows Alice
/// on topic `life` without knowing her address.
struct Discovery {
    overlay: Overlay,
    catalog: TestCatalog,
    alice: TestPeer,
    bob: TestPeer,
}

impl Discovery {
    fn new(catalog_config: CatalogConfig) -> EmyzResult<Self> {
        let overlay = Overlay::new();
        let alice = overlay.peer(1, EfunguzConfig::default())?;
        let bob = overlay.peer(2, EfunguzConfig::default())?;
        let catalog = overlay.catalog(100, catalog_config)?;
        Self::wire(overlay, catalog, alice, bob)
    }

    fn wire(
        overlay: Overlay,
        catalog: TestCatalog,
        mut alice: TestPeer,
        mut bob: TestPeer,
    ) -> EmyzResult<Self> {
        let _ = alice
            .efunguz
            .add_catalog_target(catalog.key(), &catalog.beacon_connpoint())?;
        let _ = bob
            .efunguz
            .add_catalog_source(catalog.key(), &catalog.directory_connpoint())?;
        let (ehypha, _) = bob.efunguz.add_ehypha(alice.key(), "", None)?;
        let _ = ehypha.add_topic(TOPIC)?;

        let mut discovery = Discovery {
            overlay,
            catalog,
            alice,
            bob,
        };
        // beacon + directory, address vote and reconnect, authorization
        discovery.pump(3);
        Ok(discovery)
    }

    fn pump(&mut self, passes: usize) {
        pump(
            &mut [&mut self.alice, &mut self.bob],
            &mut [&mut self.catalog],
            passes,
        );
    }

    fn bob_sees_alice_at(&self) -> Option<String> {
        self.bob
            .efunguz
            .ehypha(self.alice.key())
            .and_then(|e| e.address())
            .map(str::to_owned)
    }
}

/// Bob and Carol follow Alice at her known address; optionally Alice
/// only lets Carol in
fn direct_followers(
    whitelist_carol: bool,
) -> EmyzResult<(Overlay, TestPeer, TestPeer, TestPeer)> {
    let overlay = Overlay::new();
    let carol_keys = KeyPair::generate();
    let alice_config = EfunguzConfig {
        whitelist_keys: if whitelist_carol {
            vec![carol_keys.public_key().as_str().to_owned()]
        } else {
            Vec::new()
        },
        ..EfunguzConfig::default()
    };
    let mut alice = overlay.peer(1, alice_config)?;
    let mut bob = overlay.peer(2, EfunguzConfig::default())?;
    let mut carol = overlay.peer_with_keys(3, carol_keys, EfunguzConfig::default())?;

    for follower in [&mut bob, &mut carol] {
        let (ehypha, _) = follower
            .efunguz
            .add_ehypha(alice.key(), &alice.connpoint(), None)?;
        let _ = ehypha.add_topic(TOPIC)?;
    }
    pump(&mut [&mut alice, &mut bob, &mut carol], &mut [], 2);
    Ok((overlay, alice, bob, carol))
}

// ============================================================================
// SCENARIOS
// ============================================================================

/// A peer found only through a catalog receives etales with their
/// publication time
pub fn scenario_discovery_and_delivery() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("discovery_and_delivery");
    let mut d = Discovery::new(CatalogConfig::default())?;

    let record = d.catalog.catalog.record(d.alice.key()).cloned();
    result.check(
        record.as_ref().and_then(|r| r.connpoint.clone()) == Some(d.alice.connpoint()),
        "catalog knows the beacon source address",
    );
    result.check(
        d.bob_sees_alice_at() == Some(d.alice.connpoint()),
        "directory vote resolved the address",
    );
    let link = d.bob.efunguz.ehypha(d.alice.key()).and_then(|e| e.link_state());
    result.check(link == Some(LinkState::Ready), format!("link is ready, got {:?}", link));

    let payload = random_payload(64 * 48);
    d.alice
        .efunguz
        .emit(TOPIC, vec![Bytes::from_static(b"64x48"), payload.clone()])?;
    let published_at = d.overlay.now();
    d.overlay.advance(Duration::from_millis(3));
    d.bob.efunguz.update();

    match d.bob.efunguz.ehypha(d.alice.key()).and_then(|e| e.get(TOPIC)) {
        Some(etale) => {
            result.check(
                etale.parts() == [Bytes::from_static(b"64x48"), payload],
                "etale parts arrive together",
            );
            result.check(etale.publish_time() == Some(published_at), "publish time kept");
            result.check(etale.receive_time() == Some(d.overlay.now()), "receive time stamped");
        }
        None => result.check(false, "topic present"),
    }
    result.check(
        d.bob.efunguz.stats().directory_entries_applied >= 1,
        "directory entry applied",
    );
    Ok(result)
}

/// Between polls only the latest message of a topic is visible, whole
pub fn scenario_last_value_wins() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("last_value_wins");
    let (_overlay, mut alice, mut bob, _carol) = direct_followers(false)?;

    let first = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
    let second = vec![
        Bytes::from_static(b"c"),
        Bytes::from_static(b""),
        Bytes::from_static(b"e"),
    ];
    alice.efunguz.emit(TOPIC, first)?;
    alice.efunguz.emit(TOPIC, second.clone())?;
    alice.efunguz.emit("other", vec![Bytes::from_static(b"x")])?;
    bob.efunguz.update();

    let ehypha = bob.efunguz.ehypha(alice.key());
    let parts = ehypha.and_then(|e| e.get(TOPIC)).map(|t| t.parts().to_vec());
    result.check(parts == Some(second), "latest parts replace the earlier ones");
    result.check(
        ehypha.map_or(false, |e| e.get("other").is_none()),
        "unsubscribed topic not cached",
    );
    Ok(result)
}

/// A paused topic keeps its old value; resuming picks up new ones
pub fn scenario_pause_resume() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("pause_resume");
    let (_overlay, mut alice, mut bob, _carol) = direct_followers(false)?;
    let alice_key = alice.key().to_owned();

    alice.efunguz.emit(TOPIC, vec![Bytes::from_static(b"1")])?;
    bob.efunguz.update();

    let status = bob.efunguz.ehypha_mut(&alice_key).map(|e| e.pause_topic(TOPIC));
    result.check(status == Some(Status::Ok), "pause");
    let status = bob.efunguz.ehypha_mut(&alice_key).map(|e| e.pause_topic(TOPIC));
    result.check(status == Some(Status::AlreadyPaused), "pause twice");
    let status = bob.efunguz.ehypha_mut(&alice_key).map(|e| e.pause_topic("nothing"));
    result.check(status == Some(Status::Absent), "pause unknown topic");

    alice.efunguz.emit(TOPIC, vec![Bytes::from_static(b"2")])?;
    bob.efunguz.update();
    let seen = |bob: &TestPeer| {
        bob.efunguz
            .ehypha(&alice_key)
            .and_then(|e| e.get(TOPIC))
            .map(|t| t.parts().to_vec())
    };
    result.check(seen(&bob) == Some(vec![Bytes::from_static(b"1")]), "paused topic unchanged");

    let status = bob.efunguz.ehypha_mut(&alice_key).map(|e| e.resume_topic(TOPIC));
    result.check(status == Some(Status::Ok), "resume");
    alice.efunguz.emit(TOPIC, vec![Bytes::from_static(b"3")])?;
    bob.efunguz.update();
    result.check(seen(&bob) == Some(vec![Bytes::from_static(b"3")]), "resumed topic updated");
    Ok(result)
}

/// Only whitelisted subscribers get a usable channel; whitelist changes
/// do not touch established links
pub fn scenario_whitelist_enforcement() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("whitelist_enforcement");
    let (_overlay, mut alice, mut bob, mut carol) = direct_followers(true)?;

    let state = |peer: &TestPeer, key: &str| peer.efunguz.ehypha(key).and_then(|e| e.link_state());
    result.check(state(&bob, alice.key()) == Some(LinkState::Denied), "bob denied");
    result.check(state(&carol, alice.key()) == Some(LinkState::Ready), "carol allowed");
    result.check(alice.efunguz.stats().auth_denied == 1, "one denial");
    result.check(alice.efunguz.stats().auth_allowed == 1, "one allowance");

    alice.efunguz.emit(TOPIC, vec![Bytes::from_static(b"secret")])?;
    pump(&mut [&mut bob, &mut carol], &mut [], 1);
    let has_data = |peer: &TestPeer, key: &str| {
        peer.efunguz
            .ehypha(key)
            .and_then(|e| e.get(TOPIC))
            .map_or(false, |t| t.has_data())
    };
    result.check(!has_data(&bob, alice.key()), "bob got nothing");
    result.check(has_data(&carol, alice.key()), "carol got the etale");

    alice.efunguz.add_whitelist_keys([bob.key()]);
    pump(&mut [&mut alice, &mut bob], &mut [], 2);
    result.check(
        state(&bob, alice.key()) == Some(LinkState::Denied),
        "whitelisting is not retroactive",
    );
    Ok(result)
}

/// Beacon and directory whitelists are checked per channel role
pub fn scenario_role_separation() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("role_separation");
    let overlay = Overlay::new();
    let mut alice = overlay.peer(1, EfunguzConfig::default())?;
    let mut bob = overlay.peer(2, EfunguzConfig::default())?;
    let mut catalog = overlay.catalog(
        100,
        CatalogConfig {
            beacon_whitelist: vec![SeedKey::new(alice.key(), "")],
            pubsub_whitelist: vec![bob.key().to_owned()],
            ..CatalogConfig::default()
        },
    )?;

    for peer in [&mut alice, &mut bob] {
        let _ = peer
            .efunguz
            .add_catalog_target(catalog.key(), &catalog.beacon_connpoint())?;
        let _ = peer
            .efunguz
            .add_catalog_source(catalog.key(), &catalog.directory_connpoint())?;
    }
    pump(&mut [&mut alice, &mut bob], &mut [&mut catalog], 2);

    let stats = catalog.catalog.stats();
    result.check(stats.auth_allowed == 2, format!("allowed {}", stats.auth_allowed));
    result.check(stats.auth_denied == 2, format!("denied {}", stats.auth_denied));
    let state = |key: &str| catalog.catalog.record(key).map(|r| r.state());
    result.check(state(alice.key()) == Some(RecordState::Active), "alice beaconed");
    result.check(state(bob.key()).is_none(), "bob's beacons refused");

    let bob_key = PeerKey::new(bob.key());
    result.check(
        alice.efunguz.authorize(&bob_key, ChannelRole::Pubsub),
        "publish channel open",
    );
    result.check(
        !alice.efunguz.authorize(&bob_key, ChannelRole::Beacon),
        "a peer accepts no beacons",
    );
    Ok(result)
}

/// A silent peer goes stale exactly after the deactivate interval, keeps
/// its comment and leaves the directory
pub fn scenario_deactivation() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("deactivation");
    let overlay = Overlay::new();
    let alice = overlay.peer(1, EfunguzConfig::default())?;
    let bob = overlay.peer(2, EfunguzConfig::default())?;
    let catalog = overlay.catalog(
        100,
        CatalogConfig {
            deactivate_interval: Duration::from_secs(5),
            beacon_whitelist: vec![SeedKey::new(alice.key(), "glider farm")],
            ..CatalogConfig::default()
        },
    )?;
    result.check(
        catalog.catalog.record(alice.key()).map(|r| r.state()) == Some(RecordState::Unknown),
        "seeded record unknown",
    );
    let mut d = Discovery::wire(overlay, catalog, alice, bob)?;
    let alice_key = d.alice.key().to_owned();

    // Alice falls silent
    let _ = d.alice.efunguz.remove_catalog_target(d.catalog.key());

    d.overlay.advance(Duration::from_secs(5));
    d.catalog.catalog.update();
    result.check(
        d.catalog.catalog.record(&alice_key).map(|r| r.state()) == Some(RecordState::Active),
        "still active at the interval",
    );

    d.overlay.advance(Duration::from_micros(1));
    d.catalog.catalog.update();
    match d.catalog.catalog.record(&alice_key) {
        Some(record) => {
            result.check(record.state() == RecordState::Stale, "stale past the interval");
            result.check(record.connpoint.is_none(), "address withdrawn");
            result.check(record.comment == "glider farm", "comment preserved");
        }
        None => result.check(false, "record kept"),
    }
    let summary = d.catalog.catalog.summary();
    result.check(summary.active_once == 1 && summary.active_now == 0, "summary counts");

    d.bob.efunguz.update();
    let applied = d.bob.efunguz.stats().directory_entries_applied;
    d.overlay.advance(Duration::from_secs(2));
    d.catalog.catalog.update();
    d.bob.efunguz.update();
    result.check(
        d.bob.efunguz.stats().directory_entries_applied == applied,
        "stale record not published",
    );
    result.check(
        d.bob_sees_alice_at() == Some(d.alice.connpoint()),
        "follower keeps the last address",
    );
    Ok(result)
}

/// Majority across catalogs, ties to the smallest address, stale votes
/// ignored, and the last address kept when no vote is usable
pub fn scenario_address_voting() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("address_voting");
    let overlay = Overlay::new();
    let alice = overlay.peer(1, EfunguzConfig::default())?;
    let mut bob = overlay.peer(2, EfunguzConfig::default())?;
    let alice_key = alice.key().to_owned();
    let _ = bob
        .efunguz
        .add_ehypha(&alice_key, "", Some(Duration::from_secs(60)))?;

    let catalogs: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
    let vote = |bob: &mut TestPeer, catalog: usize, connpoint: &str| {
        let now = overlay.now();
        if let Some(ehypha) = bob.efunguz.ehypha_mut(&alice_key) {
            ehypha.update_address_via_catalog(catalogs[catalog].public_key().as_str(), connpoint, now);
        }
        bob.efunguz.update();
        bob.efunguz
            .ehypha(&alice_key)
            .and_then(|e| e.address())
            .map(str::to_owned)
    };

    let address = vote(&mut bob, 0, "tcp://10.0.0.9:60847");
    result.check(address.as_deref() == Some("tcp://10.0.0.9:60847"), "single vote");
    let address = vote(&mut bob, 1, "tcp://10.0.0.8:60847");
    result.check(address.as_deref() == Some("tcp://10.0.0.8:60847"), "tie goes to smallest");
    let address = vote(&mut bob, 2, "tcp://10.0.0.9:60847");
    result.check(address.as_deref() == Some("tcp://10.0.0.9:60847"), "majority wins");

    overlay.advance(Duration::from_secs(61));
    let address = vote(&mut bob, 1, "tcp://10.0.0.7:60847");
    result.check(address.as_deref() == Some("tcp://10.0.0.7:60847"), "fresh vote beats stale ones");

    overlay.advance(Duration::from_secs(61));
    bob.efunguz.update();
    let address = bob.efunguz.ehypha(&alice_key).and_then(|e| e.address());
    result.check(address == Some("tcp://10.0.0.7:60847"), "all stale keeps address");

    let reconnects = bob.efunguz.ehypha(&alice_key).map_or(0, |e| e.stats().reconnects);
    result.check(reconnects == 4, format!("reconnects {}", reconnects));
    Ok(result)
}

/// Repeated beacons are conflated while the catalog is not reading
pub fn scenario_beacon_conflation() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("beacon_conflation");
    let overlay = Overlay::new();
    let mut alice = overlay.peer(1, EfunguzConfig::default())?;
    let mut catalog = overlay.catalog(100, CatalogConfig::default())?;
    let _ = alice
        .efunguz
        .add_catalog_target(catalog.key(), &catalog.beacon_connpoint())?;
    pump(&mut [&mut alice], &mut [&mut catalog], 1);
    result.check(catalog.catalog.stats().beacons_received == 1, "first beacon");

    for _ in 0..5 {
        overlay.advance(alice.efunguz.config().beacon_interval);
        alice.efunguz.update();
    }
    catalog.catalog.update();
    result.check(alice.efunguz.stats().beacons_sent == 6, "six beacons sent");
    result.check(
        catalog.catalog.stats().beacons_received == 2,
        format!("received {}", catalog.catalog.stats().beacons_received),
    );
    Ok(result)
}

/// Republished identical addresses never reconnect; a moved peer is
/// followed to its new host
pub fn scenario_peer_moves() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("peer_moves");
    let mut d = Discovery::new(CatalogConfig::default())?;
    let alice_key = d.alice.key().to_owned();
    let reconnects = |d: &Discovery| {
        d.bob
            .efunguz
            .ehypha(&alice_key)
            .map_or(0, |e| e.stats().reconnects)
    };

    for _ in 0..5 {
        d.overlay.advance(Duration::from_millis(1100));
        d.pump(2);
    }
    result.check(d.bob.efunguz.stats().directory_entries_applied >= 5, "directory republished");
    result.check(reconnects(&d) == 1, "same address never reconnects");

    // Alice restarts on another host with the same identity
    let keys = d.alice.keys.clone();
    let catalog_key = d.catalog.key().to_owned();
    let beacon_connpoint = d.catalog.beacon_connpoint();
    d.alice = d.overlay.peer_with_keys(3, keys, EfunguzConfig::default())?;
    let _ = d
        .alice
        .efunguz
        .add_catalog_target(&catalog_key, &beacon_connpoint)?;

    d.overlay.advance(Duration::from_millis(1100));
    d.pump(3);
    result.check(d.bob_sees_alice_at().as_deref() == Some("tcp://10.0.0.3:60847"), "followed the move");
    result.check(reconnects(&d) == 2, "one reconnect for the move");

    d.alice.efunguz.emit(TOPIC, vec![Bytes::from_static(b"moved")])?;
    d.bob.efunguz.update();
    let parts = d
        .bob
        .efunguz
        .ehypha(&alice_key)
        .and_then(|e| e.get(TOPIC))
        .map(|t| t.parts().to_vec());
    result.check(parts == Some(vec![Bytes::from_static(b"moved")]), "data from the new host");
    Ok(result)
}

/// Dropping a catalog source withdraws its votes but keeps the address
pub fn scenario_source_removal() -> EmyzResult<ScenarioResult> {
    let mut result = ScenarioResult::new("source_removal");
    let mut d = Discovery::new(CatalogConfig::default())?;
    let alice_key = d.alice.key().to_owned();
    let catalog_key = d.catalog.key().to_owned();

    let votes = |d: &Discovery| d.bob.efunguz.ehypha(&alice_key).map_or(0, |e| e.votes().len());
    result.check(votes(&d) == 1, "one vote before removal");

    result.check(d.bob.efunguz.remove_catalog_source(&catalog_key) == Status::Ok, "removed");
    result.check(
        d.bob.efunguz.remove_catalog_source(&catalog_key) == Status::AlreadyAbsent,
        "removed twice",
    );
    result.check(votes(&d) == 0, "votes withdrawn");

    d.overlay.advance(Duration::from_secs(2));
    d.pump(2);
    result.check(votes(&d) == 0, "no new votes");
    result.check(d.bob_sees_alice_at() == Some(d.alice.connpoint()), "address kept");
    Ok(result)
}

/// Every scenario, in order
pub fn run_all() -> EmyzResult<Vec<ScenarioResult>> {
    Ok(vec![
        scenario_discovery_and_delivery()?,
        scenario_last_value_wins()?,
        scenario_pause_resume()?,
        scenario_whitelist_enforcement()?,
        scenario_role_separation()?,
        scenario_deactivation()?,
        scenario_address_voting()?,
        scenario_beacon_conflation()?,
        scenario_peer_moves()?,
        scenario_source_removal()?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_passed(result: ScenarioResult) {
        assert!(
            result.passed(),
            "{} failed {} of {} checks: {:?}",
            result.name,
            result.failures.len(),
            result.checks,
            result.failures
        );
    }

    #[test]
    fn test_scenario_result() {
        let mut result = ScenarioResult::new("sample");
        result.check(true, "holds");
        assert!(result.passed());
        result.check(false, "breaks");
        assert!(!result.passed());
        assert_eq!(result.checks, 2);
        assert_eq!(result.failures, vec!["breaks".to_owned()]);
    }

    #[test]
    fn test_discovery_and_delivery() {
        assert_passed(scenario_discovery_and_delivery().unwrap());
    }

    #[test]
    fn test_last_value_wins() {
        assert_passed(scenario_last_value_wins().unwrap());
    }

    #[test]
    fn test_pause_resume() {
        assert_passed(scenario_pause_resume().unwrap());
    }

    #[test]
    fn test_whitelist_enforcement() {
        assert_passed(scenario_whitelist_enforcement().unwrap());
    }

    #[test]
    fn test_role_separation() {
        assert_passed(scenario_role_separation().unwrap());
    }

    #[test]
    fn test_deactivation() {
        assert_passed(scenario_deactivation().unwrap());
    }

    #[test]
    fn test_address_voting() {
        assert_passed(scenario_address_voting().unwrap());
    }

    #[test]
    fn test_beacon_conflation() {
        assert_passed(scenario_beacon_conflation().unwrap());
    }

    #[test]
    fn test_peer_moves() {
        assert_passed(scenario_peer_moves().unwrap());
    }

    #[test]
    fn test_source_removal() {
        assert_passed(scenario_source_removal().unwrap());
    }

    #[test]
    fn test_run_all() {
        let results = run_all().unwrap();
        assert_eq!(results.len(), 10);
        assert!(results.iter().all(ScenarioResult::passed));
    }
}
