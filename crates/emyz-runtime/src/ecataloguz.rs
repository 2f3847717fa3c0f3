//! Ecataloguz: rendezvous for peers with changing addresses
//!
//! Peers beacon their publish port to the catalog over an authenticated
//! pull channel; the sender key comes from the authorization handshake
//! and the host from the connection. The catalog republishes
//! `[key, connpoint]` for every active record on its directory channel,
//! where subscribers filter by the keys they follow.
//!
//! Records are never deleted by the catalog itself: a record that has
//! been silent longer than the deactivate interval only loses its
//! connpoint.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use emyz_core::{
    duration_micros, ChannelRole, Clock, EmyzResult, MicroTime, PeerKey, Status, SystemClock,
};
use emyz_crypto::{read_keys_with_comments_file, Authorizer, KeyPair};
use emyz_transport::{AuthInbox, Connpoint, Context, PublishSocket, PullSocket, ServerSecurity};
use emyz_wire::{Beacon, DirectoryEntry};

use crate::{CatalogConfig, CatalogStats};

/// What the catalog knows about one peer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BeaconRecord {
    pub key: PeerKey,
    /// `None` until the first beacon, and again after deactivation
    pub connpoint: Option<String>,
    pub last_beacon: Option<MicroTime>,
    pub comment: String,
}

/// Lifecycle of a [`BeaconRecord`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordState {
    /// Seeded from the whitelist, never beaconed
    Unknown,
    Active,
    /// Silent for longer than the deactivate interval
    Stale,
}

impl BeaconRecord {
    fn seeded(key: PeerKey, comment: impl Into<String>) -> Self {
        BeaconRecord {
            key,
            connpoint: None,
            last_beacon: None,
            comment: comment.into(),
        }
    }

    pub fn state(&self) -> RecordState {
        match (&self.connpoint, self.last_beacon) {
            (Some(_), _) => RecordState::Active,
            (None, None) => RecordState::Unknown,
            (None, Some(_)) => RecordState::Stale,
        }
    }
}

/// Counts shown at the head of a catalog listing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    /// Keys allowed to beacon (0 = anyone may)
    pub beacon_whitelisted: usize,
    /// Records that have beaconed at least once
    pub active_once: usize,
    pub active_now: usize,
    /// Keys allowed to read the directory (0 = anyone may)
    pub pubsub_whitelisted: usize,
}

impl fmt::Display for CatalogSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "beacon whitelist {}, active once {}, active now {}, pubsub whitelist {}",
            self.beacon_whitelisted, self.active_once, self.active_now, self.pubsub_whitelisted
        )
    }
}

/// Catalog of peer connpoints
pub struct Ecataloguz {
    pull: Box<dyn PullSocket>,
    publish: Box<dyn PublishSocket>,
    auth_inbox: Box<dyn AuthInbox>,
    auth: Authorizer,
    records: BTreeMap<PeerKey, BeaconRecord>,
    keys: KeyPair,
    config: CatalogConfig,
    clock: Arc<dyn Clock>,
    last_publish: Option<MicroTime>,
    stats: CatalogStats,
}

impl Ecataloguz {
    /// Create with the wall clock
    pub fn new(context: Arc<dyn Context>, secret_key: &str, config: CatalogConfig) -> EmyzResult<Self> {
        Self::with_clock(context, secret_key, config, Arc::new(SystemClock))
    }

    /// Create with a custom clock; binds the beacon and directory channels
    pub fn with_clock(
        context: Arc<dyn Context>,
        secret_key: &str,
        config: CatalogConfig,
        clock: Arc<dyn Clock>,
    ) -> EmyzResult<Self> {
        let keys = KeyPair::from_secret(secret_key)?;

        let mut auth = Authorizer::new();
        let mut records = BTreeMap::new();
        {
            let beacon_whitelist = auth.declare(ChannelRole::Beacon);
            for seed in &config.beacon_whitelist {
                let key = PeerKey::new(&seed.key);
                beacon_whitelist.insert(key.as_str());
                records
                    .entry(key.clone())
                    .or_insert_with(|| BeaconRecord::seeded(key, seed.comment.as_str()));
            }
        }
        auth.declare(ChannelRole::Pubsub)
            .extend(&config.pubsub_whitelist);

        let auth_inbox = context.bind_auth_inbox()?;

        let mut pull = context.pull_socket(ServerSecurity {
            keys: keys.clone(),
            role: ChannelRole::Beacon,
        });
        pull.bind(&Connpoint::any(config.beacon_port).to_string())?;

        let mut publish = context.publish_socket(ServerSecurity {
            keys: keys.clone(),
            role: ChannelRole::Pubsub,
        });
        publish.bind(&Connpoint::any(config.pubsub_port).to_string())?;

        info!(
            "Ecataloguz {} on {}: beacons on port {}, directory on port {}",
            keys.public_key().short(),
            context.host(),
            config.beacon_port,
            config.pubsub_port
        );

        Ok(Ecataloguz {
            pull,
            publish,
            auth_inbox,
            auth,
            records,
            keys,
            config,
            clock,
            last_publish: None,
            stats: CatalogStats::default(),
        })
    }

    pub fn public_key(&self) -> &PeerKey {
        self.keys.public_key()
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn stats(&self) -> &CatalogStats {
        &self.stats
    }

    /// Whether `key` may connect to a channel of `role`
    pub fn authorize(&self, key: &PeerKey, role: ChannelRole) -> bool {
        self.auth.authorize(key, role)
    }

    /// Add keys (with comments) allowed to beacon; each seeds a record.
    /// Returns how many lines were read.
    pub fn load_beacon_whitelist_file(&mut self, path: impl AsRef<Path>) -> EmyzResult<usize> {
        let lines = read_keys_with_comments_file(path)?;
        let count = lines.len();
        let whitelist = self.auth.declare(ChannelRole::Beacon);
        for line in lines {
            whitelist.insert(line.key.as_str());
            self.records
                .entry(line.key.clone())
                .or_insert_with(|| BeaconRecord::seeded(line.key, line.comment));
        }
        Ok(count)
    }

    /// Add keys allowed to read the directory
    pub fn load_pubsub_whitelist_file(&mut self, path: impl AsRef<Path>) -> EmyzResult<usize> {
        self.auth.declare(ChannelRole::Pubsub).load_file(path)
    }

    pub fn records(&self) -> impl Iterator<Item = &BeaconRecord> {
        self.records.values()
    }

    pub fn record(&self, key: &str) -> Option<&BeaconRecord> {
        self.records.get(&PeerKey::new(key))
    }

    /// Forget a record; a new beacon from the key recreates it
    pub fn remove_record(&mut self, key: &str) -> Status {
        match self.records.remove(&PeerKey::new(key)) {
            Some(_) => Status::Ok,
            None => Status::AlreadyAbsent,
        }
    }

    pub fn summary(&self) -> CatalogSummary {
        let count = |role| self.auth.whitelist(role).map_or(0, |w| w.len());
        CatalogSummary {
            beacon_whitelisted: count(ChannelRole::Beacon),
            active_once: self
                .records
                .values()
                .filter(|r| r.last_beacon.is_some())
                .count(),
            active_now: self
                .records
                .values()
                .filter(|r| r.state() == RecordState::Active)
                .count(),
            pubsub_whitelisted: count(ChannelRole::Pubsub),
        }
    }

    /// One non-blocking pass: authorization, beacons, deactivation,
    /// directory publication
    pub fn update(&mut self) {
        self.stats.updates += 1;

        self.answer_auth_requests();

        let now = self.clock.now();
        self.drain_beacons(now);
        self.deactivate(now);

        let publish_due = self.last_publish.map_or(true, |last| {
            now.micros_since(last) > duration_micros(self.config.publish_interval)
        });
        if publish_due {
            self.publish_directory();
            self.last_publish = Some(now);
        }
    }

    /// Run `update()` until `stop` is set, idling between passes
    pub fn run(&mut self, stop: &AtomicBool) {
        info!("Ecataloguz {} running", self.keys.public_key().short());
        while !stop.load(Ordering::Relaxed) {
            self.update();
            std::thread::sleep(self.config.idle_interval);
        }
        info!("Ecataloguz {} stopped: {}", self.keys.public_key().short(), self.summary());
    }

    fn answer_auth_requests(&mut self) {
        while let Some(request) = self.auth_inbox.try_recv() {
            let Some(outcome) = self.auth.answer(&request) else {
                warn!("Refusing authorization request without a header");
                self.auth_inbox.abandon();
                self.stats.auth_denied += 1;
                continue;
            };
            match self.auth_inbox.reply(outcome.reply) {
                Ok(()) if outcome.allowed => self.stats.auth_allowed += 1,
                Ok(()) => self.stats.auth_denied += 1,
                Err(e) => {
                    warn!("Authorization reply failed, refusing: {}", e);
                    self.auth_inbox.abandon();
                    self.stats.auth_denied += 1;
                }
            }
        }
    }

    fn drain_beacons(&mut self, now: MicroTime) {
        while let Some(received) = self.pull.try_recv() {
            let beacon = match Beacon::decode(&received.parts) {
                Ok(beacon) => beacon,
                Err(e) => {
                    trace!("Dropping beacon: {}", e);
                    self.stats.malformed_dropped += 1;
                    continue;
                }
            };
            let (Some(key), Some(ip)) = (
                PeerKey::from_wire(received.props.user_id.as_bytes()),
                received.props.peer_address,
            ) else {
                trace!("Dropping beacon without sender metadata");
                self.stats.malformed_dropped += 1;
                continue;
            };

            let connpoint = Connpoint::new(ip, beacon.port).to_string();
            let record = self
                .records
                .entry(key.clone())
                .or_insert_with(|| BeaconRecord::seeded(key, ""));
            if record.connpoint.as_deref() != Some(connpoint.as_str()) {
                debug!("Peer {} at {}", record.key.short(), connpoint);
            }
            record.connpoint = Some(connpoint);
            record.last_beacon = Some(now);
            self.stats.beacons_received += 1;
        }
    }

    fn deactivate(&mut self, now: MicroTime) {
        if self.config.deactivate_interval.is_zero() {
            return;
        }
        let limit = duration_micros(self.config.deactivate_interval);
        for record in self.records.values_mut() {
            let silent = record
                .last_beacon
                .map_or(true, |last| now.micros_since(last) > limit);
            if silent && record.connpoint.take().is_some() {
                debug!("Peer {} deactivated", record.key.short());
                self.stats.records_deactivated += 1;
            }
        }
    }

    fn publish_directory(&mut self) {
        self.stats.publish_rounds += 1;
        for record in self.records.values() {
            let Some(connpoint) = &record.connpoint else {
                continue;
            };
            let entry = DirectoryEntry::new(record.key.clone(), connpoint.as_str());
            match entry.encode().and_then(|msg| self.publish.send(&msg)) {
                Ok(()) => self.stats.directory_entries_published += 1,
                Err(e) => warn!("Directory entry for {} not published: {}", record.key.short(), e),
            }
        }
    }
}

impl fmt::Debug for Ecataloguz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ecataloguz")
            .field("public_key", self.keys.public_key())
            .field("records", &self.records.len())
            .field("summary", &self.summary())
            .finish()
    }
}
