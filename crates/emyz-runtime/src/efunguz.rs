//! Efunguz: the publishing side of a peer
//!
//! An Efunguz owns the peer's key pair and every channel of the peer:
//! the authorization inbox, the publish channel, beacon channels to
//! catalogs, directory subscriptions from catalogs and the subscription
//! handles (ehyphae) of the peers it reads.
//!
//! `update()` runs one pass in a fixed order:
//! 1. answer pending authorization requests
//! 2. beacon to catalogs if the beacon interval has elapsed
//! 3. feed catalog directory entries to the matching ehyphae as votes
//! 4. poll every ehypha

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, trace, warn};

use emyz_core::{
    duration_micros, ChannelRole, Clock, EmyzResult, MicroTime, PeerKey, Status, SystemClock,
};
use emyz_crypto::{Authorizer, KeyPair, Whitelist};
use emyz_transport::{
    AuthInbox, ClientSecurity, Connpoint, Context, PublishSocket, PushSocket, ServerSecurity,
    SubscribeSocket,
};
use emyz_wire::{Beacon, DirectoryEntry, EtaleMessage};

use crate::{EfunguzConfig, EfunguzStats, Ehypha};

/// Publisher and owner of the subscriptions of one peer
pub struct Efunguz {
    // Field order is drop order: handles, catalog channels, publish, auth
    ehyphae: HashMap<PeerKey, Ehypha>,
    catalog_sources: HashMap<PeerKey, Box<dyn SubscribeSocket>>,
    catalog_targets: HashMap<PeerKey, Box<dyn PushSocket>>,
    publish: Box<dyn PublishSocket>,
    auth_inbox: Box<dyn AuthInbox>,
    auth: Authorizer,
    keys: KeyPair,
    config: EfunguzConfig,
    context: Arc<dyn Context>,
    clock: Arc<dyn Clock>,
    last_beacon: Option<MicroTime>,
    stats: EfunguzStats,
}

impl Efunguz {
    /// Create with the wall clock
    pub fn new(context: Arc<dyn Context>, secret_key: &str, config: EfunguzConfig) -> EmyzResult<Self> {
        Self::with_clock(context, secret_key, config, Arc::new(SystemClock))
    }

    /// Create with a custom clock; binds the publish channel
    pub fn with_clock(
        context: Arc<dyn Context>,
        secret_key: &str,
        config: EfunguzConfig,
        clock: Arc<dyn Clock>,
    ) -> EmyzResult<Self> {
        let keys = KeyPair::from_secret(secret_key)?;

        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub)
            .extend(&config.whitelist_keys);

        let auth_inbox = context.bind_auth_inbox()?;
        let mut publish = context.publish_socket(ServerSecurity {
            keys: keys.clone(),
            role: ChannelRole::Pubsub,
        });
        publish.bind(&Connpoint::any(config.pubsub_port).to_string())?;

        info!(
            "Efunguz {} publishing on {}:{}",
            keys.public_key().short(),
            context.host(),
            config.pubsub_port
        );

        Ok(Efunguz {
            ehyphae: HashMap::new(),
            catalog_sources: HashMap::new(),
            catalog_targets: HashMap::new(),
            publish,
            auth_inbox,
            auth,
            keys,
            config,
            context,
            clock,
            last_beacon: None,
            stats: EfunguzStats::default(),
        })
    }

    /// Own public key
    pub fn public_key(&self) -> &PeerKey {
        self.keys.public_key()
    }

    pub fn config(&self) -> &EfunguzConfig {
        &self.config
    }

    pub fn stats(&self) -> &EfunguzStats {
        &self.stats
    }

    // Whitelist

    fn whitelist_mut(&mut self) -> &mut Whitelist {
        self.auth.declare(ChannelRole::Pubsub)
    }

    /// Authorized subscriber keys (empty = everyone)
    pub fn whitelist(&self) -> Option<&Whitelist> {
        self.auth.whitelist(ChannelRole::Pubsub)
    }

    pub fn add_whitelist_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.whitelist_mut().extend(keys);
    }

    pub fn remove_whitelist_keys<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let whitelist = self.whitelist_mut();
        for key in keys {
            whitelist.remove(key.as_ref());
        }
    }

    pub fn clear_whitelist(&mut self) {
        self.whitelist_mut().clear();
    }

    /// Add the keys of a whitelist file; returns how many were read
    pub fn load_whitelist_file(&mut self, path: impl AsRef<Path>) -> EmyzResult<usize> {
        self.whitelist_mut().load_file(path)
    }

    /// Whether `key` may connect to a channel of `role`
    pub fn authorize(&self, key: &PeerKey, role: ChannelRole) -> bool {
        self.auth.authorize(key, role)
    }

    // Publishing

    /// Publish the current value of `topic`
    pub fn emit(&mut self, topic: &str, parts: Vec<Bytes>) -> EmyzResult<()> {
        let message = EtaleMessage::new(topic, self.clock.now(), parts);
        self.publish.send(&message.encode()?)?;
        self.stats.etales_emitted += 1;
        Ok(())
    }

    // Catalogs we beacon to

    /// Beacon periodically to the catalog `key` at `connpoint`
    pub fn add_catalog_target(&mut self, key: &str, connpoint: &str) -> EmyzResult<Status> {
        let key = PeerKey::new(key);
        if self.catalog_targets.contains_key(&key) {
            return Ok(Status::AlreadyPresent);
        }
        let mut socket = self.context.push_socket(ClientSecurity {
            keys: self.keys.clone(),
            server_key: key.clone(),
        })?;
        socket.connect(connpoint)?;
        debug!("Beaconing to catalog {} at {}", key.short(), connpoint);
        self.catalog_targets.insert(key, socket);
        Ok(Status::Ok)
    }

    pub fn remove_catalog_target(&mut self, key: &str) -> Status {
        match self.catalog_targets.remove(&PeerKey::new(key)) {
            Some(_) => Status::Ok,
            None => Status::AlreadyAbsent,
        }
    }

    pub fn catalog_targets(&self) -> impl Iterator<Item = &PeerKey> {
        self.catalog_targets.keys()
    }

    /// Send a beacon to every catalog target now
    pub fn emit_beacon(&mut self) {
        let beacon = Beacon::new(self.config.pubsub_port).encode();
        for (key, socket) in self.catalog_targets.iter_mut() {
            match socket.send(&beacon) {
                Ok(()) => self.stats.beacons_sent += 1,
                Err(e) => warn!("Beacon to catalog {} failed: {}", key.short(), e),
            }
        }
    }

    // Catalogs we read the directory from

    /// Read the directory of catalog `key` at `connpoint`
    pub fn add_catalog_source(&mut self, key: &str, connpoint: &str) -> EmyzResult<Status> {
        let key = PeerKey::new(key);
        if self.catalog_sources.contains_key(&key) {
            return Ok(Status::AlreadyPresent);
        }
        let mut socket = self.context.subscribe_socket(ClientSecurity {
            keys: self.keys.clone(),
            server_key: key.clone(),
        })?;
        for ehypha_key in self.ehyphae.keys() {
            socket.subscribe(ehypha_key.as_bytes());
        }
        socket.connect(connpoint)?;
        debug!("Reading directory of catalog {} at {}", key.short(), connpoint);
        self.catalog_sources.insert(key, socket);
        Ok(Status::Ok)
    }

    /// Stop reading catalog `key` and withdraw its votes
    pub fn remove_catalog_source(&mut self, key: &str) -> Status {
        let key = PeerKey::new(key);
        if self.catalog_sources.remove(&key).is_none() {
            return Status::AlreadyAbsent;
        }
        for ehypha in self.ehyphae.values_mut() {
            let _ = ehypha.remove_address_via_catalog(key.as_str());
        }
        Status::Ok
    }

    pub fn catalog_sources(&self) -> impl Iterator<Item = &PeerKey> {
        self.catalog_sources.keys()
    }

    // Ehyphae

    /// Subscribe to peer `key`.
    ///
    /// `connpoint` may be empty when the address is to come from catalogs.
    /// `forget_interval` of `None` uses the configured one. Returns the
    /// existing handle with [`Status::AlreadyPresent`] if there is one.
    pub fn add_ehypha(
        &mut self,
        key: &str,
        connpoint: &str,
        forget_interval: Option<Duration>,
    ) -> EmyzResult<(&mut Ehypha, Status)> {
        let key = PeerKey::new(key);
        match self.ehyphae.entry(key) {
            Entry::Occupied(entry) => Ok((entry.into_mut(), Status::AlreadyPresent)),
            Entry::Vacant(entry) => {
                let forget = forget_interval.or(self.config.forget_interval);
                let ehypha = Ehypha::new(
                    self.context.as_ref(),
                    &self.keys,
                    entry.key().clone(),
                    connpoint,
                    forget,
                    self.clock.clone(),
                )?;
                for socket in self.catalog_sources.values_mut() {
                    socket.subscribe(entry.key().as_bytes());
                }
                debug!("Added ehypha {}", entry.key().short());
                Ok((entry.insert(ehypha), Status::Ok))
            }
        }
    }

    pub fn remove_ehypha(&mut self, key: &str) -> Status {
        let key = PeerKey::new(key);
        if self.ehyphae.remove(&key).is_none() {
            return Status::AlreadyAbsent;
        }
        for socket in self.catalog_sources.values_mut() {
            socket.unsubscribe(key.as_bytes());
        }
        Status::Ok
    }

    pub fn ehypha(&self, key: &str) -> Option<&Ehypha> {
        self.ehyphae.get(&PeerKey::new(key))
    }

    pub fn ehypha_mut(&mut self, key: &str) -> Option<&mut Ehypha> {
        self.ehyphae.get_mut(&PeerKey::new(key))
    }

    pub fn ehyphae(&self) -> impl Iterator<Item = &Ehypha> {
        self.ehyphae.values()
    }

    // Loop

    /// One non-blocking pass
    pub fn update(&mut self) {
        self.stats.updates += 1;

        self.answer_auth_requests();

        let now = self.clock.now();
        let beacon_due = self.last_beacon.map_or(true, |last| {
            now.micros_since(last) >= duration_micros(self.config.beacon_interval)
        });
        if beacon_due {
            self.emit_beacon();
            self.last_beacon = Some(now);
        }

        self.drain_directories(now);

        for ehypha in self.ehyphae.values_mut() {
            ehypha.poll();
        }
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

    fn drain_directories(&mut self, now: MicroTime) {
        for (catalog_key, socket) in self.catalog_sources.iter_mut() {
            while let Some(received) = socket.try_recv() {
                let entry = match DirectoryEntry::decode(&received.parts) {
                    Ok(entry) => entry,
                    Err(e) => {
                        trace!("Dropping directory entry from {}: {}", catalog_key.short(), e);
                        self.stats.malformed_dropped += 1;
                        continue;
                    }
                };
                if let Some(ehypha) = self.ehyphae.get_mut(&entry.key) {
                    ehypha.update_address_via_catalog(catalog_key.as_str(), &entry.connpoint, now);
                    self.stats.directory_entries_applied += 1;
                }
            }
        }
    }
}

impl std::fmt::Debug for Efunguz {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Efunguz")
            .field("public_key", self.keys.public_key())
            .field("pubsub_port", &self.config.pubsub_port)
            .field("ehyphae", &self.ehyphae.len())
            .field("catalog_sources", &self.catalog_sources.len())
            .field("catalog_targets", &self.catalog_targets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emyz_core::ManualClock;
    use emyz_transport::{LinkState, MemoryContext, MemoryNetwork, PullSocket};
    use emyz_wire::{topic_filter, Multipart, MAX_PARTS};
    use std::net::{IpAddr, Ipv4Addr};

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn efunguz(net: &MemoryNetwork, host: u8, keys: &KeyPair, clock: &Arc<ManualClock>) -> Efunguz {
        Efunguz::with_clock(
            Arc::new(net.context(ip(host))),
            keys.secret_key(),
            EfunguzConfig::default(),
            clock.clone(),
        )
        .unwrap()
    }

    #[test]
    fn test_new_binds_publish_port() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let keys = KeyPair::generate();
        let e = efunguz(&net, 1, &keys, &clock);

        assert_eq!(e.public_key(), keys.public_key());
        assert_eq!(net.endpoint_count(), 1);

        // Same host and port is taken
        let again = Efunguz::new(
            Arc::new(net.context(ip(1))),
            keys.secret_key(),
            EfunguzConfig::default(),
        );
        assert!(again.is_err());
    }

    #[test]
    fn test_authorize_only_pubsub_role() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        let alice = KeyPair::generate();
        let bob = KeyPair::generate();

        assert!(e.authorize(alice.public_key(), ChannelRole::Pubsub));
        assert!(!e.authorize(alice.public_key(), ChannelRole::Beacon));

        e.add_whitelist_keys([alice.public_key().as_str()]);
        assert!(e.authorize(alice.public_key(), ChannelRole::Pubsub));
        assert!(!e.authorize(bob.public_key(), ChannelRole::Pubsub));

        e.remove_whitelist_keys([alice.public_key().as_str()]);
        assert!(e.authorize(bob.public_key(), ChannelRole::Pubsub));

        e.add_whitelist_keys([bob.public_key().as_str()]);
        e.clear_whitelist();
        assert!(e.whitelist().unwrap().is_empty());
    }

    #[test]
    fn test_whitelist_enforced_on_subscribers() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let publisher_keys = KeyPair::generate();
        let friend = KeyPair::generate();
        let stranger = KeyPair::generate();

        let mut publisher = efunguz(&net, 1, &publisher_keys, &clock);
        publisher.add_whitelist_keys([friend.public_key().as_str()]);

        let mut f = efunguz(&net, 2, &friend, &clock);
        let mut s = efunguz(&net, 3, &stranger, &clock);
        let cp = "tcp://10.0.0.1:60847";
        for peer in [&mut f, &mut s] {
            let (ehypha, status) = peer
                .add_ehypha(publisher_keys.public_key().as_str(), cp, None)
                .unwrap();
            assert_eq!(status, Status::Ok);
            assert_eq!(ehypha.add_topic("news").unwrap(), Status::Ok);
        }

        publisher.update();
        assert_eq!(publisher.stats().auth_allowed, 1);
        assert_eq!(publisher.stats().auth_denied, 1);

        publisher.emit("news", vec![Bytes::from_static(b"hi")]).unwrap();
        f.update();
        s.update();

        let key = publisher_keys.public_key().as_str();
        assert_eq!(f.ehypha(key).unwrap().link_state(), Some(LinkState::Ready));
        assert_eq!(s.ehypha(key).unwrap().link_state(), Some(LinkState::Denied));
        assert_eq!(
            f.ehypha(key).unwrap().get("news").unwrap().parts(),
            &[Bytes::from_static(b"hi")]
        );
        assert!(!s.ehypha(key).unwrap().get("news").unwrap().has_data());
    }

    #[test]
    fn test_add_ehypha_twice_returns_existing() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        let other = KeyPair::generate();
        let key = other.public_key().as_str();

        let (ehypha, status) = e.add_ehypha(key, "", Some(Duration::from_secs(5))).unwrap();
        assert_eq!(status, Status::Ok);
        assert_eq!(ehypha.add_topic("t").unwrap(), Status::Ok);

        let (ehypha, status) = e.add_ehypha(key, "tcp://10.0.0.5:1", None).unwrap();
        assert_eq!(status, Status::AlreadyPresent);
        assert_eq!(ehypha.address(), None);
        assert_eq!(ehypha.forget_interval(), Some(Duration::from_secs(5)));
        assert!(ehypha.get("t").is_some());

        assert_eq!(e.remove_ehypha(key), Status::Ok);
        assert_eq!(e.remove_ehypha(key), Status::AlreadyAbsent);
        assert!(e.ehypha(key).is_none());
    }

    #[test]
    fn test_default_forget_interval_from_config() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        let (ehypha, _) = e
            .add_ehypha(KeyPair::generate().public_key().as_str(), "", None)
            .unwrap();
        assert_eq!(ehypha.forget_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_beacon_interval() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let catalog_keys = KeyPair::generate();
        let catalog_ctx = net.context(ip(100));
        let mut pull = catalog_ctx.pull_socket(ServerSecurity {
            keys: catalog_keys.clone(),
            role: ChannelRole::Beacon,
        });
        pull.bind("tcp://*:51947").unwrap();

        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        assert_eq!(
            e.add_catalog_target(catalog_keys.public_key().as_str(), "tcp://10.0.0.100:51947")
                .unwrap(),
            Status::Ok
        );
        assert_eq!(
            e.add_catalog_target(catalog_keys.public_key().as_str(), "tcp://10.0.0.100:51947")
                .unwrap(),
            Status::AlreadyPresent
        );

        // First pass beacons at once
        e.update();
        assert_eq!(e.stats().beacons_sent, 1);
        let beacon = pull.try_recv().unwrap();
        assert_eq!(Beacon::decode(&beacon.parts).unwrap().port, 60847);
        assert_eq!(beacon.props.peer_address, Some(ip(1)));

        clock.advance(Duration::from_millis(1999));
        e.update();
        assert_eq!(e.stats().beacons_sent, 1);

        clock.advance(Duration::from_millis(1));
        e.update();
        assert_eq!(e.stats().beacons_sent, 2);

        e.emit_beacon();
        assert_eq!(e.stats().beacons_sent, 3);

        assert_eq!(e.remove_catalog_target(catalog_keys.public_key().as_str()), Status::Ok);
        assert_eq!(
            e.remove_catalog_target(catalog_keys.public_key().as_str()),
            Status::AlreadyAbsent
        );
    }

    #[test]
    fn test_directory_filter_follows_ehyphae() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let catalog_keys = KeyPair::generate();
        let catalog_ctx = net.context(ip(100));
        let mut directory = catalog_ctx.publish_socket(ServerSecurity {
            keys: catalog_keys.clone(),
            role: ChannelRole::Pubsub,
        });
        directory.bind("tcp://*:53791").unwrap();

        let followed = KeyPair::generate();
        let ignored = KeyPair::generate();
        let catalog = catalog_keys.public_key().as_str();

        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        let (_, status) = e.add_ehypha(followed.public_key().as_str(), "", None).unwrap();
        assert_eq!(status, Status::Ok);
        assert_eq!(e.add_catalog_source(catalog, "tcp://10.0.0.100:53791").unwrap(), Status::Ok);
        assert_eq!(
            e.add_catalog_source(catalog, "tcp://10.0.0.100:53791").unwrap(),
            Status::AlreadyPresent
        );

        for (keys, cp) in [(&followed, "tcp://10.0.0.7:60847"), (&ignored, "tcp://10.0.0.8:60847")] {
            let entry = DirectoryEntry::new(keys.public_key().clone(), cp);
            directory.send(&entry.encode().unwrap()).unwrap();
        }
        e.update();

        assert_eq!(e.stats().directory_entries_applied, 1);
        let ehypha = e.ehypha(followed.public_key().as_str()).unwrap();
        assert_eq!(ehypha.address(), Some("tcp://10.0.0.7:60847"));

        // Removing the source withdraws its vote
        assert_eq!(e.remove_catalog_source(catalog), Status::Ok);
        assert_eq!(e.remove_catalog_source(catalog), Status::AlreadyAbsent);
        assert!(e.ehypha(followed.public_key().as_str()).unwrap().votes().is_empty());
        assert_eq!(e.catalog_sources().count(), 0);
    }

    #[test]
    fn test_emit_rejects_nul_topic() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        assert!(e.emit("a\0b", Vec::new()).is_err());
        assert!(topic_filter("ab").is_ok());
        assert_eq!(e.stats().etales_emitted, 0);
    }

    #[test]
    fn test_emit_rejects_unframeable_message() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let mut e = efunguz(&net, 1, &KeyPair::generate(), &clock);
        assert!(e.emit("t", vec![Bytes::new(); 70_000]).is_err());
        assert!(e.emit("t", vec![Bytes::new(); MAX_PARTS - 2]).is_ok());
        assert_eq!(e.stats().etales_emitted, 1);
    }

    /// Memory context whose authorization inbox garbles the first request
    struct GarbledAuth(MemoryContext);

    impl Context for GarbledAuth {
        fn host(&self) -> IpAddr {
            self.0.host()
        }

        fn publish_socket(&self, security: ServerSecurity) -> Box<dyn PublishSocket> {
            self.0.publish_socket(security)
        }

        fn pull_socket(&self, security: ServerSecurity) -> Box<dyn PullSocket> {
            self.0.pull_socket(security)
        }

        fn subscribe_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn SubscribeSocket>> {
            self.0.subscribe_socket(security)
        }

        fn push_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn PushSocket>> {
            self.0.push_socket(security)
        }

        fn bind_auth_inbox(&self) -> EmyzResult<Box<dyn AuthInbox>> {
            Ok(Box::new(GarbledInbox {
                inner: self.0.bind_auth_inbox()?,
                garbled: false,
            }))
        }
    }

    struct GarbledInbox {
        inner: Box<dyn AuthInbox>,
        garbled: bool,
    }

    impl AuthInbox for GarbledInbox {
        fn try_recv(&mut self) -> Option<Multipart> {
            let request = self.inner.try_recv()?;
            if self.garbled {
                return Some(request);
            }
            self.garbled = true;
            Some(Vec::new())
        }

        fn reply(&mut self, reply: Multipart) -> EmyzResult<()> {
            self.inner.reply(reply)
        }

        fn abandon(&mut self) {
            self.inner.abandon()
        }
    }

    #[test]
    fn test_unanswerable_request_does_not_block_later_ones() {
        let net = MemoryNetwork::new();
        let clock = Arc::new(ManualClock::new(MicroTime::ZERO));
        let publisher_keys = KeyPair::generate();
        let mut publisher = Efunguz::with_clock(
            Arc::new(GarbledAuth(net.context(ip(1)))),
            publisher_keys.secret_key(),
            EfunguzConfig::default(),
            clock.clone(),
        )
        .unwrap();

        let mut first = efunguz(&net, 2, &KeyPair::generate(), &clock);
        let mut second = efunguz(&net, 3, &KeyPair::generate(), &clock);
        let key = publisher_keys.public_key().as_str();
        for peer in [&mut first, &mut second] {
            let (_, status) = peer.add_ehypha(key, "tcp://10.0.0.1:60847", None).unwrap();
            assert_eq!(status, Status::Ok);
        }

        publisher.update();
        assert_eq!(publisher.stats().auth_denied, 1);
        assert_eq!(publisher.stats().auth_allowed, 1);
        assert_eq!(first.ehypha(key).unwrap().link_state(), Some(LinkState::Denied));
        assert_eq!(second.ehypha(key).unwrap().link_state(), Some(LinkState::Ready));
    }
}
