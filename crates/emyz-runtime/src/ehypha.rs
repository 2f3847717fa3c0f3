//! Ehypha: subscription to one remote Efunguz
//!
//! The handle knows the remote peer only by its public key. Its connpoint
//! is either set directly or resolved from catalog votes on every poll;
//! the underlying channel is reconnected only when the connpoint actually
//! changes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use emyz_core::{Clock, EmyzError, EmyzResult, MicroTime, PeerKey, Status};
use emyz_crypto::KeyPair;
use emyz_transport::{ClientSecurity, Connpoint, Context, LinkState, SubscribeSocket};
use emyz_wire::{topic_filter, EtaleMessage};

use crate::{ConnpointVotes, Etale, EhyphaStats};

/// Subscription to the etales of one remote peer
pub struct Ehypha {
    key: PeerKey,
    socket: Box<dyn SubscribeSocket>,
    connpoint: Option<String>,
    forget_interval: Option<Duration>,
    votes: ConnpointVotes,
    etales: HashMap<String, Etale>,
    clock: Arc<dyn Clock>,
    stats: EhyphaStats,
}

impl Ehypha {
    /// Subscribe to the peer `key` as `own_keys`.
    ///
    /// An empty `connpoint` leaves the handle unconnected until a catalog
    /// reports an address.
    pub fn new(
        context: &dyn Context,
        own_keys: &KeyPair,
        key: PeerKey,
        connpoint: &str,
        forget_interval: Option<Duration>,
        clock: Arc<dyn Clock>,
    ) -> EmyzResult<Self> {
        let socket = context.subscribe_socket(ClientSecurity {
            keys: own_keys.clone(),
            server_key: key.clone(),
        })?;

        let mut ehypha = Ehypha {
            key,
            socket,
            connpoint: None,
            forget_interval,
            votes: ConnpointVotes::new(),
            etales: HashMap::new(),
            clock,
            stats: EhyphaStats::default(),
        };
        ehypha.set_address(connpoint)?;
        Ok(ehypha)
    }

    /// Public key of the remote peer
    pub fn key(&self) -> &PeerKey {
        &self.key
    }

    /// Current connpoint, if any
    pub fn address(&self) -> Option<&str> {
        self.connpoint.as_deref()
    }

    pub fn forget_interval(&self) -> Option<Duration> {
        self.forget_interval
    }

    /// State of the channel to the current connpoint
    pub fn link_state(&self) -> Option<LinkState> {
        self.connpoint
            .as_deref()
            .and_then(|cp| self.socket.link_state(cp))
    }

    pub fn votes(&self) -> &ConnpointVotes {
        &self.votes
    }

    pub fn stats(&self) -> &EhyphaStats {
        &self.stats
    }

    /// Point the handle at `connpoint`; empty disconnects.
    ///
    /// Nothing happens if the connpoint is unchanged.
    pub fn set_address(&mut self, connpoint: &str) -> EmyzResult<()> {
        let new = (!connpoint.is_empty()).then_some(connpoint);
        if new == self.connpoint.as_deref() {
            return Ok(());
        }
        // The old link stays up until the new one is accepted
        if let Some(cp) = new {
            if Connpoint::parse(cp)?.is_wildcard() {
                return Err(EmyzError::InvalidConnpoint(cp.to_owned()));
            }
            self.socket.connect(cp)?;
        }

        if let Some(old) = self.connpoint.take() {
            if let Err(e) = self.socket.disconnect(&old) {
                warn!("Disconnecting {} from {}: {}", self.key.short(), old, e);
            }
        }
        if let Some(cp) = new {
            self.connpoint = Some(cp.to_owned());
            self.stats.reconnects += 1;
        }

        debug!("Ehypha {} now at {:?}", self.key.short(), self.connpoint);
        Ok(())
    }

    /// Record the connpoint a catalog reports for this peer
    pub fn update_address_via_catalog(&mut self, catalog_key: &str, connpoint: &str, time: MicroTime) {
        if !Connpoint::parse(connpoint).is_ok_and(|cp| !cp.is_wildcard()) {
            debug!("Ehypha {} ignoring vote for {:?}", self.key.short(), connpoint);
            return;
        }
        self.votes.update(PeerKey::new(catalog_key), connpoint, time);
    }

    /// Withdraw the vote of a catalog
    pub fn remove_address_via_catalog(&mut self, catalog_key: &str) -> Status {
        if self.votes.remove(&PeerKey::new(catalog_key)) {
            Status::Ok
        } else {
            Status::AlreadyAbsent
        }
    }

    /// Start tracking `topic` (it must not contain NUL)
    pub fn add_topic(&mut self, topic: &str) -> EmyzResult<Status> {
        if self.etales.contains_key(topic) {
            return Ok(Status::AlreadyPresent);
        }
        let filter = topic_filter(topic)?;
        self.socket.subscribe(&filter);
        self.etales.insert(topic.to_owned(), Etale::default());
        Ok(Status::Ok)
    }

    pub fn remove_topic(&mut self, topic: &str) -> Status {
        match self.etales.remove(topic) {
            None => Status::AlreadyAbsent,
            Some(etale) => {
                if !etale.is_paused() {
                    self.unsubscribe(topic);
                }
                Status::Ok
            }
        }
    }

    /// Stop updating `topic`, keeping its last value
    pub fn pause_topic(&mut self, topic: &str) -> Status {
        let Some(etale) = self.etales.get_mut(topic) else {
            return Status::Absent;
        };
        if etale.is_paused() {
            return Status::AlreadyPaused;
        }
        etale.set_paused(true);
        self.unsubscribe(topic);
        Status::Ok
    }

    pub fn resume_topic(&mut self, topic: &str) -> Status {
        let Some(etale) = self.etales.get_mut(topic) else {
            return Status::Absent;
        };
        if !etale.is_paused() {
            return Status::AlreadyResumed;
        }
        etale.set_paused(false);
        if let Ok(filter) = topic_filter(topic) {
            self.socket.subscribe(&filter);
        }
        Status::Ok
    }

    pub fn pause_all(&mut self) {
        let topics: Vec<String> = self.etales.keys().cloned().collect();
        for topic in topics {
            let _ = self.pause_topic(&topic);
        }
    }

    pub fn resume_all(&mut self) {
        let topics: Vec<String> = self.etales.keys().cloned().collect();
        for topic in topics {
            let _ = self.resume_topic(&topic);
        }
    }

    fn unsubscribe(&mut self, topic: &str) {
        if let Ok(filter) = topic_filter(topic) {
            self.socket.unsubscribe(&filter);
        }
    }

    /// Latest value of `topic`, if tracked
    pub fn get(&self, topic: &str) -> Option<&Etale> {
        self.etales.get(topic)
    }

    /// Tracked topics
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.etales.keys().map(String::as_str)
    }

    /// Follow the catalog majority, then take every pending message
    pub fn poll(&mut self) {
        let now = self.clock.now();

        if let Some(winner) = self.votes.resolve(now, self.forget_interval) {
            if Some(winner) != self.connpoint.as_deref() {
                let winner = winner.to_owned();
                if let Err(e) = self.set_address(&winner) {
                    warn!("Ehypha {} cannot use {}: {}", self.key.short(), winner, e);
                }
            }
        }

        while let Some(received) = self.socket.try_recv() {
            let message = match EtaleMessage::decode(received.parts) {
                Ok(message) => message,
                Err(e) => {
                    trace!("Ehypha {} dropping message: {}", self.key.short(), e);
                    self.stats.malformed_dropped += 1;
                    continue;
                }
            };
            match self.etales.get_mut(&message.topic) {
                Some(etale) if !etale.is_paused() => {
                    etale.replace(message.parts, message.publish_time, now);
                    self.stats.etales_received += 1;
                }
                _ => self.stats.etales_skipped += 1,
            }
        }
    }
}

impl std::fmt::Debug for Ehypha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ehypha")
            .field("key", &self.key)
            .field("connpoint", &self.connpoint)
            .field("topics", &self.etales.len())
            .field("votes", &self.votes.len())
            .finish()
    }
}
