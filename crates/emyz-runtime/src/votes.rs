//! Catalog votes for the address of a peer
//!
//! Every catalog a publisher reads from reports the connpoint it last saw
//! for a peer. The handle goes with the majority among votes younger than
//! the forget interval; ties go to the lexicographically smallest
//! connpoint. Old votes are skipped at resolution time, not evicted.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use emyz_core::{duration_micros, MicroTime, PeerKey};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub connpoint: String,
    pub time: MicroTime,
}

/// Votes per catalog key
#[derive(Clone, Debug, Default)]
pub struct ConnpointVotes {
    votes: HashMap<PeerKey, Vote>,
}

impl ConnpointVotes {
    pub fn new() -> Self {
        ConnpointVotes::default()
    }

    /// Record (or replace) the vote of a catalog
    pub fn update(&mut self, catalog: PeerKey, connpoint: impl Into<String>, time: MicroTime) {
        self.votes.insert(
            catalog,
            Vote {
                connpoint: connpoint.into(),
                time,
            },
        );
    }

    /// Withdraw the vote of a catalog; returns false if it had none
    pub fn remove(&mut self, catalog: &PeerKey) -> bool {
        self.votes.remove(catalog).is_some()
    }

    pub fn get(&self, catalog: &PeerKey) -> Option<&Vote> {
        self.votes.get(catalog)
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Winning connpoint at `now`, or `None` if no vote counts
    pub fn resolve(&self, now: MicroTime, forget_interval: Option<Duration>) -> Option<&str> {
        let forget = forget_interval.map(duration_micros);

        let mut tally: BTreeMap<&str, usize> = BTreeMap::new();
        for vote in self.votes.values() {
            if forget.map_or(true, |forget| now.micros_since(vote.time) <= forget) {
                *tally.entry(vote.connpoint.as_str()).or_default() += 1;
            }
        }

        // First strict maximum in key order
        let mut winner: Option<(&str, usize)> = None;
        for (connpoint, count) in tally {
            if winner.map_or(true, |(_, best)| count > best) {
                winner = Some((connpoint, count));
            }
        }
        winner.map(|(connpoint, _)| connpoint)
    }
}
