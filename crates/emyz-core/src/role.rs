//! Channel roles
//!
//! Every authenticated server channel declares a role. The authorization
//! hook receives the role of the channel a connection targets, so a key
//! authorized for beacons is never accepted on a data channel and the
//! other way round.

use std::fmt;

/// Logical role of an authenticated channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelRole {
    /// Data (etales) or directory publication
    Pubsub,
    /// Beacon reception at a catalog
    Beacon,
}

impl ChannelRole {
    /// Routing identity tag carried in authorization requests
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            ChannelRole::Pubsub => b"pubsub",
            ChannelRole::Beacon => b"beacon",
        }
    }

    pub fn from_bytes(tag: &[u8]) -> Option<Self> {
        match tag {
            b"pubsub" => Some(ChannelRole::Pubsub),
            b"beacon" => Some(ChannelRole::Beacon),
            _ => None,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Pubsub => f.write_str("pubsub"),
            ChannelRole::Beacon => f.write_str("beacon"),
        }
    }
}
