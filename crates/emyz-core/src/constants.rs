//! Protocol constants and defaults

use std::time::Duration;

pub const VERSION: &str = "0.7.2";

pub const DEF_IP: &str = "127.0.0.1";

pub const DEF_EFUNGI_PUBSUB_PORT: u16 = 0xEDAF; // 60847
pub const DEF_ECATAL_BEACON_PORT: u16 = 0xCAEB; // 51947
pub const DEF_ECATAL_PUBSUB_PORT: u16 = 0xD21F; // 53791

pub const DEF_EFUNGI_ECATAL_FORGET_INTERVAL: Duration = Duration::from_secs(60);
pub const DEF_EFUNGI_BEACON_INTERVAL: Duration = Duration::from_secs(2);

pub const DEF_ECATAL_DEACTIVATE_INTERVAL: Duration = Duration::from_secs(60);
pub const DEF_ECATAL_PUBLISH_INTERVAL: Duration = Duration::from_secs(1);
pub const DEF_ECATAL_IDLE_INTERVAL: Duration = Duration::from_millis(10);

/// Longest accepted line in a key whitelist file, terminator included
pub const MAX_PUBLICKEYS_FILE_LINE_LEN: usize = 96;

/// Longest connpoint accepted in a directory entry
pub const MAX_CONNPOINT_LEN: usize = 255;

/// Every connpoint handed out by a catalog starts with this
pub const CONNPOINT_SCHEME: &str = "tcp://";
