//! Emyzelium Wire Protocol - Message formats
//!
//! Every message is a multipart message (an ordered list of byte parts).
//! This crate implements:
//! - Multipart framing for transports that carry a single byte buffer
//! - Z85 key encoding
//! - Etale messages: `[topic\0, publish_time, part, ...]`
//! - Beacons: `[port]`
//! - Directory entries: `[key, connpoint]`
//! - ZAP authorization requests and replies

pub mod beacon;
pub mod directory;
pub mod etale;
pub mod multipart;
pub mod z85;
pub mod zap;

pub use beacon::*;
pub use directory::*;
pub use etale::*;
pub use multipart::*;
pub use zap::*;
