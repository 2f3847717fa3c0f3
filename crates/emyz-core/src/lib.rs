//! Emyzelium Core - Fundamental types and primitives
//!
//! This crate defines the core types used throughout the overlay:
//! - Peer keys (fixed-length Z85 key strings)
//! - Channel roles (pubsub / beacon)
//! - Time primitives (MicroTime, clocks)
//! - Management status codes and the error type
//! - Protocol defaults

pub mod constants;
pub mod error;
pub mod key;
pub mod role;
pub mod status;
pub mod time;

pub use constants::*;
pub use error::*;
pub use key::*;
pub use role::*;
pub use status::*;
pub use time::*;
