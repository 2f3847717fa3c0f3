//! Emyzelium Transport - Messaging substrate
//!
//! This crate provides:
//! - `tcp://host:port` connpoints
//! - The socket traits the overlay is written against: authenticated
//!   publish/subscribe, conflating push/pull, and the per-context
//!   authorization inbox
//! - `MemoryNetwork`, an in-process implementation with virtual hosts

pub mod connpoint;
pub mod memory;
pub mod socket;

pub use connpoint::*;
pub use memory::{MemoryContext, MemoryNetwork};
pub use socket::*;
