//! Emyzelium Test Harness - Multi-peer scenarios
//!
//! This crate provides:
//! - An overlay of peers and catalogs on one in-memory network, driven
//!   by a shared manual clock
//! - End-to-end scenarios: discovery, delivery, whitelisting,
//!   deactivation and address voting

pub mod integration;
pub mod overlay;

pub use integration::*;
pub use overlay::*;
