//! Emyzelium Crypto - Identity, link encryption and authorization
//!
//! Provides:
//! - Curve25519 key pairs with Z85 key strings
//! - Per-link AEAD (X25519 + HKDF-SHA256 + ChaCha20-Poly1305)
//! - Key whitelists and whitelist files
//! - The role-aware authorization hook shared by publishers and catalogs

pub mod aead;
pub mod auth;
pub mod identity;
pub mod whitelist;

pub use aead::*;
pub use auth::*;
pub use identity::*;
pub use whitelist::*;
