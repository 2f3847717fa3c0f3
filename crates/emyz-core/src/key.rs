//! Peer key strings
//!
//! A peer is addressed solely by its public key. On the wire and in every
//! API keys travel as Z85 strings of exactly [`KEY_Z85_LEN`] characters;
//! anything shorter is padded with spaces, anything longer is cut.

use std::borrow::Borrow;
use std::fmt;

/// Raw key length (Curve25519)
pub const KEY_BIN_LEN: usize = 32;

/// Z85-encoded key length
pub const KEY_Z85_LEN: usize = 40;

/// Pad with `pad` or truncate `src` to exactly `len` characters.
///
/// Key strings are ASCII; any other character is replaced by `?` so the
/// result is always `len` bytes long.
pub fn cut_pad(src: &str, len: usize, pad: char) -> String {
    src.chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .chain(std::iter::repeat(pad))
        .take(len)
        .collect()
}

/// Public key of a peer, normalized to [`KEY_Z85_LEN`] characters
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerKey(String);

impl PeerKey {
    /// Normalize a key string (pad or truncate)
    pub fn new(key: &str) -> Self {
        PeerKey(cut_pad(key, KEY_Z85_LEN, ' '))
    }

    /// Build from exactly `KEY_Z85_LEN` wire bytes
    pub fn from_wire(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != KEY_Z85_LEN || !bytes.is_ascii() {
            return None;
        }
        std::str::from_utf8(bytes).ok().map(|s| PeerKey(s.to_owned()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Short form for logs
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl From<&str> for PeerKey {
    fn from(key: &str) -> Self {
        PeerKey::new(key)
    }
}

impl From<String> for PeerKey {
    fn from(key: String) -> Self {
        PeerKey::new(&key)
    }
}

impl AsRef<str> for PeerKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for PeerKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerKey({})", self.0)
    }
}

impl fmt::Display for PeerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cut_pad_short_key_is_padded() {
        assert_eq!(cut_pad("abc", 6, ' '), "abc   ");
    }

    #[test]
    fn test_cut_pad_long_key_is_cut() {
        assert_eq!(cut_pad("abcdefgh", 4, ' '), "abcd");
    }

    #[test]
    fn test_cut_pad_non_ascii() {
        let s = cut_pad("aé", 3, ' ');
        assert_eq!(s, "a? ");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn test_peer_key_normalized_length() {
        let key = PeerKey::new("short");
        assert_eq!(key.as_bytes().len(), KEY_Z85_LEN);
        assert_eq!(key, PeerKey::new("short     "));

        let long = "x".repeat(100);
        assert_eq!(PeerKey::new(&long).as_str().len(), KEY_Z85_LEN);
    }

    #[test]
    fn test_peer_key_from_wire() {
        let raw = [b'k'; KEY_Z85_LEN];
        assert!(PeerKey::from_wire(&raw).is_some());
        assert!(PeerKey::from_wire(&raw[..39]).is_none());
        assert!(PeerKey::from_wire(&[0xFF; KEY_Z85_LEN]).is_none());
    }

    proptest! {
        #[test]
        fn prop_cut_pad_yields_exact_byte_length(src in ".{0,80}", len in 0usize..64) {
            let out = cut_pad(&src, len, ' ');
            prop_assert_eq!(out.len(), len);
            prop_assert!(out.is_ascii());
        }

        #[test]
        fn prop_peer_key_is_idempotent(src in ".{0,80}") {
            let key = PeerKey::new(&src);
            prop_assert_eq!(PeerKey::new(key.as_str()), key);
        }
    }
}
