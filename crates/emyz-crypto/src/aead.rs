//! Link encryption using ChaCha20-Poly1305
//!
//! Each connection derives one key from the X25519 shared secret of the
//! two peers. Both directions use that key; the nonce carries the
//! direction and a per-direction counter, and the receiver rejects any
//! counter it has already passed.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;

use emyz_core::{EmyzError, EmyzResult, KEY_BIN_LEN};

/// Key size for ChaCha20-Poly1305
pub const KEY_SIZE: usize = 32;

/// Nonce size for ChaCha20-Poly1305
pub const NONCE_SIZE: usize = 12;

/// Tag size for ChaCha20-Poly1305
pub const TAG_SIZE: usize = 16;

/// Counter prefix on every sealed message
pub const COUNTER_SIZE: usize = 8;

/// Direction of travel on a link
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
}

impl Direction {
    fn index(self) -> usize {
        match self {
            Direction::ToServer => 0,
            Direction::ToClient => 1,
        }
    }
}

/// Derive the link key from a shared secret, bound to both public keys
pub fn derive_link_key(
    shared_secret: &[u8; KEY_BIN_LEN],
    client_public: &[u8; KEY_BIN_LEN],
    server_public: &[u8; KEY_BIN_LEN],
) -> [u8; KEY_SIZE] {
    let mut salt = [0u8; 2 * KEY_BIN_LEN];
    salt[..KEY_BIN_LEN].copy_from_slice(client_public);
    salt[KEY_BIN_LEN..].copy_from_slice(server_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&salt), shared_secret);
    let mut key = [0u8; KEY_SIZE];
    hkdf.expand(b"EMYZELIUM_LINK_v1", &mut key)
        .expect("HKDF expand failed");
    key
}

fn link_nonce(direction: Direction, counter: u64) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0] = direction.index() as u8;
    nonce[4..12].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// AEAD state of one end of a link
pub struct LinkCipher {
    cipher: ChaCha20Poly1305,
    next_send: [u64; 2],
    last_received: [Option<u64>; 2],
}

impl LinkCipher {
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        LinkCipher {
            cipher: ChaCha20Poly1305::new_from_slice(key).expect("Invalid key size"),
            next_send: [0; 2],
            last_received: [None; 2],
        }
    }

    /// Encrypt; output is counter (u64 LE) followed by ciphertext and tag
    pub fn seal(&mut self, direction: Direction, aad: &[u8], plaintext: &[u8]) -> EmyzResult<Vec<u8>> {
        let counter = self.next_send[direction.index()];
        self.next_send[direction.index()] = counter.wrapping_add(1);

        let nonce = link_nonce(direction, counter);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
            .map_err(|_| EmyzError::TransportError("encryption failed".into()))?;

        let mut sealed = Vec::with_capacity(COUNTER_SIZE + ciphertext.len());
        sealed.extend_from_slice(&counter.to_le_bytes());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    /// Decrypt a message produced by [`LinkCipher::seal`]
    pub fn open(&mut self, direction: Direction, aad: &[u8], sealed: &[u8]) -> EmyzResult<Vec<u8>> {
        if sealed.len() < COUNTER_SIZE + TAG_SIZE {
            return Err(EmyzError::BufferTooShort {
                expected: COUNTER_SIZE + TAG_SIZE,
                actual: sealed.len(),
            });
        }
        let mut counter_bytes = [0u8; COUNTER_SIZE];
        counter_bytes.copy_from_slice(&sealed[..COUNTER_SIZE]);
        let counter = u64::from_le_bytes(counter_bytes);

        let slot = &mut self.last_received[direction.index()];
        if slot.is_some_and(|last| counter <= last) {
            return Err(EmyzError::ReplayDetected(counter));
        }

        let nonce = link_nonce(direction, counter);
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &sealed[COUNTER_SIZE..],
                    aad,
                },
            )
            .map_err(|_| EmyzError::DecryptionFailed)?;

        *slot = Some(counter);
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;

    fn link_pair() -> (LinkCipher, LinkCipher) {
        let client = KeyPair::generate();
        let server = KeyPair::generate();
        let client_key = derive_link_key(
            &client.diffie_hellman(&server.public_bytes()),
            &client.public_bytes(),
            &server.public_bytes(),
        );
        let server_key = derive_link_key(
            &server.diffie_hellman(&client.public_bytes()),
            &client.public_bytes(),
            &server.public_bytes(),
        );
        assert_eq!(client_key, server_key);
        (LinkCipher::new(&client_key), LinkCipher::new(&server_key))
    }

    #[test]
    fn test_seal_open() {
        let (mut client, mut server) = link_pair();

        let sealed = client.seal(Direction::ToServer, b"beacon", b"\xaf\xed").unwrap();
        let opened = server.open(Direction::ToServer, b"beacon", &sealed).unwrap();
        assert_eq!(opened, b"\xaf\xed");

        let sealed = server.seal(Direction::ToClient, b"", b"etale").unwrap();
        assert_eq!(client.open(Direction::ToClient, b"", &sealed).unwrap(), b"etale");
    }

    #[test]
    fn test_wrong_key_fails() {
        let (mut client, _) = link_pair();
        let (_, mut other_server) = link_pair();

        let sealed = client.seal(Direction::ToServer, b"", b"secret").unwrap();
        assert!(matches!(
            other_server.open(Direction::ToServer, b"", &sealed),
            Err(EmyzError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_direction_is_authenticated() {
        let (mut client, mut server) = link_pair();
        let sealed = client.seal(Direction::ToServer, b"", b"x").unwrap();
        assert!(server.open(Direction::ToClient, b"", &sealed).is_err());
    }

    #[test]
    fn test_replay_rejected() {
        let (mut client, mut server) = link_pair();
        let first = client.seal(Direction::ToServer, b"", b"1").unwrap();
        let second = client.seal(Direction::ToServer, b"", b"2").unwrap();

        server.open(Direction::ToServer, b"", &second).unwrap();
        assert!(matches!(
            server.open(Direction::ToServer, b"", &first),
            Err(EmyzError::ReplayDetected(0))
        ));
        assert!(server.open(Direction::ToServer, b"", &second).is_err());
    }

    #[test]
    fn test_short_input() {
        let (_, mut server) = link_pair();
        assert!(server.open(Direction::ToServer, b"", &[0u8; 10]).is_err());
    }
}
