//! Identity key pairs
//!
//! Keys are Curve25519. The public key is derived from the secret key by
//! base-point multiplication, so a peer configured with only its secret
//! key always ends up with the same public key.

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};

use emyz_core::{EmyzResult, PeerKey, KEY_BIN_LEN, KEY_Z85_LEN};
use emyz_wire::z85;

/// Identity key pair of a peer
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
    secret_z85: String,
    public_key: PeerKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        Self::from_bytes(secret.to_bytes())
    }

    /// Create from raw secret key bytes
    pub fn from_bytes(bytes: [u8; KEY_BIN_LEN]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        let public_key = PeerKey::new(&z85::encode_key(public.as_bytes()));

        KeyPair {
            secret,
            public,
            secret_z85: z85::encode_key(&bytes),
            public_key,
        }
    }

    /// Create from a Z85 secret key (padded or cut to 40 characters first)
    pub fn from_secret(secret: &str) -> EmyzResult<Self> {
        let secret = emyz_core::cut_pad(secret, KEY_Z85_LEN, ' ');
        let bytes = z85::decode_key(&secret)?;
        Ok(Self::from_bytes(bytes))
    }

    /// Public key string
    pub fn public_key(&self) -> &PeerKey {
        &self.public_key
    }

    /// Secret key string
    pub fn secret_key(&self) -> &str {
        &self.secret_z85
    }

    /// Raw public key bytes
    pub fn public_bytes(&self) -> [u8; KEY_BIN_LEN] {
        self.public.to_bytes()
    }

    /// X25519 shared secret with a peer's raw public key
    pub fn diffie_hellman(&self, peer_public: &[u8; KEY_BIN_LEN]) -> [u8; KEY_BIN_LEN] {
        let peer = PublicKey::from(*peer_public);
        self.secret.diffie_hellman(&peer).to_bytes()
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Derive the public key string belonging to a Z85 secret key
pub fn derive_public_key(secret: &str) -> EmyzResult<PeerKey> {
    KeyPair::from_secret(secret).map(|pair| pair.public_key)
}

/// Key string of a raw public key
pub fn peer_key_from_bytes(raw: &[u8; KEY_BIN_LEN]) -> PeerKey {
    PeerKey::new(&z85::encode_key(raw))
}

/// Raw bytes of a key string
pub fn peer_key_to_bytes(key: &PeerKey) -> EmyzResult<[u8; KEY_BIN_LEN]> {
    z85::decode_key(key.as_str())
}
