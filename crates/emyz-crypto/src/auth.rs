//! Role-aware authorization
//!
//! Publishers and catalogs share one authorization hook. Each declares
//! the channel roles it serves and a whitelist per role; a connection is
//! accepted only when its target channel has a declared role and the
//! whitelist of that role permits the client key. Undeclared roles and
//! undecodable requests are denied.

use std::collections::HashMap;

use tracing::{debug, warn};

use emyz_core::{ChannelRole, PeerKey};
use emyz_wire::{Multipart, ZapReply, ZapRequest};

use crate::{peer_key_from_bytes, Whitelist};

/// Result of answering one authorization request
#[derive(Clone, Debug)]
pub struct AuthOutcome {
    /// Reply to send back on the authorization channel
    pub reply: Multipart,
    pub allowed: bool,
    /// Client key, if the request could be decoded
    pub key: Option<PeerKey>,
    /// Role of the target channel, if known
    pub role: Option<ChannelRole>,
}

/// Whitelists per channel role
#[derive(Clone, Debug, Default)]
pub struct Authorizer {
    rules: HashMap<ChannelRole, Whitelist>,
}

impl Authorizer {
    pub fn new() -> Self {
        Authorizer {
            rules: HashMap::new(),
        }
    }

    /// Serve `role`, starting with an empty (open) whitelist
    pub fn declare(&mut self, role: ChannelRole) -> &mut Whitelist {
        self.rules.entry(role).or_default()
    }

    pub fn is_declared(&self, role: ChannelRole) -> bool {
        self.rules.contains_key(&role)
    }

    pub fn whitelist(&self, role: ChannelRole) -> Option<&Whitelist> {
        self.rules.get(&role)
    }

    pub fn whitelist_mut(&mut self, role: ChannelRole) -> Option<&mut Whitelist> {
        self.rules.get_mut(&role)
    }

    /// Decide whether `key` may connect to a channel of `role`
    pub fn authorize(&self, key: &PeerKey, role: ChannelRole) -> bool {
        self.rules
            .get(&role)
            .is_some_and(|whitelist| whitelist.permits(key))
    }

    /// Answer a raw authorization request.
    ///
    /// Returns `None` when the request is too broken to address a reply to.
    pub fn answer(&self, request: &[bytes::Bytes]) -> Option<AuthOutcome> {
        let req = match ZapRequest::decode(request) {
            Ok(req) => req,
            Err(e) => {
                warn!("Undecodable authorization request: {}", e);
                let (version, sequence) = ZapRequest::header(request)?;
                return Some(AuthOutcome {
                    reply: ZapReply::deny(version, sequence).encode(),
                    allowed: false,
                    key: None,
                    role: None,
                });
            }
        };

        let key = peer_key_from_bytes(&req.client_key);
        let role = ChannelRole::from_bytes(&req.identity);
        let allowed = role.is_some_and(|role| self.authorize(&key, role));

        debug!(
            "Authorization of {} on {:?}: {}",
            key.short(),
            role,
            if allowed { "allowed" } else { "denied" }
        );

        let reply = if allowed {
            ZapReply::allow(req.version, req.sequence, key.as_str())
        } else {
            ZapReply::deny(req.version, req.sequence)
        };

        Some(AuthOutcome {
            reply: reply.encode(),
            allowed,
            key: Some(key),
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyPair;
    use bytes::Bytes;

    fn request(identity: &'static [u8], keys: &KeyPair) -> Multipart {
        ZapRequest::curve(
            Bytes::from_static(b"1"),
            Bytes::from_static(b"10.0.0.2"),
            Bytes::from_static(identity),
            keys.public_bytes(),
        )
        .encode()
    }

    #[test]
    fn test_undeclared_role_is_denied() {
        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub);
        let key = PeerKey::new("anyone");

        assert!(auth.authorize(&key, ChannelRole::Pubsub));
        assert!(!auth.authorize(&key, ChannelRole::Beacon));
    }

    #[test]
    fn test_whitelists_are_per_role() {
        let alice = PeerKey::new("alice");
        let bob = PeerKey::new("bob");

        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Beacon).insert(alice.as_str());
        auth.declare(ChannelRole::Pubsub).insert(bob.as_str());

        assert!(auth.authorize(&alice, ChannelRole::Beacon));
        assert!(!auth.authorize(&alice, ChannelRole::Pubsub));
        assert!(auth.authorize(&bob, ChannelRole::Pubsub));
        assert!(!auth.authorize(&bob, ChannelRole::Beacon));
    }

    #[test]
    fn test_declare_keeps_existing_whitelist() {
        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub).insert("alice");
        auth.declare(ChannelRole::Pubsub);
        assert_eq!(auth.whitelist(ChannelRole::Pubsub).map(Whitelist::len), Some(1));
    }

    #[test]
    fn test_answer_allows_with_user_id() {
        let client = KeyPair::generate();
        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub);

        let outcome = auth.answer(&request(b"pubsub", &client)).unwrap();
        assert!(outcome.allowed);
        assert_eq!(outcome.key.as_ref(), Some(client.public_key()));
        assert_eq!(outcome.role, Some(ChannelRole::Pubsub));

        let reply = ZapReply::decode(&outcome.reply).unwrap();
        assert!(reply.is_allowed());
        assert_eq!(reply.sequence.as_ref(), b"1");
        assert_eq!(reply.user_id, client.public_key().as_str());
    }

    #[test]
    fn test_answer_denies_unlisted_key() {
        let client = KeyPair::generate();
        let other = KeyPair::generate();
        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub)
            .insert(other.public_key().as_str());

        let outcome = auth.answer(&request(b"pubsub", &client)).unwrap();
        assert!(!outcome.allowed);
        let reply = ZapReply::decode(&outcome.reply).unwrap();
        assert_eq!(reply.status_code, emyz_wire::STATUS_DENIED);
        assert!(reply.user_id.is_empty());
    }

    #[test]
    fn test_answer_denies_unknown_identity() {
        let client = KeyPair::generate();
        let mut auth = Authorizer::new();
        auth.declare(ChannelRole::Pubsub);

        let outcome = auth.answer(&request(b"control", &client)).unwrap();
        assert!(!outcome.allowed);
        assert_eq!(outcome.role, None);
    }

    #[test]
    fn test_answer_malformed_request() {
        let auth = Authorizer::new();

        let broken = vec![Bytes::from_static(b"1.0"), Bytes::from_static(b"5")];
        let outcome = auth.answer(&broken).unwrap();
        assert!(!outcome.allowed);
        let reply = ZapReply::decode(&outcome.reply).unwrap();
        assert_eq!(reply.sequence.as_ref(), b"5");

        assert!(auth.answer(&[Bytes::new()]).is_none());
    }
}
