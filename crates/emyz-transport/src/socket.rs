//! Substrate socket traits
//!
//! Every server channel (publish, pull) is authenticated with its owner's
//! key pair and declares a [`ChannelRole`]; every client channel
//! (subscribe, push) knows the public key of the server it connects to.
//! Incoming connections are checked by the authorization inbox of the
//! server's context, if one is bound.
//!
//! All receive operations are non-blocking.

use std::net::IpAddr;

use emyz_core::{ChannelRole, EmyzResult, PeerKey};
use emyz_crypto::KeyPair;
use emyz_wire::Multipart;

/// Security parameters of a server channel
#[derive(Clone, Debug)]
pub struct ServerSecurity {
    pub keys: KeyPair,
    pub role: ChannelRole,
}

/// Security parameters of a client channel
#[derive(Clone, Debug)]
pub struct ClientSecurity {
    pub keys: KeyPair,
    pub server_key: PeerKey,
}

/// Metadata attached to a received message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageProps {
    /// User id granted by the authorization handler (the client key)
    pub user_id: String,
    /// Address of the remote host
    pub peer_address: Option<IpAddr>,
}

/// Message taken from a receiving socket
#[derive(Clone, Debug)]
pub struct Received {
    pub parts: Multipart,
    pub props: MessageProps,
}

/// State of a client connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing bound at the connpoint yet
    Waiting,
    /// Handshake done, authorization pending
    Authorizing,
    Ready,
    /// Refused by the authorization handler
    Denied,
    /// Handshake failed (wrong server key)
    Failed,
}

/// Authenticated publish channel
pub trait PublishSocket: Send {
    fn bind(&mut self, connpoint: &str) -> EmyzResult<()>;

    /// Send to every ready subscriber whose filter prefixes the first part
    fn send(&mut self, msg: &[bytes::Bytes]) -> EmyzResult<()>;
}

/// Authenticated subscribe channel
pub trait SubscribeSocket: Send {
    fn connect(&mut self, connpoint: &str) -> EmyzResult<()>;
    fn disconnect(&mut self, connpoint: &str) -> EmyzResult<()>;

    fn subscribe(&mut self, filter: &[u8]);
    fn unsubscribe(&mut self, filter: &[u8]);

    fn try_recv(&mut self) -> Option<Received>;

    fn link_state(&self, connpoint: &str) -> Option<LinkState>;
}

/// Authenticated conflating push channel
pub trait PushSocket: Send {
    fn connect(&mut self, connpoint: &str) -> EmyzResult<()>;
    fn disconnect(&mut self, connpoint: &str) -> EmyzResult<()>;

    /// Queue a message, replacing any message not yet delivered
    fn send(&mut self, msg: &[bytes::Bytes]) -> EmyzResult<()>;

    fn link_state(&self, connpoint: &str) -> Option<LinkState>;
}

/// Authenticated pull channel
pub trait PullSocket: Send {
    fn bind(&mut self, connpoint: &str) -> EmyzResult<()>;

    fn try_recv(&mut self) -> Option<Received>;
}

/// Authorization requests of one context
///
/// Requests are handed out one at a time; the next request is available
/// only after the previous one has been answered.
pub trait AuthInbox: Send {
    fn try_recv(&mut self) -> Option<Multipart>;

    fn reply(&mut self, reply: Multipart) -> EmyzResult<()>;

    /// Refuse the request in flight without replying, freeing the inbox
    fn abandon(&mut self);
}

/// Factory for the sockets of one peer
pub trait Context: Send + Sync {
    /// Address of the host this context lives on
    fn host(&self) -> IpAddr;

    fn publish_socket(&self, security: ServerSecurity) -> Box<dyn PublishSocket>;

    fn pull_socket(&self, security: ServerSecurity) -> Box<dyn PullSocket>;

    fn subscribe_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn SubscribeSocket>>;

    fn push_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn PushSocket>>;

    /// Bind the authorization inbox; at most one per context
    fn bind_auth_inbox(&self) -> EmyzResult<Box<dyn AuthInbox>>;
}
