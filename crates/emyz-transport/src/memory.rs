//! In-process messaging substrate
//!
//! `MemoryNetwork` connects contexts living on virtual hosts. Server
//! sockets bind `tcp://host:port` endpoints; client sockets connect to
//! them and are linked as soon as something is bound there, and again
//! after the server goes away and comes back.
//!
//! Each link runs a key agreement between the client key pair and the
//! server key the client expects. A client holding the wrong server key
//! ends up with a different link key and the handshake fails. After the
//! handshake the server context's authorization inbox, if bound, decides
//! whether the link becomes usable. Every message on a link is framed and
//! sealed with the link cipher.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use emyz_core::{ChannelRole, EmyzError, EmyzResult, KEY_BIN_LEN};
use emyz_crypto::{derive_link_key, peer_key_from_bytes, peer_key_to_bytes, Direction, KeyPair, LinkCipher};
use emyz_wire::{decode_frames, encode_frames, Multipart, ZapReply, ZapRequest};

use crate::{
    AuthInbox, ClientSecurity, Connpoint, Context, LinkState, MessageProps, PublishSocket,
    PullSocket, PushSocket, Received, ServerSecurity, SubscribeSocket,
};

type Endpoint = (IpAddr, u16);

/// Plaintext of the handshake message
const HANDSHAKE_HELLO: &[u8] = b"HELLO";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ServerKind {
    Publish,
    Pull,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ClientKind {
    Subscribe,
    Push,
}

struct ContextState {
    auth: Option<AuthQueue>,
}

#[derive(Default)]
struct AuthQueue {
    pending: VecDeque<u64>,
    in_flight: Option<u64>,
}

struct Delivery {
    link: u64,
    sealed: Vec<u8>,
}

struct Server {
    context: u64,
    host: IpAddr,
    kind: ServerKind,
    keys: KeyPair,
    role: ChannelRole,
    endpoints: Vec<Endpoint>,
    links: Vec<u64>,
    inbox: VecDeque<Delivery>,
}

struct Client {
    host: IpAddr,
    kind: ClientKind,
    keys: KeyPair,
    server_public: [u8; KEY_BIN_LEN],
    connections: BTreeMap<Endpoint, Option<u64>>,
    subscriptions: Vec<Bytes>,
    inbox: VecDeque<Delivery>,
    /// Undelivered push message (conflated)
    pending: Option<Multipart>,
    next_push: usize,
}

struct Link {
    client: u64,
    server: u64,
    endpoint: Endpoint,
    state: LinkState,
    user_id: String,
    client_cipher: LinkCipher,
    server_cipher: LinkCipher,
}

#[derive(Default)]
struct Fabric {
    next_id: u64,
    contexts: HashMap<u64, ContextState>,
    servers: HashMap<u64, Server>,
    clients: HashMap<u64, Client>,
    endpoints: HashMap<Endpoint, u64>,
    links: HashMap<u64, Link>,
}

fn closed() -> EmyzError {
    EmyzError::TransportError("socket closed".into())
}

fn display_endpoint(endpoint: &Endpoint) -> Connpoint {
    Connpoint::new(endpoint.0, endpoint.1)
}

impl Fabric {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn open_link(&mut self, client_id: u64, server_id: u64, endpoint: Endpoint) {
        let (Some(client), Some(server)) =
            (self.clients.get(&client_id), self.servers.get(&server_id))
        else {
            return;
        };

        let compatible = matches!(
            (client.kind, server.kind),
            (ClientKind::Subscribe, ServerKind::Publish) | (ClientKind::Push, ServerKind::Pull)
        );
        if !compatible {
            warn!(
                "{:?} socket cannot connect to {:?} socket at {}",
                client.kind,
                server.kind,
                display_endpoint(&endpoint)
            );
            return;
        }

        let client_public = client.keys.public_bytes();
        let client_key = derive_link_key(
            &client.keys.diffie_hellman(&client.server_public),
            &client_public,
            &client.server_public,
        );
        let server_key = derive_link_key(
            &server.keys.diffie_hellman(&client_public),
            &client_public,
            &server.keys.public_bytes(),
        );
        let mut client_cipher = LinkCipher::new(&client_key);
        let mut server_cipher = LinkCipher::new(&server_key);

        let role = server.role;
        let server_context = server.context;
        let handshake = client_cipher
            .seal(Direction::ToServer, role.as_bytes(), HANDSHAKE_HELLO)
            .and_then(|hello| server_cipher.open(Direction::ToServer, role.as_bytes(), &hello));

        let authorizing = self
            .contexts
            .get(&server_context)
            .is_some_and(|ctx| ctx.auth.is_some());

        let state = match handshake {
            Err(e) => {
                debug!(
                    "Handshake of {} with {} ({}) failed: {}",
                    peer_key_from_bytes(&client_public).short(),
                    display_endpoint(&endpoint),
                    role,
                    e
                );
                LinkState::Failed
            }
            Ok(_) if authorizing => LinkState::Authorizing,
            Ok(_) => LinkState::Ready,
        };

        let link_id = self.next_id();
        self.links.insert(
            link_id,
            Link {
                client: client_id,
                server: server_id,
                endpoint,
                state,
                user_id: String::new(),
                client_cipher,
                server_cipher,
            },
        );
        if let Some(server) = self.servers.get_mut(&server_id) {
            server.links.push(link_id);
        }
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.connections.insert(endpoint, Some(link_id));
        }

        trace!(
            "Link {} to {} ({}): {:?}",
            link_id,
            display_endpoint(&endpoint),
            role,
            state
        );

        match state {
            LinkState::Authorizing => {
                if let Some(queue) = self
                    .contexts
                    .get_mut(&server_context)
                    .and_then(|ctx| ctx.auth.as_mut())
                {
                    queue.pending.push_back(link_id);
                }
            }
            LinkState::Ready => self.on_ready(link_id),
            _ => {}
        }
    }

    /// Flush a queued push message over a link that just became usable
    fn on_ready(&mut self, link_id: u64) {
        let Some(client_id) = self.links.get(&link_id).map(|link| link.client) else {
            return;
        };
        let pending = self
            .clients
            .get_mut(&client_id)
            .filter(|client| client.kind == ClientKind::Push)
            .and_then(|client| client.pending.take());

        if let Some(msg) = pending {
            if let Err(e) = self.push(client_id, &msg) {
                warn!("Dropping queued push message: {}", e);
            }
        }
    }

    fn drop_link(&mut self, link_id: u64) {
        let Some(link) = self.links.remove(&link_id) else {
            return;
        };
        if let Some(server) = self.servers.get_mut(&link.server) {
            server.links.retain(|&id| id != link_id);
            server.inbox.retain(|d| d.link != link_id);
        }
        if let Some(client) = self.clients.get_mut(&link.client) {
            client.inbox.retain(|d| d.link != link_id);
            if let Some(slot) = client.connections.get_mut(&link.endpoint) {
                if *slot == Some(link_id) {
                    *slot = None;
                }
            }
        }
        trace!("Link {} to {} closed", link_id, display_endpoint(&link.endpoint));
    }

    fn bind(&mut self, server_id: u64, connpoint: &str) -> EmyzResult<()> {
        let cp = Connpoint::parse(connpoint)?;
        let server = self.servers.get(&server_id).ok_or_else(closed)?;

        if let Some(ip) = cp.host {
            if ip != server.host {
                return Err(EmyzError::TransportError(format!(
                    "cannot bind {} on host {}",
                    cp, server.host
                )));
            }
        }
        let endpoint = (server.host, cp.port);
        if self.endpoints.contains_key(&endpoint) {
            return Err(EmyzError::AddressInUse(display_endpoint(&endpoint).to_string()));
        }

        self.endpoints.insert(endpoint, server_id);
        if let Some(server) = self.servers.get_mut(&server_id) {
            server.endpoints.push(endpoint);
        }
        debug!("Bound {}", display_endpoint(&endpoint));

        let waiting: Vec<u64> = self
            .clients
            .iter()
            .filter(|(_, client)| client.connections.get(&endpoint) == Some(&None))
            .map(|(&id, _)| id)
            .collect();
        for client_id in waiting {
            self.open_link(client_id, server_id, endpoint);
        }
        Ok(())
    }

    fn connect(&mut self, client_id: u64, connpoint: &str) -> EmyzResult<()> {
        let cp = Connpoint::parse(connpoint)?;
        let ip = cp
            .host
            .ok_or_else(|| EmyzError::InvalidConnpoint(connpoint.to_owned()))?;
        let endpoint = (ip, cp.port);

        let client = self.clients.get_mut(&client_id).ok_or_else(closed)?;
        if client.connections.contains_key(&endpoint) {
            return Ok(());
        }
        client.connections.insert(endpoint, None);

        if let Some(&server_id) = self.endpoints.get(&endpoint) {
            self.open_link(client_id, server_id, endpoint);
        }
        Ok(())
    }

    fn disconnect(&mut self, client_id: u64, connpoint: &str) -> EmyzResult<()> {
        let cp = Connpoint::parse(connpoint)?;
        let ip = cp
            .host
            .ok_or_else(|| EmyzError::InvalidConnpoint(connpoint.to_owned()))?;

        let client = self.clients.get_mut(&client_id).ok_or_else(closed)?;
        match client.connections.remove(&(ip, cp.port)) {
            None => Err(EmyzError::TransportError(format!("not connected to {}", cp))),
            Some(link) => {
                if let Some(link_id) = link {
                    self.drop_link(link_id);
                }
                Ok(())
            }
        }
    }

    fn link_state(&self, client_id: u64, connpoint: &str) -> Option<LinkState> {
        let cp = Connpoint::parse(connpoint).ok()?;
        let client = self.clients.get(&client_id)?;
        match client.connections.get(&(cp.host?, cp.port))? {
            None => Some(LinkState::Waiting),
            Some(link_id) => self.links.get(link_id).map(|link| link.state),
        }
    }

    fn close_server(&mut self, server_id: u64) {
        let Some(server) = self.servers.remove(&server_id) else {
            return;
        };
        for endpoint in &server.endpoints {
            self.endpoints.remove(endpoint);
            debug!("Unbound {}", display_endpoint(endpoint));
        }
        for link_id in server.links {
            self.drop_link(link_id);
        }
    }

    fn close_client(&mut self, client_id: u64) {
        let Some(client) = self.clients.remove(&client_id) else {
            return;
        };
        for link_id in client.connections.into_values().flatten() {
            self.drop_link(link_id);
        }
    }

    fn publish(&mut self, server_id: u64, msg: &[Bytes]) -> EmyzResult<()> {
        let Fabric {
            servers,
            clients,
            links,
            ..
        } = self;
        let server = servers.get(&server_id).ok_or_else(closed)?;

        let topic: &[u8] = msg.first().map_or(&[], |part| part.as_ref());
        let frames = encode_frames(msg)?;

        for link_id in &server.links {
            let Some(link) = links.get_mut(link_id) else {
                continue;
            };
            if link.state != LinkState::Ready {
                continue;
            }
            let Some(client) = clients.get_mut(&link.client) else {
                continue;
            };
            if !client.subscriptions.iter().any(|f| topic.starts_with(f)) {
                continue;
            }
            let sealed = link.server_cipher.seal(Direction::ToClient, b"", &frames)?;
            client.inbox.push_back(Delivery {
                link: *link_id,
                sealed,
            });
        }
        Ok(())
    }

    /// Deliver over one ready link (round robin), or queue until one is ready
    fn push(&mut self, client_id: u64, msg: &[Bytes]) -> EmyzResult<()> {
        let Fabric {
            servers,
            clients,
            links,
            ..
        } = self;
        let client = clients.get_mut(&client_id).ok_or_else(closed)?;

        let ready: Vec<u64> = client
            .connections
            .values()
            .flatten()
            .copied()
            .filter(|id| links.get(id).is_some_and(|l| l.state == LinkState::Ready))
            .collect();
        if ready.is_empty() {
            client.pending = Some(msg.to_vec());
            return Ok(());
        }

        let link_id = ready[client.next_push % ready.len()];
        client.next_push = client.next_push.wrapping_add(1);

        let link = links.get_mut(&link_id).ok_or_else(closed)?;
        let sealed = link
            .client_cipher
            .seal(Direction::ToServer, b"", &encode_frames(msg)?)?;
        if let Some(server) = servers.get_mut(&link.server) {
            // Conflate: only the latest message per link waits in the queue
            server.inbox.retain(|d| d.link != link_id);
            server.inbox.push_back(Delivery {
                link: link_id,
                sealed,
            });
        }
        Ok(())
    }

    fn subscriber_recv(&mut self, client_id: u64) -> Option<Received> {
        let Fabric { clients, links, .. } = self;
        let client = clients.get_mut(&client_id)?;

        while let Some(delivery) = client.inbox.pop_front() {
            let Some(link) = links.get_mut(&delivery.link) else {
                continue;
            };
            let parts = match link
                .client_cipher
                .open(Direction::ToClient, b"", &delivery.sealed)
                .and_then(|plain| decode_frames(&plain))
            {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("Dropping message from {}: {}", display_endpoint(&link.endpoint), e);
                    continue;
                }
            };
            return Some(Received {
                parts,
                props: MessageProps {
                    user_id: String::new(),
                    peer_address: Some(link.endpoint.0),
                },
            });
        }
        None
    }

    fn puller_recv(&mut self, server_id: u64) -> Option<Received> {
        let Fabric {
            servers,
            clients,
            links,
            ..
        } = self;
        let server = servers.get_mut(&server_id)?;

        while let Some(delivery) = server.inbox.pop_front() {
            let Some(link) = links.get_mut(&delivery.link) else {
                continue;
            };
            let parts = match link
                .server_cipher
                .open(Direction::ToServer, b"", &delivery.sealed)
                .and_then(|plain| decode_frames(&plain))
            {
                Ok(parts) => parts,
                Err(e) => {
                    warn!("Dropping pushed message on {}: {}", display_endpoint(&link.endpoint), e);
                    continue;
                }
            };
            return Some(Received {
                parts,
                props: MessageProps {
                    user_id: link.user_id.clone(),
                    peer_address: clients.get(&link.client).map(|c| c.host),
                },
            });
        }
        None
    }

    fn bind_auth(&mut self, context_id: u64) -> EmyzResult<()> {
        let ctx = self.contexts.get_mut(&context_id).ok_or_else(closed)?;
        if ctx.auth.is_some() {
            return Err(EmyzError::AuthHandlerInUse);
        }
        ctx.auth = Some(AuthQueue::default());
        Ok(())
    }

    fn unbind_auth(&mut self, context_id: u64) {
        let Some(queue) = self
            .contexts
            .get_mut(&context_id)
            .and_then(|ctx| ctx.auth.take())
        else {
            return;
        };
        // Nobody left to answer: pending links are refused
        for link_id in queue.in_flight.into_iter().chain(queue.pending) {
            if let Some(link) = self.links.get_mut(&link_id) {
                if link.state == LinkState::Authorizing {
                    link.state = LinkState::Denied;
                }
            }
        }
    }

    fn auth_next(&mut self, context_id: u64) -> Option<Multipart> {
        let Fabric {
            contexts,
            servers,
            clients,
            links,
            ..
        } = self;
        let queue = contexts.get_mut(&context_id)?.auth.as_mut()?;
        if queue.in_flight.is_some() {
            return None;
        }

        while let Some(link_id) = queue.pending.pop_front() {
            let Some(link) = links.get(&link_id) else {
                continue;
            };
            if link.state != LinkState::Authorizing {
                continue;
            }
            let (Some(server), Some(client)) = (servers.get(&link.server), clients.get(&link.client))
            else {
                continue;
            };

            let request = ZapRequest::curve(
                Bytes::from(link_id.to_string()),
                Bytes::from(client.host.to_string()),
                Bytes::from_static(server.role.as_bytes()),
                client.keys.public_bytes(),
            );
            queue.in_flight = Some(link_id);
            return Some(request.encode());
        }
        None
    }

    fn auth_abandon(&mut self, context_id: u64) {
        let Some(link_id) = self
            .contexts
            .get_mut(&context_id)
            .and_then(|ctx| ctx.auth.as_mut())
            .and_then(|queue| queue.in_flight.take())
        else {
            return;
        };
        if let Some(link) = self.links.get_mut(&link_id) {
            if link.state == LinkState::Authorizing {
                debug!("Link {} refused without a reply", link_id);
                link.state = LinkState::Denied;
            }
        }
    }

    fn auth_reply(&mut self, context_id: u64, msg: &[Bytes]) -> EmyzResult<()> {
        let reply = ZapReply::decode(msg)?;

        let queue = self
            .contexts
            .get_mut(&context_id)
            .and_then(|ctx| ctx.auth.as_mut())
            .ok_or_else(closed)?;
        let link_id = queue.in_flight.ok_or_else(|| {
            EmyzError::TransportError("authorization reply without a request".into())
        })?;
        if reply.sequence.as_ref() != link_id.to_string().as_bytes() {
            return Err(EmyzError::MalformedMessage(
                "authorization reply does not match the pending request".into(),
            ));
        }
        queue.in_flight = None;

        let Some(link) = self.links.get_mut(&link_id) else {
            trace!("Link {} closed before authorization", link_id);
            return Ok(());
        };
        if reply.is_allowed() {
            debug!("Link {} authorized as {}", link_id, reply.user_id);
            link.state = LinkState::Ready;
            link.user_id = reply.user_id;
            self.on_ready(link_id);
        } else {
            debug!("Link {} denied", link_id);
            link.state = LinkState::Denied;
        }
        Ok(())
    }
}

/// In-process network of virtual hosts
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    fabric: Arc<Mutex<Fabric>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        MemoryNetwork::default()
    }

    /// New context on `host`; several contexts may share a host
    pub fn context(&self, host: IpAddr) -> MemoryContext {
        let mut fabric = self.fabric.lock();
        let id = fabric.next_id();
        fabric.contexts.insert(id, ContextState { auth: None });
        MemoryContext {
            network: self.clone(),
            id,
            host,
        }
    }

    /// Number of bound endpoints
    pub fn endpoint_count(&self) -> usize {
        self.fabric.lock().endpoints.len()
    }
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fabric = self.fabric.lock();
        f.debug_struct("MemoryNetwork")
            .field("contexts", &fabric.contexts.len())
            .field("endpoints", &fabric.endpoints.len())
            .field("links", &fabric.links.len())
            .finish()
    }
}

/// Sockets of one peer on a [`MemoryNetwork`]
pub struct MemoryContext {
    network: MemoryNetwork,
    id: u64,
    host: IpAddr,
}

impl MemoryContext {
    fn new_server(&self, kind: ServerKind, security: ServerSecurity) -> u64 {
        let mut fabric = self.network.fabric.lock();
        let id = fabric.next_id();
        fabric.servers.insert(
            id,
            Server {
                context: self.id,
                host: self.host,
                kind,
                keys: security.keys,
                role: security.role,
                endpoints: Vec::new(),
                links: Vec::new(),
                inbox: VecDeque::new(),
            },
        );
        id
    }

    fn new_client(&self, kind: ClientKind, security: ClientSecurity) -> EmyzResult<u64> {
        let server_public = peer_key_to_bytes(&security.server_key)?;
        let mut fabric = self.network.fabric.lock();
        let id = fabric.next_id();
        fabric.clients.insert(
            id,
            Client {
                host: self.host,
                kind,
                keys: security.keys,
                server_public,
                connections: BTreeMap::new(),
                subscriptions: Vec::new(),
                inbox: VecDeque::new(),
                pending: None,
                next_push: 0,
            },
        );
        Ok(id)
    }
}

impl Drop for MemoryContext {
    fn drop(&mut self) {
        self.network.fabric.lock().contexts.remove(&self.id);
    }
}

impl Context for MemoryContext {
    fn host(&self) -> IpAddr {
        self.host
    }

    fn publish_socket(&self, security: ServerSecurity) -> Box<dyn PublishSocket> {
        Box::new(MemoryPublishSocket(ServerHandle {
            network: self.network.clone(),
            id: self.new_server(ServerKind::Publish, security),
        }))
    }

    fn pull_socket(&self, security: ServerSecurity) -> Box<dyn PullSocket> {
        Box::new(MemoryPullSocket(ServerHandle {
            network: self.network.clone(),
            id: self.new_server(ServerKind::Pull, security),
        }))
    }

    fn subscribe_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn SubscribeSocket>> {
        let id = self.new_client(ClientKind::Subscribe, security)?;
        Ok(Box::new(MemorySubscribeSocket(ClientHandle {
            network: self.network.clone(),
            id,
        })))
    }

    fn push_socket(&self, security: ClientSecurity) -> EmyzResult<Box<dyn PushSocket>> {
        let id = self.new_client(ClientKind::Push, security)?;
        Ok(Box::new(MemoryPushSocket(ClientHandle {
            network: self.network.clone(),
            id,
        })))
    }

    fn bind_auth_inbox(&self) -> EmyzResult<Box<dyn AuthInbox>> {
        self.network.fabric.lock().bind_auth(self.id)?;
        Ok(Box::new(MemoryAuthInbox {
            network: self.network.clone(),
            context: self.id,
        }))
    }
}

struct ServerHandle {
    network: MemoryNetwork,
    id: u64,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.network.fabric.lock().close_server(self.id);
    }
}

struct ClientHandle {
    network: MemoryNetwork,
    id: u64,
}

impl Drop for ClientHandle {
    fn drop(&mut self) {
        self.network.fabric.lock().close_client(self.id);
    }
}

struct MemoryPublishSocket(ServerHandle);

impl PublishSocket for MemoryPublishSocket {
    fn bind(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().bind(self.0.id, connpoint)
    }

    fn send(&mut self, msg: &[Bytes]) -> EmyzResult<()> {
        self.0.network.fabric.lock().publish(self.0.id, msg)
    }
}

struct MemoryPullSocket(ServerHandle);

impl PullSocket for MemoryPullSocket {
    fn bind(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().bind(self.0.id, connpoint)
    }

    fn try_recv(&mut self) -> Option<Received> {
        self.0.network.fabric.lock().puller_recv(self.0.id)
    }
}

struct MemorySubscribeSocket(ClientHandle);

impl SubscribeSocket for MemorySubscribeSocket {
    fn connect(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().connect(self.0.id, connpoint)
    }

    fn disconnect(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().disconnect(self.0.id, connpoint)
    }

    fn subscribe(&mut self, filter: &[u8]) {
        if let Some(client) = self.0.network.fabric.lock().clients.get_mut(&self.0.id) {
            client.subscriptions.push(Bytes::copy_from_slice(filter));
        }
    }

    fn unsubscribe(&mut self, filter: &[u8]) {
        if let Some(client) = self.0.network.fabric.lock().clients.get_mut(&self.0.id) {
            if let Some(pos) = client.subscriptions.iter().position(|f| f.as_ref() == filter) {
                client.subscriptions.remove(pos);
            }
        }
    }

    fn try_recv(&mut self) -> Option<Received> {
        self.0.network.fabric.lock().subscriber_recv(self.0.id)
    }

    fn link_state(&self, connpoint: &str) -> Option<LinkState> {
        self.0.network.fabric.lock().link_state(self.0.id, connpoint)
    }
}

struct MemoryPushSocket(ClientHandle);

impl PushSocket for MemoryPushSocket {
    fn connect(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().connect(self.0.id, connpoint)
    }

    fn disconnect(&mut self, connpoint: &str) -> EmyzResult<()> {
        self.0.network.fabric.lock().disconnect(self.0.id, connpoint)
    }

    fn send(&mut self, msg: &[Bytes]) -> EmyzResult<()> {
        self.0.network.fabric.lock().push(self.0.id, msg)
    }

    fn link_state(&self, connpoint: &str) -> Option<LinkState> {
        self.0.network.fabric.lock().link_state(self.0.id, connpoint)
    }
}

struct MemoryAuthInbox {
    network: MemoryNetwork,
    context: u64,
}

impl AuthInbox for MemoryAuthInbox {
    fn try_recv(&mut self) -> Option<Multipart> {
        self.network.fabric.lock().auth_next(self.context)
    }

    fn reply(&mut self, reply: Multipart) -> EmyzResult<()> {
        self.network.fabric.lock().auth_reply(self.context, &reply)
    }

    fn abandon(&mut self) {
        self.network.fabric.lock().auth_abandon(self.context);
    }
}

impl Drop for MemoryAuthInbox {
    fn drop(&mut self) {
        self.network.fabric.lock().unbind_auth(self.context);
    }
}
