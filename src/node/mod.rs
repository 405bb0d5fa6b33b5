//! Overlay node: content-addressed store and fetch over the routing table.

mod actor;
pub(crate) mod config;
mod fan_out;
mod info;

use std::{
    fmt::{self, Debug, Formatter},
    num::NonZeroUsize,
    sync::Arc,
    thread,
    time::Duration,
};

use bytes::Bytes;
use flume::{Receiver, Sender, WeakSender};
use tracing::{debug, info, trace, warn};

use crate::common::{
    BucketPolicy, Digest, FetchRequest, Id, Peer, PeerError, PeerRef, StoreRequest, Trail,
};
use crate::Error;

use actor::{Actor, FetchOutcome, StoreOutcome};

pub(crate) use actor::ActorMessage;
use fan_out::fan_out;

pub use config::{
    Config, DEFAULT_MAX_HOPS, DEFAULT_REPLICATION_FACTOR, DEFAULT_REQUEST_TIMEOUT, MAX_VALUES,
};
pub use info::Info;

#[derive(Debug, Clone)]
/// Handle to a node of the overlay.
///
/// Cloning is cheap, every clone talks to the same actor thread, which keeps
/// running until [Node::shutdown] is called or every handle is dropped.
/// Entries for this node in other nodes' routing tables (see [Node::peer_ref])
/// don't keep it running.
pub struct Node {
    id: Id,
    sender: Sender<ActorMessage>,
    digest: Arc<dyn Digest>,
    request_timeout: Duration,
    max_hops: u8,
}

#[derive(Debug, Default, Clone)]
/// Node builder
pub struct NodeBuilder(Config);

impl NodeBuilder {
    /// Set this node's [Id], instead of a random one.
    pub fn id(&mut self, id: Id) -> &mut Self {
        self.0.id = Some(id);

        self
    }

    /// Set the number of closest peers stores and fetches are forwarded to.
    pub fn replication_factor(&mut self, replication_factor: usize) -> &mut Self {
        self.0.replication_factor = replication_factor;

        self
    }

    /// Set the routing table's [BucketPolicy].
    pub fn bucket_policy(&mut self, bucket_policy: BucketPolicy) -> &mut Self {
        self.0.bucket_policy = bucket_policy;

        self
    }

    /// Set the duration to wait for forwarded stores and fetches.
    pub fn request_timeout(&mut self, request_timeout: Duration) -> &mut Self {
        self.0.request_timeout = request_timeout;

        self
    }

    /// Set the number of hops operations started at this node may travel.
    pub fn max_hops(&mut self, max_hops: u8) -> &mut Self {
        self.0.max_hops = max_hops;

        self
    }

    /// Set the maximum number of values held in the local store.
    pub fn max_values(&mut self, max_values: usize) -> &mut Self {
        self.0.max_values = max_values;

        self
    }

    /// Set the [Digest] used to validate keys.
    pub fn digest(&mut self, digest: Arc<dyn Digest>) -> &mut Self {
        self.0.digest = digest;

        self
    }

    /// Create a Node from the options.
    pub fn build(&self) -> Result<Node, Error> {
        Node::new(self.0.clone())
    }
}

impl Node {
    /// Create a new node with the default [Config] and a random [Id].
    pub fn client() -> Result<Self, Error> {
        Node::builder().build()
    }

    /// Returns a builder to edit settings before creating a Node.
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Create a new node and spawn its actor thread.
    pub fn new(config: Config) -> Result<Self, Error> {
        if config.replication_factor == 0 {
            return Err(Error::InvalidConfig("replication_factor must be at least 1"));
        }
        let max_values = NonZeroUsize::new(config.max_values)
            .ok_or(Error::InvalidConfig("max_values must be at least 1"))?;

        let id = config.id.unwrap_or_else(Id::random);

        let (sender, receiver) = flume::unbounded();

        let actor = Actor::new(id, &config, max_values, receiver);

        thread::Builder::new()
            .name("xorstore-node".to_string())
            .spawn(move || actor.run())?;

        info!(%id, "Node started");

        Ok(Node {
            id,
            sender,
            digest: config.digest,
            request_timeout: config.request_timeout,
            max_hops: config.max_hops,
        })
    }

    // === Getters ===

    /// This node's [Id].
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Information and statistics about this node.
    pub fn info(&self) -> Result<Info, NodeWasShutdown> {
        self.request(ActorMessage::Info)?
            .recv()
            .map_err(|_| NodeWasShutdown)
    }

    /// A [PeerRef] to this node, to add to other nodes' routing tables.
    ///
    /// The reference doesn't keep this node alive, once every [Node] handle is
    /// dropped it answers with [PeerError::Unreachable].
    pub fn peer_ref(&self) -> PeerRef {
        PeerRef::new(Arc::new(WeakNode {
            id: self.id,
            sender: self.sender.downgrade(),
            digest: self.digest.clone(),
            request_timeout: self.request_timeout,
            max_hops: self.max_hops,
        }))
    }

    // === Public Methods ===

    /// Add a peer to this node's routing table, returns `true` if it was added.
    pub fn add_peer(&self, peer: PeerRef) -> Result<bool, NodeWasShutdown> {
        self.request(|sender| ActorMessage::AddPeer(peer, sender))?
            .recv()
            .map_err(|_| NodeWasShutdown)
    }

    /// Return up to `count` peers from this node's routing table, closest to `target` first.
    pub fn find_closest(&self, target: Id, count: usize) -> Result<Vec<PeerRef>, NodeWasShutdown> {
        self.request(|sender| ActorMessage::FindClosest(target, count, sender))?
            .recv()
            .map_err(|_| NodeWasShutdown)
    }

    /// Store a value under its key, and replicate it to the closest peers.
    ///
    /// Returns `Ok(false)` if `key` is not the digest of `value`, otherwise
    /// returns `Ok(true)` once the value is stored locally, whether or not
    /// replicating to other peers succeeded.
    pub fn store(&self, key: Id, value: impl Into<Bytes>) -> Result<bool, NodeWasShutdown> {
        self.store_request(StoreRequest {
            key,
            value: value.into(),
            trail: Trail::new(self.max_hops),
        })
    }

    /// Get the value stored under `key`, from this node or the closest peers.
    ///
    /// Returns `Ok(None)` if no reachable peer holds it.
    pub fn fetch(&self, key: Id) -> Result<Option<Bytes>, NodeWasShutdown> {
        self.fetch_request(FetchRequest {
            key,
            trail: Trail::new(self.max_hops),
        })
    }

    /// Shutdown the actor thread loop.
    ///
    /// Stored values are lost, and further calls return [NodeWasShutdown].
    pub fn shutdown(&self) {
        let (sender, receiver) = flume::bounded::<()>(1);

        let _ = self.sender.send(ActorMessage::Shutdown(sender));
        let _ = receiver.recv();
    }

    // === Private Methods ===

    /// Send a message to the actor, returning the receiver of its answer.
    pub(crate) fn request<T>(
        &self,
        message: impl FnOnce(Sender<T>) -> ActorMessage,
    ) -> Result<Receiver<T>, NodeWasShutdown> {
        let (sender, receiver) = flume::bounded::<T>(1);

        self.sender
            .send(message(sender))
            .map_err(|_| NodeWasShutdown)?;

        Ok(receiver)
    }

    fn store_request(&self, request: StoreRequest) -> Result<bool, NodeWasShutdown> {
        let StoreRequest {
            key,
            value,
            mut trail,
        } = request;

        if !self.digest.validate(&key, &value) {
            debug!(id = %self.id, %key, "Rejected a value that doesn't match its key");
            return Ok(false);
        }

        let outcome = self
            .request(|sender| ActorMessage::Store(key, value.clone(), sender))?
            .recv()
            .map_err(|_| NodeWasShutdown)?;

        let closest = match outcome {
            StoreOutcome::AlreadyStored => {
                trace!(id = %self.id, %key, "Value already stored");
                return Ok(true);
            }
            StoreOutcome::Stored(closest) => closest,
        };

        trail.visit(self.id);

        if let Some((targets, trail)) = trail.next_hop(closest) {
            self.replicate(StoreRequest { key, value, trail }, targets);
        }

        Ok(true)
    }

    /// Forward a store to `targets`, waiting at most for the request timeout.
    fn replicate(&self, request: StoreRequest, targets: Vec<PeerRef>) {
        let key = request.key;
        let mut replicas = 0;

        for (peer, result) in fan_out(targets, self.request_timeout, move |peer| {
            peer.handle_store(request.clone())
        }) {
            match result {
                Ok(true) => replicas += 1,
                Ok(false) => warn!(%key, %peer, "Peer rejected a valid value"),
                Err(error) => debug!(%key, ?error, "Replication to peer failed"),
            }
        }

        debug!(id = %self.id, %key, replicas, "Replicated value");
    }

    fn fetch_request(&self, request: FetchRequest) -> Result<Option<Bytes>, NodeWasShutdown> {
        let FetchRequest { key, mut trail } = request;

        let outcome = self
            .request(|sender| ActorMessage::Fetch(key, sender))?
            .recv()
            .map_err(|_| NodeWasShutdown)?;

        let closest = match outcome {
            FetchOutcome::Found(value) => return Ok(Some(value)),
            FetchOutcome::NotFound(closest) => closest,
        };

        trail.visit(self.id);

        let Some((targets, trail)) = trail.next_hop(closest) else {
            return Ok(None);
        };

        let request = FetchRequest { key, trail };

        // Returning early drops the fan-out, abandoning the other branches.
        for (peer, result) in fan_out(targets, self.request_timeout, move |peer| {
            peer.handle_fetch(request.clone())
        }) {
            match result {
                Ok(Some(value)) => {
                    trace!(id = %self.id, %key, %peer, "Found value");
                    return Ok(Some(value));
                }
                Ok(None) => {}
                Err(error) => debug!(%key, ?error, "Fetch from peer failed"),
            }
        }

        Ok(None)
    }
}

impl Peer for Node {
    fn id(&self) -> Id {
        self.id
    }

    fn handle_store(&self, request: StoreRequest) -> Result<bool, PeerError> {
        self.store_request(request)
            .map_err(|_| PeerError::Unreachable(self.id))
    }

    fn handle_fetch(&self, request: FetchRequest) -> Result<Option<Bytes>, PeerError> {
        self.fetch_request(request)
            .map_err(|_| PeerError::Unreachable(self.id))
    }

    fn find_closest(&self, target: Id, count: usize) -> Result<Vec<PeerRef>, PeerError> {
        Node::find_closest(self, target, count).map_err(|_| PeerError::Unreachable(self.id))
    }
}

/// A [Node] reachable from routing tables, without owning its actor.
struct WeakNode {
    id: Id,
    sender: WeakSender<ActorMessage>,
    digest: Arc<dyn Digest>,
    request_timeout: Duration,
    max_hops: u8,
}

impl WeakNode {
    fn upgrade(&self) -> Result<Node, PeerError> {
        let sender = self
            .sender
            .upgrade()
            .ok_or(PeerError::Unreachable(self.id))?;

        Ok(Node {
            id: self.id,
            sender,
            digest: self.digest.clone(),
            request_timeout: self.request_timeout,
            max_hops: self.max_hops,
        })
    }
}

impl Debug for WeakNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "WeakNode({})", self.id)
    }
}

impl Peer for WeakNode {
    fn id(&self) -> Id {
        self.id
    }

    fn handle_store(&self, request: StoreRequest) -> Result<bool, PeerError> {
        self.upgrade()?.handle_store(request)
    }

    fn handle_fetch(&self, request: FetchRequest) -> Result<Option<Bytes>, PeerError> {
        self.upgrade()?.handle_fetch(request)
    }

    fn find_closest(&self, target: Id, count: usize) -> Result<Vec<PeerRef>, PeerError> {
        Peer::find_closest(&self.upgrade()?, target, count)
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Node was shutdown")]
/// The node's actor thread is not running anymore.
pub struct NodeWasShutdown;
