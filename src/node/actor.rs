//! Actor thread owning a node's routing table and local store.

use std::num::NonZeroUsize;

use bytes::Bytes;
use flume::{Receiver, Sender};
use lru::LruCache;
use tracing::{debug, trace};

use crate::common::{Id, PeerRef, RoutingTable};

use super::{config::Config, info::Info};

#[derive(Debug)]
/// Single owner of a node's mutable state.
///
/// Every mutation of the routing table or the local store goes through this
/// actor's message queue, so they never race. The actor never calls other
/// peers, forwarding happens on the caller's side of the [crate::Node] handle.
pub struct Actor {
    routing_table: RoutingTable,
    /// Values stored at this node, keyed by their digest.
    values: LruCache<Id, Bytes>,
    replication_factor: usize,
    receiver: Receiver<ActorMessage>,
}

impl Actor {
    pub fn new(
        id: Id,
        config: &Config,
        max_values: NonZeroUsize,
        receiver: Receiver<ActorMessage>,
    ) -> Self {
        Self {
            routing_table: RoutingTable::with_policy(id, config.bucket_policy),
            values: LruCache::new(max_values),
            replication_factor: config.replication_factor,
            receiver,
        }
    }

    // === Getters ===

    pub fn id(&self) -> &Id {
        self.routing_table.id()
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn stored_values(&self) -> usize {
        self.values.len()
    }

    // === Public Methods ===

    /// Handle messages until shutdown, or until every [crate::Node] handle is dropped.
    pub fn run(mut self) {
        while let Ok(message) = self.receiver.recv() {
            match message {
                ActorMessage::Info(sender) => {
                    let _ = sender.send(Info::from(&self));
                }
                ActorMessage::AddPeer(peer, sender) => {
                    let added = self.routing_table.add(peer);
                    let _ = sender.send(added);
                }
                ActorMessage::FindClosest(target, count, sender) => {
                    let _ = sender.send(self.routing_table.closest(&target, count));
                }
                ActorMessage::Store(key, value, sender) => {
                    let _ = sender.send(self.store(key, value));
                }
                ActorMessage::Fetch(key, sender) => {
                    let _ = sender.send(self.fetch(&key));
                }
                ActorMessage::Shutdown(sender) => {
                    let _ = sender.send(());
                    break;
                }
            }
        }

        debug!(id = %self.id(), "Node actor thread stopped");
    }

    // === Private Methods ===

    /// Write a value whose key was already validated by the caller.
    fn store(&mut self, key: Id, value: Bytes) -> StoreOutcome {
        if self.values.contains(&key) {
            return StoreOutcome::AlreadyStored;
        }

        self.values.put(key, value);
        trace!(id = %self.id(), %key, "Stored value");

        StoreOutcome::Stored(self.routing_table.closest(&key, self.replication_factor))
    }

    fn fetch(&mut self, key: &Id) -> FetchOutcome {
        match self.values.get(key) {
            Some(value) => FetchOutcome::Found(value.clone()),
            None => FetchOutcome::NotFound(self.routing_table.closest(key, self.replication_factor)),
        }
    }
}

#[derive(Debug)]
pub enum ActorMessage {
    Info(Sender<Info>),
    AddPeer(PeerRef, Sender<bool>),
    FindClosest(Id, usize, Sender<Vec<PeerRef>>),
    Store(Id, Bytes, Sender<StoreOutcome>),
    Fetch(Id, Sender<FetchOutcome>),
    Shutdown(Sender<()>),
}

#[derive(Debug)]
pub enum StoreOutcome {
    /// The key was already held, nothing to forward.
    AlreadyStored,
    /// Newly stored, along with the closest peers to forward it to.
    Stored(Vec<PeerRef>),
}

#[derive(Debug)]
pub enum FetchOutcome {
    Found(Bytes),
    /// Not held locally, along with the closest peers to ask instead.
    NotFound(Vec<PeerRef>),
}
