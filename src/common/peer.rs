//! Peer capability and the requests forwarded between peers.

use std::collections::BTreeSet;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use bytes::Bytes;

use crate::Id;

/// Anything that can take part in the overlay: an in-process [crate::Node],
/// or a stub forwarding calls over some transport.
pub trait Peer: Debug + Send + Sync {
    /// The [Id] of this peer.
    fn id(&self) -> Id;

    /// Store a value on this peer, continuing the replication described by `request`.
    ///
    /// Returns `Ok(false)` if the value doesn't match its key.
    fn handle_store(&self, request: StoreRequest) -> Result<bool, PeerError>;

    /// Look up a value on this peer, continuing the lookup described by `request`.
    fn handle_fetch(&self, request: FetchRequest) -> Result<Option<Bytes>, PeerError>;

    /// Ask this peer for the `count` peers it knows closest to `target`.
    fn find_closest(&self, target: Id, count: usize) -> Result<Vec<PeerRef>, PeerError>;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Failure to reach a remote peer, never escalated past the fan-out.
pub enum PeerError {
    #[error("Peer {0} is unreachable")]
    /// The peer is gone or its transport failed.
    Unreachable(Id),

    #[error("Peer {0} timed out")]
    /// The peer didn't answer within the request timeout.
    Timeout(Id),
}

#[derive(Clone)]
/// Reference to a peer held in routing tables.
///
/// The same peer is usually referenced by many routing tables at once.
pub struct PeerRef {
    id: Id,
    endpoint: Arc<dyn Peer>,
}

impl PeerRef {
    /// Creates a new reference, caching the endpoint's [Id].
    pub fn new(endpoint: Arc<dyn Peer>) -> Self {
        PeerRef {
            id: endpoint.id(),
            endpoint,
        }
    }

    // === Getters ===

    pub fn id(&self) -> &Id {
        &self.id
    }

    pub fn endpoint(&self) -> &Arc<dyn Peer> {
        &self.endpoint
    }
}

impl Debug for PeerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "PeerRef({})", self.id)
    }
}

impl PartialEq for PeerRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PeerRef {}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Call scoped state of one logical store or fetch, carried from hop to hop.
///
/// Holds every peer already asked to handle the operation and the number of
/// hops the operation may still travel.
pub struct Trail {
    visited: BTreeSet<Id>,
    hops_remaining: u8,
}

impl Trail {
    /// Creates a fresh trail for an operation starting at the caller.
    pub fn new(max_hops: u8) -> Self {
        Trail {
            visited: BTreeSet::new(),
            hops_remaining: max_hops,
        }
    }

    // === Getters ===

    pub fn hops_remaining(&self) -> u8 {
        self.hops_remaining
    }

    pub fn has_visited(&self, id: &Id) -> bool {
        self.visited.contains(id)
    }

    // === Public Methods ===

    /// Mark a peer as visited.
    pub fn visit(&mut self, id: Id) {
        self.visited.insert(id);
    }

    /// Filter `candidates` down to peers that weren't visited yet, and returns
    /// them with the trail to hand to each of them.
    ///
    /// Returns `None` if the hop budget is spent or no candidate is left.
    pub fn next_hop(&self, candidates: Vec<PeerRef>) -> Option<(Vec<PeerRef>, Trail)> {
        if self.hops_remaining == 0 {
            return None;
        }

        let targets: Vec<PeerRef> = candidates
            .into_iter()
            .filter(|peer| !self.has_visited(peer.id()))
            .collect();

        if targets.is_empty() {
            return None;
        }

        let mut next = Trail {
            visited: self.visited.clone(),
            hops_remaining: self.hops_remaining - 1,
        };

        for peer in &targets {
            next.visit(*peer.id());
        }

        Some((targets, next))
    }
}

#[derive(Debug, Clone)]
/// A store forwarded to a peer.
pub struct StoreRequest {
    pub key: Id,
    pub value: Bytes,
    pub trail: Trail,
}

#[derive(Debug, Clone)]
/// A fetch forwarded to a peer.
pub struct FetchRequest {
    pub key: Id,
    pub trail: Trail,
}
