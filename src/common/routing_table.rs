//! Kademlia routing table

use std::slice::Iter;

use crate::common::{Id, PeerRef, ID_BITS};

/// K = the default maximum size of a k-bucket.
pub const MAX_BUCKET_SIZE_K: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// What a [KBucket] does with a new peer once it is full.
pub enum BucketPolicy {
    /// Buckets grow without limit.
    Unbounded,
    /// Keep the `k` oldest peers, ignore newcomers.
    RejectWhenFull { k: usize },
    /// Drop the oldest peer to make room for the newcomer.
    EvictOldest { k: usize },
}

impl Default for BucketPolicy {
    fn default() -> Self {
        BucketPolicy::RejectWhenFull {
            k: MAX_BUCKET_SIZE_K,
        }
    }
}

impl BucketPolicy {
    fn capacity(&self) -> Option<usize> {
        match self {
            BucketPolicy::Unbounded => None,
            BucketPolicy::RejectWhenFull { k } | BucketPolicy::EvictOldest { k } => Some(*k),
        }
    }
}

#[derive(Debug, Clone)]
/// Kademlia routing table, one [KBucket] per possible bucket index.
pub struct RoutingTable {
    id: Id,
    buckets: [KBucket; ID_BITS],
}

impl RoutingTable {
    /// Create a new [RoutingTable] with a given id.
    pub fn new(id: Id) -> Self {
        Self::with_policy(id, BucketPolicy::default())
    }

    /// Create a new [RoutingTable] with a given id and [BucketPolicy].
    pub fn with_policy(id: Id, policy: BucketPolicy) -> Self {
        RoutingTable {
            id,
            buckets: std::array::from_fn(|_| KBucket::new(policy)),
        }
    }

    /// Returns the [Id] of this node, where the distance is measured from.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Index of the bucket `target` falls in, `None` for this table's own id.
    pub fn bucket_index(&self, target: &Id) -> Option<usize> {
        self.id.bucket_index(target)
    }

    // === Public Methods ===

    /// Attempts to add a peer to this routing table, and return `true` if it did.
    pub fn add(&mut self, peer: PeerRef) -> bool {
        let Some(index) = self.bucket_index(peer.id()) else {
            // Do not add self to the routing_table
            return false;
        };

        self.buckets[index].add(peer)
    }

    /// Remove a peer from this routing table.
    pub fn remove(&mut self, peer_id: &Id) {
        if let Some(index) = self.bucket_index(peer_id) {
            self.buckets[index].remove(peer_id)
        }
    }

    /// Returns `true` if a peer with this id is in the routing table.
    ///
    /// This is routing containment only, it says nothing about stored values.
    pub fn contains(&self, peer_id: &Id) -> bool {
        match self.bucket_index(peer_id) {
            Some(index) => self.buckets[index].contains(peer_id),
            None => false,
        }
    }

    /// Return up to `count` peers closest to the target, sorted by XOR distance
    /// then by id.
    ///
    /// Buckets are visited in classes of increasing distance to the target:
    /// the target's own bucket, then every bucket closer to this node (whose
    /// peers all share the same distance magnitude to the target), then the
    /// farther buckets one by one. Once enough peers are gathered from
    /// complete classes, no farther peer can be closer.
    pub fn closest(&self, target: &Id, count: usize) -> Vec<PeerRef> {
        if count == 0 {
            return vec![];
        }

        let mut candidates: Vec<PeerRef> = Vec::with_capacity(count);

        for class in self.classes(target) {
            for index in class {
                candidates.extend(self.buckets[index].iter().cloned());
            }

            if candidates.len() >= count {
                break;
            }
        }

        candidates.sort_by(|a, b| {
            a.id()
                .xor(target)
                .cmp(&b.id().xor(target))
                .then_with(|| a.id().cmp(b.id()))
        });
        candidates.truncate(count);

        candidates
    }

    /// Returns `true` if this routing table is empty.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.is_empty())
    }

    /// Return the number of peers in this routing table.
    pub fn size(&self) -> usize {
        self.peers().count()
    }

    /// Returns an iterator over the peers in this routing table, farthest buckets first.
    pub fn peers(&self) -> impl Iterator<Item = &PeerRef> {
        self.buckets.iter().flat_map(|bucket| bucket.iter())
    }

    // === Private Methods ===

    /// Groups of bucket indices, in increasing distance to the target.
    fn classes(&self, target: &Id) -> Vec<Vec<usize>> {
        match self.bucket_index(target) {
            Some(index) => {
                let mut classes = Vec::with_capacity(index + 2);

                classes.push(vec![index]);
                classes.push((index + 1..ID_BITS).collect());
                classes.extend((0..index).rev().map(|i| vec![i]));

                classes
            }
            // Looking up our own id, closer buckets are closer to the target.
            None => (0..ID_BITS).rev().map(|i| vec![i]).collect(),
        }
    }
}

/// A bucket of peers sharing the same distance magnitude to the table's owner.
#[derive(Debug, Clone)]
pub struct KBucket {
    policy: BucketPolicy,
    /// Peers in the k-bucket, sorted by the least recently added.
    peers: Vec<PeerRef>,
}

impl KBucket {
    pub fn new(policy: BucketPolicy) -> Self {
        KBucket {
            policy,
            peers: Vec::new(),
        }
    }

    // === Public Methods ===

    /// Add a peer, returns `false` if it was already there or rejected by the policy.
    pub fn add(&mut self, incoming: PeerRef) -> bool {
        if self.contains(incoming.id()) {
            return false;
        }

        match self.policy {
            BucketPolicy::EvictOldest { k } if self.peers.len() >= k => {
                if k == 0 {
                    return false;
                }
                self.peers.remove(0);
            }
            BucketPolicy::RejectWhenFull { k } if self.peers.len() >= k => return false,
            _ => {}
        }

        self.peers.push(incoming);

        true
    }

    pub fn remove(&mut self, peer_id: &Id) {
        self.peers.retain(|peer| peer.id() != peer_id);
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.iter().any(|peer| peer.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.policy
            .capacity()
            .is_some_and(|k| self.peers.len() >= k)
    }

    pub fn iter(&self) -> Iter<'_, PeerRef> {
        self.peers.iter()
    }
}
