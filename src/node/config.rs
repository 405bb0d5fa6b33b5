use std::{sync::Arc, time::Duration};

use crate::common::{BucketPolicy, Digest, Id, Sha1Digest};

/// Default number of closest peers a store or a fetch is forwarded to at each hop.
pub const DEFAULT_REPLICATION_FACTOR: usize = 2;
/// Default time to wait for peers a store or fetch was forwarded to.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000); // 2 seconds
/// Default number of hops a store or a fetch may travel.
pub const DEFAULT_MAX_HOPS: u8 = 8;
/// Default maximum number of values held in a node's local store.
pub const MAX_VALUES: usize = 1000;

#[derive(Debug, Clone)]
/// Node configurations
pub struct Config {
    /// This node's [Id].
    ///
    /// Defaults to None, where a random Id is generated.
    pub id: Option<Id>,
    /// Number of closest peers to forward stores and fetches to.
    ///
    /// Defaults to [DEFAULT_REPLICATION_FACTOR]
    pub replication_factor: usize,
    /// What routing table buckets do once they are full.
    ///
    /// Defaults to [BucketPolicy::RejectWhenFull] with `k = 20`
    pub bucket_policy: BucketPolicy,
    /// How long to wait for peers that a store or a fetch was forwarded to.
    ///
    /// Peers that don't answer in time are abandoned, their result (if any) is ignored.
    ///
    /// Defaults to [DEFAULT_REQUEST_TIMEOUT]
    pub request_timeout: Duration,
    /// Number of hops an operation started at this node may travel.
    ///
    /// Defaults to [DEFAULT_MAX_HOPS]
    pub max_hops: u8,
    /// Maximum number of values held locally, least recently used values are
    /// evicted first.
    ///
    /// Defaults to [MAX_VALUES]
    pub max_values: usize,
    /// Digest used to validate that keys match their values.
    ///
    /// Defaults to [Sha1Digest]
    pub digest: Arc<dyn Digest>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
            bucket_policy: BucketPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_hops: DEFAULT_MAX_HOPS,
            max_values: MAX_VALUES,
            digest: Arc::new(Sha1Digest),
        }
    }
}
