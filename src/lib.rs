#![doc = include_str!("../README.md")]
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

mod common;
mod error;
mod node;
mod testnet;

#[cfg(feature = "async")]
pub mod async_node;

pub use crate::common::{
    hash_value, BucketPolicy, Digest, FetchRequest, Id, KBucket, Peer, PeerError, PeerRef,
    RoutingTable, Sha1Digest, StoreRequest, Trail, ID_BITS, ID_SIZE, MAX_BUCKET_SIZE_K,
};
pub use crate::error::Error;
pub use crate::node::{
    Config, Info, Node, NodeBuilder, NodeWasShutdown, DEFAULT_MAX_HOPS,
    DEFAULT_REPLICATION_FACTOR, DEFAULT_REQUEST_TIMEOUT, MAX_VALUES,
};
pub use crate::testnet::Testnet;
pub use bytes::Bytes;
