//! In-process overlay of fully connected nodes.

use crate::{Config, Error, Id, Node};

#[derive(Debug)]
/// Create a testnet of nodes that all know each other.
///
/// Every node is shutdown when the testnet is dropped.
pub struct Testnet {
    pub nodes: Vec<Node>,
}

impl Testnet {
    /// Create `count` nodes with random ids and the default [Config].
    pub fn new(count: usize) -> Result<Testnet, Error> {
        Testnet::with_config(count, Config::default())
    }

    /// Create `count` nodes with random ids, sharing the same `config`.
    pub fn with_config(count: usize, config: Config) -> Result<Testnet, Error> {
        Testnet::from_ids((0..count).map(|_| Id::random()), config)
    }

    /// Create one node per id, sharing the same `config`.
    ///
    /// The id set in `config` is ignored.
    pub fn from_ids(ids: impl IntoIterator<Item = Id>, config: Config) -> Result<Testnet, Error> {
        let nodes = ids
            .into_iter()
            .map(|id| {
                Node::new(Config {
                    id: Some(id),
                    ..config.clone()
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let testnet = Testnet { nodes };

        for node in &testnet.nodes {
            for other in &testnet.nodes {
                if node.id() != other.id() {
                    node.add_peer(other.peer_ref())?;
                }
            }
        }

        Ok(testnet)
    }
}

impl Drop for Testnet {
    fn drop(&mut self) {
        for node in &self.nodes {
            node.shutdown();
        }
    }
}
