//! AsyncNode node.

use std::thread;

use bytes::Bytes;
use tracing::warn;

use crate::common::{Id, PeerRef};
use crate::node::{ActorMessage, Info, Node, NodeWasShutdown};

impl Node {
    /// Return an async version of the Node handle.
    pub fn as_async(self) -> AsyncNode {
        AsyncNode(self)
    }
}

#[derive(Debug, Clone)]
/// Async version of the [Node] handle.
pub struct AsyncNode(Node);

impl AsyncNode {
    // === Getters ===

    /// This node's [Id].
    pub fn id(&self) -> &Id {
        self.0.id()
    }

    /// Information and statistics about this node.
    pub async fn info(&self) -> Result<Info, NodeWasShutdown> {
        self.0
            .request(ActorMessage::Info)?
            .recv_async()
            .await
            .map_err(|_| NodeWasShutdown)
    }

    // === Public Methods ===

    /// See [Node::add_peer].
    pub async fn add_peer(&self, peer: PeerRef) -> Result<bool, NodeWasShutdown> {
        self.0
            .request(|sender| ActorMessage::AddPeer(peer, sender))?
            .recv_async()
            .await
            .map_err(|_| NodeWasShutdown)
    }

    /// See [Node::find_closest].
    pub async fn find_closest(
        &self,
        target: Id,
        count: usize,
    ) -> Result<Vec<PeerRef>, NodeWasShutdown> {
        self.0
            .request(|sender| ActorMessage::FindClosest(target, count, sender))?
            .recv_async()
            .await
            .map_err(|_| NodeWasShutdown)
    }

    /// See [Node::store].
    pub async fn store(&self, key: Id, value: impl Into<Bytes>) -> Result<bool, NodeWasShutdown> {
        let value = value.into();

        self.on_thread(move |node| node.store(key, value)).await
    }

    /// See [Node::fetch].
    pub async fn fetch(&self, key: Id) -> Result<Option<Bytes>, NodeWasShutdown> {
        self.on_thread(move |node| node.fetch(key)).await
    }

    /// Shutdown the actor thread loop.
    pub async fn shutdown(&self) {
        if let Ok(receiver) = self.0.request(ActorMessage::Shutdown) {
            let _ = receiver.recv_async().await;
        }
    }

    // === Private Methods ===

    /// Run a blocking operation that fans out to peers on its own thread.
    async fn on_thread<T, F>(&self, operation: F) -> Result<T, NodeWasShutdown>
    where
        T: Send + 'static,
        F: FnOnce(Node) -> Result<T, NodeWasShutdown> + Send + 'static,
    {
        let (sender, receiver) = flume::bounded::<Result<T, NodeWasShutdown>>(1);
        let node = self.0.clone();

        thread::Builder::new()
            .name("xorstore-async".to_string())
            .spawn(move || {
                let _ = sender.send(operation(node));
            })
            .map_err(|error| {
                warn!(?error, "Could not spawn a thread for a blocking operation");
                NodeWasShutdown
            })?;

        receiver.recv_async().await.map_err(|_| NodeWasShutdown)?
    }
}

#[cfg(test)]
mod test {
    use futures::executor::block_on;

    use super::*;
    use crate::{hash_value, Testnet};

    #[test]
    fn store_and_fetch() {
        let testnet = Testnet::new(3).unwrap();

        let a = testnet.nodes[0].clone().as_async();
        let b = testnet.nodes[2].clone().as_async();

        let key = hash_value(b"async");

        block_on(async {
            assert!(a.store(key, &b"async"[..]).await.unwrap());

            assert_eq!(
                b.fetch(key).await.unwrap(),
                Some(Bytes::from_static(b"async"))
            );

            assert_eq!(b.find_closest(key, 5).await.unwrap().len(), 2);
            assert_eq!(b.info().await.unwrap().stored_values(), 1);
        });
    }

    #[test]
    fn shutdown() {
        let node = Node::client().unwrap().as_async();

        block_on(async {
            node.shutdown().await;

            assert!(node.info().await.is_err());
            assert!(node.fetch(Id::random()).await.is_err());
        });
    }
}
