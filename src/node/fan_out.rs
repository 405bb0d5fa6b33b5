//! Concurrent calls to a set of peers, joined against a deadline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError};
use tracing::warn;

use crate::common::{Id, Peer, PeerError, PeerRef};

/// Call every peer on its own thread and iterate over their results as they arrive.
///
/// Peers that didn't answer once `timeout` elapsed are yielded as [PeerError::Timeout],
/// exactly once each, even if their answer arrives while the caller is still
/// iterating.
/// Dropping the iterator abandons the remaining calls, their threads run to
/// completion and their results are discarded.
pub(crate) fn fan_out<T, F>(peers: Vec<PeerRef>, timeout: Duration, call: F) -> FanOut<T>
where
    T: Send + 'static,
    F: Fn(&dyn Peer) -> Result<T, PeerError> + Send + Sync + 'static,
{
    let (sender, receiver) = flume::unbounded();
    let call = Arc::new(call);
    let mut pending = BTreeSet::new();

    for peer in peers {
        let id = *peer.id();
        pending.insert(id);

        let branch_sender = sender.clone();
        let call = call.clone();

        let spawned = thread::Builder::new()
            .name("xorstore-fan-out".to_string())
            .spawn(move || {
                let result = call(peer.endpoint().as_ref());
                let _ = branch_sender.send((id, result));
            });

        if let Err(error) = spawned {
            warn!(peer = %id, ?error, "Could not spawn a thread to call peer");
            let _ = sender.send((id, Err(PeerError::Unreachable(id))));
        }
    }

    FanOut {
        receiver,
        pending,
        deadline: Instant::now() + timeout,
    }
}

#[derive(Debug)]
pub(crate) struct FanOut<T> {
    receiver: Receiver<(Id, Result<T, PeerError>)>,
    /// Peers that haven't answered yet.
    pending: BTreeSet<Id>,
    deadline: Instant,
}

impl<T> Iterator for FanOut<T> {
    type Item = (Id, Result<T, PeerError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.pending.is_empty() {
                return None;
            }

            // Past the deadline, late answers are ignored.
            if Instant::now() >= self.deadline {
                let id = self.pending.pop_first()?;
                return Some((id, Err(PeerError::Timeout(id))));
            }

            match self.receiver.recv_deadline(self.deadline) {
                Ok((id, result)) => {
                    if self.pending.remove(&id) {
                        return Some((id, result));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // A branch ended without answering.
                Err(RecvTimeoutError::Disconnected) => {
                    let id = self.pending.pop_first()?;
                    return Some((id, Err(PeerError::Unreachable(id))));
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use bytes::Bytes;

    use super::*;
    use crate::common::{FetchRequest, StoreRequest};

    #[derive(Debug)]
    struct SleepyPeer {
        id: Id,
        sleep: Duration,
    }

    impl Peer for SleepyPeer {
        fn id(&self) -> Id {
            self.id
        }

        fn handle_store(&self, _request: StoreRequest) -> Result<bool, PeerError> {
            thread::sleep(self.sleep);
            Ok(true)
        }

        fn handle_fetch(&self, _request: FetchRequest) -> Result<Option<Bytes>, PeerError> {
            thread::sleep(self.sleep);
            Ok(Some(Bytes::from_static(b"late")))
        }

        fn find_closest(&self, _target: Id, _count: usize) -> Result<Vec<PeerRef>, PeerError> {
            Err(PeerError::Unreachable(self.id))
        }
    }

    fn sleepy(sleep: Duration) -> PeerRef {
        PeerRef::new(Arc::new(SleepyPeer {
            id: Id::random(),
            sleep,
        }))
    }

    #[test]
    fn collects_every_result() {
        let peers = vec![sleepy(Duration::ZERO), sleepy(Duration::ZERO)];
        let ids: BTreeSet<Id> = peers.iter().map(|p| *p.id()).collect();

        let results: Vec<_> = fan_out(peers, Duration::from_secs(5), |peer| {
            peer.find_closest(peer.id(), 1)
        })
        .collect();

        assert_eq!(results.len(), 2);
        for (id, result) in results {
            assert!(ids.contains(&id));
            assert_eq!(result, Err(PeerError::Unreachable(id)));
        }
    }

    #[test]
    fn times_out_slow_peers() {
        let fast = sleepy(Duration::ZERO);
        let slow = sleepy(Duration::from_secs(2));
        let slow_id = *slow.id();

        let start = Instant::now();

        let results: Vec<_> = fan_out(
            vec![fast, slow],
            Duration::from_millis(100),
            |peer| {
                peer.handle_fetch(FetchRequest {
                    key: Id::random(),
                    trail: crate::common::Trail::new(1),
                })
            },
        )
        .collect();

        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(results.len(), 2);
        assert!(results
            .iter()
            .any(|(id, result)| id == &slow_id && result == &Err(PeerError::Timeout(slow_id))));
    }

    #[test]
    fn no_peers() {
        let mut results = fan_out(vec![], Duration::from_secs(5), |peer| {
            peer.find_closest(peer.id(), 1)
        });

        assert!(results.next().is_none());
    }

    #[test]
    fn ignores_answers_after_deadline() {
        let peers = vec![
            sleepy(Duration::from_millis(200)),
            sleepy(Duration::from_millis(200)),
        ];
        let ids: BTreeSet<Id> = peers.iter().map(|p| *p.id()).collect();

        let mut results = fan_out(peers, Duration::from_millis(50), |peer| {
            peer.handle_store(StoreRequest {
                key: Id::random(),
                value: Bytes::from_static(b"v"),
                trail: crate::common::Trail::new(1),
            })
        });

        let first = results.next().unwrap();

        // Slow consumer, both answers are in the channel by now.
        thread::sleep(Duration::from_millis(400));

        let mut all = vec![first];
        all.extend(results);

        assert_eq!(all.len(), 2);
        for (id, result) in &all {
            assert_eq!(result, &Err(PeerError::Timeout(*id)));
        }
        assert_eq!(all.iter().map(|(id, _)| *id).collect::<BTreeSet<_>>(), ids);
    }
}
