//! Micro-benchmarks for RoutingTable operations: add, closest, and remove
//! at varying table sizes. Reports nanoseconds-per-operation.
//!
//! Run: `cargo bench --bench routing_table`

use std::sync::Arc;
use std::time::Instant;

use xorstore::{
    BucketPolicy, Bytes, FetchRequest, Id, Peer, PeerError, PeerRef, RoutingTable, StoreRequest,
};

/// Peer that is never called, only its id matters to the routing table.
#[derive(Debug)]
struct StubPeer(Id);

impl Peer for StubPeer {
    fn id(&self) -> Id {
        self.0
    }

    fn handle_store(&self, _request: StoreRequest) -> Result<bool, PeerError> {
        Err(PeerError::Unreachable(self.0))
    }

    fn handle_fetch(&self, _request: FetchRequest) -> Result<Option<Bytes>, PeerError> {
        Err(PeerError::Unreachable(self.0))
    }

    fn find_closest(&self, _target: Id, _count: usize) -> Result<Vec<PeerRef>, PeerError> {
        Err(PeerError::Unreachable(self.0))
    }
}

fn random_peer() -> PeerRef {
    PeerRef::new(Arc::new(StubPeer(Id::random())))
}

fn main() {
    println!("routing_table\n");

    bench_add();
    bench_closest();
    bench_remove();
}

fn bench_add() {
    println!("add");

    // Pre-generate random peers outside the timed section
    let peers: Vec<_> = (0..1000).map(|_| random_peer()).collect();

    for (name, policy) in [
        ("reject when full", BucketPolicy::default()),
        ("evict oldest", BucketPolicy::EvictOldest { k: 20 }),
        ("unbounded", BucketPolicy::Unbounded),
    ] {
        let mut table = RoutingTable::with_policy(Id::random(), policy);
        let start = Instant::now();
        for peer in peers.iter().cloned() {
            table.add(peer);
        }
        let per_op = start.elapsed().as_nanos() / peers.len() as u128;
        println!("{name:<17} {per_op}ns/op (final size: {})", table.size());
    }

    println!();
}

fn bench_closest() {
    println!("closest");

    let targets: Vec<_> = (0..1000).map(|_| Id::random()).collect();

    for size in [50, 100, 200, 400] {
        let mut table = RoutingTable::with_policy(Id::random(), BucketPolicy::Unbounded);
        for _ in 0..size {
            table.add(random_peer());
        }

        let start = Instant::now();
        for target in &targets {
            let _ = table.closest(target, 2);
        }
        let per_op = start.elapsed().as_nanos() / targets.len() as u128;
        println!("{size:>3} peers: {per_op}ns/op");
    }

    println!();
}

fn bench_remove() {
    println!("remove");

    let mut table = RoutingTable::new(Id::random());

    let mut ids = Vec::new();
    for _ in 0..200 {
        let peer = random_peer();
        ids.push(*peer.id());
        table.add(peer);
    }

    let n = ids.len();
    let start = Instant::now();
    for id in &ids {
        table.remove(id);
    }
    let per_op = start.elapsed().as_nanos() / n as u128;
    println!("{per_op}ns/op ({n} removals)");
    println!();
}
