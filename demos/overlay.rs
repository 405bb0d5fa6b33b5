//! Store random values from random peers of a local overlay, then fetch a
//! random sample of them from other random peers.
//!
//! Run: `cargo run --release --example overlay -- --peers 100 --values 200 --fetches 100`

use std::time::Instant;

use clap::Parser;
use histo::Histogram;
use rand::{seq::SliceRandom, Rng};
use tracing::Level;
use xorstore::{hash_value, Config, Testnet};

#[derive(Parser)]
struct Cli {
    /// Number of peers in the overlay
    #[arg(short, long, default_value_t = 100)]
    peers: usize,
    /// Number of random values to store
    #[arg(short, long, default_value_t = 200)]
    values: usize,
    /// Number of random keys to fetch
    #[arg(short, long, default_value_t = 100)]
    fetches: usize,
    /// Number of closest peers each hop forwards to
    #[arg(short, long, default_value_t = xorstore::DEFAULT_REPLICATION_FACTOR)]
    replication_factor: usize,
    /// Log debug messages
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<(), xorstore::Error> {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let testnet = Testnet::with_config(
        cli.peers,
        Config {
            replication_factor: cli.replication_factor,
            ..Config::default()
        },
    )?;

    let mut rng = rand::thread_rng();

    let values: Vec<String> = (0..cli.values).map(|_| random_string(&mut rng, 10)).collect();

    for value in &values {
        if let Some(node) = testnet.nodes.choose(&mut rng) {
            node.store(hash_value(value.as_bytes()), value.clone())?;
        }
    }

    let mut latencies = Histogram::with_buckets(10);
    let mut found = 0;

    for _ in 0..cli.fetches {
        let (Some(value), Some(node)) = (values.choose(&mut rng), testnet.nodes.choose(&mut rng))
        else {
            break;
        };
        let key = hash_value(value.as_bytes());

        let start = Instant::now();
        let result = node.fetch(key)?;
        latencies.add(start.elapsed().as_micros() as u64);

        match result {
            Some(value) => {
                found += 1;
                println!("Key: {key:X} , Value: {}", String::from_utf8_lossy(&value));
            }
            None => println!("Key: {key:X} , Value not found"),
        }
    }

    println!("\nFound {found}/{} values", cli.fetches);
    println!("Fetch latency (µs):\n{latencies}");

    Ok(())
}

fn random_string(rng: &mut impl Rng, length: usize) -> String {
    const CHARACTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

    (0..length)
        .map(|_| CHARACTERS[rng.gen_range(0..CHARACTERS.len())] as char)
        .collect()
}
