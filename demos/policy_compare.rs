//! Runs one zipf-skewed page trace through every policy and prints the hit
//! ratios side by side.
//!
//! Run with: `cargo run --example policy_compare`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Zipf};

use pagecache::builder::{CacheBuilder, ALL_POLICIES};

const CAPACITY: usize = 256;
const KEYS: u64 = 4096;
const OPS: usize = 200_000;

fn main() {
    // one shared trace so the policies compete on equal footing
    let mut rng = StdRng::seed_from_u64(42);
    let zipf = Zipf::new(KEYS, 0.9).expect("zipf");
    let trace: Vec<u64> = (0..OPS)
        .map(|_| {
            if rng.gen_bool(0.05) {
                // occasional scan burst
                rng.gen_range(0..KEYS)
            } else {
                zipf.sample(&mut rng) as u64
            }
        })
        .collect();

    println!("{:>8}  {:>10}  {:>10}  {:>10}", "policy", "hits", "misses", "hit ratio");
    for kind in ALL_POLICIES {
        let mut cache = CacheBuilder::new(CAPACITY).build::<u64, u64>(kind);
        for &key in &trace {
            if cache.lookup(&key).is_none() {
                let _ = cache.insert(key, key);
            }
        }
        let stats = cache.stats();
        println!(
            "{:>8}  {:>10}  {:>10}  {:>9.1}%",
            cache.policy_name(),
            stats.hits,
            stats.misses,
            stats.hit_ratio() * 100.0
        );
    }
}
