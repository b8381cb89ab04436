use std::collections::HashMap;

use rand::Rng;

/// Fixed-size slot count for both the per-flow and global latency arrays
/// (`spec.md` §4.7).
pub const RESERVOIR_SIZE: usize = 10_000;

/// A uniform-overwrite latency array: each sample lands on a uniformly
/// random slot rather than a reservoir-sampled one. This biases the
/// distribution relative to a true reservoir sampler (Algorithm R), but
/// is preserved for parity with the source (`spec.md` §9) — it still
/// supplies coarse percentile estimates cheaply and without unbounded
/// growth.
#[derive(Debug)]
pub struct LatencyReservoir {
    slots: Vec<f64>,
    filled: usize,
}

impl LatencyReservoir {
    pub fn new() -> Self {
        Self {
            slots: vec![0.0; RESERVOIR_SIZE],
            filled: 0,
        }
    }

    /// Writes `sample_us` into a uniformly random slot.
    pub fn record(&mut self, sample_us: f64) {
        let idx = rand::thread_rng().gen_range(0..RESERVOIR_SIZE);
        self.slots[idx] = sample_us;
        self.filled = self.filled.saturating_add(1).min(RESERVOIR_SIZE);
    }

    pub fn samples(&self) -> &[f64] {
        &self.slots[..self.filled]
    }
}

impl Default for LatencyReservoir {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-fingerprint accumulator (`spec.md` §3 "Aggregated bucket", §4.8).
#[derive(Debug, Default)]
pub struct Bucket {
    pub count: u64,
    pub total_bytes: u64,
    pub latency: LatencyReservoir,
}

/// Optional summary mode: maps a rendered fingerprint to a [`Bucket`],
/// updated on every request from the pairing engine. Not required for
/// the publish-to-sink flow (`spec.md` §4.8).
#[derive(Debug, Default)]
pub struct Aggregator {
    buckets: HashMap<String, Bucket>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, fingerprint: &str, bytes: usize, latency_us: f64) {
        let bucket = self.buckets.entry(fingerprint.to_string()).or_default();
        bucket.count += 1;
        bucket.total_bytes += bytes as u64;
        bucket.latency.record(latency_us);
    }

    pub fn bucket(&self, fingerprint: &str) -> Option<&Bucket> {
        self.buckets.get(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
