use std::collections::HashMap;
use std::time::{Duration, Instant};

/// One client TCP connection to the configured MySQL server, identified
/// by client `ip:port` (`spec.md` §3, GLOSSARY "Flow").
#[derive(Debug)]
pub struct FlowState {
    pub client_addr: String,
    pub client_ip: String,
    pub synced: bool,
    /// Unused payload bytes left over from a partial request frame.
    pub req_buffer: Vec<u8>,
    /// Unused payload bytes left over from a partial response frame.
    pub resp_buffer: Vec<u8>,
    pub req_sent_at: Option<Instant>,
    pub pending_fingerprint: String,
    pub pending_raw_body: String,
    pub pending_bytes: usize,
    pub last_seen_at: Instant,
}

impl FlowState {
    pub fn new(client_addr: String, client_ip: String, now: Instant) -> Self {
        Self {
            client_addr,
            client_ip,
            synced: false,
            req_buffer: Vec::new(),
            resp_buffer: Vec::new(),
            req_sent_at: None,
            pending_fingerprint: String::new(),
            pending_raw_body: String::new(),
            pending_bytes: 0,
            last_seen_at: now,
        }
    }

    /// Invariant: a request is in flight iff both fields are set
    /// together (`spec.md` §3).
    pub fn has_pending_request(&self) -> bool {
        self.req_sent_at.is_some()
    }

    pub fn clear_pending(&mut self) {
        self.req_sent_at = None;
        self.pending_fingerprint.clear();
        self.pending_raw_body.clear();
        self.pending_bytes = 0;
    }
}

/// Maps `client_addr` to per-flow state and evicts idle flows
/// (`spec.md` §4.2). The sweep never runs inline with packet handling —
/// the driver calls [`FlowTable::evict_idle`] on its own cooperative
/// timer tick (§4.9).
#[derive(Debug, Default)]
pub struct FlowTable {
    flows: HashMap<String, FlowState>,
}

impl FlowTable {
    pub fn new() -> Self {
        Self {
            flows: HashMap::new(),
        }
    }

    pub fn get_or_create(&mut self, client_addr: &str, client_ip: &str, now: Instant) -> &mut FlowState {
        self.flows
            .entry(client_addr.to_string())
            .or_insert_with(|| FlowState::new(client_addr.to_string(), client_ip.to_string(), now))
    }

    pub fn remove(&mut self, client_addr: &str) -> Option<FlowState> {
        self.flows.remove(client_addr)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Removes every flow whose `last_seen_at` is older than `max_idle`.
    /// Returns the number of flows evicted.
    pub fn evict_idle(&mut self, now: Instant, max_idle: Duration) -> usize {
        let before = self.flows.len();
        self.flows
            .retain(|_, flow| now.duration_since(flow.last_seen_at) < max_idle);
        before - self.flows.len()
    }
}
