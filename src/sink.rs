use serde::Serialize;

use crate::error::{Error, Result};

/// Literal prefix the original tool puts on the wire ahead of every JSON
/// payload (`spec.md` §6).
const WIRE_PREFIX: &str = "APPS sniff ";

/// One completed observation, published to the sink exactly once per
/// matched (request, response) pair (`spec.md` §3, §6).
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub service_id: String,
    pub tenant_id: String,
    pub sql: String,
    /// Latency in microseconds (nanoseconds / 1000, as floating point).
    pub time: f64,
    /// Request payload byte count.
    pub size: usize,
    /// Lowercased first token of `sql` with asterisks stripped.
    pub operate: String,
}

impl Observation {
    /// Derives `operate` from a fingerprint: the first whitespace-delimited
    /// token, lowercased, with `*` stripped (`spec.md` §3).
    pub fn operate_of(fingerprint: &str) -> String {
        fingerprint
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_lowercase()
            .replace('*', "")
    }

    /// JSON-encodes this observation, matching the field set in
    /// `spec.md` §6 (field order is irrelevant there; `serde_json`'s
    /// struct-field order is used here).
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::SinkUnavailable(e.to_string()))
    }

    /// The full wire payload: the literal prefix followed by the JSON
    /// encoding (`spec.md` §6).
    pub fn to_wire_payload(&self) -> Result<String> {
        Ok(format!("{WIRE_PREFIX}{}", self.to_json()?))
    }
}

/// Publish collaborator (`spec.md` §6): accepts `(topic, payload)` and is
/// allowed to drop or buffer. The core never blocks packet ingestion on
/// this call succeeding (§9 "Publish sink is fire-and-forget").
pub trait Sink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;
}

/// ZeroMQ PUB-socket sink. Sends each observation as a two-frame
/// multipart message: the topic frame, then the payload frame
/// (`spec.md` §6), with no acknowledgement.
pub struct ZmqSink {
    socket: zmq::Socket,
}

impl ZmqSink {
    pub fn bind(addr: &str) -> Result<Self> {
        let ctx = zmq::Context::new();
        let socket = ctx
            .socket(zmq::PUB)
            .map_err(|e| Error::DeviceOpen(e.to_string()))?;
        socket
            .bind(addr)
            .map_err(|e| Error::DeviceOpen(e.to_string()))?;
        Ok(Self { socket })
    }
}

impl Sink for ZmqSink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.socket
            .send(topic, zmq::SNDMORE)
            .map_err(|e| Error::SinkUnavailable(e.to_string()))?;
        self.socket
            .send(payload, 0)
            .map_err(|e| Error::SinkUnavailable(e.to_string()))?;
        Ok(())
    }
}

/// In-memory sink for tests: collects every published `(topic, payload)`
/// pair instead of touching a real socket.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub published: Vec<(String, String)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for RecordingSink {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        self.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
