use std::time::Instant;

use crate::aggregate::{Aggregator, LatencyReservoir};
use crate::canonical::canonicalize;
use crate::config::{Config, FlowLifecycle};
use crate::constant::DML_VERBS;
use crate::error::Result;
use crate::flow::FlowState;
use crate::format::{RenderInput, Template};
use crate::packet::{self, PTYPE_INCOMPLETE};
use crate::sink::Observation;
use crate::wire::Direction;

/// What the caller should do with a flow after [`PairingEngine::on_payload`]
/// returns.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
    /// The flow stays in the table unchanged (or was mutated in place,
    /// e.g. reset to `Unsynced`).
    Keep,
    /// The flow should be removed from the table — either because it
    /// just emitted under `destroy_on_emit`, or because a non-DML
    /// response still ends its one-shot lifetime under that mode
    /// (`spec.md` §4.7, §9).
    Remove,
}

/// Result of processing one `(direction, payload)` event.
pub struct Outcome {
    pub action: Action,
    pub observation: Option<Observation>,
    /// A human-readable rendered line for the emitted query, per the
    /// configured `-f` template (§4.6). Not part of the JSON payload;
    /// intended for the driver's log output.
    pub rendered_line: Option<String>,
}

impl Outcome {
    fn keep() -> Self {
        Self {
            action: Action::Keep,
            observation: None,
            rendered_line: None,
        }
    }
}

/// The state machine at the heart of the system (`spec.md` §4.7). One
/// logical instance runs per flow; the engine itself is stateless across
/// flows and holds only process-wide config, counters, and the global
/// latency reservoir.
pub struct PairingEngine {
    canonicalize: bool,
    template: Template,
    lifecycle: FlowLifecycle,
    service_id: String,
    tenant_id: String,
    pub desyncs: u64,
    pub global_latency: LatencyReservoir,
}

impl PairingEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            canonicalize: config.canonicalize,
            template: Template::parse(&config.format),
            lifecycle: config.lifecycle,
            service_id: config.service_id.clone(),
            tenant_id: config.tenant_id.clone(),
            desyncs: 0,
            global_latency: LatencyReservoir::new(),
        }
    }

    /// Processes one captured TCP payload for `flow`, carving as many
    /// complete MySQL frames as are available and driving the state
    /// machine through each (`spec.md` §4.2–§4.7). `aggregator` is
    /// optional (§4.8) and only touched when present.
    pub fn on_payload(
        &mut self,
        flow: &mut FlowState,
        direction: Direction,
        payload: &[u8],
        now: Instant,
        aggregator: Option<&mut Aggregator>,
    ) -> Result<Outcome> {
        flow.last_seen_at = now;

        match direction {
            Direction::Request => {
                flow.req_buffer.extend_from_slice(payload);
                loop {
                    let carved = packet::carve(&flow.req_buffer);
                    if carved.ptype == PTYPE_INCOMPLETE {
                        break;
                    }
                    let ptype = carved.ptype;
                    let body_len = carved.body.len();
                    let rest_len = carved.rest.len();
                    let body: Vec<u8> = carved.body.to_vec();
                    let consumed = flow.req_buffer.len() - rest_len;
                    flow.req_buffer.drain(0..consumed);
                    debug_assert_eq!(flow.req_buffer.len(), rest_len);
                    let _ = body_len;
                    self.on_request_frame(flow, ptype, &body, now)?;
                }
                Ok(Outcome::keep())
            }
            Direction::Response => self.on_response(flow, now, aggregator),
        }
    }

    fn on_request_frame(&mut self, flow: &mut FlowState, ptype: i16, body: &[u8], now: Instant) -> Result<()> {
        let is_query = packet::is_query(ptype);

        if !flow.synced {
            if is_query {
                flow.synced = true;
                self.start_awaiting(flow, body, now)?;
            }
            // Anything else: discard, remain Unsynced (`spec.md` §4.7).
            return Ok(());
        }

        if !flow.has_pending_request() {
            // Idle
            if is_query {
                self.start_awaiting(flow, body, now)?;
            } else {
                self.desync(flow);
            }
        } else {
            // AwaitingResponse: a request arrived before its response.
            self.desync(flow);
        }
        Ok(())
    }

    fn start_awaiting(&mut self, flow: &mut FlowState, body: &[u8], now: Instant) -> Result<()> {
        // body[0] is the COM_QUERY command byte; the remainder is SQL
        // (`spec.md` §4.3).
        let sql_bytes = body.get(1..).unwrap_or(&[]);
        let fingerprint = if self.canonicalize {
            canonicalize(sql_bytes)?
        } else {
            String::from_utf8_lossy(sql_bytes).into_owned()
        };

        flow.req_sent_at = Some(now);
        flow.pending_bytes = sql_bytes.len();
        flow.pending_raw_body = String::from_utf8_lossy(sql_bytes).into_owned();
        flow.pending_fingerprint = fingerprint;
        Ok(())
    }

    fn desync(&mut self, flow: &mut FlowState) {
        self.desyncs += 1;
        flow.synced = false;
        flow.clear_pending();
        flow.req_buffer.clear();
        flow.resp_buffer.clear();
    }

    fn on_response(&mut self, flow: &mut FlowState, now: Instant, aggregator: Option<&mut Aggregator>) -> Result<Outcome> {
        if !flow.synced || !flow.has_pending_request() {
            // Unsynced: discard. Idle: no pending request, ignore.
            return Ok(Outcome::keep());
        }

        let sent_at = flow
            .req_sent_at
            .expect("has_pending_request guarantees req_sent_at is set");
        let latency_us = now.duration_since(sent_at).as_nanos() as f64 / 1000.0;

        let fingerprint = flow.pending_fingerprint.clone();
        let is_dml = DML_VERBS
            .iter()
            .any(|verb| fingerprint.to_lowercase().contains(verb));

        self.global_latency.record(latency_us);
        if let Some(agg) = aggregator {
            agg.record(&fingerprint, flow.pending_bytes, latency_us);
        }

        let observation = is_dml.then(|| Observation {
            service_id: self.service_id.clone(),
            tenant_id: self.tenant_id.clone(),
            sql: fingerprint.clone(),
            time: latency_us,
            size: flow.pending_bytes,
            operate: Observation::operate_of(&fingerprint),
        });

        let rendered_line = observation.as_ref().map(|_| {
            self.template.render(&RenderInput {
                client_addr: &flow.client_addr,
                client_ip: &flow.client_ip,
                query: &fingerprint,
                raw_body: &flow.pending_raw_body,
            })
        });

        // `spec.md` §4.7: both branches destroy the flow under the
        // legacy lifecycle, whether or not the response matched the DML
        // filter. `return_to_idle` is the documented correction (§9).
        let action = match self.lifecycle {
            FlowLifecycle::DestroyOnEmit => Action::Remove,
            FlowLifecycle::ReturnToIdle => {
                flow.clear_pending();
                Action::Keep
            }
        };

        Ok(Outcome {
            action,
            observation,
            rendered_line,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::wire::Direction;

    fn config() -> Config {
        Config {
            port: 3306,
            iface: "eth0".into(),
            canonicalize: true,
            verbose: true,
            format: "#s:#q".into(),
            zmq_addr: String::new(),
            service_id: "svc".into(),
            tenant_id: "ten".into(),
            topic: "topic".into(),
            summary: false,
            idle_timeout_secs: 60,
            lifecycle: FlowLifecycle::DestroyOnEmit,
        }
    }

    fn query_frame(sql: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let len = sql.len() + 1;
        buf.push((len & 0xff) as u8);
        buf.push(((len >> 8) & 0xff) as u8);
        buf.push(((len >> 16) & 0xff) as u8);
        buf.push(0); // sequence id
        buf.push(0x03); // COM_QUERY
        buf.extend_from_slice(sql);
        buf
    }

    /// S5 — request/response pairing with latency measurement.
    #[test]
    fn s5_request_response_pairing() {
        let cfg = config();
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("10.0.0.5:4444".into(), "10.0.0.5".into(), Instant::now());

        let frame = query_frame(b"SELECT 1");
        let t0 = Instant::now();
        let out = engine
            .on_payload(&mut flow, Direction::Request, &frame, t0, None)
            .unwrap();
        assert_eq!(out.action, Action::Keep);
        assert!(flow.has_pending_request());
        assert_eq!(flow.pending_bytes, 8);

        let t1 = t0 + Duration::from_micros(500);
        let out = engine
            .on_payload(&mut flow, Direction::Response, b"anything-17-bytes", t1, None)
            .unwrap();
        assert_eq!(out.action, Action::Remove);
        let obs = out.observation.expect("SELECT is a DML verb, must emit");
        assert_eq!(obs.operate, "select");
        assert_eq!(obs.size, 8);
        assert!((obs.time - 500.0).abs() < 50.0);
    }

    /// S6 — desync recovery.
    #[test]
    fn s6_desync_recovery() {
        let cfg = config();
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("10.0.0.9:1".into(), "10.0.0.9".into(), Instant::now());
        let now = Instant::now();

        // A response arrives first, on a brand-new (Unsynced) flow.
        let out = engine
            .on_payload(&mut flow, Direction::Response, b"unexpected", now, None)
            .unwrap();
        assert_eq!(out.action, Action::Keep);
        assert!(out.observation.is_none());
        assert_eq!(engine.desyncs, 0);
        assert!(!flow.synced);

        // Then a COM_QUERY request arrives; flow becomes AwaitingResponse.
        let frame = query_frame(b"SELECT 1");
        engine
            .on_payload(&mut flow, Direction::Request, &frame, now, None)
            .unwrap();
        assert!(flow.synced);
        assert!(flow.has_pending_request());
    }

    #[test]
    fn non_dml_response_is_not_emitted() {
        let cfg = config();
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("a:1".into(), "a".into(), Instant::now());
        let now = Instant::now();

        let frame = query_frame(b"SHOW TABLES");
        engine
            .on_payload(&mut flow, Direction::Request, &frame, now, None)
            .unwrap();
        let out = engine
            .on_payload(&mut flow, Direction::Response, b"r", now, None)
            .unwrap();
        assert!(out.observation.is_none());
        assert_eq!(out.action, Action::Remove);
    }

    #[test]
    fn request_without_response_desyncs() {
        let cfg = config();
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("a:1".into(), "a".into(), Instant::now());
        let now = Instant::now();

        let frame = query_frame(b"SELECT 1");
        engine
            .on_payload(&mut flow, Direction::Request, &frame, now, None)
            .unwrap();
        assert!(flow.has_pending_request());

        // Another request arrives before any response.
        engine
            .on_payload(&mut flow, Direction::Request, &frame, now, None)
            .unwrap();
        assert_eq!(engine.desyncs, 1);
        assert!(!flow.synced);
        assert!(!flow.has_pending_request());
    }

    #[test]
    fn partial_frame_across_two_packets_is_retained() {
        let cfg = config();
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("a:1".into(), "a".into(), Instant::now());
        let now = Instant::now();

        let frame = query_frame(b"SELECT 1");
        let (first, second) = frame.split_at(3);
        engine
            .on_payload(&mut flow, Direction::Request, first, now, None)
            .unwrap();
        assert!(!flow.has_pending_request());
        assert_eq!(flow.req_buffer.len(), 3);

        engine
            .on_payload(&mut flow, Direction::Request, second, now, None)
            .unwrap();
        assert!(flow.has_pending_request());
        assert!(flow.req_buffer.is_empty());
    }

    #[test]
    fn return_to_idle_allows_multiple_queries_per_flow() {
        let mut cfg = config();
        cfg.lifecycle = FlowLifecycle::ReturnToIdle;
        let mut engine = PairingEngine::new(&cfg);
        let mut flow = FlowState::new("a:1".into(), "a".into(), Instant::now());
        let now = Instant::now();

        for _ in 0..3 {
            let frame = query_frame(b"SELECT 1");
            engine
                .on_payload(&mut flow, Direction::Request, &frame, now, None)
                .unwrap();
            let out = engine
                .on_payload(&mut flow, Direction::Response, b"r", now, None)
                .unwrap();
            assert_eq!(out.action, Action::Keep);
            assert!(out.observation.is_some());
        }
    }
}
