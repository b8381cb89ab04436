use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::error::Result;
use crate::flow::FlowTable;
use crate::pairing::{Action, PairingEngine};
use crate::sink::{Observation, Sink};
use crate::wire;

/// Everything the driver needs between two captured frames, bundled into
/// one value instead of process globals (`spec.md` §9 "Config-as-value").
pub struct Core {
    config: Config,
    flows: FlowTable,
    engine: PairingEngine,
    aggregator: Option<Aggregator>,
    last_eviction: Instant,
}

/// How long the cooperative loop waits between idle-eviction sweeps
/// (`spec.md` §4.9).
const EVICTION_TICK: Duration = Duration::from_secs(10);

impl Core {
    pub fn new(config: Config, now: Instant) -> Self {
        let aggregator = config.summary.then(Aggregator::new);
        Self {
            engine: PairingEngine::new(&config),
            flows: FlowTable::new(),
            aggregator,
            config,
            last_eviction: now,
        }
    }

    /// Decodes and processes one captured frame, returning an observation
    /// to publish if the pairing engine just emitted one. Recoverable
    /// errors (`spec.md` §7: `UnexpectedPorts`, `CarveIncomplete`,
    /// `Desync`) are logged and swallowed here; only fatal errors should
    /// ever reach the driver via `?`.
    pub fn handle_frame(&mut self, frame: &[u8], now: Instant) -> Result<Option<Observation>> {
        let decoded = match wire::decode(frame, self.config.port) {
            Ok(Some(decoded)) => decoded,
            Ok(None) => return Ok(None),
            Err(e) if !e.is_fatal() => {
                warn!(error = %e, "dropping frame");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let flow = self
            .flows
            .get_or_create(&decoded.client_addr, &decoded.client_ip, now);

        let outcome = self.engine.on_payload(
            flow,
            decoded.direction,
            decoded.payload,
            now,
            self.aggregator.as_mut(),
        )?;

        if let Some(line) = &outcome.rendered_line {
            debug!(line, "emitted observation");
        }

        if outcome.action == Action::Remove {
            self.flows.remove(&decoded.client_addr);
        }

        Ok(outcome.observation)
    }

    /// Runs the idle-eviction sweep if `EVICTION_TICK` has elapsed since
    /// the last one. Never runs inline with frame handling — the driver
    /// calls this once per loop iteration and it is cheap to call
    /// needlessly (§4.9).
    pub fn maybe_evict(&mut self, now: Instant) -> usize {
        if now.duration_since(self.last_eviction) < EVICTION_TICK {
            return 0;
        }
        self.last_eviction = now;
        let timeout = Duration::from_secs(self.config.idle_timeout_secs);
        self.flows.evict_idle(now, timeout)
    }

    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    pub fn desyncs(&self) -> u64 {
        self.engine.desyncs
    }

    pub fn flow_count(&self) -> usize {
        self.flows.len()
    }

    pub fn aggregator(&self) -> Option<&Aggregator> {
        self.aggregator.as_ref()
    }
}

/// Publishes `observation` to `sink` on `topic`, matching the wire
/// prefix and framing in `spec.md` §6. Publish failures are logged and
/// swallowed, never propagated to the caller (§9 "fire-and-forget").
pub fn publish(sink: &mut dyn Sink, topic: &str, observation: &Observation) {
    match observation.to_wire_payload() {
        Ok(payload) => {
            if let Err(e) = sink.publish(topic, &payload) {
                warn!(error = %e, "sink publish failed, dropping observation");
            }
        }
        Err(e) => warn!(error = %e, "failed to encode observation"),
    }
}
