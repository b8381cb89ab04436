use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mysql_sniff::config::{CliArgs, Config};
use mysql_sniff::core::{self, Core};
use mysql_sniff::sink::{Sink, ZmqSink};
use mysql_sniff::source::{PacketSource, PcapSource};

fn main() {
    let args = CliArgs::parse();
    let config = Config::from(args);
    init_tracing(config.verbose);

    if let Err(e) = run(config) {
        error!(error = %e, "fatal error, exiting");
        for cause in e.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

/// `-v`/`--verbose` (default on, `spec.md` §6) raises the default
/// tracing level; `RUST_LOG` always wins when set (`SPEC_FULL.md` §4.11).
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

/// Cooperative driver loop (`spec.md` §5, §6). There are exactly two
/// suspension points: the blocking pull from the capture device and the
/// (fire-and-forget) publish to the sink. Idle eviction runs on its own
/// tick, never inline with frame handling.
///
/// Fatal core errors (`spec.md` §7) unwind here via `anyhow`, which chains
/// the underlying cause onto whatever `.context(...)` this function added
/// at the capture-device/sink boundary, matching `SPEC_FULL.md` §7's "logs
/// the full error chain and exits with a nonzero status".
fn run(config: Config) -> anyhow::Result<()> {
    info!(port = config.port, iface = %config.iface, topic = %config.topic, "starting");

    let mut source = PcapSource::open(&config.iface, config.port).context("opening capture device")?;
    let mut sink = ZmqSink::bind(&config.zmq_addr).context("binding publish sink")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .unwrap_or_else(|e| warn!(error = %e, "failed to install signal handler"));
    }

    let mut core = Core::new(config, Instant::now());

    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();

        match source.next_frame() {
            Ok(Some(frame)) if !frame.is_empty() => match core.handle_frame(&frame, now) {
                Ok(Some(observation)) => core::publish(&mut sink, core.topic(), &observation),
                Ok(None) => {}
                Err(e) if !e.is_fatal() => warn!(error = %e, "dropping frame"),
                Err(e) => return Err(e).context("fatal error while handling a frame"),
            },
            Ok(Some(_)) => {} // capture-timeout tick with no data
            Ok(None) => break, // clean end of capture
            Err(e) if !e.is_fatal() => warn!(error = %e, "capture error, continuing"),
            Err(e) => return Err(e).context("fatal error while pulling from the capture source"),
        }

        let evicted = core.maybe_evict(now);
        if evicted > 0 {
            info!(evicted, flows = core.flow_count(), "idle flows evicted");
        }
    }

    info!(desyncs = core.desyncs(), "shutting down");
    Ok(())
}
