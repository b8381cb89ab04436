use clap::Parser;

/// Command-line surface (`spec.md` §6).
///
/// Parsed once by the driver and converted into a [`Config`]; the core
/// never reads flags directly, matching the "bundle into a `Core` value"
/// redesign in `spec.md` §9.
#[derive(Debug, Parser)]
#[command(name = "mysql-sniff", about = "Passive MySQL wire-protocol sniffer")]
pub struct CliArgs {
    /// MySQL port to watch.
    #[arg(short = 'P', long = "port", default_value_t = 3306)]
    pub port: u16,

    /// Capture interface name.
    #[arg(short = 'i', long = "iface", default_value = "eth0")]
    pub iface: String,

    /// Disable canonicalization; `#q` renders the raw request body.
    #[arg(short = 'u', long = "no-canon")]
    pub no_canon: bool,

    /// Verbose logging. Defaults on, matching the original tool.
    #[arg(short = 'v', long = "verbose", default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,

    /// Disable canonicalization unconditionally.
    #[arg(short = 'n', long = "no-canon-force")]
    pub no_canon_force: bool,

    /// Output line template. See §4.6 for the `#`-escape grammar.
    #[arg(short = 'f', long = "format", default_value = "#s:#q")]
    pub format: String,

    /// ZeroMQ PUB bind address.
    #[arg(long = "zmq-addr", default_value = "tcp://*:5555")]
    pub zmq_addr: String,

    /// Opaque service label carried on every observation.
    #[arg(long = "service-id", default_value = "")]
    pub service_id: String,

    /// Opaque tenant label carried on every observation.
    #[arg(long = "tenant-id", default_value = "")]
    pub tenant_id: String,

    /// Publish topic. Empty defaults to `cep.mysql.sniff.<tenant_id>`.
    #[arg(long = "topic", default_value = "")]
    pub topic: String,

    /// Enable the fingerprint aggregator (§4.8). Off by default.
    #[arg(long = "summary")]
    pub summary: bool,

    /// Idle eviction window in seconds, overridable for tests.
    #[arg(long = "idle-timeout-secs", default_value_t = 60)]
    pub idle_timeout_secs: u64,
}

/// Destruction policy for a flow after its first emitted observation
/// (`spec.md` §9 "Flow destruction after one emit").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowLifecycle {
    /// Legacy behavior: destroy the flow after the first matched
    /// (request, response) pair. A long-lived connection running many
    /// queries yields one observation, not one per query.
    DestroyOnEmit,
    /// Corrected behavior: return the flow to `Idle` after emitting so
    /// subsequent queries on the same connection are also observed.
    ReturnToIdle,
}

/// Runtime configuration, built once from [`CliArgs`] and passed by value
/// into [`crate::core::Core::new`]. No field is read from process
/// globals anywhere in the pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub iface: String,
    pub canonicalize: bool,
    pub verbose: bool,
    pub format: String,
    pub zmq_addr: String,
    pub service_id: String,
    pub tenant_id: String,
    pub topic: String,
    pub summary: bool,
    pub idle_timeout_secs: u64,
    pub lifecycle: FlowLifecycle,
}

impl From<CliArgs> for Config {
    fn from(args: CliArgs) -> Self {
        let canonicalize = !(args.no_canon || args.no_canon_force);
        let topic = if args.topic.is_empty() {
            format!("cep.mysql.sniff.{}", args.tenant_id)
        } else {
            args.topic
        };
        Self {
            port: args.port,
            iface: args.iface,
            canonicalize,
            verbose: args.verbose,
            format: args.format,
            zmq_addr: args.zmq_addr,
            service_id: args.service_id,
            tenant_id: args.tenant_id,
            topic,
            summary: args.summary,
            idle_timeout_secs: args.idle_timeout_secs,
            lifecycle: FlowLifecycle::DestroyOnEmit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from(CliArgs::parse_from(["mysql-sniff"]))
    }
}
