use clap::{Parser, ValueEnum};
use sdnctl_rs::config::{ConfigError, HostsFile, NetworkConfig, Settings};
use sdnctl_rs::ctl::{
    Adjust, BuildError, BuildOrchestrator, ControlError, ControlPlane, HostStatus, LinkInfo,
};
use sdnctl_rs::net::Bandwidth;
use sdnctl_rs::substrate::{EmulatedSubstrate, OvsSubstrate, Substrate};
use sdnctl_rs::topo::build_fan_out;
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SubstrateKind {
    /// In-memory flow tables, nothing leaves the process
    Emulated,
    /// A running Open vSwitch network driven through ovs-ofctl / tc / ip
    Ovs,
}

/// One runtime operation, applied in command-line order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Operation {
    Redirect { host: String, switch: String },
    SwitchBandwidth { a: String, b: String, adjust: Adjust, delta: Bandwidth },
    HostBandwidth { host: String, adjust: Adjust, delta: Bandwidth },
    LinkState { a: String, b: String, up: bool },
}

impl FromStr for Operation {
    type Err = String;

    /// `redirect:h1:s103`, `increase-switch:s101:s102:0.05`,
    /// `decrease-host:h1:0.1`, `link-down:h1:s1`, ...
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = raw.split(':').collect();
        let delta = |s: &str| s.parse::<Bandwidth>().map_err(|e| e.to_string());
        let op = match parts.as_slice() {
            ["redirect", host, switch] => Operation::Redirect {
                host: host.to_string(),
                switch: switch.to_string(),
            },
            [kind @ ("increase-switch" | "decrease-switch"), a, b, d] => Operation::SwitchBandwidth {
                a: a.to_string(),
                b: b.to_string(),
                adjust: if *kind == "increase-switch" { Adjust::Increase } else { Adjust::Decrease },
                delta: delta(d)?,
            },
            [kind @ ("increase-host" | "decrease-host"), host, d] => Operation::HostBandwidth {
                host: host.to_string(),
                adjust: if *kind == "increase-host" { Adjust::Increase } else { Adjust::Decrease },
                delta: delta(d)?,
            },
            [kind @ ("link-up" | "link-down"), a, b] => Operation::LinkState {
                a: a.to_string(),
                b: b.to_string(),
                up: *kind == "link-up",
            },
            _ => return Err(format!("unrecognized operation `{raw}`")),
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = |adjust: &Adjust, what: &str| match adjust {
            Adjust::Increase => format!("increase-{what}"),
            Adjust::Decrease => format!("decrease-{what}"),
        };
        match self {
            Operation::Redirect { host, switch } => write!(f, "redirect:{host}:{switch}"),
            Operation::SwitchBandwidth { a, b, adjust, delta } => {
                write!(f, "{}:{a}:{b}:{delta}", verb(adjust, "switch"))
            }
            Operation::HostBandwidth { host, adjust, delta } => {
                write!(f, "{}:{host}:{delta}", verb(adjust, "host"))
            }
            Operation::LinkState { a, b, up } => {
                write!(f, "link-{}:{a}:{b}", if *up { "up" } else { "down" })
            }
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "sdnctl",
    about = "Bring up the fan-out SDN testbed, apply path and bandwidth operations, print state as JSON"
)]
struct Args {
    /// Hosts topology file (JSON keyed by host name)
    #[arg(long)]
    hosts_file: PathBuf,

    /// Server host; only `hs` is supported
    #[arg(long, value_delimiter = ',', default_value = "hs")]
    servers: Vec<String>,

    /// Attacker host; exactly one of the hosts in the hosts file
    #[arg(long, value_delimiter = ',')]
    attackers: Vec<String>,

    /// Number of controlled switches (4..=99)
    #[arg(long, default_value_t = 4)]
    nbr_controlled_switches: usize,

    /// Same bandwidth for every client access link (Mbit/s)
    #[arg(long)]
    unified_host_bandwidth: Option<Bandwidth>,

    /// Same bandwidth for every core and mesh link (Mbit/s)
    #[arg(long)]
    unified_switch_bandwidth: Option<Bandwidth>,

    /// Seed for the random bandwidth draws
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value_t = SubstrateKind::Emulated)]
    substrate: SubstrateKind,

    /// Run host-side commands inside per-host network namespaces (ovs only)
    #[arg(long)]
    host_namespaces: bool,

    /// Operation to apply after bring-up; repeatable, applied in order
    #[arg(long = "op")]
    ops: Vec<Operation>,

    /// Keep applying operations after one fails
    #[arg(long)]
    keep_going: bool,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("operation {index} failed")]
    Operation {
        index: usize,
        #[source]
        source: ControlError,
    },
    #[error("failed to render report")]
    Render(#[from] serde_json::Error),
    #[error("failed to write {}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Serialize)]
struct OperationRecord {
    op: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_changed: Option<bool>,
}

#[derive(Debug, Serialize)]
struct Report {
    substrate: &'static str,
    operations: Vec<OperationRecord>,
    hosts: Vec<HostStatus>,
    links: Vec<LinkInfo>,
}

fn apply<S: Substrate>(plane: &ControlPlane<S>, op: &Operation) -> Result<Value, ControlError> {
    let value = match op {
        Operation::Redirect { host, switch } => json!(plane.redirect_path(host, switch)?),
        Operation::SwitchBandwidth { a, b, adjust, delta } => {
            json!({ "bandwidth": plane.adjust_switch_bandwidth(a, b, *adjust, *delta)? })
        }
        Operation::HostBandwidth { host, adjust, delta } => {
            json!({ "bandwidth": plane.adjust_host_bandwidth(host, *adjust, *delta)? })
        }
        Operation::LinkState { a, b, up } => {
            plane.set_link_admin_state(a, b, *up)?;
            json!({ "connected": up })
        }
    };
    Ok(value)
}

/// Core and mesh links, each listed once.
fn switch_links<S: Substrate>(plane: &ControlPlane<S>) -> Result<Vec<LinkInfo>, ControlError> {
    let topo = plane.topology();
    let mut out = Vec::new();
    let core = topo.core();
    for (i, a) in topo.controlled_switches().iter().enumerate() {
        out.push(plane.link_info(core, a)?);
        for b in &topo.controlled_switches()[i + 1..] {
            out.push(plane.link_info(a, b)?);
        }
    }
    Ok(out)
}

fn operate<S: Substrate>(
    plane: &ControlPlane<S>,
    substrate: &'static str,
    args: &Args,
) -> Result<Report, CliError> {
    let mut operations = Vec::with_capacity(args.ops.len());
    for (index, op) in args.ops.iter().enumerate() {
        let label = op.to_string();
        match apply(plane, op) {
            Ok(result) => operations.push(OperationRecord {
                op: label,
                ok: true,
                result: Some(result),
                error: None,
                state_changed: None,
            }),
            Err(source) if args.keep_going => {
                error!(index, error = %source, "operation failed");
                operations.push(OperationRecord {
                    op: label,
                    ok: false,
                    result: None,
                    error: Some(source.to_string()),
                    state_changed: Some(source.changed_state()),
                });
            }
            Err(source) => return Err(CliError::Operation { index, source }),
        }
    }

    let hosts = plane
        .host_names()
        .iter()
        .map(|h| plane.host_status(h))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CliError::Operation { index: operations.len(), source })?;
    let links = switch_links(plane).map_err(|source| CliError::Operation {
        index: operations.len(),
        source,
    })?;
    Ok(Report {
        substrate,
        operations,
        hosts,
        links,
    })
}

fn run(args: &Args) -> Result<Report, CliError> {
    let hosts = HostsFile::load(&args.hosts_file)?;
    let settings = Settings {
        controlled_switches: args.nbr_controlled_switches,
        servers: args.servers.clone(),
        attackers: args.attackers.clone(),
        unified_host_bandwidth: args.unified_host_bandwidth,
        unified_switch_bandwidth: args.unified_switch_bandwidth,
        seed: args.seed,
        ..Settings::default()
    };
    let config = NetworkConfig::new(hosts, settings)?;
    info!(
        hosts = config.hosts().len(),
        controlled = config.controlled_switches().len(),
        attacker = config.attacker(),
        "configuration loaded"
    );

    match args.substrate {
        SubstrateKind::Emulated => {
            let plane = BuildOrchestrator::new(EmulatedSubstrate::new()).build(&config)?;
            operate(&plane, "emulated", args)
        }
        SubstrateKind::Ovs => {
            let mut policy = config.bandwidth_policy();
            let topology = build_fan_out(&config, &mut policy)?;
            let substrate = OvsSubstrate::new(args.host_namespaces).with_switches(&topology);
            let plane = BuildOrchestrator::new(substrate).build_topology(topology, config.priorities())?;
            operate(&plane, "ovs", args)
        }
    }
}

fn emit(report: &Report, out: Option<&Path>) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(report)?;
    match out {
        Some(path) => {
            fs::write(path, rendered).map_err(|source| CliError::Output {
                path: path.to_path_buf(),
                source,
            })?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(&args).and_then(|report| emit(&report, args.out.as_deref())) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let mut chain = err.to_string();
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                chain.push_str(&format!(": {cause}"));
                source = cause.source();
            }
            error!(error = %chain, "sdnctl failed");
            eprintln!("error: {chain}");
            ExitCode::FAILURE
        }
    }
}
