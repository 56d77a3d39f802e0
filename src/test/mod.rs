mod bandwidth_control;
mod bootstrap_rules;
mod fan_out;

use std::sync::Arc;

use crate::config::{HostEntry, HostsFile, NetworkConfig, Settings};
use crate::ctl::{BuildOrchestrator, ControlPlane};
use crate::net::Bandwidth;
use crate::substrate::EmulatedSubstrate;

pub(crate) type Emulated = Arc<EmulatedSubstrate>;

pub(crate) fn entry(n: u32, default: &str) -> HostEntry {
    HostEntry {
        ip: format!("10.0.1.{n}"),
        mac: format!("00:00:00:00:00:{n:02}"),
        router_switch: format!("s{n}"),
        default_path_switch: default.to_string(),
    }
}

/// h1..h4 on s101, s102, s101, s104; s103 has no router switch.
pub(crate) fn four_hosts() -> HostsFile {
    HostsFile::from_entries([
        ("h1".to_string(), entry(1, "s101")),
        ("h2".to_string(), entry(2, "s102")),
        ("h3".to_string(), entry(3, "s101")),
        ("h4".to_string(), entry(4, "s104")),
    ])
    .expect("valid host names")
}

/// h2 is the attacker; client links at 3.0, switch links at 9.0.
pub(crate) fn unified_settings() -> Settings {
    Settings {
        attackers: vec!["h2".to_string()],
        unified_host_bandwidth: Some(Bandwidth::from_kbps(3_000)),
        unified_switch_bandwidth: Some(Bandwidth::from_kbps(9_000)),
        seed: Some(7),
        ..Settings::default()
    }
}

pub(crate) fn config() -> NetworkConfig {
    NetworkConfig::new(four_hosts(), unified_settings()).expect("valid config")
}

/// Builds the fixture network and returns the plane plus a second handle on
/// the emulated substrate for inspection.
pub(crate) fn control_plane() -> (ControlPlane<Emulated>, Emulated) {
    let substrate = Arc::new(EmulatedSubstrate::new());
    let plane = BuildOrchestrator::new(Arc::clone(&substrate))
        .build(&config())
        .expect("build fixture network");
    (plane, substrate)
}

pub(crate) fn bw(raw: &str) -> Bandwidth {
    raw.parse().expect("bandwidth literal")
}
