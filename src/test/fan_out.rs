use super::{bw, config, four_hosts, unified_settings};
use crate::config::{NetworkConfig, Settings};
use crate::net::{Bandwidth, HostRole, MAX_ATTACKER_BW, SwitchKind, Topology, server_ceiling};
use crate::topo::{ROUTER_LINK_ID, build_fan_out};

fn build(config: &NetworkConfig) -> Topology {
    let mut policy = config.bandwidth_policy();
    build_fan_out(config, &mut policy).expect("build fan-out")
}

fn random_config(seed: u64) -> NetworkConfig {
    let settings = Settings {
        unified_host_bandwidth: None,
        unified_switch_bandwidth: None,
        seed: Some(seed),
        ..unified_settings()
    };
    NetworkConfig::new(four_hosts(), settings).expect("valid config")
}

#[test]
fn fan_out_has_core_controlled_and_router_tiers() {
    let topo = build(&config());

    assert_eq!(topo.core(), "s0");
    assert_eq!(topo.kind_of("s0"), Some(SwitchKind::Core));
    assert_eq!(topo.controlled_switches(), ["s101", "s102", "s103", "s104"]);
    assert_eq!(topo.router_switches(), ["s1", "s2", "s3", "s4"]);
    assert_eq!(topo.client_hosts(), ["h1", "h2", "h3", "h4"]);
    assert_eq!(topo.switches().count(), 9);

    // Full mesh between controlled switches plus the core link.
    for a in topo.controlled_switches() {
        assert!(topo.link("s0", a).is_some());
        assert!(topo.link(a, "s0").is_some());
        for b in topo.controlled_switches() {
            assert_eq!(topo.link(a, b).is_some(), a != b, "{a} <-> {b}");
        }
    }
    assert!(topo.link("s1", "s102").is_none());
}

#[test]
fn interfaces_follow_naming_convention_and_declaration_order() {
    let topo = build(&config());

    let core = topo.switch("s0").unwrap();
    assert_eq!(
        core.ports,
        ["s0-eth101", "s0-eth102", "s0-eth103", "s0-eth104", "s0-eth6", "s0-eth0"]
    );

    let link = topo.link("s101", "s1").unwrap();
    assert_eq!(link.src_interface, "s101-eth1");
    assert_eq!(link.dst_interface, "s1-eth101");
    assert_eq!(link.id, Some(ROUTER_LINK_ID));
    assert_eq!(topo.link("s101", "s102").unwrap().id, None);

    let h3 = topo.host("h3").unwrap();
    assert_eq!(h3.src_interface, "h3-eth0");
    assert_eq!(h3.dst_interface, "s3-eth0");
    assert_eq!(h3.router_switch, "s3");

    let server = topo.server().unwrap();
    assert_eq!(server.name, "hs");
    assert_eq!(server.router_switch, "s0");
    assert_eq!(server.dst_interface, "s0-eth0");
    assert_eq!(server.ip, "10.0.1.101");
    assert!(server.path.is_none());
}

#[test]
fn every_client_starts_on_its_default_switch() {
    let topo = build(&config());
    for name in topo.client_hosts() {
        let host = topo.host(name).unwrap();
        let path = host.path.as_ref().expect("client has path state");
        assert_eq!(path.current(), path.default_switch());
        let view = path.current_path();
        assert_eq!(view.len(), 4);
        assert_eq!(view.values().filter(|active| **active).count(), 1);
        assert_eq!(view.get(path.default_switch()), Some(&true));
    }
    assert_eq!(topo.host("h4").unwrap().default_path_switch(), Some("s104"));
}

#[test]
fn unified_bandwidths_apply_to_clients_and_switch_links_only() {
    let topo = build(&config());

    for sw in topo.switches().filter(|s| s.kind != SwitchKind::Router) {
        for (neighbor, link) in &sw.links {
            if topo.kind_of(neighbor) == Some(SwitchKind::Router) {
                continue;
            }
            assert_eq!(link.bandwidth, bw("9.0"), "{} -> {neighbor}", sw.name);
        }
    }
    assert_eq!(topo.host("h1").unwrap().bandwidth, bw("3.0"));
    assert_eq!(topo.link("s1", "s101").unwrap().bandwidth, bw("3.0"));

    let attacker = topo.host("h2").unwrap();
    assert_eq!(attacker.role, HostRole::Attacker);
    assert!((bw("4.6")..=MAX_ATTACKER_BW).contains(&attacker.bandwidth));
    assert_eq!(topo.link("s2", "s102").unwrap().bandwidth, attacker.bandwidth);

    assert_eq!(topo.server().unwrap().bandwidth, server_ceiling(4));
}

#[test]
fn random_draws_stay_on_their_grid() {
    let on_grid = |bw: Bandwidth, lo: u64, hi: u64| {
        let k = bw.kbps().checked_sub(100).expect("offset");
        k % 300 == 0 && (lo..=hi).contains(&(k / 300))
    };
    for seed in 0..8 {
        let topo = build(&random_config(seed));
        for a in topo.controlled_switches() {
            assert!(on_grid(topo.link("s0", a).unwrap().bandwidth, 3, 10));
            for b in topo.controlled_switches().iter().filter(|b| *b != a) {
                assert!(on_grid(topo.link(a, b).unwrap().bandwidth, 16, 30));
                assert_eq!(topo.link(a, b).unwrap().bandwidth, topo.link(b, a).unwrap().bandwidth);
            }
        }
        for name in ["h1", "h3", "h4"] {
            assert!(on_grid(topo.host(name).unwrap().bandwidth, 2, 10));
        }
        assert!(on_grid(topo.host("h2").unwrap().bandwidth, 15, 20));
    }
}

#[test]
fn seeded_builds_are_reproducible() {
    let snapshot = |topo: &Topology| {
        let mut out: Vec<(String, String, Bandwidth)> = Vec::new();
        for sw in topo.switches() {
            for (n, link) in &sw.links {
                out.push((sw.name.clone(), n.clone(), link.bandwidth));
            }
        }
        for h in topo.hosts() {
            out.push((h.name.clone(), h.router_switch.clone(), h.bandwidth));
        }
        out
    };
    let a = snapshot(&build(&random_config(42)));
    let b = snapshot(&build(&random_config(42)));
    assert_eq!(a, b);
}
