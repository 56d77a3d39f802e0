use std::sync::Arc;

use super::{control_plane, four_hosts, unified_settings};
use crate::config::{MAX_CONTROLLED_SWITCHES, NetworkConfig, Settings};
use crate::ctl::BuildOrchestrator;
use crate::flow::{Action, EtherType};
use crate::net::SwitchKind;
use crate::substrate::{EmulatedSubstrate, FlowEntry, PacketHeader, TraceEnd};

fn arp_entries(table: &[FlowEntry]) -> Vec<&FlowEntry> {
    table
        .iter()
        .filter(|e| e.matcher.ether_type == Some(EtherType::ARP))
        .collect()
}

#[test]
fn controlled_switches_get_directed_arp_rules_plus_flood() {
    let (plane, substrate) = control_plane();
    let topo = plane.topology();

    for name in topo.controlled_switches() {
        let sw = topo.switch(name).unwrap();
        let non_server_ports = sw.ports.len() - 1;
        let routers = sw
            .links
            .keys()
            .filter(|n| topo.kind_of(n) == Some(SwitchKind::Router))
            .count();
        let table = substrate.flow_table(name);
        let arp = arp_entries(&table);
        let floods = arp.iter().filter(|e| e.actions == [Action::Flood]).count();
        let directed = arp.len() - floods;

        assert_eq!(floods, 1, "{name}");
        assert!(arp.iter().any(|e| e.actions == [Action::Flood] && e.priority() == 0));
        // No router port means there is nothing to fan server ARP out to.
        let fan_out = usize::from(routers > 0);
        assert_eq!(directed, non_server_ports + fan_out, "{name}");
    }

    // s101 serves h1 and h3: 3 mesh + 2 router ports.
    assert_eq!(arp_entries(&substrate.flow_table("s101")).len(), 5 + 1 + 1);
    // s103 has no router switches.
    assert_eq!(arp_entries(&substrate.flow_table("s103")).len(), 3 + 1);
}

#[test]
fn server_arp_fans_out_to_router_ports_only() {
    let (plane, substrate) = control_plane();
    let ports = plane.ports();
    let server_port = ports.port("s101", "s101-eth0").unwrap();
    let r1 = ports.port("s101", "s101-eth1").unwrap();
    let r3 = ports.port("s101", "s101-eth3").unwrap();

    let table = substrate.flow_table("s101");
    let fan = table
        .iter()
        .find(|e| e.matcher.in_port == Some(server_port) && e.matcher.ether_type == Some(EtherType::ARP))
        .expect("server-port ARP rule");
    assert_eq!(fan.actions, [Action::Output(r1), Action::Output(r3)]);
    assert_eq!(fan.priority(), 499);

    for entry in arp_entries(&table) {
        if entry.matcher.in_port.is_some_and(|p| p != server_port) {
            assert_eq!(entry.actions, [Action::Output(server_port)]);
        }
    }
}

#[test]
fn core_has_one_rule_per_client_plus_flood_dns_and_delivery() {
    let (plane, substrate) = control_plane();
    let topo = plane.topology();
    let table = substrate.flow_table("s0");

    assert_eq!(table.len(), topo.client_hosts().len() + 3);
    assert_eq!(arp_entries(&table).len(), 1);
    assert_eq!(arp_entries(&table)[0].priority(), 2);
    assert!(table.iter().any(|e| e.matcher.ip_dst.as_deref() == Some("8.8.8.8")));

    for name in topo.client_hosts() {
        let host = topo.host(name).unwrap();
        let rule = table
            .iter()
            .find(|e| e.matcher.mac_dst.as_deref() == Some(host.mac.as_str()))
            .expect("core rule for client");
        let toward = format!("s0-eth{}", &host.default_path_switch().unwrap()[1..]);
        let port = plane.ports().port("s0", &toward).unwrap();
        assert_eq!(rule.actions, [Action::Output(port)]);
        assert_eq!(rule.priority(), 65535);
    }
}

#[test]
fn router_switches_flood_arp_and_forward_directed_traffic() {
    let (_plane, substrate) = control_plane();
    for router in ["s1", "s2", "s3", "s4"] {
        let table = substrate.flow_table(router);
        // ARP flood, DNS escape, toward server, toward host.
        assert_eq!(table.len(), 4, "{router}");
        let arp = arp_entries(&table);
        assert_eq!(arp.len(), 1);
        assert_eq!(arp[0].actions, [Action::Flood]);
        assert_eq!(arp[0].priority(), 499);
    }
}

#[test]
fn bootstrapped_network_delivers_both_directions_along_default_paths() {
    let (plane, substrate) = control_plane();
    let topo = plane.topology();
    let server = topo.server().unwrap().clone();

    for name in topo.client_hosts() {
        let host = topo.host(name).unwrap();
        let default = host.default_path_switch().unwrap();

        let up = PacketHeader::ipv4(&host.mac, &host.ip, &server.mac, &server.ip);
        let trace = substrate.trace(&topo, name, &up).expect("trace up");
        assert_eq!(trace.end, TraceEnd::Delivered("hs".to_string()), "{name}");
        assert_eq!(trace.switches, [host.router_switch.as_str(), default, "s0"]);

        let down = PacketHeader::ipv4(&server.mac, &server.ip, &host.mac, &host.ip);
        let trace = substrate.trace(&topo, "hs", &down).expect("trace down");
        assert_eq!(trace.end, TraceEnd::Delivered(name.clone()));
        assert_eq!(trace.switches, ["s0", default, host.router_switch.as_str()]);
    }
}

#[test]
fn dns_escapes_through_the_core_uplink() {
    let (plane, substrate) = control_plane();
    let topo = plane.topology();
    let h4 = topo.host("h4").unwrap();

    let dns = PacketHeader::ipv4(&h4.mac, &h4.ip, "00:00:00:00:ff:ff", "8.8.8.8");
    let trace = substrate.trace(&topo, "h4", &dns).unwrap();
    assert_eq!(trace.switches, ["s4", "s104", "s0"]);
    assert_eq!(
        trace.end,
        TraceEnd::Egress {
            switch: "s0".to_string(),
            interface: "s0-eth6".to_string()
        }
    );
}

#[test]
fn dns_uplink_stays_distinct_with_the_most_controlled_switches() {
    let settings = Settings {
        controlled_switches: MAX_CONTROLLED_SWITCHES,
        ..unified_settings()
    };
    let config = NetworkConfig::new(four_hosts(), settings).expect("valid config");
    let substrate = Arc::new(EmulatedSubstrate::new());
    let plane = BuildOrchestrator::new(Arc::clone(&substrate))
        .build(&config)
        .expect("build");
    let topo = plane.topology();

    // Server port, one port per controlled switch, uplink.
    assert_eq!(topo.switch("s0").unwrap().ports.len(), MAX_CONTROLLED_SWITCHES + 2);
    let uplink = plane.ports().port("s0", "s0-eth200").unwrap();
    assert_ne!(uplink, plane.ports().port("s0", "s0-eth101").unwrap());

    let h4 = topo.host("h4").unwrap();
    let dns = PacketHeader::ipv4(&h4.mac, &h4.ip, "00:00:00:00:ff:ff", "8.8.8.8");
    let trace = substrate.trace(&topo, "h4", &dns).unwrap();
    assert_eq!(trace.switches, ["s4", "s104", "s0"]);
    assert_eq!(
        trace.end,
        TraceEnd::Egress {
            switch: "s0".to_string(),
            interface: "s0-eth200".to_string()
        }
    );
}

#[test]
fn arp_requests_reach_the_core_and_flood() {
    let (plane, substrate) = control_plane();
    let topo = plane.topology();
    let h1 = topo.host("h1").unwrap();

    let arp = PacketHeader::arp_request(&h1.mac, &h1.ip, "10.0.1.101");
    let trace = substrate.trace(&topo, "h1", &arp).unwrap();
    assert_eq!(
        trace.end,
        TraceEnd::Flooded {
            switch: "s1".to_string()
        }
    );

    // Seen from the controlled switch, ARP from a router port goes to the core.
    let from_router = plane.ports().port("s101", "s101-eth1").unwrap();
    let hit = substrate.lookup("s101", from_router, &arp).unwrap();
    let to_core = plane.ports().port("s101", "s101-eth0").unwrap();
    assert_eq!(hit.actions, [Action::Output(to_core)]);
}
