use super::{bw, control_plane};
use crate::ctl::{Adjust, ControlError, Step};
use crate::net::{Bandwidth, server_ceiling};
use crate::substrate::{PacketHeader, SubstrateCall, TraceEnd};

#[test]
fn switch_increase_past_ceiling_is_rejected_and_leaves_bandwidth() {
    let (plane, substrate) = control_plane();
    assert_eq!(plane.switch_bandwidth("s101", "s102").unwrap(), bw("9.0"));

    let err = plane
        .increase_switch_bandwidth("s101", "s102", bw("0.3"))
        .unwrap_err();
    match &err {
        ControlError::BandwidthOutOfRange { current, max, op, .. } => {
            assert_eq!(*current, bw("9.0"));
            assert_eq!(*max, bw("9.1"));
            assert_eq!(*op, '+');
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!err.changed_state());
    assert_eq!(plane.switch_bandwidth("s101", "s102").unwrap(), bw("9.0"));
    assert_eq!(plane.switch_bandwidth("s102", "s101").unwrap(), bw("9.0"));
    assert_eq!(substrate.interface_bandwidth("s101", "s101-eth102"), Some(bw("9.0")));
}

#[test]
fn switch_increase_within_range_updates_both_ends() {
    let (plane, substrate) = control_plane();

    let next = plane
        .increase_switch_bandwidth("s101", "s102", bw("0.05"))
        .expect("increase");
    assert_eq!(next, bw("9.05"));
    assert_eq!(plane.switch_bandwidth("s101", "s102").unwrap(), bw("9.05"));
    assert_eq!(plane.switch_bandwidth("s102", "s101").unwrap(), bw("9.05"));
    assert_eq!(substrate.interface_bandwidth("s101", "s101-eth102"), Some(bw("9.05")));
    assert_eq!(substrate.interface_bandwidth("s102", "s102-eth101"), Some(bw("9.05")));

    // Exactly reaching the ceiling is allowed.
    assert_eq!(
        plane.increase_switch_bandwidth("s102", "s101", bw("0.05")).unwrap(),
        bw("9.1")
    );
    assert_eq!(plane.link_info("s101", "s102").unwrap().bandwidth.to_string(), "9.1");
}

#[test]
fn decreases_stop_at_the_floor() {
    let (plane, _substrate) = control_plane();
    assert_eq!(
        plane.decrease_switch_bandwidth("s0", "s103", bw("8.99")).unwrap(),
        bw("0.01")
    );
    assert!(matches!(
        plane.decrease_switch_bandwidth("s0", "s103", bw("0.001")),
        Err(ControlError::BandwidthOutOfRange { op: '-', .. })
    ));
    assert!(matches!(
        plane.decrease_switch_bandwidth("s103", "s0", bw("1.0")),
        Err(ControlError::BandwidthOutOfRange { .. })
    ));
    assert_eq!(plane.switch_bandwidth("s0", "s103").unwrap(), bw("0.01"));
}

#[test]
fn zero_delta_and_unknown_links_are_rejected() {
    let (plane, _substrate) = control_plane();
    assert!(matches!(
        plane.increase_switch_bandwidth("s101", "s102", Bandwidth::ZERO),
        Err(ControlError::InvalidDelta(_))
    ));
    assert!(matches!(
        plane.decrease_host_bandwidth("h1", Bandwidth::ZERO),
        Err(ControlError::InvalidDelta(_))
    ));
    assert!(matches!(
        plane.increase_switch_bandwidth("s101", "s109", bw("0.1")),
        Err(ControlError::UnknownSwitch(s)) if s == "s109"
    ));
    assert!(matches!(
        plane.increase_switch_bandwidth("s1", "s102", bw("0.1")),
        Err(ControlError::NoSuchLink { .. })
    ));
    assert!(matches!(
        plane.increase_host_bandwidth("h7", bw("0.1")),
        Err(ControlError::UnknownHost(_))
    ));
}

#[test]
fn host_bandwidth_respects_role_ceilings() {
    let (plane, substrate) = control_plane();

    assert_eq!(plane.increase_host_bandwidth("h1", bw("0.1")).unwrap(), bw("3.1"));
    assert_eq!(plane.host_bandwidth("h1").unwrap(), bw("3.1"));
    assert_eq!(substrate.interface_bandwidth("h1", "h1-eth0"), Some(bw("3.1")));
    assert_eq!(substrate.interface_bandwidth("s1", "s1-eth0"), Some(bw("3.1")));
    assert!(matches!(
        plane.increase_host_bandwidth("h1", bw("0.001")),
        Err(ControlError::BandwidthOutOfRange { .. })
    ));

    // Attackers may go up to 6.1.
    let attacker = plane.host_bandwidth("h2").unwrap();
    let room = bw("6.1").checked_sub(attacker).unwrap();
    if room > Bandwidth::ZERO {
        assert_eq!(plane.increase_host_bandwidth("h2", room).unwrap(), bw("6.1"));
    }
    assert!(plane.increase_host_bandwidth("h2", bw("0.1")).is_err());

    // The server starts at its ceiling.
    assert_eq!(plane.host_bandwidth("hs").unwrap(), server_ceiling(4));
    assert!(plane.increase_host_bandwidth("hs", bw("0.1")).is_err());
    assert_eq!(plane.decrease_host_bandwidth("hs", bw("0.1")).unwrap(), bw("6.0"));
}

#[test]
fn adjust_dispatches_on_direction() {
    let (plane, _substrate) = control_plane();
    assert_eq!(
        plane.adjust_host_bandwidth("h3", Adjust::Decrease, bw("1.5")).unwrap(),
        bw("1.5")
    );
    assert_eq!(
        plane.adjust_switch_bandwidth("s103", "s104", Adjust::Decrease, bw("4.5")).unwrap(),
        bw("4.5")
    );
}

#[test]
fn second_interface_failure_is_reported_as_partial() {
    let (plane, substrate) = control_plane();
    substrate.fail_when(|call| matches!(call, SubstrateCall::SetBandwidth { node: "s102", .. }));

    let err = plane
        .increase_switch_bandwidth("s101", "s102", bw("0.05"))
        .unwrap_err();
    match &err {
        ControlError::SubstrateCommandFailed {
            step,
            switch,
            applied,
            state_changed,
            ..
        } => {
            assert_eq!(*step, Step::Reconfigure);
            assert_eq!(switch, "s102");
            assert_eq!(*applied, 1);
            assert!(*state_changed);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.changed_state());
    // Recorded ends moved together; the physical ends are now asymmetric.
    assert_eq!(plane.switch_bandwidth("s102", "s101").unwrap(), bw("9.05"));
    assert_eq!(substrate.interface_bandwidth("s101", "s101-eth102"), Some(bw("9.05")));
    assert_eq!(substrate.interface_bandwidth("s102", "s102-eth101"), Some(bw("9.0")));
}

#[test]
fn switch_link_admin_state_toggles_both_ends() {
    let (plane, substrate) = control_plane();

    plane.set_link_admin_state("s101", "s0", false).unwrap();
    assert!(!substrate.is_up("s101", "s101-eth0"));
    assert!(!substrate.is_up("s0", "s0-eth101"));
    assert_eq!(plane.switch_connections("s0").unwrap().get("s101"), Some(&false));
    assert_eq!(plane.switch_connections("s101").unwrap().get("s0"), Some(&false));
    assert!(!plane.link_info("s0", "s101").unwrap().connected);

    let topo = plane.topology();
    let h1 = topo.host("h1").unwrap();
    let hs = topo.server().unwrap();
    let trace = substrate
        .trace(&topo, "h1", &PacketHeader::ipv4(&h1.mac, &h1.ip, &hs.mac, &hs.ip))
        .unwrap();
    assert_eq!(
        trace.end,
        TraceEnd::LinkDown {
            switch: "s101".to_string(),
            interface: "s101-eth0".to_string()
        }
    );

    plane.set_link_admin_state("s0", "s101", true).unwrap();
    assert!(substrate.is_up("s101", "s101-eth0"));
    assert_eq!(plane.switch_connections("s101").unwrap().get("s0"), Some(&true));
}

#[test]
fn host_link_admin_state_uses_the_access_link() {
    let (plane, substrate) = control_plane();

    plane.set_link_admin_state("h1", "s1", false).unwrap();
    assert!(!substrate.is_up("h1", "h1-eth0"));
    assert!(!substrate.is_up("s1", "s1-eth0"));
    assert!(!plane.host_status("h1").unwrap().connected);

    let topo = plane.topology();
    let h1 = topo.host("h1").unwrap();
    let hs = topo.server().unwrap();
    let down = substrate
        .trace(&topo, "hs", &PacketHeader::ipv4(&hs.mac, &hs.ip, &h1.mac, &h1.ip))
        .unwrap();
    assert_eq!(
        down.end,
        TraceEnd::LinkDown {
            switch: "s1".to_string(),
            interface: "s1-eth0".to_string()
        }
    );

    // Either argument order works.
    plane.set_link_admin_state("s1", "h1", true).unwrap();
    assert!(plane.host_status("h1").unwrap().connected);

    assert!(matches!(
        plane.set_link_admin_state("h1", "s2", false),
        Err(ControlError::NoSuchLink { .. })
    ));
    assert!(matches!(
        plane.set_link_admin_state("h1", "s77", false),
        Err(ControlError::UnknownSwitch(_))
    ));
}

#[test]
fn admin_state_failure_keeps_recorded_flag() {
    let (plane, substrate) = control_plane();
    substrate.fail_when(|call| matches!(call, SubstrateCall::SetState { node: "s102", .. }));

    let err = plane.set_link_admin_state("s101", "s102", false).unwrap_err();
    assert!(matches!(
        err,
        ControlError::SubstrateCommandFailed { step: Step::AdminState, applied: 1, state_changed: false, .. }
    ));
    assert_eq!(plane.switch_connections("s101").unwrap().get("s102"), Some(&true));
}

#[test]
fn link_info_reports_counters_from_each_end() {
    let (plane, substrate) = control_plane();
    substrate.record_traffic("s101", "s101-eth103", 1_500, 20);
    substrate.record_traffic("s103", "s103-eth101", 40, 1_200);

    let info = plane.link_info("s101", "s103").unwrap();
    assert_eq!(info.src_interface, "s101-eth103");
    assert_eq!(info.dst_interface, "s103-eth101");
    assert_eq!(info.tx_bytes, 1_500);
    assert_eq!(info.rx_bytes, 1_200);

    let reverse = plane.link_info("s103", "s101").unwrap();
    assert_eq!(reverse.tx_bytes, 40);
    assert_eq!(reverse.rx_bytes, 20);

    substrate.record_traffic("s4", "s4-eth0", 7, 9);
    let counters = plane.host_counters("h4").unwrap();
    assert_eq!((counters.tx_bytes, counters.rx_bytes), (7, 9));

    assert!(matches!(plane.link_info("s101", "s2"), Err(ControlError::NoSuchLink { .. })));
}
