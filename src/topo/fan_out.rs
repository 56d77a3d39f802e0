//! 两层 fan-out 拓扑构建
//!
//! `hs - s0 - {s101 .. s1NN}`，受控交换机之间全互联；hosts 文件中每个条目
//! 对应一个 router 交换机和一个客户端主机，挂在该主机的默认受控交换机下。

use crate::config::{BandwidthPolicy, ConfigError, NetworkConfig};
use crate::net::naming::{self, CORE_SWITCH, host_interface, interface_name};
use crate::net::{Bandwidth, Host, HostRole, PathState, SwitchKind, Topology};
use tracing::{debug, info};

/// router <-> 受控交换机链路使用的 id
pub const ROUTER_LINK_ID: u32 = 1;

/// 构建拓扑，带宽由 `policy` 生成
pub fn build_fan_out(
    config: &NetworkConfig,
    policy: &mut BandwidthPolicy,
) -> Result<Topology, ConfigError> {
    let controlled = config.controlled_switches();
    let mut topo = Topology::default();

    // 先建核心交换机，使其占用最小的端口号
    topo.add_switch(CORE_SWITCH, SwitchKind::Core);
    for switch in controlled {
        topo.add_switch(switch.as_str(), SwitchKind::Controlled);
    }
    for (_, entry) in config.hosts().iter() {
        topo.add_switch(entry.router_switch.as_str(), SwitchKind::Router);
    }

    let core_bw: Vec<Bandwidth> = controlled.iter().map(|_| policy.core_link()).collect();
    let mut mesh_bw = Vec::new();
    for i in 0..controlled.len() {
        for _ in (i + 1)..controlled.len() {
            mesh_bw.push(policy.mesh_link());
        }
    }
    let clients = config.hosts().len();
    let server_bw = policy.server(clients);
    let host_bw: Vec<(HostRole, Bandwidth)> = config
        .hosts()
        .names()
        .map(|name| match config.role_of(name) {
            HostRole::Attacker => (HostRole::Attacker, policy.attacker()),
            role => (role, policy.client()),
        })
        .collect();

    for (switch, bw) in controlled.iter().zip(&core_bw) {
        topo.connect(CORE_SWITCH, switch, *bw);
        debug!(switch = %switch, bandwidth = %bw, "core link");
    }
    let mut mesh = mesh_bw.into_iter();
    for (i, a) in controlled.iter().enumerate() {
        for b in &controlled[i + 1..] {
            if let Some(bw) = mesh.next() {
                topo.connect(a, b, bw);
            }
        }
    }

    topo.add_port(CORE_SWITCH, naming::core_uplink_interface(controlled.len()));
    topo.add_host(Host {
        name: naming::DEFAULT_SERVER.to_string(),
        role: HostRole::Server,
        ip: naming::SERVER_IP.to_string(),
        mac: naming::SERVER_MAC.to_string(),
        router_switch: CORE_SWITCH.to_string(),
        src_interface: host_interface(naming::DEFAULT_SERVER),
        dst_interface: interface_name(CORE_SWITCH, "0"),
        bandwidth: server_bw,
        connected: true,
        path: None,
    });

    for ((name, entry), (role, bw)) in config.hosts().iter().zip(host_bw) {
        let path = PathState::new(controlled.to_vec(), &entry.default_path_switch).ok_or_else(|| {
            ConfigError::UnknownDefaultSwitch {
                host: name.to_string(),
                switch: entry.default_path_switch.clone(),
            }
        })?;
        topo.connect_with_id(&entry.router_switch, &entry.default_path_switch, bw, Some(ROUTER_LINK_ID));
        let added = topo.add_host(Host {
            name: name.to_string(),
            role,
            ip: entry.ip.clone(),
            mac: entry.mac.clone(),
            router_switch: entry.router_switch.clone(),
            src_interface: host_interface(name),
            dst_interface: interface_name(&entry.router_switch, "0"),
            bandwidth: bw,
            connected: true,
            path: Some(path),
        });
        if !added {
            return Err(ConfigError::RouterNameCollision {
                host: name.to_string(),
                router: entry.router_switch.clone(),
            });
        }
    }

    info!(
        controlled = controlled.len(),
        routers = topo.router_switches().len(),
        clients,
        "fan-out topology built"
    );
    Ok(topo)
}
