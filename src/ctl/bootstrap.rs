//! ARP / 转发 bootstrap
//!
//! 启动后一次性安装的规则集。ARP 在所有交换机上以低优先级泛洪，
//! 在受控交换机上经朝向服务器的端口引导；每个客户端沿默认路径
//! 获得定向 MAC 规则。

use crate::config::{ConfigError, Priorities};
use crate::flow::{Action, ETHER_TYPE_ARP, FlowCommand, FlowError, FlowMatch, NET_PROTOCOL_ICMP, Protocol};
use crate::net::naming::{self, GLOBAL_DNS, interface_name};
use crate::net::{PortMap, Switch, SwitchKind, Topology};
use tracing::{debug, info};

use super::error::BuildError;

fn arp_match(priority: u16) -> Result<FlowMatch, FlowError> {
    FlowMatch::new()
        .priority(priority)
        .ether_type(ETHER_TYPE_ARP)?
        .net_protocol(NET_PROTOCOL_ICMP)
}

/// ARP（opcode 1）从所有端口泛洪
pub fn arp_flood(target: &str, priority: u16) -> Result<FlowCommand, FlowError> {
    FlowCommand::add_flow(target, arp_match(priority)?, vec![Action::Flood])
}

/// 从 `in_port` 进入的 ARP 从 `out_ports` 发出
pub fn arp_forward(
    target: &str,
    priority: u16,
    in_port: u32,
    out_ports: &[u32],
) -> Result<FlowCommand, FlowError> {
    let actions = out_ports.iter().map(|p| Action::Output(*p)).collect();
    FlowCommand::add_flow(target, arp_match(priority)?.in_port(in_port), actions)
}

/// `dl_src=<mac_src>,dl_dst=<mac_dst>`（源可选）从 `port` 发出
pub fn mac_rule(
    target: &str,
    priority: u16,
    mac_src: Option<&str>,
    mac_dst: &str,
    port: u32,
) -> Result<FlowCommand, FlowError> {
    let mut m = FlowMatch::new().priority(priority).mac_dst(mac_dst);
    if let Some(src) = mac_src {
        m = m.mac_src(src);
    }
    FlowCommand::add_flow(target, m, vec![Action::Output(port)])
}

fn dns_rule(target: &str, priority: u16, in_port: Option<u32>, port: u32) -> Result<FlowCommand, FlowError> {
    let mut m = FlowMatch::new().protocol(Protocol::Ip).priority(priority).ip_dst(GLOBAL_DNS);
    if let Some(p) = in_port {
        m = m.in_port(p);
    }
    FlowCommand::add_flow(target, m, vec![Action::Output(port)])
}

/// 受控交换机端口按 ARP 规则分组
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArpPorts {
    /// 朝向核心交换机，也就是朝向服务器
    pub server: u32,
    /// 朝向其他受控交换机
    pub controlled: Vec<u32>,
    /// 朝向 router 交换机
    pub routers: Vec<u32>,
}

pub fn arp_ports(topology: &Topology, ports: &PortMap, sw: &Switch) -> Result<ArpPorts, BuildError> {
    let switch = sw.name.as_str();
    let core_side = interface_name(switch, topology.core());
    let mut out = ArpPorts::default();
    for interface in &sw.ports {
        let port = ports.port(switch, interface)?;
        if *interface == core_side {
            out.server = port;
        } else if sw
            .neighbor_on(interface)
            .is_some_and(|n| topology.kind_of(n) == Some(SwitchKind::Controlled))
        {
            out.controlled.push(port);
        } else {
            out.routers.push(port);
        }
    }
    Ok(out)
}

/// 单个受控交换机的 ARP 规则：服务器端口到所有 router 端口，
/// 其余端口回到服务器端口，最后是泛洪兜底。
pub fn controlled_arp_rules(
    target: &str,
    arp: &ArpPorts,
    priorities: &Priorities,
) -> Result<Vec<FlowCommand>, FlowError> {
    let mut rules = Vec::with_capacity(arp.controlled.len() + arp.routers.len() + 2);
    // 没有主机以此为默认交换机时，就没有 router 端口可分发
    if !arp.routers.is_empty() {
        rules.push(arp_forward(target, priorities.controlled_arp, arp.server, &arp.routers)?);
    }
    for port in arp.routers.iter().chain(&arp.controlled) {
        rules.push(arp_forward(target, priorities.controlled_arp, *port, &[arp.server])?);
    }
    rules.push(arp_flood(target, priorities.controlled_flood)?);
    Ok(rules)
}

/// 完整的 bootstrap 序列，按安装顺序
pub fn bootstrap_rules(
    topology: &Topology,
    ports: &PortMap,
    priorities: &Priorities,
) -> Result<Vec<FlowCommand>, BuildError> {
    let core = topology.core();
    let highest = priorities.highest;
    let server = topology.server().ok_or(ConfigError::NoServer)?;
    let mut rules = Vec::new();

    rules.push(arp_flood(core, priorities.core_flood)?);
    for sw in topology.controlled_switches().iter().filter_map(|n| topology.switch(n)) {
        let arp = arp_ports(topology, ports, sw)?;
        rules.extend(controlled_arp_rules(&sw.name, &arp, priorities)?);
    }
    for router in topology.router_switches() {
        rules.push(arp_flood(router, priorities.router_arp)?);
    }

    let uplink = naming::core_uplink_interface(topology.controlled_switches().len());
    rules.push(dns_rule(core, highest, None, ports.port(core, &uplink)?)?);
    rules.push(mac_rule(core, highest, None, &server.mac, ports.port(core, &server.dst_interface)?)?);

    for name in topology.client_hosts() {
        let Some(host) = topology.host(name) else { continue };
        let Some(default) = host.default_path_switch() else { continue };
        let port = ports.port(core, &interface_name(core, default))?;
        rules.push(mac_rule(core, highest, None, &host.mac, port)?);
    }

    for name in topology.client_hosts() {
        let Some(host) = topology.host(name) else { continue };
        let Some(default) = host.default_path_switch() else { continue };
        let router = host.router_switch.as_str();
        let host_port = ports.port(router, &host.dst_interface)?;
        let uplink = ports.port(router, &interface_name(router, default))?;

        rules.push(dns_rule(router, highest, Some(host_port), uplink)?);
        rules.push(FlowCommand::add_flow(
            router,
            FlowMatch::new().priority(highest).in_port(host_port).mac_dst(&server.mac),
            vec![Action::Output(uplink)],
        )?);
        rules.push(mac_rule(router, highest, None, &host.mac, host_port)?);

        let to_core = ports.port(default, &interface_name(default, core))?;
        let to_router = ports.port(default, &interface_name(default, router))?;
        rules.push(dns_rule(default, highest, None, to_core)?);
        rules.push(mac_rule(default, highest, Some(&host.mac), &server.mac, to_core)?);
        rules.push(mac_rule(default, highest, None, &host.mac, to_router)?);
        debug!(host = %name, %router, %default, "host rules generated");
    }

    info!(rules = rules.len(), "bootstrap rules generated");
    Ok(rules)
}
