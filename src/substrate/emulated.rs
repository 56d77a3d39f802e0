//! 内存 substrate
//!
//! 每个交换机维护一张流表，add/delete 语义与 `ovs-ofctl` 一致；
//! 端口号按 Mininet 的方式分配（声明顺序，从 1 开始）；
//! 记录接口带宽、管理状态和字节计数。可以逐跳追踪数据包来检验流表规则。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{LinkCounters, Substrate, SubstrateError};
use crate::flow::{Action, EtherType, FlowCommand, FlowMatch};
use crate::net::{Bandwidth, Topology};
use tracing::{debug, trace};

/// 规则未指定 priority 时 OVS 的默认值
const DEFAULT_PRIORITY: u16 = 32_768;
const MAX_TRACE_HOPS: usize = 32;

/// 一条已安装的规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowEntry {
    pub matcher: FlowMatch,
    pub actions: Vec<Action>,
}

impl FlowEntry {
    pub fn priority(&self) -> u16 {
        self.matcher.priority.unwrap_or(DEFAULT_PRIORITY)
    }
}

/// 规则可匹配的包头字段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketHeader {
    pub ether_type: EtherType,
    /// IP 协议号；ARP 帧则为 opcode（OVS 复用 `nw_proto`）
    pub net_protocol: Option<&'static str>,
    pub ip_src: Option<String>,
    pub ip_dst: Option<String>,
    pub mac_src: String,
    pub mac_dst: String,
}

impl PacketHeader {
    /// 两个主机之间的 IPv4 帧
    pub fn ipv4(mac_src: &str, ip_src: &str, mac_dst: &str, ip_dst: &str) -> Self {
        Self {
            ether_type: EtherType::IPV4,
            net_protocol: Some("6"),
            ip_src: Some(ip_src.to_string()),
            ip_dst: Some(ip_dst.to_string()),
            mac_src: mac_src.to_string(),
            mac_dst: mac_dst.to_string(),
        }
    }

    /// 广播 ARP 请求
    pub fn arp_request(mac_src: &str, ip_src: &str, ip_dst: &str) -> Self {
        Self {
            ether_type: EtherType::ARP,
            net_protocol: Some("1"),
            ip_src: Some(ip_src.to_string()),
            ip_dst: Some(ip_dst.to_string()),
            mac_src: mac_src.to_string(),
            mac_dst: "ff:ff:ff:ff:ff:ff".to_string(),
        }
    }
}

fn rule_matches(m: &FlowMatch, in_port: u32, pkt: &PacketHeader) -> bool {
    fn eq_opt(want: &Option<String>, have: &Option<String>) -> bool {
        want.as_deref().is_none_or(|w| have.as_deref() == Some(w))
    }
    if let Some(protocol) = m.protocol {
        if protocol.ether_type() != pkt.ether_type {
            return false;
        }
        if protocol.net_protocol().is_some_and(|p| pkt.net_protocol != Some(p)) {
            return false;
        }
    }
    m.ether_type.is_none_or(|t| t == pkt.ether_type)
        && m.net_protocol.is_none_or(|p| pkt.net_protocol == Some(p.code()))
        && m.in_port.is_none_or(|p| p == in_port)
        && eq_opt(&m.ip_src, &pkt.ip_src)
        && eq_opt(&m.ip_dst, &pkt.ip_dst)
        && m.mac_src.as_deref().is_none_or(|mac| mac == pkt.mac_src)
        && m.mac_dst.as_deref().is_none_or(|mac| mac == pkt.mac_dst)
}

/// 故障注入看到的变更类调用
#[derive(Debug, Clone, Copy)]
pub enum SubstrateCall<'a> {
    Apply(&'a FlowCommand),
    SetBandwidth {
        node: &'a str,
        interface: &'a str,
        bandwidth: Bandwidth,
    },
    SetState {
        node: &'a str,
        interface: &'a str,
        up: bool,
    },
}

type FailurePredicate = Box<dyn Fn(&SubstrateCall<'_>) -> bool + Send + Sync>;

/// 被追踪数据包离开网络的方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEnd {
    /// 到达该主机的接入端口
    Delivered(String),
    /// 从后面没有建模对象的端口发出（例如 NAT uplink）
    Egress { switch: String, interface: String },
    /// 命中泛洪规则
    Flooded { switch: String },
    /// 没有规则匹配
    Dropped { switch: String },
    /// 转发到管理状态为 down 的链路
    LinkDown { switch: String, interface: String },
    Looped,
}

/// [`EmulatedSubstrate::trace`] 的逐跳结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub switches: Vec<String>,
    pub end: TraceEnd,
}

#[derive(Default)]
struct State {
    started: bool,
    ports: HashMap<String, BTreeMap<String, u32>>,
    tables: HashMap<String, Vec<FlowEntry>>,
    interfaces: HashSet<(String, String)>,
    bandwidth: HashMap<(String, String), Bandwidth>,
    down: HashSet<(String, String)>,
    counters: HashMap<(String, String), LinkCounters>,
    hidden: HashSet<(String, String)>,
    log: Vec<FlowCommand>,
}

/// 模拟网络
#[derive(Default)]
pub struct EmulatedSubstrate {
    state: Mutex<State>,
    failure: Mutex<Option<FailurePredicate>>,
}

impl EmulatedSubstrate {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 端口上报中不包含 `interface`，就像它从未启动
    pub fn hide_interface(&self, switch: &str, interface: &str) {
        self.state()
            .hidden
            .insert((switch.to_string(), interface.to_string()));
    }

    /// 让匹配 `predicate` 的变更调用失败，直到清除
    pub fn fail_when(&self, predicate: impl Fn(&SubstrateCall<'_>) -> bool + Send + Sync + 'static) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = Some(Box::new(predicate));
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn check_failure(&self, call: SubstrateCall<'_>) -> Result<(), SubstrateError> {
        let guard = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(pred) if pred(&call) => Err(SubstrateError::CommandFailed {
                command: describe(&call),
                reason: "injected failure".to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// 所有成功执行的流表命令，按顺序
    pub fn applied(&self) -> Vec<FlowCommand> {
        self.state().log.clone()
    }

    pub fn clear_applied(&self) {
        self.state().log.clear();
    }

    pub fn flow_table(&self, switch: &str) -> Vec<FlowEntry> {
        self.state().tables.get(switch).cloned().unwrap_or_default()
    }

    pub fn interface_bandwidth(&self, node: &str, interface: &str) -> Option<Bandwidth> {
        self.state()
            .bandwidth
            .get(&(node.to_string(), interface.to_string()))
            .copied()
    }

    pub fn is_up(&self, node: &str, interface: &str) -> bool {
        !self
            .state()
            .down
            .contains(&(node.to_string(), interface.to_string()))
    }

    /// 给接口计数器累加流量
    pub fn record_traffic(&self, node: &str, interface: &str, tx_bytes: u64, rx_bytes: u64) {
        let mut state = self.state();
        let c = state
            .counters
            .entry((node.to_string(), interface.to_string()))
            .or_default();
        c.tx_bytes = c.tx_bytes.saturating_add(tx_bytes);
        c.rx_bytes = c.rx_bytes.saturating_add(rx_bytes);
    }

    /// `switch` 上匹配从 `in_port` 进入的 `pkt` 的最高优先级规则。
    /// 优先级相同时取先安装的规则。
    pub fn lookup(&self, switch: &str, in_port: u32, pkt: &PacketHeader) -> Option<FlowEntry> {
        let state = self.state();
        let table = state.tables.get(switch)?;
        let mut best: Option<&FlowEntry> = None;
        for entry in table {
            if !rule_matches(&entry.matcher, in_port, pkt) {
                continue;
            }
            if best.is_none_or(|b| entry.priority() > b.priority()) {
                best = Some(entry);
            }
        }
        best.cloned()
    }

    /// 从 `host` 的接入端口出发追踪 `pkt`，每跳使用第一个 output 动作
    pub fn trace(&self, topology: &Topology, host: &str, pkt: &PacketHeader) -> Option<Trace> {
        let origin = topology.host(host)?;
        let mut switch = origin.router_switch.clone();
        let mut in_port = self.port_of(&switch, &origin.dst_interface)?;
        let mut switches = Vec::new();

        for _ in 0..MAX_TRACE_HOPS {
            switches.push(switch.clone());
            let Some(entry) = self.lookup(&switch, in_port, pkt) else {
                return Some(Trace { switches, end: TraceEnd::Dropped { switch } });
            };
            let out = match entry.actions.first() {
                Some(Action::Output(port)) => *port,
                Some(Action::Flood) | None => {
                    return Some(Trace { switches, end: TraceEnd::Flooded { switch } });
                }
            };
            let interface = self.interface_of(&switch, out)?;
            trace!(%switch, in_port, out, %interface, "trace hop");
            if !self.is_up(&switch, &interface) {
                return Some(Trace {
                    switches,
                    end: TraceEnd::LinkDown { switch, interface },
                });
            }
            if let Some(h) = topology
                .hosts()
                .find(|h| h.router_switch == switch && h.dst_interface == interface)
            {
                return Some(Trace {
                    switches,
                    end: TraceEnd::Delivered(h.name.clone()),
                });
            }
            let sw = topology.switch(&switch)?;
            let Some(next) = sw.neighbor_on(&interface) else {
                return Some(Trace {
                    switches,
                    end: TraceEnd::Egress { switch, interface },
                });
            };
            let link = sw.link_to(next)?;
            in_port = self.port_of(next, &link.dst_interface)?;
            switch = next.to_string();
        }
        Some(Trace { switches, end: TraceEnd::Looped })
    }

    fn port_of(&self, switch: &str, interface: &str) -> Option<u32> {
        self.state().ports.get(switch)?.get(interface).copied()
    }

    fn interface_of(&self, switch: &str, port: u32) -> Option<String> {
        self.state()
            .ports
            .get(switch)?
            .iter()
            .find(|(_, p)| **p == port)
            .map(|(name, _)| name.clone())
    }

    fn known_interface(state: &State, node: &str, interface: &str) -> Result<(), SubstrateError> {
        if state.interfaces.contains(&(node.to_string(), interface.to_string())) {
            Ok(())
        } else {
            Err(SubstrateError::UnknownInterface {
                node: node.to_string(),
                interface: interface.to_string(),
            })
        }
    }
}

/// `--strict`：字段相同且实际 priority 相同
fn strict_hit(want: &FlowMatch, have: &FlowMatch) -> bool {
    let normalize = |m: &FlowMatch| FlowMatch {
        priority: Some(m.priority.unwrap_or(DEFAULT_PRIORITY)),
        ..m.clone()
    };
    normalize(want).same_rule(&normalize(have))
}

fn describe(call: &SubstrateCall<'_>) -> String {
    match call {
        SubstrateCall::Apply(cmd) => cmd.to_string(),
        SubstrateCall::SetBandwidth {
            node,
            interface,
            bandwidth,
        } => format!("{node}: shape {interface} to {bandwidth}"),
        SubstrateCall::SetState { node, interface, up } => {
            format!("{node}: set {interface} {}", if *up { "up" } else { "down" })
        }
    }
}

impl Substrate for EmulatedSubstrate {
    fn start(&self, topology: &Topology) -> Result<(), SubstrateError> {
        let mut state = self.state();
        for sw in topology.switches() {
            let mut ports = BTreeMap::new();
            for (idx, interface) in sw.ports.iter().enumerate() {
                state.interfaces.insert((sw.name.clone(), interface.clone()));
                if state.hidden.contains(&(sw.name.clone(), interface.clone())) {
                    continue;
                }
                ports.insert(interface.clone(), idx as u32 + 1);
            }
            for link in sw.links.values() {
                state
                    .bandwidth
                    .insert((sw.name.clone(), link.src_interface.clone()), link.bandwidth);
            }
            state.ports.insert(sw.name.clone(), ports);
            state.tables.entry(sw.name.clone()).or_default();
        }
        for host in topology.hosts() {
            let host_side = (host.name.clone(), host.src_interface.clone());
            let switch_side = (host.router_switch.clone(), host.dst_interface.clone());
            state.interfaces.insert(host_side.clone());
            state.bandwidth.insert(host_side, host.bandwidth);
            state.bandwidth.insert(switch_side, host.bandwidth);
        }
        state.started = true;
        debug!(switches = state.ports.len(), "emulated substrate started");
        Ok(())
    }

    fn apply(&self, command: &FlowCommand) -> Result<(), SubstrateError> {
        self.check_failure(SubstrateCall::Apply(command))?;
        let mut state = self.state();
        if !state.started {
            return Err(SubstrateError::NotStarted);
        }
        let table = state
            .tables
            .get_mut(command.target())
            .ok_or_else(|| SubstrateError::UnknownNode(command.target().to_string()))?;
        match command {
            FlowCommand::AddFlow { matcher, actions, .. } => {
                let entry = FlowEntry {
                    matcher: matcher.clone(),
                    actions: actions.clone(),
                };
                match table.iter_mut().find(|e| e.matcher.same_rule(matcher)) {
                    Some(existing) => *existing = entry,
                    None => table.push(entry),
                }
            }
            FlowCommand::DeleteFlow { matcher, strict, .. } => {
                let before = table.len();
                table.retain(|e| {
                    let hit = if *strict {
                        strict_hit(matcher, &e.matcher)
                    } else {
                        matcher.selects(&e.matcher)
                    };
                    let out_port_ok = matcher.out_port.is_none_or(|p| {
                        e.actions.iter().any(|a| *a == Action::Output(p))
                    });
                    !(hit && out_port_ok)
                });
                trace!(target = command.target(), removed = before - table.len(), "del-flows");
            }
        }
        debug!(command = %command, "applied");
        state.log.push(command.clone());
        Ok(())
    }

    fn read_live_ports(&self, switch: &str) -> Result<HashMap<String, u32>, SubstrateError> {
        let state = self.state();
        if !state.started {
            return Err(SubstrateError::NotStarted);
        }
        state
            .ports
            .get(switch)
            .map(|m| m.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .ok_or_else(|| SubstrateError::UnknownNode(switch.to_string()))
    }

    fn read_link_counters(&self, node: &str, interface: &str) -> Result<LinkCounters, SubstrateError> {
        let state = self.state();
        Self::known_interface(&state, node, interface)?;
        Ok(state
            .counters
            .get(&(node.to_string(), interface.to_string()))
            .copied()
            .unwrap_or_default())
    }

    fn set_interface_bandwidth(
        &self,
        node: &str,
        interface: &str,
        bandwidth: Bandwidth,
    ) -> Result<(), SubstrateError> {
        self.check_failure(SubstrateCall::SetBandwidth {
            node,
            interface,
            bandwidth,
        })?;
        let mut state = self.state();
        Self::known_interface(&state, node, interface)?;
        state
            .bandwidth
            .insert((node.to_string(), interface.to_string()), bandwidth);
        Ok(())
    }

    fn set_interface_state(&self, node: &str, interface: &str, up: bool) -> Result<(), SubstrateError> {
        self.check_failure(SubstrateCall::SetState { node, interface, up })?;
        let mut state = self.state();
        Self::known_interface(&state, node, interface)?;
        let key = (node.to_string(), interface.to_string());
        if up {
            state.down.remove(&key);
        } else {
            state.down.insert(key);
        }
        Ok(())
    }
}
