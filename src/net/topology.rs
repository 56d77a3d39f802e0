//! 网络拓扑管理
//!
//! 两层 fan-out 的交换机、链路和主机，按名字索引。结构构建后固定，
//! 之后只有路径状态、带宽和 `connected` 标志会变化。

use std::collections::BTreeMap;

use super::bandwidth::Bandwidth;
use super::host::{Host, HostRole};
use super::link::Link;
use super::naming::{self, interface_name};
use super::switch::{Switch, SwitchKind};
use tracing::{debug, trace};

/// 网络拓扑
#[derive(Debug, Clone, Default)]
pub struct Topology {
    switches: BTreeMap<String, Switch>,
    hosts: BTreeMap<String, Host>,
    /// 受控交换机，按构建顺序
    controlled: Vec<String>,
    /// router 交换机，按构建顺序
    routers: Vec<String>,
    /// 客户端主机（含攻击者），按构建顺序
    clients: Vec<String>,
    server: Option<String>,
}

impl Topology {
    /// 添加交换机节点；重复添加不会替换，返回 `false`
    pub fn add_switch(&mut self, name: impl Into<String>, kind: SwitchKind) -> bool {
        let name = name.into();
        if self.switches.contains_key(&name) {
            return false;
        }
        match kind {
            SwitchKind::Controlled => self.controlled.push(name.clone()),
            SwitchKind::Router => self.routers.push(name.clone()),
            SwitchKind::Core => {}
        }
        debug!(switch = %name, ?kind, "switch added");
        self.switches.insert(name.clone(), Switch::new(name, kind));
        true
    }

    /// 在 `switch` 上声明没有交换机邻居的端口（服务器/主机接入端口或 uplink）
    pub fn add_port(&mut self, switch: &str, interface: impl Into<String>) {
        if let Some(sw) = self.switches.get_mut(switch) {
            sw.add_port(interface);
        }
    }

    /// 连接两个节点（创建双向链路 `a <-> b`，接口名按约定生成）
    pub fn connect(&mut self, a: &str, b: &str, bandwidth: Bandwidth) -> Option<()> {
        self.connect_with_id(a, b, bandwidth, None)
    }

    pub fn connect_with_id(
        &mut self,
        a: &str,
        b: &str,
        bandwidth: Bandwidth,
        id: Option<u32>,
    ) -> Option<()> {
        if !self.switches.contains_key(a) || !self.switches.contains_key(b) || a == b {
            return None;
        }
        let mut forward = Link::new(interface_name(a, b), interface_name(b, a), bandwidth);
        forward.id = id;
        let backward = forward.reversed();
        trace!(a, b, %bandwidth, "connecting switches");

        let sw_a = self.switches.get_mut(a)?;
        sw_a.add_port(forward.src_interface.clone());
        sw_a.links.insert(b.to_string(), forward);
        let sw_b = self.switches.get_mut(b)?;
        sw_b.add_port(backward.src_interface.clone());
        sw_b.links.insert(a.to_string(), backward);
        Some(())
    }

    /// 添加主机节点，并在接入交换机上声明其端口
    pub fn add_host(&mut self, host: Host) -> bool {
        if self.hosts.contains_key(&host.name) || !self.switches.contains_key(&host.router_switch) {
            return false;
        }
        self.add_port(&host.router_switch, host.dst_interface.clone());
        match host.role {
            HostRole::Server => self.server = Some(host.name.clone()),
            HostRole::Attacker | HostRole::Client => self.clients.push(host.name.clone()),
        }
        debug!(host = %host.name, role = ?host.role, router = %host.router_switch, "host added");
        self.hosts.insert(host.name.clone(), host);
        true
    }

    pub fn core(&self) -> &str {
        naming::CORE_SWITCH
    }

    pub fn switch(&self, name: &str) -> Option<&Switch> {
        self.switches.get(name)
    }

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.values()
    }

    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn host_mut(&mut self, name: &str) -> Option<&mut Host> {
        self.hosts.get_mut(name)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn controlled_switches(&self) -> &[String] {
        &self.controlled
    }

    pub fn router_switches(&self) -> &[String] {
        &self.routers
    }

    pub fn client_hosts(&self) -> &[String] {
        &self.clients
    }

    pub fn server(&self) -> Option<&Host> {
        self.server.as_deref().and_then(|name| self.hosts.get(name))
    }

    pub fn kind_of(&self, switch: &str) -> Option<SwitchKind> {
        self.switches.get(switch).map(|sw| sw.kind)
    }

    /// 从 `from` 出发到 `to` 的链路
    pub fn link(&self, from: &str, to: &str) -> Option<&Link> {
        self.switches.get(from)?.links.get(to)
    }

    /// 对 `a <-> b` 两个方向都执行 `update`
    pub fn update_link(&mut self, a: &str, b: &str, mut update: impl FnMut(&mut Link)) -> Option<()> {
        if self.link(a, b).is_none() || self.link(b, a).is_none() {
            return None;
        }
        update(self.switches.get_mut(a)?.links.get_mut(b)?);
        update(self.switches.get_mut(b)?.links.get_mut(a)?);
        Some(())
    }
}
