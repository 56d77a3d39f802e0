//! 交换机类型

use std::collections::BTreeMap;

use serde::Serialize;

use super::link::Link;

/// 交换机在两层 fan-out 中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SwitchKind {
    /// 服务器和所有受控交换机连接的唯一交换机
    Core,
    /// 流表由路径重定向管理
    Controlled,
    /// 每个主机一个的边缘交换机；只负责泛洪 ARP
    Router,
}

/// 交换机节点
#[derive(Debug, Clone, Serialize)]
pub struct Switch {
    pub name: String,
    pub kind: SwitchKind,
    /// 按声明顺序的接口名
    pub ports: Vec<String>,
    /// 邻居交换机名 -> 从本交换机出发的链路
    pub links: BTreeMap<String, Link>,
}

impl Switch {
    pub fn new(name: impl Into<String>, kind: SwitchKind) -> Self {
        Self {
            name: name.into(),
            kind,
            ports: Vec::new(),
            links: BTreeMap::new(),
        }
    }

    /// 声明接口（已存在则忽略）
    pub fn add_port(&mut self, interface: impl Into<String>) {
        let interface = interface.into();
        if !self.ports.contains(&interface) {
            self.ports.push(interface);
        }
    }

    pub fn link_to(&self, neighbor: &str) -> Option<&Link> {
        self.links.get(neighbor)
    }

    /// 经 `interface` 到达的邻居名
    pub fn neighbor_on(&self, interface: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|(_, link)| link.src_interface == interface)
            .map(|(name, _)| name.as_str())
    }
}
