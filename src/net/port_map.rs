//! 端口映射
//!
//! `(switch, interface) -> OpenFlow 端口号`，在链路建立后从 substrate 学习一次。
//! 之后只读，查询无需加锁。

use std::collections::HashMap;

use super::topology::Topology;
use tracing::{debug, warn};

/// substrate 未上报的已声明接口
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("port mapping incomplete, missing interfaces: {}", format_missing(.missing))]
pub struct PortMappingIncomplete {
    pub missing: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no port mapped for interface {interface} on switch {switch}")]
pub struct PortNotMapped {
    pub switch: String,
    pub interface: String,
}

pub(crate) fn format_missing(missing: &[(String, String)]) -> String {
    missing
        .iter()
        .map(|(switch, interface)| format!("{switch}/{interface}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 不可变的接口 -> 端口表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortMap {
    ports: HashMap<String, HashMap<String, u32>>,
}

impl PortMap {
    /// 根据每个交换机上报的端口构建映射表
    ///
    /// 拓扑声明的每个接口都必须存在；多余的接口（例如网桥的 `LOCAL` 端口）
    /// 保留但不使用。
    pub fn learn<E: From<PortMappingIncomplete>>(
        topology: &Topology,
        mut read_live_ports: impl FnMut(&str) -> Result<HashMap<String, u32>, E>,
    ) -> Result<PortMap, E> {
        let mut ports = HashMap::new();
        let mut missing = Vec::new();
        for switch in topology.switches() {
            let live = read_live_ports(&switch.name)?;
            debug!(switch = %switch.name, ports = live.len(), "learned live ports");
            for interface in &switch.ports {
                if !live.contains_key(interface) {
                    warn!(switch = %switch.name, %interface, "declared interface has no live port");
                    missing.push((switch.name.clone(), interface.clone()));
                }
            }
            ports.insert(switch.name.clone(), live);
        }
        if !missing.is_empty() {
            return Err(PortMappingIncomplete { missing }.into());
        }
        Ok(PortMap { ports })
    }

    pub fn port(&self, switch: &str, interface: &str) -> Result<u32, PortNotMapped> {
        self.ports
            .get(switch)
            .and_then(|m| m.get(interface))
            .copied()
            .ok_or_else(|| PortNotMapped {
                switch: switch.to_string(),
                interface: interface.to_string(),
            })
    }
}
