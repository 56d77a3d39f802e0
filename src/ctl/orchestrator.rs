//! 构建编排
//!
//! 启动顺序：拓扑、启动 substrate、关闭断开的链路、端口映射、bootstrap 规则。
//! 这是获得 [`ControlPlane`] 的唯一途径。

use std::collections::BTreeSet;

use super::bootstrap::bootstrap_rules;
use super::control_plane::ControlPlane;
use super::error::BuildError;
use crate::config::{NetworkConfig, Priorities};
use crate::net::{PortMap, Topology};
use crate::substrate::{Substrate, SubstrateError};
use crate::topo::build_fan_out;
use tracing::{debug, info};

fn stage(stage: &'static str) -> impl Fn(SubstrateError) -> BuildError {
    move |source| BuildError::Substrate { stage, source }
}

/// 把 substrate 从空白驱动到完成 bootstrap 的网络
pub struct BuildOrchestrator<S> {
    substrate: S,
}

impl<S: Substrate> BuildOrchestrator<S> {
    pub fn new(substrate: S) -> Self {
        Self { substrate }
    }

    /// 构建 `config` 描述的 fan-out 拓扑并启动
    pub fn build(self, config: &NetworkConfig) -> Result<ControlPlane<S>, BuildError> {
        let mut policy = config.bandwidth_policy();
        let topology = build_fan_out(config, &mut policy)?;
        self.build_topology(topology, config.priorities())
    }

    /// 启动已构建好的拓扑
    #[tracing::instrument(skip_all, fields(switches = topology.switches().count()))]
    pub fn build_topology(
        self,
        topology: Topology,
        priorities: Priorities,
    ) -> Result<ControlPlane<S>, BuildError> {
        priorities.validate()?;
        let substrate = self.substrate;

        substrate.start(&topology).map_err(stage("start"))?;
        let downed = bring_down_disconnected(&substrate, &topology)?;
        debug!(interfaces = downed, "disconnected links brought down");

        let ports = PortMap::learn(&topology, |switch| {
            substrate
                .read_live_ports(switch)
                .map_err(stage("port discovery"))
        })?;

        let rules = bootstrap_rules(&topology, &ports, &priorities)?;
        let total = rules.len();
        for (index, command) in rules.iter().enumerate() {
            substrate
                .apply(command)
                .map_err(|source| BuildError::Bootstrap {
                    index,
                    total,
                    command: command.to_string(),
                    source,
                })?;
        }
        info!(rules = total, "network bootstrapped");

        Ok(ControlPlane::new(substrate, topology, ports, priorities))
    }
}

/// 关闭所有记录为未连接的链路（包括主机接入链路）两端的接口。
/// 返回处理的接口数。
fn bring_down_disconnected<S: Substrate>(substrate: &S, topology: &Topology) -> Result<usize, BuildError> {
    let mut ends = BTreeSet::new();
    for sw in topology.switches() {
        for (neighbor, link) in &sw.links {
            if !link.connected {
                ends.insert((sw.name.clone(), link.src_interface.clone()));
                ends.insert((neighbor.clone(), link.dst_interface.clone()));
            }
        }
    }
    for host in topology.hosts().filter(|h| !h.connected) {
        ends.insert((host.name.clone(), host.src_interface.clone()));
        ends.insert((host.router_switch.clone(), host.dst_interface.clone()));
    }
    for (node, interface) in &ends {
        substrate
            .set_interface_state(node, interface, false)
            .map_err(stage("link bring-down"))?;
    }
    Ok(ends.len())
}
