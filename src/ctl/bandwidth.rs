//! 带宽与链路管理状态
//!
//! 链路两端总是记录相同的带宽。先更新记录，再依次调整两端的物理接口；
//! 第二个接口失败时只报告，不撤销。

use super::control_plane::{ControlPlane, lock, no_such_link};
use super::error::{ControlError, Step};
use crate::net::{
    Bandwidth, HostRole, MAX_ATTACKER_BW, MAX_HOST_BW, MAX_SWITCH_BW, MIN_BW, Topology,
    server_ceiling,
};
use crate::substrate::Substrate;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Increase,
    Decrease,
}

impl Adjust {
    fn sign(self) -> char {
        match self {
            Adjust::Increase => '+',
            Adjust::Decrease => '-',
        }
    }
}

/// `current ± delta`，要求结果在 `[MIN_BW, max]` 之内
pub fn adjusted(
    target: &str,
    current: Bandwidth,
    adjust: Adjust,
    delta: Bandwidth,
    max: Bandwidth,
) -> Result<Bandwidth, ControlError> {
    if delta == Bandwidth::ZERO {
        return Err(ControlError::InvalidDelta(delta));
    }
    let next = match adjust {
        Adjust::Increase => current.checked_add(delta),
        Adjust::Decrease => current.checked_sub(delta),
    };
    next.filter(|bw| (MIN_BW..=max).contains(bw))
        .ok_or_else(|| ControlError::BandwidthOutOfRange {
            target: target.to_string(),
            current,
            op: adjust.sign(),
            delta,
            min: MIN_BW,
            max,
        })
}

/// 主机接入链路允许的最高带宽
pub fn host_ceiling(topology: &Topology, role: HostRole) -> Bandwidth {
    match role {
        HostRole::Server => server_ceiling(topology.client_hosts().len()),
        HostRole::Attacker => MAX_ATTACKER_BW,
        HostRole::Client => MAX_HOST_BW,
    }
}

/// 需要调整或开关的单个物理接口
type Endpoint = (String, String);

impl<S: Substrate> ControlPlane<S> {
    pub fn increase_switch_bandwidth(&self, a: &str, b: &str, delta: Bandwidth) -> Result<Bandwidth, ControlError> {
        self.adjust_switch_bandwidth(a, b, Adjust::Increase, delta)
    }

    pub fn decrease_switch_bandwidth(&self, a: &str, b: &str, delta: Bandwidth) -> Result<Bandwidth, ControlError> {
        self.adjust_switch_bandwidth(a, b, Adjust::Decrease, delta)
    }

    pub fn increase_host_bandwidth(&self, host: &str, delta: Bandwidth) -> Result<Bandwidth, ControlError> {
        self.adjust_host_bandwidth(host, Adjust::Increase, delta)
    }

    pub fn decrease_host_bandwidth(&self, host: &str, delta: Bandwidth) -> Result<Bandwidth, ControlError> {
        self.adjust_host_bandwidth(host, Adjust::Decrease, delta)
    }

    #[tracing::instrument(skip(self, delta), fields(delta = %delta))]
    pub fn adjust_switch_bandwidth(
        &self,
        a: &str,
        b: &str,
        adjust: Adjust,
        delta: Bandwidth,
    ) -> Result<Bandwidth, ControlError> {
        let _guard = lock(&self.bandwidth_lock);
        let (next, ends) = {
            let mut topo = self.write();
            Self::check_switch(&topo, a)?;
            Self::check_switch(&topo, b)?;
            let link = topo.link(a, b).ok_or_else(|| no_such_link(a, b))?;
            let next = adjusted(&format!("{a}<->{b}"), link.bandwidth, adjust, delta, MAX_SWITCH_BW)?;
            let ends = [
                (a.to_string(), link.src_interface.clone()),
                (b.to_string(), link.dst_interface.clone()),
            ];
            topo.update_link(a, b, |l| l.bandwidth = next)
                .ok_or_else(|| no_such_link(a, b))?;
            (next, ends)
        };
        self.reshape(&ends, next)?;
        info!(a, b, bandwidth = %next, "switch bandwidth changed");
        Ok(next)
    }

    #[tracing::instrument(skip(self, delta), fields(delta = %delta))]
    pub fn adjust_host_bandwidth(
        &self,
        host: &str,
        adjust: Adjust,
        delta: Bandwidth,
    ) -> Result<Bandwidth, ControlError> {
        let _guard = lock(&self.bandwidth_lock);
        let (next, ends) = {
            let mut topo = self.write();
            let h = topo
                .host(host)
                .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
            let max = host_ceiling(&topo, h.role);
            let next = adjusted(host, h.bandwidth, adjust, delta, max)?;
            let ends = [
                (h.name.clone(), h.src_interface.clone()),
                (h.router_switch.clone(), h.dst_interface.clone()),
            ];
            if let Some(h) = topo.host_mut(host) {
                h.bandwidth = next;
            }
            (next, ends)
        };
        self.reshape(&ends, next)?;
        info!(host, bandwidth = %next, "host bandwidth changed");
        Ok(next)
    }

    /// 记录中已经是 `bandwidth`，因此这里的任何失败都算状态已变更
    fn reshape(&self, ends: &[Endpoint], bandwidth: Bandwidth) -> Result<(), ControlError> {
        for (applied, (node, interface)) in ends.iter().enumerate() {
            self.substrate
                .set_interface_bandwidth(node, interface, bandwidth)
                .map_err(|source| ControlError::SubstrateCommandFailed {
                    step: Step::Reconfigure,
                    switch: node.clone(),
                    applied,
                    state_changed: true,
                    source,
                })?;
        }
        Ok(())
    }

    /// 开启或关闭 `a` 与 `b` 之间的链路。
    ///
    /// 任一端可以是主机，此时另一端必须是它的 router 交换机。
    /// 两端接口都切换完成后才更新记录的 `connected` 标志。
    #[tracing::instrument(skip(self))]
    pub fn set_link_admin_state(&self, a: &str, b: &str, up: bool) -> Result<(), ControlError> {
        let _guard = lock(&self.bandwidth_lock);
        let (ends, host) = {
            let topo = self.read();
            let host_end = topo.host(a).or_else(|| topo.host(b));
            match host_end {
                Some(h) => {
                    let other = if h.name == a { b } else { a };
                    if topo.switch(other).is_none() {
                        return Err(ControlError::UnknownSwitch(other.to_string()));
                    }
                    if h.router_switch != other {
                        return Err(no_such_link(a, b));
                    }
                    let ends = [
                        (h.name.clone(), h.src_interface.clone()),
                        (h.router_switch.clone(), h.dst_interface.clone()),
                    ];
                    (ends, Some(h.name.clone()))
                }
                None => {
                    Self::check_switch(&topo, a)?;
                    Self::check_switch(&topo, b)?;
                    let link = topo.link(a, b).ok_or_else(|| no_such_link(a, b))?;
                    let ends = [
                        (a.to_string(), link.src_interface.clone()),
                        (b.to_string(), link.dst_interface.clone()),
                    ];
                    (ends, None)
                }
            }
        };

        for (applied, (node, interface)) in ends.iter().enumerate() {
            self.substrate
                .set_interface_state(node, interface, up)
                .map_err(|source| ControlError::SubstrateCommandFailed {
                    step: Step::AdminState,
                    switch: node.clone(),
                    applied,
                    state_changed: false,
                    source,
                })?;
        }

        let mut topo = self.write();
        match host {
            Some(name) => {
                if let Some(h) = topo.host_mut(&name) {
                    h.connected = up;
                }
            }
            None => {
                topo.update_link(a, b, |l| l.connected = up);
            }
        }
        info!(a, b, up, "link admin state changed");
        Ok(())
    }
}
