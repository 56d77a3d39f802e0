//! 控制平面上下文
//!
//! 持有拓扑、学习到的端口映射和 substrate，以及串行化变更操作的锁。
//! `ControlPlane` 只能由 [`super::BuildOrchestrator`] 产生，
//! 持有它就意味着网络已启动并完成 bootstrap。

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use super::error::{ControlError, Step};
use crate::config::Priorities;
use crate::net::{Bandwidth, HostRole, PortMap, Topology};
use crate::substrate::{LinkCounters, Substrate};
use tracing::debug;

pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`ControlPlane::host_path`] 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPath {
    pub host: String,
    pub router: String,
    pub current: String,
    pub default: String,
    /// 主机可以重定向到的受控交换机
    pub options: Vec<String>,
    pub current_path: BTreeMap<String, bool>,
}

/// [`ControlPlane::link_info`] 的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkInfo {
    pub src: String,
    pub dst: String,
    pub src_interface: String,
    pub dst_interface: String,
    pub bandwidth: Bandwidth,
    pub connected: bool,
    /// `src` 在 `src_interface` 上发送的字节数
    pub tx_bytes: u64,
    /// `dst` 在 `dst_interface` 上接收的字节数
    pub rx_bytes: u64,
}

/// 单个主机的记录状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    pub name: String,
    pub role: HostRole,
    pub ip: String,
    pub mac: String,
    pub router_switch: String,
    pub src_interface: String,
    pub dst_interface: String,
    pub bandwidth: Bandwidth,
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_path_switch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_path: Option<BTreeMap<String, bool>>,
}

/// 已运行并完成 bootstrap 的网络
pub struct ControlPlane<S> {
    pub(super) substrate: S,
    topology: RwLock<Topology>,
    pub(super) ports: PortMap,
    pub(super) priorities: Priorities,
    /// 串行化同一主机的重定向
    pub(super) host_locks: HashMap<String, Mutex<()>>,
    /// 重定向期间在核心交换机的删除和安装之间一直持有
    pub(super) core_lock: Mutex<()>,
    /// 串行化带宽和管理状态变更
    pub(super) bandwidth_lock: Mutex<()>,
}

impl<S: Substrate> ControlPlane<S> {
    pub(super) fn new(substrate: S, topology: Topology, ports: PortMap, priorities: Priorities) -> Self {
        let host_locks = topology
            .hosts()
            .map(|h| (h.name.clone(), Mutex::new(())))
            .collect();
        Self {
            substrate,
            topology: RwLock::new(topology),
            ports,
            priorities,
            host_locks,
            core_lock: Mutex::new(()),
            bandwidth_lock: Mutex::new(()),
        }
    }

    pub(super) fn read(&self) -> RwLockReadGuard<'_, Topology> {
        self.topology.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn write(&self) -> RwLockWriteGuard<'_, Topology> {
        self.topology.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn substrate(&self) -> &S {
        &self.substrate
    }

    pub fn ports(&self) -> &PortMap {
        &self.ports
    }

    pub fn priorities(&self) -> Priorities {
        self.priorities
    }

    /// 当前记录拓扑的快照
    pub fn topology(&self) -> Topology {
        self.read().clone()
    }

    /// 先是服务器，然后按构建顺序列出客户端主机
    pub fn host_names(&self) -> Vec<String> {
        let topo = self.read();
        topo.server()
            .map(|s| s.name.clone())
            .into_iter()
            .chain(topo.client_hosts().iter().cloned())
            .collect()
    }

    pub fn host_status(&self, host: &str) -> Result<HostStatus, ControlError> {
        let topo = self.read();
        let h = topo
            .host(host)
            .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
        Ok(HostStatus {
            name: h.name.clone(),
            role: h.role,
            ip: h.ip.clone(),
            mac: h.mac.clone(),
            router_switch: h.router_switch.clone(),
            src_interface: h.src_interface.clone(),
            dst_interface: h.dst_interface.clone(),
            bandwidth: h.bandwidth,
            connected: h.connected,
            default_path_switch: h.default_path_switch().map(str::to_string),
            current_path: h.path.as_ref().map(|p| p.current_path()),
        })
    }

    pub fn host_path(&self, host: &str) -> Result<HostPath, ControlError> {
        let topo = self.read();
        let h = topo
            .host(host)
            .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
        let path = h
            .path
            .as_ref()
            .ok_or_else(|| ControlError::NotRedirectable(host.to_string()))?;
        Ok(HostPath {
            host: h.name.clone(),
            router: h.router_switch.clone(),
            current: path.current().to_string(),
            default: path.default_switch().to_string(),
            options: path.options(),
            current_path: path.current_path(),
        })
    }

    pub fn host_bandwidth(&self, host: &str) -> Result<Bandwidth, ControlError> {
        self.read()
            .host(host)
            .map(|h| h.bandwidth)
            .ok_or_else(|| ControlError::UnknownHost(host.to_string()))
    }

    /// 主机接入链路交换机侧的计数
    pub fn host_counters(&self, host: &str) -> Result<LinkCounters, ControlError> {
        let (switch, interface) = {
            let topo = self.read();
            let h = topo
                .host(host)
                .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
            (h.router_switch.clone(), h.dst_interface.clone())
        };
        self.read_counters(&switch, &interface)
    }

    pub fn switch_bandwidth(&self, a: &str, b: &str) -> Result<Bandwidth, ControlError> {
        let topo = self.read();
        Self::check_switch(&topo, a)?;
        Self::check_switch(&topo, b)?;
        topo.link(a, b)
            .map(|l| l.bandwidth)
            .ok_or_else(|| no_such_link(a, b))
    }

    /// `switch` 每条链路的 `neighbor -> connected`
    pub fn switch_connections(&self, switch: &str) -> Result<BTreeMap<String, bool>, ControlError> {
        let topo = self.read();
        let sw = topo
            .switch(switch)
            .ok_or_else(|| ControlError::UnknownSwitch(switch.to_string()))?;
        Ok(sw
            .links
            .iter()
            .map(|(name, link)| (name.clone(), link.connected))
            .collect())
    }

    pub fn neighbor_switches(&self, switch: &str) -> Result<Vec<String>, ControlError> {
        let topo = self.read();
        let sw = topo
            .switch(switch)
            .ok_or_else(|| ControlError::UnknownSwitch(switch.to_string()))?;
        Ok(sw.links.keys().cloned().collect())
    }

    /// 链路 `a -> b` 的带宽和字节计数
    pub fn link_info(&self, a: &str, b: &str) -> Result<LinkInfo, ControlError> {
        let link = {
            let topo = self.read();
            Self::check_switch(&topo, a)?;
            Self::check_switch(&topo, b)?;
            topo.link(a, b).cloned().ok_or_else(|| no_such_link(a, b))?
        };
        let tx = self.read_counters(a, &link.src_interface)?;
        let rx = self.read_counters(b, &link.dst_interface)?;
        debug!(a, b, tx = tx.tx_bytes, rx = rx.rx_bytes, "link info");
        Ok(LinkInfo {
            src: a.to_string(),
            dst: b.to_string(),
            src_interface: link.src_interface,
            dst_interface: link.dst_interface,
            bandwidth: link.bandwidth,
            connected: link.connected,
            tx_bytes: tx.tx_bytes,
            rx_bytes: rx.rx_bytes,
        })
    }

    fn read_counters(&self, node: &str, interface: &str) -> Result<LinkCounters, ControlError> {
        self.substrate
            .read_link_counters(node, interface)
            .map_err(|source| ControlError::SubstrateCommandFailed {
                step: Step::ReadCounters,
                switch: node.to_string(),
                applied: 0,
                state_changed: false,
                source,
            })
    }

    pub(super) fn check_switch(topo: &Topology, name: &str) -> Result<(), ControlError> {
        match topo.switch(name) {
            Some(_) => Ok(()),
            None => Err(ControlError::UnknownSwitch(name.to_string())),
        }
    }
}

pub(super) fn no_such_link(a: &str, b: &str) -> ControlError {
    ControlError::NoSuchLink {
        a: a.to_string(),
        b: b.to_string(),
    }
}
