//! 交换机控制 substrate
//!
//! 控制平面本身不转发数据包。它对网络的所有需求（安装规则、学习端口号、
//! 读取计数器、限速和开关接口）都通过 [`Substrate`] 完成。

mod emulated;
mod ovs;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::flow::FlowCommand;
use crate::net::{Bandwidth, Topology};

pub use emulated::{EmulatedSubstrate, FlowEntry, PacketHeader, SubstrateCall, Trace, TraceEnd};
pub use ovs::OvsSubstrate;

/// 单个接口的字节计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkCounters {
    pub tx_bytes: u64,
    pub rx_bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SubstrateError {
    #[error("substrate has not been started")]
    NotStarted,
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("unknown interface {interface} on {node}")]
    UnknownInterface { node: String, interface: String },
    #[error("`{command}` failed: {reason}")]
    CommandFailed { command: String, reason: String },
    #[error("failed to run `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unexpected output from `{command}`: {detail}")]
    Parse { command: String, detail: String },
}

/// 控制平面依赖的网络 substrate 能力
///
/// 所有调用都是阻塞的，每个操作内逐个发出。
pub trait Substrate: Send + Sync {
    /// 启动 `topology` 中的所有交换机、主机和链路
    fn start(&self, topology: &Topology) -> Result<(), SubstrateError>;

    /// 执行一条 add-flow / del-flows 命令并等待完成
    fn apply(&self, command: &FlowCommand) -> Result<(), SubstrateError>;

    /// 交换机的 `接口名 -> OpenFlow 端口`
    fn read_live_ports(&self, switch: &str) -> Result<HashMap<String, u32>, SubstrateError>;

    fn read_link_counters(&self, node: &str, interface: &str) -> Result<LinkCounters, SubstrateError>;

    /// 立即调整接口限速，不做平滑过渡
    fn set_interface_bandwidth(
        &self,
        node: &str,
        interface: &str,
        bandwidth: Bandwidth,
    ) -> Result<(), SubstrateError>;

    fn set_interface_state(&self, node: &str, interface: &str, up: bool) -> Result<(), SubstrateError>;
}

impl<S: Substrate + ?Sized> Substrate for Arc<S> {
    fn start(&self, topology: &Topology) -> Result<(), SubstrateError> {
        (**self).start(topology)
    }

    fn apply(&self, command: &FlowCommand) -> Result<(), SubstrateError> {
        (**self).apply(command)
    }

    fn read_live_ports(&self, switch: &str) -> Result<HashMap<String, u32>, SubstrateError> {
        (**self).read_live_ports(switch)
    }

    fn read_link_counters(&self, node: &str, interface: &str) -> Result<LinkCounters, SubstrateError> {
        (**self).read_link_counters(node, interface)
    }

    fn set_interface_bandwidth(
        &self,
        node: &str,
        interface: &str,
        bandwidth: Bandwidth,
    ) -> Result<(), SubstrateError> {
        (**self).set_interface_bandwidth(node, interface, bandwidth)
    }

    fn set_interface_state(&self, node: &str, interface: &str, up: bool) -> Result<(), SubstrateError> {
        (**self).set_interface_state(node, interface, up)
    }
}
