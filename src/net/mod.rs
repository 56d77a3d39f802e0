//! 网络模型
//!
//! 交换机、链路、主机及其路径状态，以及学习到的端口映射。

// 子模块声明
mod bandwidth;
mod host;
mod link;
pub mod naming;
mod port_map;
mod switch;
mod topology;

// 重新导出公共接口
pub use bandwidth::{
    Bandwidth, MAX_ATTACKER_BW, MAX_HOST_BW, MAX_SWITCH_BW, MIN_BW, ParseBandwidthError,
    server_ceiling,
};
pub use host::{Host, HostRole, PathState};
pub use link::Link;
pub use port_map::{PortMap, PortMappingIncomplete, PortNotMapped};
pub(crate) use port_map::format_missing;
pub use switch::{Switch, SwitchKind};
pub use topology::Topology;
