//! 链路类型
//!
//! 双向连接的一个方向，保存在拥有 `src_interface` 的交换机上。

use serde::Serialize;

use super::bandwidth::Bandwidth;

/// 从源交换机看到的网络链路
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub src_interface: String,
    pub dst_interface: String,
    pub bandwidth: Bandwidth,
    /// 管理状态 up/down
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

impl Link {
    /// 创建管理状态为 up 的链路
    pub fn new(
        src_interface: impl Into<String>,
        dst_interface: impl Into<String>,
        bandwidth: Bandwidth,
    ) -> Self {
        Self {
            src_interface: src_interface.into(),
            dst_interface: dst_interface.into(),
            bandwidth,
            connected: true,
            id: None,
        }
    }

    /// 从另一端看到的同一条链路
    pub fn reversed(&self) -> Link {
        Link {
            src_interface: self.dst_interface.clone(),
            dst_interface: self.src_interface.clone(),
            bandwidth: self.bandwidth,
            connected: self.connected,
            id: self.id,
        }
    }
}
