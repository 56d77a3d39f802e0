//! 主机类型与每主机路径状态

use std::collections::BTreeMap;

use serde::Serialize;

use super::bandwidth::Bandwidth;

/// 主机在实验中的用途
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostRole {
    Server,
    Attacker,
    Client,
}

/// 客户端主机流量当前经过的受控交换机
///
/// 保存候选交换机列表和当前生效项的下标，因此任何时刻恰好一个交换机生效，
/// 且默认交换机总在候选中。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathState {
    switches: Vec<String>,
    default: usize,
    active: usize,
}

impl PathState {
    /// 初始为 `default_switch`；不在 `switches` 中时返回 `None`
    pub fn new(switches: Vec<String>, default_switch: &str) -> Option<Self> {
        let default = switches.iter().position(|s| s == default_switch)?;
        Some(Self {
            switches,
            default,
            active: default,
        })
    }

    pub fn current(&self) -> &str {
        &self.switches[self.active]
    }

    pub fn default_switch(&self) -> &str {
        &self.switches[self.default]
    }

    pub fn contains(&self, switch: &str) -> bool {
        self.switches.iter().any(|s| s == switch)
    }

    /// 未生效的候选，按声明顺序
    pub fn options(&self) -> Vec<String> {
        self.switches
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.active)
            .map(|(_, s)| s.clone())
            .collect()
    }

    /// `switch -> 是否生效` 视图
    pub fn current_path(&self) -> BTreeMap<String, bool> {
        self.switches
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i == self.active))
            .collect()
    }

    /// 将 `switch` 设为生效并返回之前生效的交换机。
    /// `switch` 不是候选时返回 `None`，状态不变。
    pub fn switch_to(&mut self, switch: &str) -> Option<String> {
        let next = self.switches.iter().position(|s| s == switch)?;
        let previous = self.switches[self.active].clone();
        self.active = next;
        Some(previous)
    }
}

/// 主机节点
#[derive(Debug, Clone)]
pub struct Host {
    pub name: String,
    pub role: HostRole,
    pub ip: String,
    pub mac: String,
    /// 主机接入的交换机（服务器为 `s0`）
    pub router_switch: String,
    /// 接入链路的主机侧接口
    pub src_interface: String,
    /// 接入链路的交换机侧接口
    pub dst_interface: String,
    pub bandwidth: Bandwidth,
    pub connected: bool,
    /// 仅客户端主机有
    pub path: Option<PathState>,
}

impl Host {
    pub fn default_path_switch(&self) -> Option<&str> {
        self.path.as_ref().map(PathState::default_switch)
    }
}
