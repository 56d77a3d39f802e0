//! 控制平面错误

use std::fmt;

use crate::config::ConfigError;
use crate::flow::FlowError;
use crate::net::{Bandwidth, PortMappingIncomplete, PortNotMapped};
use crate::substrate::SubstrateError;

/// substrate 调用在操作的哪一步失败
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// 删除主机当前路径的规则
    Teardown,
    /// 安装新路径的规则
    Install,
    /// 带宽变更后调整接口限速
    Reconfigure,
    /// 开启或关闭接口
    AdminState,
    /// 读取接口计数
    ReadCounters,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Teardown => "teardown",
            Step::Install => "install",
            Step::Reconfigure => "reconfigure",
            Step::AdminState => "admin-state",
            Step::ReadCounters => "read-counters",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("unknown host {0}")]
    UnknownHost(String),
    #[error("unknown switch {0}")]
    UnknownSwitch(String),
    #[error("no link between {a} and {b}")]
    NoSuchLink { a: String, b: String },
    #[error("host {0} has no redirectable path")]
    NotRedirectable(String),
    #[error("host {host} is already on {switch}")]
    AlreadyOnPath { host: String, switch: String },
    #[error("{target}: {current} {op} {delta} leaves the allowed range [{min}, {max}]")]
    BandwidthOutOfRange {
        target: String,
        current: Bandwidth,
        op: char,
        delta: Bandwidth,
        min: Bandwidth,
        max: Bandwidth,
    },
    #[error("bandwidth delta must be positive, got {0}")]
    InvalidDelta(Bandwidth),
    #[error("no port mapped for interface {interface} on switch {switch}")]
    PortNotMapped { switch: String, interface: String },
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error(
        "{step} failed on {switch} after {applied} applied call(s) (state changed: {state_changed})"
    )]
    SubstrateCommandFailed {
        step: Step,
        switch: String,
        applied: usize,
        state_changed: bool,
        #[source]
        source: SubstrateError,
    },
}

impl ControlError {
    /// 失败的操作是否已改变了记录状态或 substrate
    pub fn changed_state(&self) -> bool {
        match self {
            ControlError::SubstrateCommandFailed {
                applied,
                state_changed,
                ..
            } => *applied > 0 || *state_changed,
            _ => false,
        }
    }
}

impl From<PortNotMapped> for ControlError {
    fn from(err: PortNotMapped) -> Self {
        ControlError::PortNotMapped {
            switch: err.switch,
            interface: err.interface,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("substrate failed during {stage}")]
    Substrate {
        stage: &'static str,
        #[source]
        source: SubstrateError,
    },
    #[error("port mapping incomplete, missing interfaces: {}", crate::net::format_missing(.missing))]
    PortMappingIncomplete { missing: Vec<(String, String)> },
    #[error("no port mapped for interface {interface} on switch {switch}")]
    PortNotMapped { switch: String, interface: String },
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("bootstrap rule {index} of {total} failed: `{command}`")]
    Bootstrap {
        index: usize,
        total: usize,
        command: String,
        #[source]
        source: SubstrateError,
    },
}

impl From<PortMappingIncomplete> for BuildError {
    fn from(err: PortMappingIncomplete) -> Self {
        BuildError::PortMappingIncomplete {
            missing: err.missing,
        }
    }
}

impl From<PortNotMapped> for BuildError {
    fn from(err: PortNotMapped) -> Self {
        BuildError::PortNotMapped {
            switch: err.switch,
            interface: err.interface,
        }
    }
}
