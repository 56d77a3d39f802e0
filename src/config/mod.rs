//! 配置
//!
//! hosts 拓扑文件、运行时设置及其校验，以及初始带宽策略。
//! 所有检查在加载时完成一次；只要 `NetworkConfig` 存在就是合法的。

mod hosts;
mod policy;
mod settings;

use std::path::PathBuf;

use crate::net::Bandwidth;

pub use hosts::{HostEntry, HostsFile};
pub use policy::BandwidthPolicy;
pub use settings::{
    MAX_CONTROLLED_SWITCHES, MIN_CONTROLLED_SWITCHES, NetworkConfig, Priorities, Settings,
};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed hosts file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("host name `{0}` is not valid, expected 'h' followed by a positive number (e.g. h76)")]
    InvalidHostName(String),
    #[error("no server has been set")]
    NoServer,
    #[error("only a single server is supported, got {0:?}")]
    TooManyServers(Vec<String>),
    #[error("only `hs` is supported as server, got `{0}`")]
    UnsupportedServer(String),
    #[error("no attacker has been set")]
    NoAttacker,
    #[error("only a single attacker is supported, got {0:?}")]
    TooManyAttackers(Vec<String>),
    #[error("attacker `{attacker}` is not one of the hosts {hosts:?}")]
    UnknownAttacker { attacker: String, hosts: Vec<String> },
    #[error("{0} controlled switches requested, allowed range is 4..=99")]
    ControlledSwitchCount(usize),
    #[error("default path switch `{switch}` of host {host} is not a controlled switch")]
    UnknownDefaultSwitch { host: String, switch: String },
    #[error("router switch `{router}` of host {host} is not valid, expected 's' followed by digits (e.g. s76)")]
    InvalidRouterName { host: String, router: String },
    #[error("router switch `{router}` of host {host} collides with another node name")]
    RouterNameCollision { host: String, router: String },
    #[error("router switch `{0}` is shared by more than one host")]
    DuplicateRouter(String),
    #[error("address {address} of host {host} is already in use")]
    DuplicateAddress { host: String, address: String },
    #[error("{what} {value} is outside the allowed range")]
    BandwidthOutOfRange { what: &'static str, value: Bandwidth },
    #[error("priority `{higher}` must be greater than `{lower}`")]
    PriorityOrder {
        higher: &'static str,
        lower: &'static str,
    },
}
