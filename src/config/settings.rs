//! 运行时设置与校验后的网络配置

use serde::{Deserialize, Serialize};

use super::ConfigError;
use super::hosts::HostsFile;
use super::policy::BandwidthPolicy;
use crate::net::naming::{self, CORE_SWITCH, DEFAULT_SERVER};
use crate::net::{Bandwidth, HostRole, MAX_HOST_BW, MAX_SWITCH_BW, MIN_BW};

pub const MIN_CONTROLLED_SWITCHES: usize = 4;
pub const MAX_CONTROLLED_SWITCHES: usize = 99;

/// bootstrap 规则和路径重定向使用的流表优先级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priorities {
    /// 定向转发规则
    pub highest: u16,
    pub core_flood: u16,
    pub controlled_arp: u16,
    pub controlled_flood: u16,
    pub router_arp: u16,
}

impl Default for Priorities {
    fn default() -> Self {
        Self {
            highest: 65535,
            core_flood: 2,
            controlled_arp: 499,
            controlled_flood: 0,
            router_arp: 499,
        }
    }
}

impl Priorities {
    /// 定向规则优先于 ARP 规则，ARP 规则优先于泛洪
    pub fn validate(&self) -> Result<(), ConfigError> {
        let order = [
            ("highest", self.highest, "controlled_arp", self.controlled_arp),
            ("controlled_arp", self.controlled_arp, "controlled_flood", self.controlled_flood),
            ("highest", self.highest, "router_arp", self.router_arp),
            ("highest", self.highest, "core_flood", self.core_flood),
        ];
        for (higher, hv, lower, lv) in order {
            if hv <= lv {
                return Err(ConfigError::PriorityOrder { higher, lower });
            }
        }
        Ok(())
    }
}

/// hosts 文件之外的选项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub controlled_switches: usize,
    pub servers: Vec<String>,
    pub attackers: Vec<String>,
    /// 所有客户端接入链路使用同一带宽（攻击者除外）
    pub unified_host_bandwidth: Option<Bandwidth>,
    /// 所有核心链路和 mesh 链路使用同一带宽
    pub unified_switch_bandwidth: Option<Bandwidth>,
    pub seed: Option<u64>,
    pub priorities: Priorities,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            controlled_switches: MIN_CONTROLLED_SWITCHES,
            servers: vec![DEFAULT_SERVER.to_string()],
            attackers: Vec::new(),
            unified_host_bandwidth: None,
            unified_switch_bandwidth: None,
            seed: None,
            priorities: Priorities::default(),
        }
    }
}

/// 通过校验的 hosts 文件和设置
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    hosts: HostsFile,
    settings: Settings,
    attacker: String,
    controlled: Vec<String>,
}

impl NetworkConfig {
    pub fn new(hosts: HostsFile, settings: Settings) -> Result<Self, ConfigError> {
        match settings.servers.as_slice() {
            [] => return Err(ConfigError::NoServer),
            [server] if server != DEFAULT_SERVER => {
                return Err(ConfigError::UnsupportedServer(server.clone()));
            }
            [_] => {}
            many => return Err(ConfigError::TooManyServers(many.to_vec())),
        }
        let attacker = match settings.attackers.as_slice() {
            [] => return Err(ConfigError::NoAttacker),
            [attacker] => attacker.clone(),
            many => return Err(ConfigError::TooManyAttackers(many.to_vec())),
        };
        if hosts.get(&attacker).is_none() {
            return Err(ConfigError::UnknownAttacker {
                attacker,
                hosts: hosts.names().map(str::to_string).collect(),
            });
        }

        let n = settings.controlled_switches;
        if !(MIN_CONTROLLED_SWITCHES..=MAX_CONTROLLED_SWITCHES).contains(&n) {
            return Err(ConfigError::ControlledSwitchCount(n));
        }
        let controlled: Vec<String> = (1..=n).map(naming::controlled_switch_name).collect();

        let mut routers: Vec<&str> = Vec::new();
        let mut addresses: Vec<&str> = vec![naming::SERVER_IP, naming::SERVER_MAC];
        for (name, entry) in hosts.iter() {
            if !controlled.contains(&entry.default_path_switch) {
                return Err(ConfigError::UnknownDefaultSwitch {
                    host: name.to_string(),
                    switch: entry.default_path_switch.clone(),
                });
            }
            let router = entry.router_switch.as_str();
            if !naming::is_switch_name(router) {
                return Err(ConfigError::InvalidRouterName {
                    host: name.to_string(),
                    router: router.to_string(),
                });
            }
            if router == CORE_SWITCH || controlled.iter().any(|c| c == router) || hosts.get(router).is_some() {
                return Err(ConfigError::RouterNameCollision {
                    host: name.to_string(),
                    router: router.to_string(),
                });
            }
            if routers.contains(&router) {
                return Err(ConfigError::DuplicateRouter(router.to_string()));
            }
            routers.push(router);
            for address in [entry.ip.as_str(), entry.mac.as_str()] {
                if addresses.contains(&address) {
                    return Err(ConfigError::DuplicateAddress {
                        host: name.to_string(),
                        address: address.to_string(),
                    });
                }
                addresses.push(address);
            }
        }

        check_range("unified host bandwidth", settings.unified_host_bandwidth, MAX_HOST_BW)?;
        check_range("unified switch bandwidth", settings.unified_switch_bandwidth, MAX_SWITCH_BW)?;
        settings.priorities.validate()?;

        Ok(Self {
            hosts,
            settings,
            attacker,
            controlled,
        })
    }

    pub fn hosts(&self) -> &HostsFile {
        &self.hosts
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn priorities(&self) -> Priorities {
        self.settings.priorities
    }

    pub fn server(&self) -> &str {
        DEFAULT_SERVER
    }

    pub fn attacker(&self) -> &str {
        &self.attacker
    }

    /// `s101 ..= s1NN`
    pub fn controlled_switches(&self) -> &[String] {
        &self.controlled
    }

    pub fn role_of(&self, host: &str) -> HostRole {
        if host == DEFAULT_SERVER {
            HostRole::Server
        } else if host == self.attacker {
            HostRole::Attacker
        } else {
            HostRole::Client
        }
    }

    pub fn bandwidth_policy(&self) -> BandwidthPolicy {
        BandwidthPolicy::new(
            self.settings.unified_host_bandwidth,
            self.settings.unified_switch_bandwidth,
            self.settings.seed,
        )
    }
}

fn check_range(what: &'static str, value: Option<Bandwidth>, max: Bandwidth) -> Result<(), ConfigError> {
    match value {
        Some(bw) if bw < MIN_BW || bw > max => Err(ConfigError::BandwidthOutOfRange { what, value: bw }),
        _ => Ok(()),
    }
}
