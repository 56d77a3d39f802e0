//! Open vSwitch substrate
//!
//! 通过 `ovs-ofctl`、`ovs-vsctl`、`tc` 和 `ip` 驱动已运行的 OVS 网络（例如 Mininet 创建的）。
//! 交换机接口位于根命名空间；设置 `host_namespaces` 时，
//! 主机接口位于以主机名命名的命名空间中。

use std::collections::HashMap;
use std::process::Command;

use super::{LinkCounters, Substrate, SubstrateError};
use crate::flow::{FlowCommand, OFCTL};
use crate::net::{Bandwidth, Topology};
use tracing::{debug, info};

const VSCTL: &str = "ovs-vsctl";

/// 命令行 OVS 后端
#[derive(Debug, Clone, Default)]
pub struct OvsSubstrate {
    /// 主机侧命令通过 `ip netns exec <host>` 执行
    pub host_namespaces: bool,
    /// 属于交换机的节点名，见 `with_switches`
    switches: Vec<String>,
}

impl OvsSubstrate {
    pub fn new(host_namespaces: bool) -> Self {
        Self {
            host_namespaces,
            switches: Vec::new(),
        }
    }

    /// 预先登记交换机名，使节点相关命令在 `start` 之前
    /// 就能区分交换机和主机。
    pub fn with_switches(mut self, topology: &Topology) -> Self {
        self.switches = topology.switches().map(|s| s.name.clone()).collect();
        self
    }

    fn node_command(&self, node: &str, program: &str, args: &[String]) -> (String, Vec<String>) {
        if self.host_namespaces && !self.switches.iter().any(|s| s == node) {
            let mut full = vec!["netns".to_string(), "exec".to_string(), node.to_string(), program.to_string()];
            full.extend(args.iter().cloned());
            ("ip".to_string(), full)
        } else {
            (program.to_string(), args.to_vec())
        }
    }
}

fn run(program: &str, args: &[String]) -> Result<String, SubstrateError> {
    let rendered = format!("{program} {}", args.join(" "));
    debug!(command = %rendered, "exec");
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| SubstrateError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !output.status.success() {
        return Err(SubstrateError::CommandFailed {
            command: rendered,
            reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `ovs-ofctl show` 的端口行，例如 ` 3(s101-eth3): addr:...`
pub(crate) fn parse_ofctl_show(raw: &str) -> HashMap<String, u32> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim_start();
            let (port, rest) = line.split_once('(')?;
            let (name, _) = rest.split_once(')')?;
            let port = port.trim().parse::<u32>().ok()?;
            Some((name.to_string(), port))
        })
        .collect()
}

/// `ovs-vsctl get interface X statistics`，例如 `{collisions=0, rx_bytes=1, tx_bytes=2}`
pub(crate) fn parse_statistics(raw: &str) -> Option<LinkCounters> {
    let body = raw.trim().trim_start_matches('{').trim_end_matches('}');
    let mut counters = LinkCounters::default();
    let mut seen = 0;
    for item in body.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };
        match key.trim() {
            "tx_bytes" => {
                counters.tx_bytes = value.trim().parse().ok()?;
                seen += 1;
            }
            "rx_bytes" => {
                counters.rx_bytes = value.trim().parse().ok()?;
                seen += 1;
            }
            _ => {}
        }
    }
    (seen == 2).then_some(counters)
}

impl Substrate for OvsSubstrate {
    fn start(&self, topology: &Topology) -> Result<(), SubstrateError> {
        for sw in topology.switches() {
            run(VSCTL, &["br-exists".to_string(), sw.name.clone()]).map_err(|_| {
                SubstrateError::UnknownNode(sw.name.clone())
            })?;
        }
        info!(switches = topology.switches().count(), "ovs bridges present");
        Ok(())
    }

    fn apply(&self, command: &FlowCommand) -> Result<(), SubstrateError> {
        run(OFCTL, &command.argv()).map(|_| ())
    }

    fn read_live_ports(&self, switch: &str) -> Result<HashMap<String, u32>, SubstrateError> {
        let raw = run(OFCTL, &["show".to_string(), switch.to_string()])?;
        Ok(parse_ofctl_show(&raw))
    }

    fn read_link_counters(&self, node: &str, interface: &str) -> Result<LinkCounters, SubstrateError> {
        let args = vec![
            "get".to_string(),
            "interface".to_string(),
            interface.to_string(),
            "statistics".to_string(),
        ];
        let raw = run(VSCTL, &args)?;
        parse_statistics(&raw).ok_or_else(|| SubstrateError::Parse {
            command: format!("{VSCTL} {} ({node})", args.join(" ")),
            detail: raw.trim().to_string(),
        })
    }

    fn set_interface_bandwidth(
        &self,
        node: &str,
        interface: &str,
        bandwidth: Bandwidth,
    ) -> Result<(), SubstrateError> {
        // Mininet 的 TCIntf 在 qdisc 5:0 下创建 htb class 5:1
        let args: Vec<String> = [
            "class", "change", "dev", interface, "parent", "5:0", "classid", "5:1", "htb", "rate",
        ]
        .iter()
        .map(|s| s.to_string())
        .chain([format!("{}kbit", bandwidth.kbps()), "burst".to_string(), "15k".to_string()])
        .collect();
        let (program, args) = self.node_command(node, "tc", &args);
        run(&program, &args).map(|_| ())
    }

    fn set_interface_state(&self, node: &str, interface: &str, up: bool) -> Result<(), SubstrateError> {
        let args = vec![
            "link".to_string(),
            "set".to_string(),
            "dev".to_string(),
            interface.to_string(),
            if up { "up" } else { "down" }.to_string(),
        ];
        let (program, args) = self.node_command(node, "ip", &args);
        run(&program, &args).map(|_| ())
    }
}
