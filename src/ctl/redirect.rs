//! 路径重定向
//!
//! 客户端主机发往服务器的流量总是从其默认受控交换机进入。
//! 重定向到另一个受控交换机时经 `default -> dst -> core` 中转；
//! 重定向回默认交换机时恢复直连的 `default -> core` 规则。只支持一跳中转。

use serde::Serialize;

use super::bootstrap::mac_rule;
use super::control_plane::{ControlPlane, lock};
use super::error::{ControlError, Step};
use crate::config::Priorities;
use crate::flow::{FlowCommand, FlowMatch};
use crate::net::naming::interface_name;
use crate::net::{PortMap, Topology};
use crate::substrate::Substrate;
use tracing::{debug, info, warn};

/// 一次重定向的命令；teardown 全部完成后才开始 install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectPlan {
    pub host: String,
    pub previous: String,
    pub next: String,
    pub teardown: Vec<FlowCommand>,
    pub install: Vec<FlowCommand>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectOutcome {
    pub host: String,
    pub previous: String,
    pub current: String,
    /// 已发出的 substrate 调用数
    pub applied: usize,
}

fn host_to_server(mac_host: &str, mac_server: &str) -> FlowMatch {
    FlowMatch::new().mac_src(mac_host).mac_dst(mac_server)
}

/// 生成把 `host` 移到 `dst` 所需的 teardown 和 install 命令。
///
/// 所有无需接触网络就能发现的错误（未知名字、无效重定向、
/// 未映射的端口）都在这里返回。
pub fn plan_redirect(
    topology: &Topology,
    ports: &PortMap,
    priorities: &Priorities,
    host: &str,
    dst: &str,
) -> Result<RedirectPlan, ControlError> {
    let h = topology
        .host(host)
        .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
    let path = h
        .path
        .as_ref()
        .ok_or_else(|| ControlError::NotRedirectable(host.to_string()))?;
    if !path.contains(dst) {
        return Err(ControlError::UnknownSwitch(dst.to_string()));
    }
    let old = path.current();
    if old == dst {
        return Err(ControlError::AlreadyOnPath {
            host: host.to_string(),
            switch: dst.to_string(),
        });
    }
    let server = topology
        .server()
        .ok_or_else(|| ControlError::UnknownHost(crate::net::naming::DEFAULT_SERVER.to_string()))?;
    let core = topology.core();
    let default = path.default_switch();
    let highest = priorities.highest;
    let (mac_host, mac_server) = (h.mac.as_str(), server.mac.as_str());

    let mut teardown = vec![FlowCommand::delete_flow_strict(
        core,
        FlowMatch::new().priority(highest).mac_dst(mac_host),
    )];
    if old == default {
        teardown.push(FlowCommand::delete_flows(old, host_to_server(mac_host, mac_server)));
    } else {
        teardown.push(FlowCommand::delete_flows(default, host_to_server(mac_host, mac_server)));
        teardown.push(FlowCommand::delete_flows(old, host_to_server(mac_host, mac_server)));
        teardown.push(FlowCommand::delete_flows(old, host_to_server(mac_server, mac_host)));
    }

    let port = |switch: &str, toward: &str| ports.port(switch, &interface_name(switch, toward));
    let mut install = vec![mac_rule(core, highest, None, mac_host, port(core, dst)?)?];
    if dst == default {
        install.push(mac_rule(dst, highest, Some(mac_host), mac_server, port(dst, core)?)?);
    } else {
        install.push(mac_rule(default, highest, Some(mac_host), mac_server, port(default, dst)?)?);
        install.push(mac_rule(dst, highest, Some(mac_host), mac_server, port(dst, core)?)?);
        install.push(mac_rule(dst, highest, Some(mac_server), mac_host, port(dst, default)?)?);
    }

    Ok(RedirectPlan {
        host: host.to_string(),
        previous: old.to_string(),
        next: dst.to_string(),
        teardown,
        install,
    })
}

impl<S: Substrate> ControlPlane<S> {
    /// 把 `host` 发往服务器的流量移到受控交换机 `dst`。
    ///
    /// 不回滚：substrate 失败时，错误中包含步骤、交换机、
    /// 已执行的调用数以及路径状态是否已切换。
    #[tracing::instrument(skip(self))]
    pub fn redirect_path(&self, host: &str, dst: &str) -> Result<RedirectOutcome, ControlError> {
        let host_lock = self
            .host_locks
            .get(host)
            .ok_or_else(|| ControlError::UnknownHost(host.to_string()))?;
        let _host_guard = lock(host_lock);

        let plan = {
            let topo = self.read();
            plan_redirect(&topo, &self.ports, &self.priorities, host, dst)?
        };
        debug!(
            previous = %plan.previous,
            teardown = plan.teardown.len(),
            install = plan.install.len(),
            "redirect planned"
        );

        let _core_guard = lock(&self.core_lock);
        let mut applied = 0;
        for command in &plan.teardown {
            self.apply_step(command, Step::Teardown, applied, false)?;
            applied += 1;
        }

        {
            let mut topo = self.write();
            if let Some(path) = topo.host_mut(host).and_then(|h| h.path.as_mut()) {
                path.switch_to(dst);
            }
        }

        for command in &plan.install {
            self.apply_step(command, Step::Install, applied, true)?;
            applied += 1;
        }

        info!(previous = %plan.previous, current = dst, applied, "path redirected");
        Ok(RedirectOutcome {
            host: plan.host,
            previous: plan.previous,
            current: plan.next,
            applied,
        })
    }

    fn apply_step(
        &self,
        command: &FlowCommand,
        step: Step,
        applied: usize,
        state_changed: bool,
    ) -> Result<(), ControlError> {
        self.substrate.apply(command).map_err(|source| {
            warn!(%step, switch = command.target(), applied, error = %source, "substrate call failed");
            ControlError::SubstrateCommandFailed {
                step,
                switch: command.target().to_string(),
                applied,
                state_changed,
                source,
            }
        })
    }
}
