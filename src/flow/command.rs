//! 流表命令
//!
//! 不可变、已校验的 add/delete 命令。构造时检查词表和动作列表；
//! 渲染成 `ovs-ofctl` 文本只发生在 substrate 边界，且完全确定。

use std::fmt;

use super::action::Action;
use super::error::FlowError;
use super::matcher::FlowMatch;

pub const OFCTL: &str = "ovs-ofctl";

/// 单条交换机控制命令
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlowCommand {
    AddFlow {
        target: String,
        matcher: FlowMatch,
        actions: Vec<Action>,
    },
    DeleteFlow {
        target: String,
        matcher: FlowMatch,
        /// 只删除匹配和 priority 完全一致的规则
        strict: bool,
    },
}

impl FlowCommand {
    /// `add-flow`；至少需要一个动作
    pub fn add_flow(
        target: impl Into<String>,
        matcher: FlowMatch,
        actions: Vec<Action>,
    ) -> Result<Self, FlowError> {
        let target = target.into();
        if actions.is_empty() {
            return Err(FlowError::EmptyActionList { target });
        }
        Ok(FlowCommand::AddFlow {
            target,
            matcher,
            actions,
        })
    }

    /// 非严格 `del-flows`：删除匹配选中的所有规则
    pub fn delete_flows(target: impl Into<String>, matcher: FlowMatch) -> Self {
        FlowCommand::DeleteFlow {
            target: target.into(),
            matcher,
            strict: false,
        }
    }

    /// `--strict del-flows`：只删除匹配和 priority 完全一致的那条规则
    pub fn delete_flow_strict(target: impl Into<String>, matcher: FlowMatch) -> Self {
        FlowCommand::DeleteFlow {
            target: target.into(),
            matcher,
            strict: true,
        }
    }

    pub fn target(&self) -> &str {
        match self {
            FlowCommand::AddFlow { target, .. } | FlowCommand::DeleteFlow { target, .. } => target,
        }
    }

    pub fn matcher(&self) -> &FlowMatch {
        match self {
            FlowCommand::AddFlow { matcher, .. } | FlowCommand::DeleteFlow { matcher, .. } => {
                matcher
            }
        }
    }

    pub fn is_add(&self) -> bool {
        matches!(self, FlowCommand::AddFlow { .. })
    }

    /// 参数列表：匹配字段，add-flow 再加上 `actions=...`
    pub fn render_args(&self) -> String {
        let mut parts = self.matcher().render();
        if let FlowCommand::AddFlow { actions, .. } = self {
            let acts = actions.iter().map(Action::to_string).collect::<Vec<_>>().join(",");
            parts.push(format!("actions={acts}"));
        }
        parts.join(",")
    }

    /// `ovs-ofctl` 之后的参数，可直接传给 `Command::args`
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(4);
        match self {
            FlowCommand::AddFlow { target, .. } => {
                argv.push("add-flow".to_string());
                argv.push(target.clone());
            }
            FlowCommand::DeleteFlow { target, strict, .. } => {
                if *strict {
                    argv.push("--strict".to_string());
                }
                argv.push("del-flows".to_string());
                argv.push(target.clone());
            }
        }
        let args = self.render_args();
        if !args.is_empty() {
            argv.push(args);
        }
        argv
    }
}

impl fmt::Display for FlowCommand {
    /// 完整命令行，例如 `ovs-ofctl --strict del-flows s0 priority=65535,dl_dst=...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OFCTL} {}", self.argv().join(" "))
    }
}
