//! 流表动作

use std::fmt;

/// `actions=` 列表中的一项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// 从指定端口号转发
    Output(u32),
    /// 从除入端口外的所有端口发出
    Flood,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Output(port) => write!(f, "output:{port}"),
            Action::Flood => f.write_str("flood"),
        }
    }
}
