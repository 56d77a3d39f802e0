//! 命令构造错误

/// 在调用 substrate 之前即被拒绝
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("`{0}` is not recognized as nw_proto")]
    UnknownProtocolValue(String),
    #[error("`{0}` is not recognized as dl_type")]
    UnknownEtherTypeValue(String),
    #[error("add-flow for {target} has no actions")]
    EmptyActionList { target: String },
}
