//! 流表命令构建
//!
//! 带类型的 `ovs-ofctl` add-flow / del-flows 命令，
//! 词表经过校验，字段顺序固定。

mod action;
mod command;
mod error;
mod matcher;
mod vocab;

pub use action::Action;
pub use command::{FlowCommand, OFCTL};
pub use error::FlowError;
pub use matcher::{FlowMatch, Protocol};
pub use vocab::{ETHER_TYPE_ARP, EtherType, NET_PROTOCOL_ICMP, NetProtocol};
