//! 拓扑构建

pub mod fan_out;

pub use fan_out::{ROUTER_LINK_ID, build_fan_out};
