//! 控制平面
//!
//! bootstrap 规则生成、路径重定向、带宽控制和构建编排，
//! 都作用在同一个 [`ControlPlane`] 上下文上。

pub mod bandwidth;
pub mod bootstrap;
mod control_plane;
mod error;
mod orchestrator;
pub mod redirect;

pub use bandwidth::Adjust;
pub use control_plane::{ControlPlane, HostPath, HostStatus, LinkInfo};
pub use error::{BuildError, ControlError, Step};
pub use orchestrator::BuildOrchestrator;
pub use redirect::{RedirectOutcome, RedirectPlan, plan_redirect};
