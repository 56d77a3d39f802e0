pub mod config;
pub mod ctl;
pub mod flow;
pub mod net;
pub mod substrate;
pub mod topo;

#[cfg(test)]
mod test;
