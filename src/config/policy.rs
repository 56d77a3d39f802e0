//! 带宽生成策略
//!
//! 初始链路带宽取设置中的统一值，或形如 `0.3 * k + 0.1` 的有界随机值。

use rand::prelude::*;

use crate::net::{Bandwidth, server_ceiling};

const STEP: Bandwidth = Bandwidth::from_kbps(300);
const OFFSET: Bandwidth = Bandwidth::from_kbps(100);

/// 按链路类别生成初始带宽
#[derive(Debug, Clone)]
pub struct BandwidthPolicy {
    unified_host: Option<Bandwidth>,
    unified_switch: Option<Bandwidth>,
    rng: StdRng,
}

impl BandwidthPolicy {
    /// 给定 `seed` 时结果可复现
    pub fn new(
        unified_host: Option<Bandwidth>,
        unified_switch: Option<Bandwidth>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            unified_host,
            unified_switch,
            rng,
        }
    }

    fn draw(&mut self, low: u64, high: u64) -> Bandwidth {
        Bandwidth::stepped(self.rng.gen_range(low..=high), STEP, OFFSET)
    }

    /// 0.7 ..= 3.1
    pub fn client(&mut self) -> Bandwidth {
        match self.unified_host {
            Some(bw) => bw,
            None => self.draw(2, 10),
        }
    }

    /// 4.6 ..= 6.1；不使用统一值
    pub fn attacker(&mut self) -> Bandwidth {
        self.draw(15, 20)
    }

    /// 服务器总是从上限开始
    pub fn server(&self, clients: usize) -> Bandwidth {
        server_ceiling(clients)
    }

    /// 核心到受控交换机，1.0 ..= 3.1
    pub fn core_link(&mut self) -> Bandwidth {
        match self.unified_switch {
            Some(bw) => bw,
            None => self.draw(3, 10),
        }
    }

    /// 受控交换机 mesh，4.9 ..= 9.1
    pub fn mesh_link(&mut self) -> Bandwidth {
        match self.unified_switch {
            Some(bw) => bw,
            None => self.draw(16, 30),
        }
    }
}
