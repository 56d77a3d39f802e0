//! 链路带宽
//!
//! 带宽以 Mbit/s 为单位、固定 0.001 精度保存，
//! 反复 `± delta` 调整不会像二进制浮点那样产生误差。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 所有可调接口的下限（0.01）
pub const MIN_BW: Bandwidth = Bandwidth(10);
/// 客户端主机接入链路上限
pub const MAX_HOST_BW: Bandwidth = Bandwidth(3_100);
/// 攻击者接入链路上限
pub const MAX_ATTACKER_BW: Bandwidth = Bandwidth(6_100);
/// 交换机间链路上限
pub const MAX_SWITCH_BW: Bandwidth = Bandwidth(9_100);

/// 服务器接入链路上限：`(MAX_HOST_BW - 0.1) * floor(clients / 2) + 0.1`
pub fn server_ceiling(clients: usize) -> Bandwidth {
    let offset = Bandwidth::from_kbps(100);
    Bandwidth((MAX_HOST_BW.0 - offset.0) * (clients as u64 / 2) + offset.0)
}

/// 以 kbit/s 保存的带宽（其他地方使用的 Mbit/s 的 1/1000）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Bandwidth(pub u64);

impl Bandwidth {
    pub const ZERO: Bandwidth = Bandwidth(0);

    pub const fn from_kbps(kbps: u64) -> Bandwidth {
        Bandwidth(kbps)
    }

    /// 四舍五入到 kbit/s；负数和非有限值截断为 0
    pub fn from_mbps(mbps: f64) -> Bandwidth {
        if !mbps.is_finite() || mbps <= 0.0 {
            return Bandwidth::ZERO;
        }
        Bandwidth((mbps * 1_000.0).round() as u64)
    }

    /// `steps * step + offset`，带宽生成策略使用的形式
    /// （例如 `k * 0.3 + 0.1`）
    pub const fn stepped(steps: u64, step: Bandwidth, offset: Bandwidth) -> Bandwidth {
        Bandwidth(steps * step.0 + offset.0)
    }

    pub fn kbps(self) -> u64 {
        self.0
    }

    pub fn as_mbps(self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    pub fn checked_add(self, rhs: Bandwidth) -> Option<Bandwidth> {
        self.0.checked_add(rhs.0).map(Bandwidth)
    }

    pub fn checked_sub(self, rhs: Bandwidth) -> Option<Bandwidth> {
        self.0.checked_sub(rhs.0).map(Bandwidth)
    }
}

impl fmt::Display for Bandwidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 1_000;
        let frac = self.0 % 1_000;
        if frac == 0 {
            return write!(f, "{whole}.0");
        }
        let digits = format!("{frac:03}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bandwidth value `{0}`")]
pub struct ParseBandwidthError(pub String);

impl FromStr for Bandwidth {
    type Err = ParseBandwidthError;

    /// 解析 `9.05` 这样的非负小数，不经过 `f64`
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let err = || ParseBandwidthError(raw.to_string());
        let s = raw.trim();
        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(err());
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        if frac.len() > 3 && frac[3..].chars().any(|c| c != '0') {
            return Err(err());
        }
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| err())? };
        let mut frac_kbps = 0u64;
        for (i, c) in frac.chars().take(3).enumerate() {
            let digit = u64::from(c as u8 - b'0');
            frac_kbps += digit * 10u64.pow(2 - i as u32);
        }
        whole
            .checked_mul(1_000)
            .and_then(|k| k.checked_add(frac_kbps))
            .map(Bandwidth)
            .ok_or_else(err)
    }
}

impl Serialize for Bandwidth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_mbps())
    }
}

impl<'de> Deserialize<'de> for Bandwidth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mbps = f64::deserialize(deserializer)?;
        if !mbps.is_finite() || mbps < 0.0 {
            return Err(serde::de::Error::custom(format!("invalid bandwidth {mbps}")));
        }
        Ok(Bandwidth::from_mbps(mbps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_keep_decimal_precision() {
        let bw: Bandwidth = "9.05".parse().unwrap();
        assert_eq!(bw, Bandwidth(9_050));
        assert_eq!(bw.to_string(), "9.05");
        assert_eq!("3".parse::<Bandwidth>().unwrap().to_string(), "3.0");
        assert_eq!("0.01".parse::<Bandwidth>().unwrap(), Bandwidth(10));
        assert_eq!(".5".parse::<Bandwidth>().unwrap(), Bandwidth(500));
    }

    #[test]
    fn parse_rejects_garbage_and_sub_kbps_precision() {
        assert!("".parse::<Bandwidth>().is_err());
        assert!("-1".parse::<Bandwidth>().is_err());
        assert!("1.0001".parse::<Bandwidth>().is_err());
        assert!("abc".parse::<Bandwidth>().is_err());
        assert_eq!("1.2500".parse::<Bandwidth>().unwrap(), Bandwidth(1_250));
    }

    #[test]
    fn repeated_adjustments_do_not_drift() {
        let step = Bandwidth::from_kbps(100);
        let mut bw = Bandwidth::from_kbps(700);
        for _ in 0..24 {
            bw = bw.checked_add(step).unwrap();
        }
        assert_eq!(bw, Bandwidth::from_kbps(3_100));
        assert_eq!(Bandwidth::from_mbps(0.1 + 0.2), Bandwidth(300));
    }

    #[test]
    fn server_ceiling_scales_with_client_pairs() {
        assert_eq!(server_ceiling(0), Bandwidth(100));
        assert_eq!(server_ceiling(6), Bandwidth(9_100));
        assert_eq!(server_ceiling(7), Bandwidth(9_100));
    }
}
