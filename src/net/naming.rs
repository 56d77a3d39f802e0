//! 测试床命名约定
//!
//! 交换机、接口和地址的命名沿用基于 Mininet 的测试床约定，
//! 因此这里渲染出的命令可以直接粘贴到 `ovs-ofctl` 会话中使用。

/// 唯一的核心交换机，所有受控交换机和服务器都连到它
pub const CORE_SWITCH: &str = "s0";

/// 唯一支持的服务器主机
pub const DEFAULT_SERVER: &str = "hs";
pub const SERVER_IP: &str = "10.0.1.101";
pub const SERVER_MAC: &str = "00:00:00:00:01:00";

/// 保留的上游 DNS 地址，经核心交换机的 uplink 发出
pub const GLOBAL_DNS: &str = "8.8.8.8";

/// `s101`, `s102`, ...（`index` 从 1 开始）
pub fn controlled_switch_name(index: usize) -> String {
    format!("s1{index:02}")
}

/// `src` 上朝向 `dst` 的接口
///
/// `s101`、`h7` 这类名字取其数字后缀（`s0-eth101`, `s3-eth7`）；
/// 其他名字原样使用（`s3-eth0`）。
pub fn interface_name(src: &str, dst: &str) -> String {
    let suffix = dst
        .strip_prefix('s')
        .or_else(|| dst.strip_prefix('h'))
        .filter(|rest| is_number(rest))
        .unwrap_or(dst);
    format!("{src}-eth{suffix}")
}

/// 有 `controlled` 个受控交换机时核心交换机的上游（NAT）uplink
///
/// 通常是 `s0-eth<N+2>`。99 个受控交换机时它会变成 `s0-eth101`，
/// 与朝向 `s101` 的端口重名，此时 uplink 改用最后一个受控交换机之后的编号。
pub fn core_uplink_interface(controlled: usize) -> String {
    let mut k = controlled + 2;
    if (101..=100 + controlled).contains(&k) {
        k = 101 + controlled;
    }
    format!("{CORE_SWITCH}-eth{k}")
}

/// router 交换机名必须是 `s` 加数字，保证它在受控交换机上的接口名
/// 不会与其他端口重名
pub fn is_switch_name(name: &str) -> bool {
    name.strip_prefix('s').is_some_and(is_number)
}

fn is_number(digits: &str) -> bool {
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// 主机侧接口
pub fn host_interface(host: &str) -> String {
    format!("{host}-eth0")
}

/// 客户端主机名的数字部分（`h12` -> 12）。不是 `h` 加正整数时返回 `None`
pub fn host_number(host: &str) -> Option<u32> {
    let digits = host.strip_prefix('h')?;
    if !is_number(digits) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interface_names_follow_testbed_convention() {
        assert_eq!(interface_name("s0", "s101"), "s0-eth101");
        assert_eq!(interface_name("s101", "s0"), "s101-eth0");
        assert_eq!(interface_name("s101", "s3"), "s101-eth3");
        assert_eq!(interface_name("s3", "0"), "s3-eth0");
        assert_eq!(interface_name("s3", "h3"), "s3-eth3");
        assert_eq!(interface_name("s101", "ss0"), "s101-ethss0");
        assert_eq!(core_uplink_interface(4), "s0-eth6");
        assert_eq!(core_uplink_interface(98), "s0-eth100");
        assert_eq!(core_uplink_interface(99), "s0-eth200");
        assert_eq!(controlled_switch_name(1), "s101");
        assert_eq!(controlled_switch_name(12), "s112");
    }

    #[test]
    fn switch_names_are_s_and_digits() {
        assert!(is_switch_name("s1"));
        assert!(is_switch_name("s250"));
        assert!(!is_switch_name("s"));
        assert!(!is_switch_name("ss102"));
        assert!(!is_switch_name("s1a"));
        assert!(!is_switch_name("r1"));
    }

    #[test]
    fn host_numbers_require_positive_integer_suffix() {
        assert_eq!(host_number("h1"), Some(1));
        assert_eq!(host_number("h76"), Some(76));
        assert_eq!(host_number("h0"), None);
        assert_eq!(host_number("h"), None);
        assert_eq!(host_number("hx1"), None);
        assert_eq!(host_number("s1"), None);
        assert_eq!(host_number("h-1"), None);
    }
}
