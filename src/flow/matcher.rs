//! 流表匹配字段
//!
//! 所有字段都是可选的。设置顺序无关，渲染时总是按照
//! [`FlowMatch::render`] 的固定字段顺序输出。

use std::fmt;

use super::error::FlowError;
use super::vocab::{EtherType, NetProtocol};

/// `ovs-ofctl` 协议简写
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Ip,
    Arp,
    Icmp,
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Ip => "ip",
            Protocol::Arp => "arp",
            Protocol::Icmp => "icmp",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }

    /// 简写隐含的 ether type
    pub fn ether_type(self) -> EtherType {
        match self {
            Protocol::Arp => EtherType::ARP,
            Protocol::Ip | Protocol::Icmp | Protocol::Tcp | Protocol::Udp => EtherType::IPV4,
        }
    }

    /// 简写隐含的 `nw_proto`（如果有）
    pub fn net_protocol(self) -> Option<&'static str> {
        match self {
            Protocol::Icmp => Some("1"),
            Protocol::Tcp => Some("6"),
            Protocol::Udp => Some("17"),
            Protocol::Ip | Protocol::Arp => None,
        }
    }
}

/// 流表规则的匹配部分
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FlowMatch {
    pub protocol: Option<Protocol>,
    pub net_protocol: Option<NetProtocol>,
    pub priority: Option<u16>,
    pub in_port: Option<u32>,
    pub out_port: Option<u32>,
    pub ip_src: Option<String>,
    pub ip_dst: Option<String>,
    pub mac_src: Option<String>,
    pub mac_dst: Option<String>,
    pub ether_type: Option<EtherType>,
}

impl FlowMatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    /// 接受协议符号名或已知的数字编号
    pub fn net_protocol(mut self, raw: &str) -> Result<Self, FlowError> {
        self.net_protocol = Some(NetProtocol::parse(raw)?);
        Ok(self)
    }

    pub fn priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn in_port(mut self, port: u32) -> Self {
        self.in_port = Some(port);
        self
    }

    pub fn out_port(mut self, port: u32) -> Self {
        self.out_port = Some(port);
        self
    }

    pub fn ip_src(mut self, ip: impl Into<String>) -> Self {
        self.ip_src = Some(ip.into());
        self
    }

    pub fn ip_dst(mut self, ip: impl Into<String>) -> Self {
        self.ip_dst = Some(ip.into());
        self
    }

    pub fn mac_src(mut self, mac: impl Into<String>) -> Self {
        self.mac_src = Some(mac.into());
        self
    }

    pub fn mac_dst(mut self, mac: impl Into<String>) -> Self {
        self.mac_dst = Some(mac.into());
        self
    }

    /// 接受 ether-type 符号名或已知的十六进制编号
    pub fn ether_type(mut self, raw: &str) -> Result<Self, FlowError> {
        self.ether_type = Some(EtherType::parse(raw)?);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        *self == FlowMatch::default()
    }

    /// 按固定顺序用逗号拼接的 `key=value` 列表：protocol,
    /// nw_proto, priority, in_port, out_port, nw_src, nw_dst, dl_src, dl_dst,
    /// dl_type。空字符串与未设置一样被跳过。
    pub fn render(&self) -> Vec<String> {
        let mut parts = Vec::new();
        if let Some(protocol) = self.protocol {
            parts.push(protocol.as_str().to_string());
        }
        if let Some(proto) = self.net_protocol {
            parts.push(format!("nw_proto={}", proto.code()));
        }
        if let Some(priority) = self.priority {
            parts.push(format!("priority={priority}"));
        }
        if let Some(port) = self.in_port {
            parts.push(format!("in_port={port}"));
        }
        if let Some(port) = self.out_port {
            parts.push(format!("out_port={port}"));
        }
        push_text(&mut parts, "nw_src", &self.ip_src);
        push_text(&mut parts, "nw_dst", &self.ip_dst);
        push_text(&mut parts, "dl_src", &self.mac_src);
        push_text(&mut parts, "dl_dst", &self.mac_dst);
        if let Some(ether_type) = self.ether_type {
            parts.push(format!("dl_type={}", ether_type.code()));
        }
        parts
    }

    /// 非严格 `del-flows` 的选择规则：这里设置的每个字段（priority 和
    /// out_port 除外）在 `entry` 中取值相同。
    pub fn selects(&self, entry: &FlowMatch) -> bool {
        fn covers<T: PartialEq>(want: &Option<T>, have: &Option<T>) -> bool {
            want.is_none() || want == have
        }
        covers(&self.protocol, &entry.protocol)
            && covers(&self.net_protocol, &entry.net_protocol)
            && covers(&self.in_port, &entry.in_port)
            && covers(&self.ip_src, &entry.ip_src)
            && covers(&self.ip_dst, &entry.ip_dst)
            && covers(&self.mac_src, &entry.mac_src)
            && covers(&self.mac_dst, &entry.mac_dst)
            && covers(&self.ether_type, &entry.ether_type)
    }

    /// 严格匹配：字段相同且 priority 相同。`out_port` 只是删除过滤条件，
    /// 不属于规则本身，因此忽略。
    pub fn same_rule(&self, entry: &FlowMatch) -> bool {
        let mut a = self.clone();
        let mut b = entry.clone();
        a.out_port = None;
        b.out_port = None;
        a == b
    }
}

fn push_text(parts: &mut Vec<String>, key: &str, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        parts.push(format!("{key}={v}"));
    }
}

impl fmt::Display for FlowMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render().join(","))
    }
}
