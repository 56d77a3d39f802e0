//! hosts 拓扑文件
//!
//! 以客户端主机名为键的 JSON 对象：
//!
//! ```json
//! { "h1": { "ip": "10.0.0.1", "mac": "00:00:00:00:00:01",
//!           "router_switch": "s1", "default_path_switch": "s101" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::net::naming::host_number;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    pub ip: String,
    pub mac: String,
    pub router_switch: String,
    pub default_path_switch: String,
}

/// 按数字后缀排序的客户端主机（`h2` 在 `h10` 之前）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostsFile {
    entries: Vec<(String, HostEntry)>,
}

impl HostsFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let map: BTreeMap<String, HostEntry> = serde_json::from_str(raw)?;
        Self::from_entries(map)
    }

    /// 检查主机名并排序
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, HostEntry)>,
    ) -> Result<Self, ConfigError> {
        let mut numbered = Vec::new();
        for (name, entry) in entries {
            let n = host_number(&name).ok_or_else(|| ConfigError::InvalidHostName(name.clone()))?;
            numbered.push((n, name, entry));
        }
        numbered.sort_by_key(|(n, _, _)| *n);
        Ok(Self {
            entries: numbered.into_iter().map(|(_, name, entry)| (name, entry)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&HostEntry> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostEntry)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }
}
