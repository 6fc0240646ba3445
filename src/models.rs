//! Desired-state and remote record types shared by the document loader,
//! the remote store and the reconciler.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_EXPECTED_STATUS: i64 = 200;
pub const DEFAULT_CHECK_INTERVAL_SECONDS: i64 = 30;
pub const DEFAULT_TIMEOUT_SECONDS: i64 = 30;

/// Protocol used by the monitoring service to probe a check's target.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    #[default]
    Http,
    Tcp,
    Udp,
    Icmp,
    Grpc,
    Static,
}

/// A check exactly as written in the desired-state document.
///
/// Optional fields stay `None` when the key is absent, so an explicit `0`,
/// `false` or `""` is never mistaken for "not provided".
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CheckEntry {
    pub name: String,
    pub domain: String,
    pub expected: Option<String>,
    #[serde(rename = "type")]
    pub check_type: Option<CheckType>,
    pub method: Option<String>,
    pub post_data: Option<String>,
    pub port: Option<i64>,
    pub expected_status: Option<i64>,
    pub check_interval: Option<i64>,
    pub timeout: Option<i64>,
    pub order_id: Option<i64>,
    // Always replaced by the identifier of the enclosing group.
    pub group_id: Option<i64>,
}

impl CheckEntry {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Produces the fully-defaulted check attached to `group_id`.
    /// Only absent fields receive defaults; explicit values are kept as-is.
    pub fn resolve(self, group_id: i64) -> CheckSpec {
        CheckSpec {
            name: self.name,
            domain: self.domain,
            expected: self.expected.unwrap_or_default(),
            check_type: self.check_type.unwrap_or_default(),
            method: self.method.unwrap_or_else(|| DEFAULT_METHOD.to_string()),
            post_data: self.post_data.unwrap_or_default(),
            port: self.port.unwrap_or(0),
            expected_status: self.expected_status.unwrap_or(DEFAULT_EXPECTED_STATUS),
            check_interval: self
                .check_interval
                .unwrap_or(DEFAULT_CHECK_INTERVAL_SECONDS),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            order_id: self.order_id.unwrap_or(0),
            group_id,
        }
    }
}

/// A check ready to be submitted: every field populated, group attached.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CheckSpec {
    pub name: String,
    pub domain: String,
    pub expected: String,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    pub method: String,
    pub post_data: String,
    pub port: i64,
    pub expected_status: i64,
    pub check_interval: i64,
    pub timeout: i64,
    pub order_id: i64,
    pub group_id: i64,
}

impl CheckSpec {
    /// The full key/value body sent when replacing an existing check.
    pub fn to_body(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // A struct of plain strings and integers always serializes to an object.
            _ => Map::new(),
        }
    }
}

/// One entry under a group: either a usable check or the reason it was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredEntry {
    Valid(CheckEntry),
    Malformed {
        name: Option<String>,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub name: String,
    pub public: bool,
    pub entries: Vec<DesiredEntry>,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: true,
            entries: Vec::new(),
        }
    }

    pub fn with_check(mut self, entry: CheckEntry) -> Self {
        self.entries.push(DesiredEntry::Valid(entry));
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteGroup {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub public: Option<bool>,
}

impl RemoteGroup {
    /// The store-assigned identifier, if one was actually assigned.
    pub fn resolved_id(&self) -> Option<i64> {
        self.id.filter(|id| *id > 0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RemoteCheck {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub group_id: Option<i64>,
}
