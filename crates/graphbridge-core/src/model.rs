//! Shared domain types: backend kinds, traversal direction and raw rows.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};

/// A raw backend row. Key names are backend specific.
pub type Row = serde_json::Map<String, Value>;

/// One of the two graph backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// REST-mediated PGQL graph service.
    Oracle,
    /// Native property-graph store speaking Cypher over Bolt.
    Memgraph,
}

impl BackendKind {
    /// Both backends, in fan-out order.
    pub const ALL: [BackendKind; 2] = [BackendKind::Oracle, BackendKind::Memgraph];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oracle => "oracle",
            Self::Memgraph => "memgraph",
        }
    }

    /// Parse a backend selection such as `both`, `oracle` or `oracle,memgraph`.
    ///
    /// Duplicates are dropped; order follows first appearance.
    pub fn parse_set(s: &str) -> BridgeResult<Vec<BackendKind>> {
        let mut set = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kinds: Vec<BackendKind> = match part.to_lowercase().as_str() {
                "both" | "all" => Self::ALL.to_vec(),
                _ => vec![part.parse()?],
            };
            for kind in kinds {
                if !set.contains(&kind) {
                    set.push(kind);
                }
            }
        }
        Ok(set)
    }
}

impl FromStr for BackendKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "oracle" | "pgql" | "pgx" => Ok(Self::Oracle),
            "memgraph" | "cypher" => Ok(Self::Memgraph),
            other => Err(BridgeError::UnknownBackend(other.to_string())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Edge direction relative to the anchor entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
}

impl FromStr for Direction {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "outgoing" | "out" => Ok(Self::Outgoing),
            "incoming" | "in" => Ok(Self::Incoming),
            other => Err(BridgeError::validation(format!("unknown direction '{other}'"))),
        }
    }
}

/// Read the first present key from a row as a string.
///
/// Keys are compared case-insensitively since the REST service upper-cases
/// column names depending on the formatter. Numbers are stringified.
pub fn row_str(row: &Row, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        row.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, v)| value_to_string(v))
    })
}

/// Stringify a scalar JSON value; `null`, arrays and objects yield `None`.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
