//! Backend-agnostic query descriptors.
//!
//! A descriptor names an entity label, one of four operations and a bag of
//! parameters. It is built by callers (or deserialized from JSON) and consumed
//! once by the [`Translator`](crate::translator::Translator).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BridgeError;
use crate::model::Direction;

/// The four recognised query operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Find,
    Aggregate,
    Join,
    Relation,
}

impl FromStr for Operation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "find" => Ok(Self::Find),
            "aggregate" => Ok(Self::Aggregate),
            "join" => Ok(Self::Join),
            "relation" => Ok(Self::Relation),
            other => Err(BridgeError::UnsupportedOperation(other.to_string())),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Find => "find",
            Self::Aggregate => "aggregate",
            Self::Join => "join",
            Self::Relation => "relation",
        };
        f.write_str(name)
    }
}

/// A complete query descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDescriptor {
    pub entity_label: String,
    pub operation: Operation,
    #[serde(default)]
    pub parameters: QueryParameters,
}

impl QueryDescriptor {
    pub fn new(entity_label: &str, operation: Operation, parameters: QueryParameters) -> Self {
        Self {
            entity_label: entity_label.to_string(),
            operation,
            parameters,
        }
    }
}

/// Operation parameters. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParameters {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, alias = "where")]
    pub where_clause: BTreeMap<String, WhereValue>,
    #[serde(default)]
    pub order_by: Option<OrderBy>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub aggregate: Option<AggregateSpec>,
    #[serde(default, alias = "relationshipSpec")]
    pub relationship: Option<RelationshipSpec>,
}

impl QueryParameters {
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, field: &str, value: WhereValue) -> Self {
        self.where_clause.insert(field.to_string(), value);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_order_by(mut self, field: &str, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            descending,
        });
        self
    }

    pub fn with_group_by(mut self, field: &str) -> Self {
        self.group_by = Some(field.to_string());
        self
    }

    pub fn with_aggregate(mut self, aggregate: AggregateSpec) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn with_relationship(mut self, relationship: RelationshipSpec) -> Self {
        self.relationship = Some(relationship);
        self
    }
}

/// A where-clause entry: either a bare literal (equality) or an operator form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WhereValue {
    Condition { operator: String, value: Value },
    Literal(Value),
}

impl WhereValue {
    pub fn eq(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn op(operator: &str, value: impl Into<Value>) -> Self {
        Self::Condition {
            operator: operator.to_string(),
            value: value.into(),
        }
    }

    /// Resolved operator and the literal it applies to.
    pub fn parts(&self) -> (Operator, &Value) {
        match self {
            Self::Condition { operator, value } => (Operator::parse(operator), value),
            Self::Literal(value) => (Operator::Eq, value),
        }
    }
}

/// Comparison operators understood by the translator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Contains,
    StartsWith,
    EndsWith,
    In,
    /// Case-insensitive substring match.
    IContains,
}

impl Operator {
    /// Parse an operator name. Unknown names fall back to equality.
    pub fn parse(name: &str) -> Self {
        match name.trim() {
            "gt" | ">" => Self::Gt,
            "gte" | ">=" => Self::Gte,
            "lt" | "<" => Self::Lt,
            "lte" | "<=" => Self::Lte,
            "ne" | "!=" | "<>" => Self::Ne,
            "like" => Self::Like,
            "contains" => Self::Contains,
            "startsWith" | "starts_with" => Self::StartsWith,
            "endsWith" | "ends_with" => Self::EndsWith,
            "in" => Self::In,
            "icontains" => Self::IContains,
            _ => Self::Eq,
        }
    }
}

/// Sort order for `find` and `aggregate`.
///
/// Accepts `"name"`, `"name DESC"` or `{"field": "name", "descending": true}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OrderByRepr")]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrderByRepr {
    Text(String),
    Spec {
        field: String,
        #[serde(default)]
        descending: bool,
    },
}

impl From<OrderByRepr> for OrderBy {
    fn from(repr: OrderByRepr) -> Self {
        match repr {
            OrderByRepr::Spec { field, descending } => Self { field, descending },
            OrderByRepr::Text(text) => {
                let mut parts = text.split_whitespace();
                let field = parts.next().unwrap_or_default().to_string();
                let descending = parts
                    .next()
                    .map(|dir| dir.eq_ignore_ascii_case("desc"))
                    .unwrap_or(false);
                Self { field, descending }
            }
        }
    }
}

/// Aggregate functions for the `aggregate` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    #[default]
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// A single aggregate projection. A missing field means `*` (count only).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSpec {
    #[serde(default)]
    pub function: AggregateFunction,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl AggregateSpec {
    pub fn count_all(alias: &str) -> Self {
        Self {
            function: AggregateFunction::Count,
            field: None,
            alias: Some(alias.to_string()),
        }
    }
}

/// Whether a relation descriptor reads, creates or deletes an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationMode {
    #[default]
    Match,
    Create,
    Delete,
}

/// Relationship part of a `join` or `relation` descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipSpec {
    #[serde(default)]
    pub relationship_type: Option<String>,
    #[serde(default)]
    pub direction: Direction,
    /// Backend identifier of the entity the traversal starts from.
    #[serde(default)]
    pub anchor_id: Option<String>,
    #[serde(default)]
    pub target_label: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub mode: RelationMode,
}
