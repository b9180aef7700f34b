//! Query translation: abstract descriptor → backend query text.
//!
//! The translator is pure. It never performs I/O and its only failure is an
//! unknown operation name. Both dialects share the where-clause operator table
//! defined here; clause layout lives in [`pgql`] and [`cypher`].

pub mod cypher;
pub mod literal;
pub mod pgql;

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::catalog::edge_config;
use crate::descriptor::{
    AggregateFunction, AggregateSpec, Operation, Operator, OrderBy, QueryDescriptor, QueryParameters,
    WhereValue,
};
use crate::error::BridgeResult;
use crate::model::BackendKind;
use literal::{identifier, like_to_regex, pattern_text, quote, render_literal, Dialect};

/// Default REST graph name.
pub const DEFAULT_GRAPH_NAME: &str = "ALL_GRAPH";

/// Where/field key that renders as the backend's vertex id function.
pub const VERTEX_ID_KEY: &str = "vertex_id";

/// Stateless query translator for both backends.
#[derive(Debug, Clone)]
pub struct Translator {
    graph_name: String,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new(DEFAULT_GRAPH_NAME)
    }
}

impl Translator {
    /// Create a translator targeting the given REST graph.
    pub fn new(graph_name: &str) -> Self {
        Self {
            graph_name: identifier(graph_name),
        }
    }

    pub fn graph_name(&self) -> &str {
        &self.graph_name
    }

    pub fn dialect(backend: BackendKind) -> Dialect {
        match backend {
            BackendKind::Oracle => Dialect::Pgql,
            BackendKind::Memgraph => Dialect::Cypher,
        }
    }

    /// Translate an operation given by name.
    ///
    /// Fails with `UnsupportedOperation` when `operation` is not one of
    /// `find`, `aggregate`, `join` or `relation`.
    pub fn translate(
        &self,
        backend: BackendKind,
        entity_label: &str,
        operation: &str,
        params: &QueryParameters,
    ) -> BridgeResult<String> {
        let operation: Operation = operation.parse()?;
        Ok(self.translate_operation(backend, entity_label, operation, params))
    }

    pub fn translate_descriptor(&self, backend: BackendKind, descriptor: &QueryDescriptor) -> String {
        self.translate_operation(
            backend,
            &descriptor.entity_label,
            descriptor.operation,
            &descriptor.parameters,
        )
    }

    pub fn translate_operation(
        &self,
        backend: BackendKind,
        entity_label: &str,
        operation: Operation,
        params: &QueryParameters,
    ) -> String {
        let query = match backend {
            BackendKind::Oracle => match operation {
                Operation::Find => pgql::find(&self.graph_name, entity_label, params),
                Operation::Aggregate => pgql::aggregate(&self.graph_name, entity_label, params),
                Operation::Join => pgql::join(&self.graph_name, entity_label, params),
                Operation::Relation => pgql::relation(&self.graph_name, entity_label, params),
            },
            BackendKind::Memgraph => match operation {
                Operation::Find => cypher::find(entity_label, params),
                Operation::Aggregate => cypher::aggregate(entity_label, params),
                Operation::Join => cypher::join(entity_label, params),
                Operation::Relation => cypher::relation(entity_label, params),
            },
        };
        debug!(%backend, entity = entity_label, %operation, "translated query");
        query
    }

    /// Statement creating one vertex with the given properties.
    pub fn create_node(
        &self,
        backend: BackendKind,
        entity_label: &str,
        properties: &BTreeMap<String, Value>,
    ) -> String {
        match backend {
            BackendKind::Oracle => pgql::insert_vertex(entity_label, properties),
            BackendKind::Memgraph => cypher::create_node(entity_label, properties),
        }
    }

    /// Statements deleting one vertex and every edge attached to it, in
    /// execution order.
    ///
    /// The REST tables have no cascading deletes, so the edge tables are
    /// cleared first; the native store needs a single `DETACH DELETE`.
    pub fn delete_node(&self, backend: BackendKind, entity_label: &str, id: &str) -> Vec<String> {
        match backend {
            BackendKind::Oracle => pgql::delete_vertex(entity_label, id),
            BackendKind::Memgraph => vec![cypher::delete_node(entity_label, id)],
        }
    }
}

/// Variable naming for field references inside one query.
///
/// Keys may be qualified (`target.name`); the qualifier is mapped through
/// `aliases`, otherwise `default_var` is used.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub default_var: &'a str,
    pub aliases: &'a [(&'a str, &'a str)],
}

impl<'a> Scope<'a> {
    pub fn single(var: &'a str) -> Self {
        Self {
            default_var: var,
            aliases: &[],
        }
    }

    pub fn field_ref(&self, key: &str) -> String {
        let (var, field) = match key.split_once('.') {
            Some((qualifier, field)) => {
                let var = self
                    .aliases
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(qualifier))
                    .map(|(_, var)| (*var).to_string())
                    .unwrap_or_else(|| identifier(qualifier));
                (var, field)
            }
            None => (self.default_var.to_string(), key),
        };

        if field == VERTEX_ID_KEY {
            format!("id({})", var)
        } else {
            format!("{}.{}", var, identifier(field))
        }
    }
}

/// Render one where-clause entry through the operator table.
pub(crate) fn predicate(dialect: Dialect, field: &str, value: &WhereValue) -> String {
    let (operator, literal) = value.parts();

    let compare = |symbol: &str| format!("{} {} {}", field, symbol, render_literal(dialect, literal));

    match operator {
        Operator::Eq if literal.is_null() => format!("{} IS NULL", field),
        Operator::Ne if literal.is_null() => format!("{} IS NOT NULL", field),
        Operator::Eq => compare("="),
        Operator::Ne => compare("<>"),
        Operator::Gt => compare(">"),
        Operator::Gte => compare(">="),
        Operator::Lt => compare("<"),
        Operator::Lte => compare("<="),
        Operator::In => {
            let list = match literal {
                Value::Array(items) if items.is_empty() => return "1 = 0".to_string(),
                Value::Array(_) => literal.clone(),
                single => Value::Array(vec![single.clone()]),
            };
            format!("{} IN {}", field, render_literal(dialect, &list))
        }
        Operator::Like | Operator::Contains | Operator::StartsWith | Operator::EndsWith | Operator::IContains => {
            pattern_predicate(dialect, operator, field, &pattern_text(literal))
        }
    }
}

fn pattern_predicate(dialect: Dialect, operator: Operator, field: &str, text: &str) -> String {
    match dialect {
        Dialect::Pgql => match operator {
            Operator::Like => format!("{} LIKE {}", field, quote(dialect, text)),
            Operator::Contains => format!("{} LIKE {}", field, quote(dialect, &format!("%{}%", text))),
            Operator::StartsWith => format!("{} LIKE {}", field, quote(dialect, &format!("{}%", text))),
            Operator::EndsWith => format!("{} LIKE {}", field, quote(dialect, &format!("%{}", text))),
            _ => format!(
                "UPPER({}) LIKE UPPER({})",
                field,
                quote(dialect, &format!("%{}%", text))
            ),
        },
        Dialect::Cypher => match operator {
            Operator::Like => format!("{} =~ {}", field, quote(dialect, &like_to_regex(text))),
            Operator::Contains => format!("{} CONTAINS {}", field, quote(dialect, text)),
            Operator::StartsWith => format!("{} STARTS WITH {}", field, quote(dialect, text)),
            Operator::EndsWith => format!("{} ENDS WITH {}", field, quote(dialect, text)),
            _ => format!("toUpper({}) CONTAINS toUpper({})", field, quote(dialect, text)),
        },
    }
}

/// All where-clause entries, in key order.
pub(crate) fn conditions(
    dialect: Dialect,
    scope: Scope<'_>,
    where_clause: &BTreeMap<String, WhereValue>,
) -> Vec<String> {
    where_clause
        .iter()
        .map(|(key, value)| predicate(dialect, &scope.field_ref(key), value))
        .collect()
}

pub(crate) fn push_where(lines: &mut Vec<String>, conditions: &[String]) {
    if !conditions.is_empty() {
        lines.push(format!("WHERE {}", conditions.join(" AND ")));
    }
}

pub(crate) fn push_order_by(lines: &mut Vec<String>, scope: Scope<'_>, order_by: Option<&OrderBy>) {
    if let Some(order) = order_by.filter(|o| !o.field.is_empty()) {
        let direction = if order.descending { " DESC" } else { "" };
        lines.push(format!("ORDER BY {}{}", scope.field_ref(&order.field), direction));
    }
}

/// Output column name for a projected field (`target.name` → `name`).
pub(crate) fn column_alias(field: &str) -> String {
    let bare = field.rsplit('.').next().unwrap_or(field);
    identifier(bare)
}

/// Column name of an aggregate: explicit alias, else `count` / `sum_<field>`.
pub(crate) fn aggregate_alias(agg: &AggregateSpec) -> String {
    if let Some(alias) = agg.alias.as_deref().filter(|a| !a.trim().is_empty()) {
        return identifier(alias);
    }
    let function = agg.function.keyword().to_lowercase();
    match agg.field.as_deref() {
        Some(field) => format!("{}_{}", function, column_alias(field)),
        None => function,
    }
}

/// Argument of the aggregate function. Only `COUNT` accepts `*`.
pub(crate) fn aggregate_target(scope: Scope<'_>, agg: &AggregateSpec) -> String {
    match (agg.field.as_deref(), agg.function) {
        (Some(field), _) => scope.field_ref(field),
        (None, AggregateFunction::Count) => "*".to_string(),
        (None, _) => scope.field_ref("id"),
    }
}

/// Relationship type as spelled in the edge catalog, else sanitized as given.
pub(crate) fn relationship_label(relationship_type: &str) -> String {
    match edge_config(relationship_type) {
        Some(edge) => edge.relationship_type.to_string(),
        None => identifier(relationship_type),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::RelationshipSpec;
    use crate::error::BridgeError;
    use serde_json::json;

    const OPERATORS: &[&str] = &[
        "gt", "gte", "lt", "lte", "ne", "like", "contains", "startsWith", "endsWith", "in",
    ];

    fn find_with(field: &str, value: WhereValue) -> QueryParameters {
        QueryParameters::default().with_filter(field, value)
    }

    #[test]
    fn test_every_operator_in_both_dialects() {
        let translator = Translator::default();
        let expected_pgql = [
            "e.birth_year > 1900",
            "e.birth_year >= 1900",
            "e.birth_year < 1900",
            "e.birth_year <= 1900",
            "e.birth_year <> 1900",
            "e.birth_year LIKE '1900'",
            "e.birth_year LIKE '%1900%'",
            "e.birth_year LIKE '1900%'",
            "e.birth_year LIKE '%1900'",
            "e.birth_year IN (1900)",
        ];
        let expected_cypher = [
            "e.birth_year > 1900",
            "e.birth_year >= 1900",
            "e.birth_year < 1900",
            "e.birth_year <= 1900",
            "e.birth_year <> 1900",
            "e.birth_year =~ '1900'",
            "e.birth_year CONTAINS '1900'",
            "e.birth_year STARTS WITH '1900'",
            "e.birth_year ENDS WITH '1900'",
            "e.birth_year IN [1900]",
        ];

        for (i, op) in OPERATORS.iter().enumerate() {
            let params = find_with("birth_year", WhereValue::op(op, 1900));
            let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
            let cypher = translator.translate(BackendKind::Memgraph, "person", "find", &params).unwrap();
            assert!(pgql.contains(&format!("WHERE {}", expected_pgql[i])), "{op}: {pgql}");
            assert!(cypher.contains(&format!("WHERE {}", expected_cypher[i])), "{op}: {cypher}");
        }
    }

    #[test]
    fn test_unknown_operator_falls_back_to_equality() {
        let translator = Translator::default();
        let params = find_with("name", WhereValue::op("resembles", "Ada"));
        let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
        let cypher = translator.translate(BackendKind::Memgraph, "person", "find", &params).unwrap();
        assert!(pgql.contains("WHERE e.name = 'Ada'"));
        assert!(cypher.contains("WHERE e.name = 'Ada'"));
    }

    #[test]
    fn test_in_operator_with_list() {
        let translator = Translator::default();
        let params = find_with("name", WhereValue::op("in", json!(["Ada", "Alan"])));
        let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
        let cypher = translator.translate(BackendKind::Memgraph, "person", "find", &params).unwrap();
        assert!(pgql.contains("e.name IN ('Ada', 'Alan')"));
        assert!(cypher.contains("e.name IN ['Ada', 'Alan']"));
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let translator = Translator::default();
        let params = find_with("name", WhereValue::op("in", json!([])));
        let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
        let cypher = translator.translate(BackendKind::Memgraph, "person", "find", &params).unwrap();
        assert!(pgql.contains("WHERE 1 = 0"), "{pgql}");
        assert!(cypher.contains("WHERE 1 = 0"), "{cypher}");
        assert!(!pgql.contains("IN ()"));
        assert!(!cypher.contains("IN []"));
    }

    #[test]
    fn test_node_mutations_per_backend() {
        let translator = Translator::default();
        let mut properties = BTreeMap::new();
        properties.insert("id".to_string(), json!("Q7259"));
        properties.insert("name".to_string(), json!("Ada Lovelace"));

        let insert = translator.create_node(BackendKind::Oracle, "person", &properties);
        let create = translator.create_node(BackendKind::Memgraph, "person", &properties);
        assert!(insert.starts_with("INSERT INTO PERSONS (id, name)"));
        assert!(create.starts_with("CREATE (n:person {id: 'Q7259', name: 'Ada Lovelace'})"));

        let rest = translator.delete_node(BackendKind::Oracle, "field", "FIELDS(Q395)");
        assert_eq!(rest.last().map(String::as_str), Some("DELETE FROM FIELDS WHERE id = 'Q395'"));
        assert_eq!(rest.len(), 2);
        let native = translator.delete_node(BackendKind::Memgraph, "field", "Q395");
        assert_eq!(native.len(), 1);
        assert!(native[0].contains("DETACH DELETE n"));
    }

    #[test]
    fn test_null_literal_renders_is_null() {
        let translator = Translator::default();
        let params = QueryParameters::default()
            .with_filter("death_date", WhereValue::eq(Value::Null))
            .with_filter("gender", WhereValue::op("ne", Value::Null));
        let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
        assert!(pgql.contains("WHERE e.death_date IS NULL AND e.gender IS NOT NULL"));
    }

    #[test]
    fn test_limit_round_trip() {
        let translator = Translator::default();
        let params = QueryParameters::default().with_limit(10);
        let pgql = translator.translate(BackendKind::Oracle, "person", "find", &params).unwrap();
        let cypher = translator.translate(BackendKind::Memgraph, "person", "find", &params).unwrap();

        let pgql_limit = pgql.lines().last().and_then(|l| l.strip_prefix("LIMIT "));
        let cypher_limit = cypher.lines().last().and_then(|l| l.strip_prefix("LIMIT "));
        assert_eq!(pgql_limit.and_then(|n| n.parse::<u64>().ok()), Some(10));
        assert_eq!(cypher_limit.and_then(|n| n.parse::<u64>().ok()), Some(10));
    }

    #[test]
    fn test_unsupported_operation() {
        let translator = Translator::default();
        let err = translator
            .translate(BackendKind::Oracle, "person", "delete", &QueryParameters::default())
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedOperation(op) if op == "delete"));
    }

    #[test]
    fn test_literals_are_escaped_in_every_path() {
        let translator = Translator::default();
        let hostile = "x') DETACH DELETE (n";
        let params = find_with("name", WhereValue::op("contains", hostile)).with_relationship(RelationshipSpec {
            relationship_type: Some("WORKS_IN".into()),
            anchor_id: Some(hostile.into()),
            ..Default::default()
        });

        for op in ["find", "aggregate", "join", "relation"] {
            let pgql = translator.translate(BackendKind::Oracle, "person", op, &params).unwrap();
            let cypher = translator.translate(BackendKind::Memgraph, "person", op, &params).unwrap();
            assert!(!pgql.contains("x')"), "{op}: {pgql}");
            assert!(!cypher.contains("x')"), "{op}: {cypher}");
        }
    }

    #[test]
    fn test_scope_qualified_keys() {
        let scope = Scope {
            default_var: "s",
            aliases: &[("source", "s"), ("target", "t")],
        };
        assert_eq!(scope.field_ref("name"), "s.name");
        assert_eq!(scope.field_ref("target.name"), "t.name");
        assert_eq!(scope.field_ref("target.vertex_id"), "id(t)");
        assert_eq!(column_alias("target.name"), "name");
    }
}
