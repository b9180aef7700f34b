//! PGQL / SQL rendering for the REST graph service.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::{decode_vertex_id, edge_config, edges_touching, encode_vertex_id, label_names};
use crate::descriptor::{QueryParameters, RelationMode, RelationshipSpec};
use crate::model::Direction;

use super::literal::{identifier, quote, render_literal, Dialect};
use super::{
    aggregate_alias, aggregate_target, column_alias, conditions, push_order_by, push_where,
    relationship_label, Scope, VERTEX_ID_KEY,
};

const DIALECT: Dialect = Dialect::Pgql;

const JOIN_SCOPE: Scope<'static> = Scope {
    default_var: "s",
    aliases: &[("source", "s"), ("target", "t"), ("edge", "e")],
};

/// Projected vertex properties: explicit fields, else the catalog's safe
/// fields, else just `name`.
fn projected_fields(entity_label: &str, params: &QueryParameters) -> Vec<String> {
    if !params.fields.is_empty() {
        return params.fields.clone();
    }
    match crate::catalog::entity_config(entity_label) {
        Some(entity) => entity.oracle_fields.iter().map(|f| f.to_string()).collect(),
        None => vec!["name".to_string()],
    }
}

/// Composite vertex id for an anchor given either as plain or composite id.
fn anchor_vertex_id(table: &str, id: &str) -> String {
    match decode_vertex_id(id) {
        Some(_) => id.to_string(),
        None => encode_vertex_id(table, id),
    }
}

fn push_limit(lines: &mut Vec<String>, limit: Option<u64>) {
    if let Some(limit) = limit {
        lines.push(format!("LIMIT {}", limit));
    }
}

pub fn find(graph: &str, entity_label: &str, params: &QueryParameters) -> String {
    let names = label_names(entity_label);
    let scope = Scope::single("e");

    let mut projection = vec![format!("id(e) AS {}", VERTEX_ID_KEY)];
    for field in projected_fields(entity_label, params) {
        if field != VERTEX_ID_KEY {
            projection.push(format!("{} AS {}", scope.field_ref(&field), column_alias(&field)));
        }
    }

    let mut lines = vec![
        format!("SELECT {}", projection.join(", ")),
        format!("FROM MATCH (e:{}) ON {}", identifier(&names.oracle_label), graph),
    ];
    push_where(&mut lines, &conditions(DIALECT, scope, &params.where_clause));
    push_order_by(&mut lines, scope, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

pub fn aggregate(graph: &str, entity_label: &str, params: &QueryParameters) -> String {
    let names = label_names(entity_label);
    let scope = Scope::single("e");
    let agg = params.aggregate.clone().unwrap_or_default();
    let alias = aggregate_alias(&agg);

    let mut projection = Vec::new();
    if let Some(group) = &params.group_by {
        projection.push(format!("{} AS {}", scope.field_ref(group), column_alias(group)));
    }
    projection.push(format!(
        "{}({}) AS {}",
        agg.function.keyword(),
        aggregate_target(scope, &agg),
        alias
    ));

    let mut lines = vec![
        format!("SELECT {}", projection.join(", ")),
        format!("FROM MATCH (e:{}) ON {}", identifier(&names.oracle_label), graph),
    ];
    push_where(&mut lines, &conditions(DIALECT, scope, &params.where_clause));
    if let Some(group) = &params.group_by {
        lines.push(format!("GROUP BY {}", scope.field_ref(group)));
    }
    match params.order_by.as_ref() {
        Some(order) if identifier(&order.field) == alias => {
            let direction = if order.descending { " DESC" } else { "" };
            lines.push(format!("ORDER BY {}{}", alias, direction));
        }
        other => push_order_by(&mut lines, scope, other),
    }
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// Edge traversal as a PGQL path match, or an edge-table insert in create mode.
pub fn relation(graph: &str, entity_label: &str, params: &QueryParameters) -> String {
    let rel = params.relationship.clone().unwrap_or_default();
    match rel.mode {
        RelationMode::Create => return insert_edge(&rel),
        RelationMode::Delete => return delete_edge(&rel),
        RelationMode::Match => {}
    }

    let names = label_names(entity_label);
    let label = identifier(&names.oracle_label);
    let edge = match rel.relationship_type.as_deref() {
        Some(rel_type) => format!("e:{}", relationship_label(rel_type)),
        None => "e".to_string(),
    };
    let other = rel
        .target_label
        .as_deref()
        .map(|l| format!(":{}", identifier(&label_names(l).oracle_label)))
        .unwrap_or_default();

    let (pattern, projection, anchor_var) = match rel.direction {
        Direction::Outgoing => (
            format!("(source:{})-[{}]->(target{})", label, edge, other),
            "label(e) AS relationship_type, id(target) AS target_vertex_id, target.name AS target_name",
            "source",
        ),
        Direction::Incoming => (
            format!("(source{})-[{}]->(target:{})", other, edge, label),
            "label(e) AS relationship_type, id(source) AS source_vertex_id, source.name AS source_name",
            "target",
        ),
    };
    let scope = Scope {
        default_var: anchor_var,
        aliases: &[("source", "source"), ("target", "target"), ("edge", "e")],
    };

    let mut lines = vec![
        format!("SELECT {}", projection),
        format!("FROM MATCH {} ON {}", pattern, graph),
    ];

    let mut predicates = Vec::new();
    if let Some(anchor) = &rel.anchor_id {
        predicates.push(format!(
            "id({}) = {}",
            anchor_var,
            quote(DIALECT, &anchor_vertex_id(&names.oracle_table, anchor))
        ));
    }
    predicates.extend(conditions(DIALECT, scope, &params.where_clause));
    push_where(&mut lines, &predicates);
    push_order_by(&mut lines, scope, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// Sequential join chain over vertex and edge tables.
///
/// Relationship types missing from the edge catalog have no known edge
/// table and fall back to a PGQL path match.
pub fn join(graph: &str, entity_label: &str, params: &QueryParameters) -> String {
    let rel = params.relationship.clone().unwrap_or_default();
    match rel.mode {
        RelationMode::Create => return insert_edge(&rel),
        RelationMode::Delete => return delete_edge(&rel),
        RelationMode::Match => {}
    }
    let Some(edge) = rel.relationship_type.as_deref().and_then(edge_config) else {
        return path_join(graph, entity_label, params, &rel);
    };

    let names = label_names(entity_label);
    let (near_key, far_key, far_type) = match rel.direction {
        Direction::Outgoing => (edge.source_field, edge.target_field, edge.target_type),
        Direction::Incoming => (edge.target_field, edge.source_field, edge.source_type),
    };
    let far = label_names(rel.target_label.as_deref().unwrap_or(far_type));

    let mut lines = vec![
        "SELECT s.id AS source_id, s.name AS source_name, t.id AS target_id, t.name AS target_name".to_string(),
        format!("FROM {} s", identifier(&names.oracle_table)),
        format!("JOIN {} e ON e.{} = s.id", edge.oracle_table, near_key),
        format!("JOIN {} t ON t.id = e.{}", identifier(&far.oracle_table), far_key),
    ];

    let mut predicates = Vec::new();
    if let Some(anchor) = &rel.anchor_id {
        let plain = decode_vertex_id(anchor).map(|(_, id)| id).unwrap_or(anchor);
        predicates.push(format!("s.id = {}", quote(DIALECT, plain)));
    }
    predicates.extend(conditions(DIALECT, JOIN_SCOPE, &params.where_clause));
    push_where(&mut lines, &predicates);
    push_order_by(&mut lines, JOIN_SCOPE, params.order_by.as_ref());
    if let Some(limit) = params.limit {
        lines.push(format!("FETCH FIRST {} ROWS ONLY", limit));
    }
    lines.join("\n")
}

fn path_join(graph: &str, entity_label: &str, params: &QueryParameters, rel: &RelationshipSpec) -> String {
    let names = label_names(entity_label);
    let label = identifier(&names.oracle_label);
    let edge = match rel.relationship_type.as_deref() {
        Some(rel_type) => format!("e:{}", relationship_label(rel_type)),
        None => "e".to_string(),
    };
    let other = rel
        .target_label
        .as_deref()
        .map(|l| format!(":{}", identifier(&label_names(l).oracle_label)))
        .unwrap_or_default();
    let pattern = match rel.direction {
        Direction::Outgoing => format!("(s:{})-[{}]->(t{})", label, edge, other),
        Direction::Incoming => format!("(t{})-[{}]->(s:{})", other, edge, label),
    };

    let mut lines = vec![
        "SELECT id(s) AS source_vertex_id, s.name AS source_name, label(e) AS relationship_type, \
         id(t) AS target_vertex_id, t.name AS target_name"
            .to_string(),
        format!("FROM MATCH {} ON {}", pattern, graph),
    ];

    let mut predicates = Vec::new();
    if let Some(anchor) = &rel.anchor_id {
        predicates.push(format!(
            "id(s) = {}",
            quote(DIALECT, &anchor_vertex_id(&names.oracle_table, anchor))
        ));
    }
    predicates.extend(conditions(DIALECT, JOIN_SCOPE, &params.where_clause));
    push_where(&mut lines, &predicates);
    push_order_by(&mut lines, JOIN_SCOPE, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// Edge table, its endpoint columns and the quoted endpoint ids.
struct EdgeRow {
    table: String,
    columns: [String; 2],
    values: [String; 2],
}

fn edge_row(rel: &RelationshipSpec) -> EdgeRow {
    let rel_type = rel.relationship_type.as_deref().unwrap_or("RELATED_TO");
    let (table, source_col, target_col) = match edge_config(rel_type) {
        Some(edge) => (
            edge.oracle_table.to_string(),
            edge.source_field.to_string(),
            edge.target_field.to_string(),
        ),
        None => (
            format!("{}_EDGES", identifier(rel_type).to_uppercase()),
            "source_id".to_string(),
            "target_id".to_string(),
        ),
    };

    let (source_id, target_id) = match rel.direction {
        Direction::Outgoing => (rel.anchor_id.as_deref(), rel.target_id.as_deref()),
        Direction::Incoming => (rel.target_id.as_deref(), rel.anchor_id.as_deref()),
    };
    let plain = |id: Option<&str>| match id {
        Some(id) => quote(DIALECT, plain_id(id)),
        None => "NULL".to_string(),
    };

    EdgeRow {
        table,
        columns: [source_col, target_col],
        values: [plain(source_id), plain(target_id)],
    }
}

fn plain_id(id: &str) -> &str {
    decode_vertex_id(id).map(|(_, inner)| inner).unwrap_or(id)
}

/// Insert one row into the relationship's edge table.
fn insert_edge(rel: &RelationshipSpec) -> String {
    let row = edge_row(rel);
    let mut columns = row.columns.to_vec();
    let mut values = row.values.to_vec();
    for (key, value) in &rel.properties {
        columns.push(identifier(key));
        values.push(render_literal(DIALECT, value));
    }

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        row.table,
        columns.join(", "),
        values.join(", ")
    )
}

/// Delete the edge-table row linking both endpoints.
fn delete_edge(rel: &RelationshipSpec) -> String {
    let row = edge_row(rel);
    format!(
        "DELETE FROM {} WHERE {} = {} AND {} = {}",
        row.table, row.columns[0], row.values[0], row.columns[1], row.values[1]
    )
}

/// Date columns are stored as `DATE` and need an explicit conversion.
fn column_value(column: &str, value: &Value) -> String {
    match value {
        Value::String(s) if column.ends_with("_date") => {
            format!("TO_DATE({}, 'YYYY-MM-DD')", quote(DIALECT, s))
        }
        other => render_literal(DIALECT, other),
    }
}

/// Insert one row into the entity's vertex table.
pub fn insert_vertex(entity_label: &str, properties: &BTreeMap<String, Value>) -> String {
    let names = label_names(entity_label);
    let columns: Vec<String> = properties.keys().map(|k| identifier(k)).collect();
    let values: Vec<String> = properties
        .iter()
        .map(|(key, value)| column_value(&identifier(key), value))
        .collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        identifier(&names.oracle_table),
        columns.join(", "),
        values.join(", ")
    )
}

/// Edge-table deletes for every edge touching the vertex, then the vertex row.
pub fn delete_vertex(entity_label: &str, id: &str) -> Vec<String> {
    let names = label_names(entity_label);
    let id = quote(DIALECT, plain_id(id));
    let key = crate::catalog::entity_config(entity_label).map(|e| e.key).unwrap_or(entity_label);

    let mut statements: Vec<String> = edges_touching(key)
        .map(|edge| {
            let mut columns = Vec::new();
            if edge.source_type.eq_ignore_ascii_case(key) {
                columns.push(edge.source_field);
            }
            if edge.target_type.eq_ignore_ascii_case(key) {
                columns.push(edge.target_field);
            }
            let predicate: Vec<String> = columns.iter().map(|c| format!("{} = {}", c, id)).collect();
            format!("DELETE FROM {} WHERE {}", edge.oracle_table, predicate.join(" OR "))
        })
        .collect();
    statements.push(format!(
        "DELETE FROM {} WHERE id = {}",
        identifier(&names.oracle_table),
        id
    ));
    statements
}
