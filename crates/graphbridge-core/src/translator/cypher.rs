//! Cypher rendering for the native graph store.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::catalog::{decode_vertex_id, edge_config, entity_config, label_names};
use crate::descriptor::{QueryParameters, RelationMode, RelationshipSpec};
use crate::model::Direction;

use super::literal::{identifier, quote, render_literal, Dialect};
use super::{
    aggregate_alias, aggregate_target, column_alias, conditions, push_order_by, push_where,
    relationship_label, Scope, VERTEX_ID_KEY,
};

const DIALECT: Dialect = Dialect::Cypher;

const PAIR_SCOPE: Scope<'static> = Scope {
    default_var: "s",
    aliases: &[("source", "s"), ("target", "t"), ("edge", "e")],
};

fn node_label(label: &str) -> String {
    identifier(&label_names(label).memgraph_label)
}

fn projected_fields(entity_label: &str, params: &QueryParameters) -> Vec<String> {
    if !params.fields.is_empty() {
        return params.fields.clone();
    }
    match entity_config(entity_label) {
        Some(entity) => entity.memgraph_fields.iter().map(|f| f.to_string()).collect(),
        None => vec!["id".to_string(), "name".to_string()],
    }
}

/// Native entity id for an anchor, unwrapping composite REST ids.
fn plain_id(id: &str) -> &str {
    decode_vertex_id(id).map(|(_, inner)| inner).unwrap_or(id)
}

fn id_filter(id: Option<&str>) -> String {
    match id {
        Some(id) => format!(" {{id: {}}}", quote(DIALECT, plain_id(id))),
        None => String::new(),
    }
}

fn property_map(properties: &BTreeMap<String, Value>) -> String {
    if properties.is_empty() {
        return String::new();
    }
    let entries: Vec<String> = properties
        .iter()
        .map(|(key, value)| format!("{}: {}", identifier(key), render_literal(DIALECT, value)))
        .collect();
    format!(" {{{}}}", entries.join(", "))
}

/// Label of the far end: explicit target label, else the catalog's
/// counterpart for the relationship type.
fn far_label(rel: &RelationshipSpec) -> Option<String> {
    if let Some(label) = rel.target_label.as_deref() {
        return Some(label.to_string());
    }
    let edge = edge_config(rel.relationship_type.as_deref()?)?;
    let far = match rel.direction {
        Direction::Outgoing => edge.target_type,
        Direction::Incoming => edge.source_type,
    };
    Some(far.to_string())
}

fn edge_pattern(rel: &RelationshipSpec) -> String {
    match rel.relationship_type.as_deref() {
        Some(rel_type) => format!("e:{}", relationship_label(rel_type)),
        None => "e".to_string(),
    }
}

fn push_limit(lines: &mut Vec<String>, limit: Option<u64>) {
    if let Some(limit) = limit {
        lines.push(format!("LIMIT {}", limit));
    }
}

pub fn find(entity_label: &str, params: &QueryParameters) -> String {
    let scope = Scope::single("e");

    let mut projection = vec![
        format!("id(e) AS {}", VERTEX_ID_KEY),
        "labels(e) AS labels".to_string(),
    ];
    for field in projected_fields(entity_label, params) {
        if field != VERTEX_ID_KEY {
            projection.push(format!("{} AS {}", scope.field_ref(&field), column_alias(&field)));
        }
    }
    projection.push("properties(e) AS all_properties".to_string());

    let mut lines = vec![format!("MATCH (e:{})", node_label(entity_label))];
    push_where(&mut lines, &conditions(DIALECT, scope, &params.where_clause));
    lines.push(format!("RETURN {}", projection.join(", ")));
    push_order_by(&mut lines, scope, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// Aggregation with implicit grouping on the non-aggregated columns.
pub fn aggregate(entity_label: &str, params: &QueryParameters) -> String {
    let scope = Scope::single("e");
    let agg = params.aggregate.clone().unwrap_or_default();
    let alias = aggregate_alias(&agg);

    let mut projection = Vec::new();
    if let Some(group) = &params.group_by {
        projection.push(format!("{} AS {}", scope.field_ref(group), column_alias(group)));
    }
    projection.push(format!(
        "{}({}) AS {}",
        agg.function.keyword().to_lowercase(),
        aggregate_target(scope, &agg),
        alias
    ));

    let mut lines = vec![format!("MATCH (e:{})", node_label(entity_label))];
    push_where(&mut lines, &conditions(DIALECT, scope, &params.where_clause));
    lines.push(format!("RETURN {}", projection.join(", ")));
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

/// Edge traversal from an anchored node, or edge creation in create mode.
pub fn relation(entity_label: &str, params: &QueryParameters) -> String {
    let rel = params.relationship.clone().unwrap_or_default();
    match rel.mode {
        RelationMode::Create => return create_edge(entity_label, &rel),
        RelationMode::Delete => return delete_edge(entity_label, &rel),
        RelationMode::Match => {}
    }

    let label = node_label(entity_label);
    let edge = edge_pattern(&rel);
    let other = rel
        .target_label
        .as_deref()
        .map(|l| format!(":{}", node_label(l)))
        .unwrap_or_default();
    let anchor = id_filter(rel.anchor_id.as_deref());

    let (pattern, far, anchor_var) = match rel.direction {
        Direction::Outgoing => (
            format!("(source:{}{})-[{}]->(target{})", label, anchor, edge, other),
            "target",
            "source",
        ),
        Direction::Incoming => (
            format!("(source{})-[{}]->(target:{}{})", other, edge, label, anchor),
            "source",
            "target",
        ),
    };
    let scope = Scope {
        default_var: anchor_var,
        aliases: &[("source", "source"), ("target", "target"), ("edge", "e")],
    };

    let mut lines = vec![format!("MATCH {}", pattern)];
    push_where(&mut lines, &conditions(DIALECT, scope, &params.where_clause));
    lines.push(format!(
        "RETURN type(e) AS relationship_type, id({far}) AS {far}_vertex_id, labels({far}) AS {far}_labels, \
         {far}.id AS {far}_entity_id, {far}.name AS {far}_name, properties({far}) AS {far}_properties",
        far = far
    ));
    push_order_by(&mut lines, scope, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// Source/edge/target triples for one relationship type.
pub fn join(entity_label: &str, params: &QueryParameters) -> String {
    let rel = params.relationship.clone().unwrap_or_default();
    match rel.mode {
        RelationMode::Create => return create_edge(entity_label, &rel),
        RelationMode::Delete => return delete_edge(entity_label, &rel),
        RelationMode::Match => {}
    }

    let label = node_label(entity_label);
    let edge = edge_pattern(&rel);
    let other = far_label(&rel)
        .map(|l| format!(":{}", node_label(&l)))
        .unwrap_or_default();
    let pattern = match rel.direction {
        Direction::Outgoing => format!("(s:{})-[{}]->(t{})", label, edge, other),
        Direction::Incoming => format!("(t{})-[{}]->(s:{})", other, edge, label),
    };

    let mut predicates = Vec::new();
    if let Some(anchor) = rel.anchor_id.as_deref() {
        predicates.push(format!("s.id = {}", quote(DIALECT, plain_id(anchor))));
    }
    predicates.extend(conditions(DIALECT, PAIR_SCOPE, &params.where_clause));

    let mut lines = vec![format!("MATCH {}", pattern)];
    push_where(&mut lines, &predicates);
    lines.push(
        "RETURN s.id AS source_id, s.name AS source_name, type(e) AS relationship_type, \
         t.id AS target_id, t.name AS target_name"
            .to_string(),
    );
    push_order_by(&mut lines, PAIR_SCOPE, params.order_by.as_ref());
    push_limit(&mut lines, params.limit);
    lines.join("\n")
}

/// `(source, target)` node patterns with ids, oriented by direction.
fn endpoints(entity_label: &str, rel: &RelationshipSpec) -> (String, String) {
    let anchor = format!(":{}{}", node_label(entity_label), id_filter(rel.anchor_id.as_deref()));
    let other = format!(
        "{}{}",
        far_label(rel).map(|l| format!(":{}", node_label(&l))).unwrap_or_default(),
        id_filter(rel.target_id.as_deref())
    );
    match rel.direction {
        Direction::Outgoing => (anchor, other),
        Direction::Incoming => (other, anchor),
    }
}

fn create_edge(entity_label: &str, rel: &RelationshipSpec) -> String {
    let rel_type = relationship_label(rel.relationship_type.as_deref().unwrap_or("RELATED_TO"));
    let (source, target) = endpoints(entity_label, rel);

    [
        format!("MATCH (source{}), (target{})", source, target),
        format!(
            "CREATE (source)-[e:{}{}]->(target)",
            rel_type,
            property_map(&rel.properties)
        ),
        "RETURN type(e) AS relationship_type, source.id AS source_id, target.id AS target_id".to_string(),
    ]
    .join("\n")
}

/// Delete the typed edges between both endpoints, reporting how many went.
fn delete_edge(entity_label: &str, rel: &RelationshipSpec) -> String {
    let (source, target) = endpoints(entity_label, rel);
    [
        format!("MATCH (source{})-[{}]->(target{})", source, edge_pattern(rel), target),
        "DELETE e".to_string(),
        "RETURN count(e) AS deleted_count".to_string(),
    ]
    .join("\n")
}

pub fn create_node(entity_label: &str, properties: &BTreeMap<String, Value>) -> String {
    [
        format!("CREATE (n:{}{})", node_label(entity_label), property_map(properties)),
        "RETURN id(n) AS vertex_id, properties(n) AS all_properties".to_string(),
    ]
    .join("\n")
}

/// Detach-delete one node, reporting how many edges went with it.
pub fn delete_node(entity_label: &str, id: &str) -> String {
    [
        format!("MATCH (n:{}{})", node_label(entity_label), id_filter(Some(id))),
        "OPTIONAL MATCH (n)-[r]-()".to_string(),
        "WITH n, count(r) AS deleted_edges".to_string(),
        "DETACH DELETE n".to_string(),
        "RETURN deleted_edges".to_string(),
    ]
    .join("\n")
}
