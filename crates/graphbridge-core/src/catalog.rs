//! Entity and edge catalog shared by both backends.
//!
//! The two backends name the same things differently: the REST service uses
//! upper-case vertex labels backed by plural tables (`PERSON` / `PERSONS`),
//! the native store uses lower-case labels (`person`). Composite REST vertex
//! ids embed the table name: `PERSONS(Q7251)`.

/// Per-entity naming and projection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityConfig {
    pub key: &'static str,
    pub oracle_label: &'static str,
    pub oracle_table: &'static str,
    pub memgraph_label: &'static str,
    /// Properties known to exist on every REST vertex of this type.
    pub oracle_fields: &'static [&'static str],
    pub memgraph_fields: &'static [&'static str],
    pub search_field: &'static str,
}

/// Per-relationship storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeConfig {
    pub relationship_type: &'static str,
    pub oracle_table: &'static str,
    pub source_field: &'static str,
    pub target_field: &'static str,
    pub source_type: &'static str,
    pub target_type: &'static str,
    pub properties: &'static [&'static str],
}

const ENTITIES: &[EntityConfig] = &[
    EntityConfig {
        key: "person",
        oracle_label: "PERSON",
        oracle_table: "PERSONS",
        memgraph_label: "person",
        oracle_fields: &["name", "birth_date", "death_date", "gender", "description"],
        memgraph_fields: &["id", "name", "birth_date", "death_date", "gender", "description"],
        search_field: "name",
    },
    EntityConfig {
        key: "place",
        oracle_label: "PLACE",
        oracle_table: "PLACES",
        memgraph_label: "place",
        oracle_fields: &["name", "type"],
        memgraph_fields: &["id", "name", "type"],
        search_field: "name",
    },
    EntityConfig {
        key: "work",
        oracle_label: "WORK",
        oracle_table: "WORKS",
        memgraph_label: "work",
        oracle_fields: &["name", "type"],
        memgraph_fields: &["id", "name", "type"],
        search_field: "name",
    },
    EntityConfig {
        key: "award",
        oracle_label: "AWARD",
        oracle_table: "AWARDS",
        memgraph_label: "award",
        oracle_fields: &["name"],
        memgraph_fields: &["id", "name"],
        search_field: "name",
    },
    EntityConfig {
        key: "field",
        oracle_label: "FIELD",
        oracle_table: "FIELDS",
        memgraph_label: "field",
        oracle_fields: &["name"],
        memgraph_fields: &["id", "name"],
        search_field: "name",
    },
    EntityConfig {
        key: "occupation",
        oracle_label: "OCCUPATION",
        oracle_table: "OCCUPATIONS",
        memgraph_label: "occupation",
        oracle_fields: &["name"],
        memgraph_fields: &["id", "name"],
        search_field: "name",
    },
    EntityConfig {
        key: "workplace",
        oracle_label: "WORKPLACE",
        oracle_table: "WORKPLACES",
        memgraph_label: "workplace",
        oracle_fields: &["name", "type"],
        memgraph_fields: &["id", "name", "type"],
        search_field: "name",
    },
];

const fn edge(
    relationship_type: &'static str,
    oracle_table: &'static str,
    source_field: &'static str,
    target_field: &'static str,
    source_type: &'static str,
    target_type: &'static str,
) -> EdgeConfig {
    EdgeConfig {
        relationship_type,
        oracle_table,
        source_field,
        target_field,
        source_type,
        target_type,
        properties: &[],
    }
}

const EDGES: &[EdgeConfig] = &[
    edge("RECEIVED", "RECEIVED_EDGES", "person_id", "award_id", "person", "award"),
    edge("WORKS_IN", "WORKS_IN_EDGES", "person_id", "field_id", "person", "field"),
    EdgeConfig {
        relationship_type: "WORKED_AT",
        oracle_table: "WORKED_AT_EDGES",
        source_field: "person_id",
        target_field: "workplace_id",
        source_type: "person",
        target_type: "workplace",
        properties: &["start_date", "end_date"],
    },
    edge("HAS_OCCUPATION", "HAS_OCCUPATION_EDGES", "person_id", "occupation_id", "person", "occupation"),
    edge("STUDENT_OF", "STUDENT_OF_EDGES", "student_id", "teacher_id", "person", "person"),
    edge("ADVISED", "ADVISED_EDGES", "advisor_id", "advisee_id", "person", "person"),
    edge("BIRTH_IN", "BIRTH_IN_EDGES", "person_id", "place_id", "person", "place"),
    edge("DIED_IN", "DIED_IN_EDGES", "person_id", "place_id", "person", "place"),
    edge("NATIONAL_OF", "NATIONAL_OF_EDGES", "person_id", "place_id", "person", "place"),
    edge("CREATED", "CREATED_EDGES", "person_id", "work_id", "person", "work"),
    edge("FATHER_OF", "FATHER_EDGES", "father_id", "child_id", "person", "person"),
    edge("MOTHER_OF", "MOTHER_EDGES", "mother_id", "child_id", "person", "person"),
    edge("PARTNER_OF", "PARTNER_EDGES", "person1_id", "person2_id", "person", "person"),
    edge("INFLUENCED_BY", "INFLUENCE_EDGES", "influenced_id", "influencer_id", "person", "person"),
    edge("RELATIVE_OF", "RELATIVE_EDGES", "person1_id", "person2_id", "person", "person"),
    edge(
        "SIGNIFICANT_PERSON_FOR",
        "SIGNIFICANT_PERSON_EDGES",
        "significant_person_id",
        "for_person_id",
        "person",
        "person",
    ),
];

/// Look up an entity by key or by either backend label (case-insensitive).
pub fn entity_config(label: &str) -> Option<&'static EntityConfig> {
    let label = label.trim();
    ENTITIES.iter().find(|e| {
        e.key.eq_ignore_ascii_case(label)
            || e.oracle_label.eq_ignore_ascii_case(label)
            || e.memgraph_label.eq_ignore_ascii_case(label)
    })
}

/// Look up the entity stored in a REST vertex table.
pub fn entity_for_table(table: &str) -> Option<&'static EntityConfig> {
    ENTITIES.iter().find(|e| e.oracle_table.eq_ignore_ascii_case(table.trim()))
}

/// Look up a relationship type (case-insensitive).
pub fn edge_config(relationship_type: &str) -> Option<&'static EdgeConfig> {
    EDGES
        .iter()
        .find(|e| e.relationship_type.eq_ignore_ascii_case(relationship_type.trim()))
}

pub fn entity_types() -> Vec<&'static str> {
    ENTITIES.iter().map(|e| e.key).collect()
}

pub fn relationship_types() -> Vec<&'static str> {
    EDGES.iter().map(|e| e.relationship_type).collect()
}

/// Edge types with `entity_key` at either end.
pub fn edges_touching(entity_key: &str) -> impl Iterator<Item = &'static EdgeConfig> + '_ {
    EDGES.iter().filter(move |e| {
        e.source_type.eq_ignore_ascii_case(entity_key) || e.target_type.eq_ignore_ascii_case(entity_key)
    })
}

/// Backend names for a label, falling back to naming conventions for
/// labels the catalog does not know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelNames {
    pub oracle_label: String,
    pub oracle_table: String,
    pub memgraph_label: String,
}

pub fn label_names(label: &str) -> LabelNames {
    match entity_config(label) {
        Some(entity) => LabelNames {
            oracle_label: entity.oracle_label.to_string(),
            oracle_table: entity.oracle_table.to_string(),
            memgraph_label: entity.memgraph_label.to_string(),
        },
        None => LabelNames {
            oracle_label: label.to_uppercase(),
            oracle_table: format!("{}S", label.to_uppercase()),
            memgraph_label: label.to_string(),
        },
    }
}

/// Build a composite REST vertex id: `PERSONS(Q7251)`.
pub fn encode_vertex_id(table: &str, id: &str) -> String {
    format!("{}({})", table, id)
}

/// Split a composite REST vertex id into `(table, id)`.
pub fn decode_vertex_id(vertex_id: &str) -> Option<(&str, &str)> {
    let vertex_id = vertex_id.trim();
    let open = vertex_id.find('(')?;
    let inner = vertex_id[open + 1..].strip_suffix(')')?;
    let table = &vertex_id[..open];
    if table.is_empty() || inner.is_empty() {
        return None;
    }
    Some((table, inner))
}
