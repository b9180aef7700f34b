//! Terminal output formatting.

use anyhow::Result;
use colored::Colorize;
use graphbridge_core::{model::value_to_string, BackendKind, BridgeError, BridgeResult, Row};
use graphbridge_pgx::GraphInfo;
use graphbridge_query::{
    BulkDeleteReport, CreatedNode, EdgeDeletion, EntityStats, HealthStatus, NodeDeletion, StructuredQueryResult,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Widest value shown in row listings.
const VALUE_WIDTH: usize = 60;

/// Pretty-print any serializable value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// JSON form of a per-backend outcome: the value, or an `error` slot.
pub fn outcome_json<T: Serialize>(outcome: &BridgeResult<T>) -> Value {
    match outcome {
        Ok(value) => serde_json::to_value(value).unwrap_or(Value::Null),
        Err(e) => json!({ "error": { "code": e.code(), "message": e.to_string() } }),
    }
}

pub fn print_backend_header(backend: BackendKind) {
    println!();
    println!("{}", backend.as_str().to_uppercase().cyan().bold());
    println!("{}", "─".repeat(50).dimmed());
}

/// Print a translated query under its backend heading.
pub fn print_query(backend: BackendKind, query: &str) {
    print_backend_header(backend);
    println!("{}", query);
}

pub fn print_query_text(query: &str) {
    for line in query.lines() {
        println!("  {}", line.dimmed());
    }
    println!();
}

pub fn print_backend_error(err: &BridgeError) {
    println!("  {} {}", format!("[{}]", err.code()).red().bold(), err.to_string().red());
}

/// Print rows as indented `key: value` blocks.
pub fn print_rows(rows: &[Row]) {
    if rows.is_empty() {
        println!("  {}", "No results.".dimmed());
        return;
    }

    for (i, row) in rows.iter().enumerate() {
        println!("  {}", format!("#{}", i + 1).bold());
        for (key, value) in row {
            let text = match value {
                Value::Object(map) => format!("{{{} properties}}", map.len()).dimmed().to_string(),
                other => truncate(&value_to_string(other).unwrap_or_else(|| other.to_string()), VALUE_WIDTH),
            };
            println!("    {:<24} {}", key.dimmed(), text);
        }
    }
    println!();
    println!("  {}", format!("{} row(s)", rows.len()).dimmed());
}

pub fn print_stats(stats: &EntityStats) {
    println!("  {}: {}", "Entity".bold(), stats.entity_label);
    println!("  {}: {}", "Total".bold(), stats.total_count.to_string().green());
    print_query_text(&stats.query);
}

pub fn print_created(node: &CreatedNode) {
    println!("  {} {} {}", "Created".green().bold(), node.entity_label, node.id.yellow());
    print_query_text(&node.query);
}

pub fn print_node_deletion(deletion: &NodeDeletion) {
    println!("  {} {} {}", "Deleted".green().bold(), deletion.entity_label, deletion.id.yellow());
    if let Some(edges) = deletion.deleted_edges {
        println!("  {}", format!("{} edge(s) detached", edges).dimmed());
    }
    for query in &deletion.queries {
        print_query_text(query);
    }
}

pub fn print_edge_deletion(deletion: &EdgeDeletion) {
    println!(
        "  {} {} {} {}",
        "Deleted".green().bold(),
        deletion.source_id,
        format!("-[{}]->", deletion.relationship_type).cyan(),
        deletion.target_id
    );
    print_query_text(&deletion.query);
}

pub fn print_bulk_report(report: &BulkDeleteReport) {
    let summary = format!("{}/{} deleted", report.deleted.len(), report.requested);
    if report.success() {
        println!("  {}", summary.green());
    } else {
        println!("  {}", summary.yellow());
    }
    for deletion in &report.deleted {
        println!("  {} {}", "ok".green(), deletion.id);
    }
    for failure in &report.failed {
        println!(
            "  {} {} {}",
            "failed".red(),
            failure.id,
            format!("[{}] {}", failure.code, truncate(&failure.message, VALUE_WIDTH)).dimmed()
        );
    }
}

pub fn print_graphs(graphs: &[GraphInfo]) {
    if graphs.is_empty() {
        println!("{}", "No graphs found.".dimmed());
        return;
    }

    println!("{:<32} {:>12} {:>12}", "Graph".bold(), "Vertices".bold(), "Edges".bold());
    println!("{}", "─".repeat(58).dimmed());
    for graph in graphs {
        println!(
            "{:<32} {:>12} {:>12}",
            truncate(&graph.graph_name, 30).cyan(),
            count_cell(graph.vertex_count),
            count_cell(graph.edge_count),
        );
    }
}

fn count_cell(count: Option<u64>) -> String {
    count.map(|c| c.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn print_health(statuses: &[HealthStatus]) {
    if statuses.is_empty() {
        println!("{}", "No backends configured.".dimmed());
        return;
    }

    println!("{:<12} {:<16} {}", "Backend".bold(), "Entity".bold(), "Status".bold());
    println!("{}", "─".repeat(50).dimmed());
    for status in statuses {
        let state = if status.healthy {
            "ok".green()
        } else {
            "down".red()
        };
        println!("{:<12} {:<16} {}", status.backend.as_str(), status.entity_label, state);
        if let Some(error) = &status.error {
            println!("{:<29} {}", "", truncate(error, VALUE_WIDTH).dimmed());
        }
    }
}

/// Print a structured query result, one section per backend.
pub fn print_resolution(result: &StructuredQueryResult) {
    let query = &result.query;
    let mut heading = format!("{} \"{}\"", query.entity_label, query.entity_name);
    if let Some(rel) = &query.relationship_type {
        heading.push_str(&format!(" -[{}]->", rel));
    }
    if let Some(target) = &query.target_entity_label {
        heading.push_str(&format!(" ({})", target));
    }
    println!("{}", heading.bold());

    for (backend, outcome) in &result.results {
        print_backend_header(*backend);
        let resolution = match outcome {
            Ok(resolution) => resolution,
            Err(e) => {
                print_backend_error(e);
                continue;
            }
        };

        println!("  {}: {}", "Identifier".bold(), resolution.source_identifier.yellow());
        if resolution.relationships.is_empty() {
            println!("  {}", "No relationships.".dimmed());
            continue;
        }
        for rel in &resolution.relationships {
            let target = rel
                .target_name
                .as_deref()
                .or(rel.target_identifier.as_deref())
                .unwrap_or("?");
            let kind = rel
                .target_descriptor
                .clone()
                .or_else(|| rel.target_labels.as_ref().map(|labels| labels.join(":")))
                .unwrap_or_default();
            println!(
                "  {} {} {}",
                format!("-[{}]->", rel.relationship_type).cyan(),
                truncate(target, VALUE_WIDTH),
                kind.dimmed()
            );
        }
        println!("  {}", format!("{} relationship(s)", resolution.count).dimmed());
    }
}

/// Shorten to at most `max_len` characters, ending with `...` when cut.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}
