//! Post-parse validation: coerce the recovered JSON payload into typed
//! records and derive the graph, enforcing the uniqueness and referential
//! invariants the rest of the system relies on.

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::repair::{recover_payload, ParseError};
use crate::schema::{
    Anomaly, CaseAnalysis, Entity, Graph, GraphEdge, GraphNode, Relation, Severity,
    DEFAULT_CONFIDENCE,
};

/// Parse raw generation-service output into a validated analysis.
///
/// Guarantees on the result: every entity has a non-empty value; node ids
/// are the distinct entity values, first occurrence winning; every edge's
/// endpoints are node ids; every confidence sits in [0, 1].
pub fn parse_response(raw: &str) -> Result<CaseAnalysis, ParseError> {
    let payload = recover_payload(raw)?;
    Ok(materialize(&payload))
}

fn materialize(payload: &Value) -> CaseAnalysis {
    let mut entities = collect_entities(payload["entities"].as_array());
    if entities.is_empty() {
        // Graph-shaped payloads carry their entities as nodes.
        entities = collect_entities(payload["nodes"].as_array());
    }
    if entities.is_empty() {
        entities = collect_summary_entities(payload["Document Summaries"].as_array());
    }

    let relations = collect_relations(
        payload["relations"]
            .as_array()
            .or_else(|| payload["relationships"].as_array())
            .or_else(|| payload["edges"].as_array()),
    );

    let anomalies = collect_anomalies(payload["anomalies"].as_array());

    let graph = derive_graph(&entities, &relations);

    debug!(
        entities = entities.len(),
        relations = relations.len(),
        anomalies = anomalies.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Materialized extraction payload"
    );

    CaseAnalysis {
        entities,
        relations,
        anomalies,
        graph,
    }
}

fn collect_entities(items: Option<&Vec<Value>>) -> Vec<Entity> {
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|e| {
            let value = str_field(e, &["value", "name", "label", "id"])?;
            Some(Entity {
                value,
                entity_type: str_field(e, &["type"]).unwrap_or_else(|| "UNKNOWN".to_string()),
                context: str_field(e, &["context"]),
                confidence: confidence_field(e),
            })
        })
        .collect()
}

/// Salvage for models that answer with a list of per-document summaries
/// instead of a graph: each headline becomes a HEADLINE entity with the
/// summary text as its context.
fn collect_summary_entities(items: Option<&Vec<Value>>) -> Vec<Entity> {
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|s| {
            let value = str_field(s, &["Headline", "headline"])?;
            Some(Entity {
                value,
                entity_type: "HEADLINE".to_string(),
                context: str_field(s, &["Summary", "summary"]),
                confidence: 1.0,
            })
        })
        .collect()
}

fn collect_relations(items: Option<&Vec<Value>>) -> Vec<Relation> {
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|r| {
            let source = str_field(r, &["source"])?;
            let target = str_field(r, &["target"])?;
            Some(Relation {
                source,
                target,
                relation_type: str_field(r, &["type", "label", "relation"])
                    .unwrap_or_else(|| "RELATED_TO".to_string()),
                confidence: confidence_field(r),
            })
        })
        .collect()
}

fn collect_anomalies(items: Option<&Vec<Value>>) -> Vec<Anomaly> {
    let Some(items) = items else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|a| {
            let description = str_field(a, &["description"])?;
            let related_entities = a["related_entities"]
                .as_array()
                .map(|ents| {
                    ents.iter()
                        .filter_map(|e| e.as_str())
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            Some(Anomaly {
                description,
                severity: Severity::parse_lenient(a["severity"].as_str().unwrap_or("")),
                related_entities,
                potential_impact: str_field(a, &["potential_impact"]),
            })
        })
        .collect()
}

/// One node per distinct entity value (first occurrence wins), one edge per
/// relation whose endpoints both resolved to nodes. Dangling relations are
/// dropped here, never errored.
fn derive_graph(entities: &[Entity], relations: &[Relation]) -> Graph {
    let mut node_ids: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::new();

    for entity in entities {
        if node_ids.insert(entity.value.as_str()) {
            nodes.push(GraphNode {
                id: entity.value.clone(),
                label: entity.value.clone(),
                node_type: entity.entity_type.clone(),
                confidence: entity.confidence,
            });
        }
    }

    let edges = relations
        .iter()
        .filter(|r| node_ids.contains(r.source.as_str()) && node_ids.contains(r.target.as_str()))
        .map(|r| GraphEdge {
            source: r.source.clone(),
            target: r.target.clone(),
            label: r.relation_type.clone(),
            confidence: r.confidence,
        })
        .collect();

    Graph { nodes, edges }
}

/// First non-empty string under any of the given keys, trimmed.
fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        value[*k]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn confidence_field(value: &Value) -> f32 {
    value["confidence"]
        .as_f64()
        .map(|c| c as f32)
        .unwrap_or(DEFAULT_CONFIDENCE)
        .clamp(0.0, 1.0)
}
