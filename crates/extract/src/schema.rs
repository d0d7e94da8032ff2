use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub value: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Lenient coercion from model output; anything unrecognized lands on
    /// the middle of the scale.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "LOW" => Severity::Low,
            "HIGH" => Severity::High,
            _ => Severity::Medium,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Anomaly {
    pub description: String,
    pub severity: Severity,
    pub related_entities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_impact: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
    pub confidence: f32,
}

/// Visualization-ready graph derived from entities and relations: one node
/// per distinct entity value, one edge per relation whose endpoints both
/// resolved to nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// The validated result of one extraction attempt. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseAnalysis {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub anomalies: Vec<Anomaly>,
    pub graph: Graph,
}
