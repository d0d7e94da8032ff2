pub mod llm;
pub mod parser;
pub mod prompt;
pub mod repair;
pub mod schema;

pub use llm::OllamaClient;
pub use parser::parse_response;
pub use repair::ParseError;
pub use schema::{Anomaly, CaseAnalysis, Entity, Graph, GraphEdge, GraphNode, Relation, Severity};

use async_trait::async_trait;
use corpus::RetrievedCase;
use tracing::warn;

/// Seam for the generation step so pipelines can run against a scripted
/// analyzer in tests.
#[async_trait]
pub trait CaseAnalyzer: Send + Sync {
    /// `None` means extraction failed for this case after every fallback;
    /// the caller records a null analysis and moves on.
    async fn analyze_case(
        &self,
        headline: &str,
        content: &[String],
        similar: &[RetrievedCase],
    ) -> Option<CaseAnalysis>;
}

/// Orchestrates one extraction attempt: build the prompt, walk the model
/// fallback list, parse the first non-empty answer. Exhausting the list
/// yields `None` (null analysis), never an error, so one stubborn case
/// cannot take its batch down.
pub struct Extractor {
    client: OllamaClient,
    models: Vec<String>,
}

impl Extractor {
    pub fn new(client: OllamaClient, models: Vec<String>) -> Self {
        Self { client, models }
    }
}

#[async_trait]
impl CaseAnalyzer for Extractor {
    async fn analyze_case(
        &self,
        headline: &str,
        content: &[String],
        similar: &[RetrievedCase],
    ) -> Option<CaseAnalysis> {
        let prompt = prompt::build_extraction_prompt(headline, content, similar);

        for model in &self.models {
            let raw = match self.client.chat(model, &prompt).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(model = %model, error = %e, "Generation failed, trying next model");
                    continue;
                }
            };

            if raw.trim().is_empty() {
                warn!(model = %model, "Empty generation output, trying next model");
                continue;
            }

            match parser::parse_response(&raw) {
                Ok(analysis) => return Some(analysis),
                Err(e) => {
                    let snippet: String = raw.chars().take(200).collect();
                    warn!(model = %model, error = %e, snippet, "Unparseable generation output, trying next model");
                }
            }
        }

        warn!(models = ?self.models, "All models exhausted for case, leaving analysis null");
        None
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(
            OllamaClient::default(),
            vec!["openhermes:latest".to_string(), "mistral:instruct".to_string()],
        )
    }
}
