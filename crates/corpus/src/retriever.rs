use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::store::CaseCorpus;
use segment::Chunker;

/// How many characters of a hit's content form its uniqueness key when
/// merging results across chunk queries.
const DEDUP_PREFIX_CHARS: usize = 100;

/// Over-fetch factor per chunk query, leaving room for deduplication.
const OVER_FETCH: usize = 2;

/// A previously analyzed case pulled back as grounding context.
/// Ephemeral: derived per query, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedCase {
    pub case_type: String,
    pub content: String,
    pub analysis: String,
    /// `1 - distance` under the store's metric, clamped to [0, 1].
    pub similarity_score: f32,
}

/// Chunks a candidate case and queries the corpus once per chunk, merging
/// and ranking the hits. Never fails: store trouble already degrades to
/// empty hit lists inside the corpus.
pub struct SimilarCaseRetriever {
    corpus: Arc<dyn CaseCorpus>,
    chunker: Chunker,
}

impl SimilarCaseRetriever {
    pub fn new(corpus: Arc<dyn CaseCorpus>, chunker: Chunker) -> Self {
        Self { corpus, chunker }
    }

    pub async fn get_similar(
        &self,
        content: &[String],
        case_type: &str,
        n_results: usize,
    ) -> Vec<RetrievedCase> {
        if n_results == 0 {
            return Vec::new();
        }

        let joined = content.join("\n");
        let chunks = self.chunker.chunk(&joined);
        if chunks.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<RetrievedCase> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let hits = self
                .corpus
                .query(chunk, case_type, n_results * OVER_FETCH)
                .await;

            for hit in hits {
                let similarity = (1.0 - hit.distance).clamp(0.0, 1.0);
                let key: String = hit.content.chars().take(DEDUP_PREFIX_CHARS).collect();

                match seen.get(&key) {
                    Some(&idx) => {
                        // Same entry reached from another chunk: keep the
                        // best score observed for it.
                        if similarity > results[idx].similarity_score {
                            results[idx].similarity_score = similarity;
                        }
                    }
                    None => {
                        seen.insert(key, results.len());
                        results.push(RetrievedCase {
                            case_type: hit.case_type,
                            content: hit.content,
                            analysis: hit.analysis,
                            similarity_score: similarity,
                        });
                    }
                }
            }
        }

        // Stable sort: equal scores keep their original retrieval order.
        results.sort_by(|a, b| {
            b.similarity_score
                .partial_cmp(&a.similarity_score)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(n_results);

        debug!(
            case_type,
            chunks = chunks.len(),
            results = results.len(),
            "Similar-case retrieval complete"
        );

        results
    }
}
