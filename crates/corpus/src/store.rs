use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{info, warn};

use crate::embeddings::EmbeddingClient;
use crate::seed;

/// One nearest-neighbor match from the corpus. `distance` is the store's
/// cosine distance; callers derive similarity as `1 - distance`.
#[derive(Debug, Clone)]
pub struct CorpusHit {
    pub content: String,
    pub case_type: String,
    pub analysis: String,
    pub distance: f32,
}

/// The persistent, similarity-searchable collection of past case chunks.
///
/// Retrieval is best-effort context, never required for correctness, so
/// `query` and `add` are fail-soft: store trouble is logged and produces
/// an empty result or a dropped write, never an error the caller sees.
#[async_trait]
pub trait CaseCorpus: Send + Sync {
    /// Idempotently ensure the backing collection exists, seeding it with
    /// example cases when it is first created.
    async fn initialize(&self) -> Result<()>;

    /// Append one chunked case with its type and serialized analysis.
    async fn add(&self, chunks: &[String], case_type: &str, analysis: &str);

    /// Up to `k` nearest entries of the given type.
    async fn query(&self, text: &str, case_type: &str, k: usize) -> Vec<CorpusHit>;
}

/// Store-unique key for one corpus entry: a digest of the chunk text with
/// the chunk index appended, so two chunks with identical text still get
/// distinct keys.
pub fn entry_key(chunk_text: &str, chunk_index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chunk_text.as_bytes());
    let digest = hasher.finalize();
    format!("{}-{}", hex::encode(&digest[..16]), chunk_index)
}

/// Qdrant-backed corpus, spoken to over its REST API.
pub struct VectorCorpus {
    base_url: String,
    collection: String,
    client: reqwest::Client,
    embedder: EmbeddingClient,
}

#[derive(Deserialize)]
struct CollectionInfo {
    result: CollectionResult,
}

#[derive(Deserialize)]
struct CollectionResult {
    collections: Vec<Collection>,
}

#[derive(Deserialize)]
struct Collection {
    name: String,
}

#[derive(Serialize)]
struct UpsertPoints {
    points: Vec<Point>,
}

#[derive(Serialize)]
struct Point {
    id: u64,
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

impl VectorCorpus {
    pub fn new(base_url: String, collection: String, embedder: EmbeddingClient) -> Self {
        Self {
            base_url,
            collection,
            client: reqwest::Client::new(),
            embedder,
        }
    }

    async fn collection_exists(&self) -> Result<bool> {
        let url = format!("{}/collections", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to list collections: {}", response.status());
        }

        let info: CollectionInfo = response.json().await?;
        Ok(info.result.collections.iter().any(|c| c.name == self.collection))
    }

    async fn create_collection(&self) -> Result<()> {
        let dimension = self
            .embedder
            .dimension()
            .await
            .context("Failed to probe embedding dimension")?;

        let url = format!("{}/collections/{}", self.base_url, self.collection);
        let body = json!({
            "vectors": { "size": dimension, "distance": "Cosine" }
        });

        let response = self.client.put(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to create collection: {}", error_text);
        }

        info!(collection = %self.collection, dimension, "Created corpus collection");
        Ok(())
    }

    /// Fallible write path; the trait method wraps this with log-and-drop.
    async fn try_add(&self, chunks: &[String], case_type: &str, analysis: &str) -> Result<()> {
        let total_chunks = chunks.len();
        let mut points = Vec::with_capacity(total_chunks);

        for (chunk_index, chunk) in chunks.iter().enumerate() {
            let embedding = self
                .embedder
                .embed(chunk)
                .await
                .context("Failed to embed corpus chunk")?;

            let key = entry_key(chunk, chunk_index);

            let mut payload = HashMap::new();
            payload.insert("entry_key".to_string(), json!(key));
            payload.insert("content".to_string(), json!(chunk));
            payload.insert("case_type".to_string(), json!(case_type));
            payload.insert("chunk_index".to_string(), json!(chunk_index));
            payload.insert("total_chunks".to_string(), json!(total_chunks));
            payload.insert("analysis".to_string(), json!(analysis));

            points.push(Point {
                id: point_id(&key),
                vector: embedding,
                payload,
            });
        }

        let url = format!("{}/collections/{}/points", self.base_url, self.collection);
        let response = self
            .client
            .put(&url)
            .json(&UpsertPoints { points })
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            anyhow::bail!("Failed to upsert corpus entries: {}", error_text);
        }

        Ok(())
    }

    async fn try_query(&self, text: &str, case_type: &str, k: usize) -> Result<Vec<CorpusHit>> {
        let embedding = self
            .embedder
            .embed(text)
            .await
            .context("Failed to embed query text")?;

        let url = format!(
            "{}/collections/{}/points/search",
            self.base_url, self.collection
        );
        let body = json!({
            "vector": embedding,
            "limit": k,
            "with_payload": true,
            "filter": {
                "must": [{ "key": "case_type", "match": { "value": case_type } }]
            }
        });

        let response = self.client.post(&url).json(&body).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Corpus search failed: {}", error_text);
        }

        let result: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse corpus search response")?;

        let points = result["result"]
            .as_array()
            .context("Invalid corpus search response format")?;

        let mut hits = Vec::new();
        for point in points {
            // Cosine score from the store is a similarity; hits carry the
            // distance form of it.
            let score = point["score"].as_f64().unwrap_or(0.0) as f32;
            let payload = &point["payload"];

            hits.push(CorpusHit {
                content: payload["content"].as_str().unwrap_or("").to_string(),
                case_type: payload["case_type"].as_str().unwrap_or("").to_string(),
                analysis: payload["analysis"].as_str().unwrap_or("").to_string(),
                distance: 1.0 - score,
            });
        }

        Ok(hits)
    }
}

#[async_trait]
impl CaseCorpus for VectorCorpus {
    async fn initialize(&self) -> Result<()> {
        if self.collection_exists().await? {
            info!(collection = %self.collection, "Corpus collection already exists");
            return Ok(());
        }

        self.create_collection().await?;

        for seed_case in seed::seed_cases() {
            self.add(&seed_case.chunks(), &seed_case.case_type, &seed_case.analysis)
                .await;
        }
        info!(collection = %self.collection, "Seeded corpus collection");

        Ok(())
    }

    async fn add(&self, chunks: &[String], case_type: &str, analysis: &str) {
        if chunks.is_empty() {
            return;
        }
        if let Err(e) = self.try_add(chunks, case_type, analysis).await {
            warn!(case_type, error = %e, "Dropping corpus write");
        }
    }

    async fn query(&self, text: &str, case_type: &str, k: usize) -> Vec<CorpusHit> {
        match self.try_query(text, case_type, k).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(case_type, error = %e, "Corpus query failed, returning no context");
                Vec::new()
            }
        }
    }
}

/// Numeric point id for the store, taken from the leading bytes of a
/// digest over the entry key. Stays identical across toolchain and
/// process restarts, so re-adding an entry upserts instead of duplicating.
fn point_id(key: &str) -> u64 {
    let digest = Sha256::digest(key.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_keys_distinct_for_identical_text() {
        let a = entry_key("the same chunk text", 0);
        let b = entry_key("the same chunk text", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_key_is_stable() {
        assert_eq!(entry_key("chunk", 2), entry_key("chunk", 2));
    }

    #[test]
    fn test_point_id_pinned_to_digest() {
        // First 8 bytes of sha256("abc"), big-endian. A point id must not
        // drift between builds or the store loses upsert identity.
        assert_eq!(point_id("abc"), 0xba78_16bf_8f01_cfea);
    }

    #[test]
    fn test_point_ids_distinct_per_entry_key() {
        let a = point_id(&entry_key("the same chunk text", 0));
        let b = point_id(&entry_key("the same chunk text", 1));
        assert_ne!(a, b);
    }

    #[test]
    fn test_entry_key_shape() {
        let key = entry_key("chunk", 3);
        let (digest, index) = key.rsplit_once('-').unwrap();
        assert_eq!(digest.len(), 32);
        assert_eq!(index, "3");
    }
}
