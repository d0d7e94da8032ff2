pub mod embeddings;
pub mod retriever;
pub mod seed;
pub mod store;

pub use embeddings::EmbeddingClient;
pub use retriever::{RetrievedCase, SimilarCaseRetriever};
pub use store::{entry_key, CaseCorpus, CorpusHit, VectorCorpus};
