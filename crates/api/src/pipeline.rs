use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use corpus::{CaseCorpus, SimilarCaseRetriever};
use extract::{CaseAnalysis, CaseAnalyzer};
use segment::{segment_and_classify, Case, Chunker, ChunkerConfig, SegmentError, Taxonomy};

#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub case_id: String,
    pub headline: String,
    pub page_number: usize,
    pub content: Vec<String>,
    /// Null when extraction failed outright for this case.
    pub ai_analysis: Option<CaseAnalysis>,
}

#[derive(Debug, Serialize)]
pub struct FileAnalysis {
    pub filename: String,
    pub cases: Vec<CaseReport>,
}

/// Per-file processing: segment, then run each case through
/// classify -> retrieve -> generate -> parse -> store-write. Cases are
/// independent and run concurrently under a semaphore bound; within a case
/// the steps are strictly sequential. A failed case reports a null
/// analysis and never takes its siblings down.
pub struct Pipeline {
    taxonomy: Taxonomy,
    retriever: Arc<SimilarCaseRetriever>,
    analyzer: Arc<dyn CaseAnalyzer>,
    corpus: Arc<dyn CaseCorpus>,
    semaphore: Arc<Semaphore>,
    n_similar: usize,
}

impl Pipeline {
    pub fn new(
        taxonomy: Taxonomy,
        retriever: Arc<SimilarCaseRetriever>,
        analyzer: Arc<dyn CaseAnalyzer>,
        corpus: Arc<dyn CaseCorpus>,
        max_concurrent_cases: usize,
        n_similar: usize,
    ) -> Self {
        Self {
            taxonomy,
            retriever,
            analyzer,
            corpus,
            semaphore: Arc::new(Semaphore::new(max_concurrent_cases.max(1))),
            n_similar,
        }
    }

    pub async fn process_file(
        &self,
        filename: &str,
        pages: &[Vec<String>],
    ) -> Result<FileAnalysis, SegmentError> {
        let cases = segment_and_classify(pages, &self.taxonomy)?;
        info!(filename, cases = cases.len(), "Segmented document");

        let mut tasks = JoinSet::new();
        for (i, case) in cases.into_iter().enumerate() {
            let retriever = Arc::clone(&self.retriever);
            let analyzer = Arc::clone(&self.analyzer);
            let corpus = Arc::clone(&self.corpus);
            let semaphore = Arc::clone(&self.semaphore);
            let n_similar = self.n_similar;
            let case_id = format!("case-{}", i + 1);

            tasks.spawn(async move {
                // Closed semaphores cannot happen here; treat failure as
                // an unbounded permit.
                let _permit = semaphore.acquire_owned().await;
                let report =
                    process_case(retriever, analyzer, corpus, n_similar, case, case_id).await;
                (i, report)
            });
        }

        let mut reports: Vec<(usize, CaseReport)> = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(indexed) => reports.push(indexed),
                Err(e) => error!(filename, error = %e, "Case task failed; sibling cases continue"),
            }
        }
        reports.sort_by_key(|(i, _)| *i);

        Ok(FileAnalysis {
            filename: filename.to_string(),
            cases: reports.into_iter().map(|(_, r)| r).collect(),
        })
    }
}

async fn process_case(
    retriever: Arc<SimilarCaseRetriever>,
    analyzer: Arc<dyn CaseAnalyzer>,
    corpus: Arc<dyn CaseCorpus>,
    n_similar: usize,
    case: Case,
    case_id: String,
) -> CaseReport {
    let similar = retriever
        .get_similar(&case.content, &case.case_type, n_similar)
        .await;

    let analysis = analyzer
        .analyze_case(&case.headline, &case.content, &similar)
        .await;

    if let Some(analysis) = &analysis {
        match serde_json::to_string(analysis) {
            Ok(json) => {
                let chunks = Chunker::new(ChunkerConfig::default()).chunk(&case.joined_content());
                // Write-back is fail-soft inside the corpus.
                corpus.add(&chunks, &case.case_type, &json).await;
            }
            Err(e) => warn!(case_id, error = %e, "Could not serialize analysis for corpus write"),
        }
    }

    CaseReport {
        case_id,
        headline: case.headline,
        page_number: case.page_number,
        content: case.content,
        ai_analysis: analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use corpus::{CorpusHit, RetrievedCase};
    use extract::Graph;
    use std::sync::Mutex;

    /// Corpus fake: empty retrieval, records every write.
    #[derive(Default)]
    struct RecordingCorpus {
        writes: Mutex<Vec<(usize, String)>>,
    }

    #[async_trait]
    impl CaseCorpus for RecordingCorpus {
        async fn initialize(&self) -> Result<()> {
            Ok(())
        }

        async fn add(&self, chunks: &[String], case_type: &str, _analysis: &str) {
            self.writes
                .lock()
                .unwrap()
                .push((chunks.len(), case_type.to_string()));
        }

        async fn query(&self, _text: &str, _case_type: &str, _k: usize) -> Vec<CorpusHit> {
            Vec::new()
        }
    }

    /// Analyzer fake: succeeds only on fraud-flavored content.
    struct FraudOnlyAnalyzer;

    #[async_trait]
    impl CaseAnalyzer for FraudOnlyAnalyzer {
        async fn analyze_case(
            &self,
            _headline: &str,
            content: &[String],
            _similar: &[RetrievedCase],
        ) -> Option<CaseAnalysis> {
            if content.iter().any(|l| l.contains("fraud")) {
                Some(CaseAnalysis {
                    entities: Vec::new(),
                    relations: Vec::new(),
                    anomalies: Vec::new(),
                    graph: Graph {
                        nodes: Vec::new(),
                        edges: Vec::new(),
                    },
                })
            } else {
                None
            }
        }
    }

    fn pipeline(corpus: Arc<RecordingCorpus>) -> Pipeline {
        let retriever = SimilarCaseRetriever::new(
            corpus.clone() as Arc<dyn CaseCorpus>,
            Chunker::new(ChunkerConfig::default()),
        );
        Pipeline::new(
            Taxonomy::default(),
            Arc::new(retriever),
            Arc::new(FraudOnlyAnalyzer),
            corpus,
            2,
            3,
        )
    }

    fn two_case_pages() -> Vec<Vec<String>> {
        vec![vec![
            "Bank Fraud Ring Busted".to_string(),
            "A man was arrested for fraud today.".to_string(),
            "".to_string(),
            "Quiet Day at the Docks Reported".to_string(),
            "nothing noteworthy happened.".to_string(),
        ]]
    }

    #[tokio::test]
    async fn test_failed_case_does_not_poison_siblings() {
        let corpus = Arc::new(RecordingCorpus::default());
        let result = pipeline(corpus).process_file("report.txt", &two_case_pages()).await.unwrap();

        assert_eq!(result.filename, "report.txt");
        assert_eq!(result.cases.len(), 2);
        assert!(result.cases[0].ai_analysis.is_some());
        assert!(result.cases[1].ai_analysis.is_none());
    }

    #[tokio::test]
    async fn test_reports_keep_segmentation_order() {
        let corpus = Arc::new(RecordingCorpus::default());
        let result = pipeline(corpus).process_file("report.txt", &two_case_pages()).await.unwrap();

        assert_eq!(result.cases[0].case_id, "case-1");
        assert_eq!(result.cases[0].headline, "Bank Fraud Ring Busted");
        assert_eq!(result.cases[1].case_id, "case-2");
    }

    #[tokio::test]
    async fn test_successful_analysis_written_back_to_corpus() {
        let corpus = Arc::new(RecordingCorpus::default());
        pipeline(corpus.clone())
            .process_file("report.txt", &two_case_pages())
            .await
            .unwrap();

        let writes = corpus.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, "FRAUD");
        assert!(writes[0].0 >= 1);
    }

    #[tokio::test]
    async fn test_empty_document_is_explicit_failure() {
        let corpus = Arc::new(RecordingCorpus::default());
        let err = pipeline(corpus)
            .process_file("empty.txt", &[vec!["".to_string()]])
            .await
            .unwrap_err();
        assert!(matches!(err, SegmentError::NoContent));
    }
}
