pub mod case;
pub mod chunker;
pub mod classifier;
pub mod segmenter;

pub use case::Case;
pub use chunker::{Chunker, ChunkerConfig};
pub use classifier::{classify, Taxonomy, FALLBACK_TYPE};
pub use segmenter::{is_headline, segment_document, segment_page, PendingHeadline, SegmentError};

/// Segment a document and classify every resulting case in one pass.
pub fn segment_and_classify(
    pages: &[Vec<String>],
    taxonomy: &Taxonomy,
) -> Result<Vec<Case>, SegmentError> {
    let mut cases = segment_document(pages)?;
    for case in &mut cases {
        case.case_type = classify(&case.content, taxonomy);
    }
    Ok(cases)
}
