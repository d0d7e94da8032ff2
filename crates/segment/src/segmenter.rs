use crate::case::Case;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("no case content could be extracted from the document")]
    NoContent,
}

/// Words exempt from the capitalization check in headline detection.
const SMALL_WORDS: &[&str] = &[
    "a", "an", "the", "and", "but", "or", "nor", "for", "in", "on", "at", "to", "of", "by",
    "with", "from", "as", "is", "up",
];

/// Lines opening with these are treated as running prose, never headlines.
const SENTENCE_STARTERS: &[&str] = &["A ", "The ", "In ", "And ", "But "];

/// A headline cut short by a page break: 1-3 words at the bottom of a page
/// with no body under it. Carried into the next page's segmentation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingHeadline(pub Option<String>);

/// Line-shape heuristic for headline detection. A headline is title-cased
/// prose with none of the punctuation that marks quotes, contacts, or
/// asides.
pub fn is_headline(line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    if line.contains('"')
        || line.contains('\u{201C}')
        || line.contains('\u{201D}')
        || line.contains('\'')
        || line.contains('\u{2019}')
        || line.contains('@')
        || line.contains("+1-")
        || line.contains('(')
        || line.contains(')')
    {
        return false;
    }
    if SENTENCE_STARTERS.iter().any(|s| line.starts_with(s)) {
        return false;
    }
    line.split_whitespace().all(|word| {
        if SMALL_WORDS.contains(&word.to_lowercase().as_str()) {
            return true;
        }
        match word.chars().find(|c| c.is_alphabetic()) {
            Some(first) => first.is_uppercase(),
            // Numbers, currency amounts, etc. do not disqualify a headline.
            None => true,
        }
    })
}

/// Segment one page of lines into cases.
///
/// Pure function: all cross-page state travels through `carry`. The rule
/// for a pending headline from the previous page is: it is space-joined in
/// front of this page's first headline run; if this page's first case
/// closes without a headline run of its own, the pending text is promoted
/// to that case's headline unchanged. A trailing headline run of 1-3 words
/// with no content under it is deferred into the returned carry instead of
/// being emitted.
pub fn segment_page(
    page_number: usize,
    lines: &[String],
    carry: PendingHeadline,
) -> (Vec<Case>, PendingHeadline) {
    let mut cases = Vec::new();
    let mut headline = String::new();
    let mut content: Vec<String> = Vec::new();
    let mut in_headline_run = false;
    let mut pending = carry.0;

    let mut close_case = |headline: &mut String, content: &mut Vec<String>, pending: &mut Option<String>| {
        // Promotion only happens when there is body text to attach;
        // otherwise an unclaimed pending headline would spawn an empty case.
        if headline.is_empty() && !content.is_empty() {
            if let Some(p) = pending.take() {
                *headline = p;
            }
        }
        if !headline.is_empty() || !content.is_empty() {
            cases.push(Case::new(
                std::mem::take(headline),
                std::mem::take(content),
                page_number,
            ));
        }
    };

    for raw in lines {
        let line = raw.trim();

        if line.is_empty() {
            close_case(&mut headline, &mut content, &mut pending);
            in_headline_run = false;
            continue;
        }

        if is_headline(line) {
            if in_headline_run {
                headline.push(' ');
                headline.push_str(line);
            } else {
                close_case(&mut headline, &mut content, &mut pending);
                headline = match pending.take() {
                    Some(p) => format!("{} {}", p, line),
                    None => line.to_string(),
                };
                in_headline_run = true;
            }
        } else {
            in_headline_run = false;
            content.push(line.to_string());
        }
    }

    // Page ended mid-headline: a short run with no body reads as the top
    // half of a headline split by the page break.
    if !headline.is_empty() && content.is_empty() && headline.split_whitespace().count() <= 3 {
        return (cases, PendingHeadline(Some(headline)));
    }
    close_case(&mut headline, &mut content, &mut pending);

    (cases, PendingHeadline(pending))
}

/// Segment a whole document, one `Vec<String>` of lines per page.
///
/// Pages with no extractable text contribute nothing. A pending headline
/// left over at the end of the document is emitted as a final body-less
/// case rather than dropped. Non-empty input that produces no case at all
/// is an explicit failure, never a silent empty result.
pub fn segment_document(pages: &[Vec<String>]) -> Result<Vec<Case>, SegmentError> {
    let mut cases = Vec::new();
    let mut carry = PendingHeadline::default();

    for (i, page_lines) in pages.iter().enumerate() {
        let (page_cases, next_carry) = segment_page(i + 1, page_lines, carry);
        cases.extend(page_cases);
        carry = next_carry;
    }

    if let Some(leftover) = carry.0 {
        cases.push(Case::new(leftover, Vec::new(), pages.len()));
    }

    if cases.is_empty() && !pages.is_empty() {
        return Err(SegmentError::NoContent);
    }

    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_headline_detection() {
        assert!(is_headline("Bank Fraud Ring Busted"));
        assert!(is_headline("Police Seize Shipment of Narcotics"));
        assert!(is_headline("FBI Raids Warehouse"));
        assert!(!is_headline("A man was arrested for fraud today."));
        assert!(!is_headline("The suspect fled the scene."));
        assert!(!is_headline("\"I lost everything,\" she said"));
        assert!(!is_headline("Contact us at tips@police.gov"));
        assert!(!is_headline("Call +1-800-555-0199 with information"));
        assert!(!is_headline("Suspect Arrested (Again)"));
        assert!(!is_headline("Mayor's Office Raided Overnight"));
        assert!(!is_headline("Mayor\u{2019}s Office Raided Overnight"));
        assert!(!is_headline(""));
    }

    #[test]
    fn test_small_words_exempt_from_capitalization() {
        assert!(is_headline("Ring of Thieves Broken up by Police"));
    }

    #[test]
    fn test_single_case_with_headline() {
        let page = lines(&["Bank Fraud Ring Busted", "A man was arrested for fraud today."]);
        let (cases, carry) = segment_page(1, &page, PendingHeadline::default());

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].headline, "Bank Fraud Ring Busted");
        assert_eq!(cases[0].content, vec!["A man was arrested for fraud today."]);
        assert_eq!(carry, PendingHeadline::default());
    }

    #[test]
    fn test_no_headline_yields_single_case_with_all_content() {
        let page = lines(&[
            "it was a quiet night in the precinct.",
            "nothing unusual was reported.",
        ]);
        let cases = segment_document(&[page]).unwrap();

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].headline, "");
        assert_eq!(cases[0].content.len(), 2);
    }

    #[test]
    fn test_blank_line_closes_case() {
        let page = lines(&[
            "Warehouse Robbery Under Investigation",
            "items worth thousands were stolen.",
            "",
            "Gang Violence Erupts Downtown",
            "two groups clashed near the station.",
        ]);
        let (cases, _) = segment_page(1, &page, PendingHeadline::default());

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].headline, "Warehouse Robbery Under Investigation");
        assert_eq!(cases[1].headline, "Gang Violence Erupts Downtown");
    }

    #[test]
    fn test_new_headline_closes_previous_case() {
        let page = lines(&[
            "Warehouse Robbery Under Investigation",
            "items worth thousands were stolen.",
            "Gang Violence Erupts Downtown",
            "two groups clashed near the station.",
        ]);
        let (cases, _) = segment_page(1, &page, PendingHeadline::default());

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].content, vec!["two groups clashed near the station."]);
    }

    #[test]
    fn test_consecutive_headline_lines_join() {
        let page = lines(&[
            "Massive Phishing Operation",
            "Dismantled by Federal Agents",
            "victims reported losses in the millions.",
        ]);
        let (cases, _) = segment_page(1, &page, PendingHeadline::default());

        assert_eq!(cases.len(), 1);
        assert_eq!(
            cases[0].headline,
            "Massive Phishing Operation Dismantled by Federal Agents"
        );
    }

    #[test]
    fn test_short_trailing_headline_is_deferred() {
        let page = lines(&["suspects remain at large.", "Crime Ring Exposed"]);
        let (cases, carry) = segment_page(1, &page, PendingHeadline::default());

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].headline, "");
        assert_eq!(carry, PendingHeadline(Some("Crime Ring Exposed".to_string())));
    }

    #[test]
    fn test_pending_headline_joins_next_page_headline() {
        let page1 = lines(&["Crime Ring"]);
        let page2 = lines(&["Exposed by Detectives", "arrests were made at dawn."]);

        let cases = segment_document(&[page1, page2]).unwrap();

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].headline, "Crime Ring Exposed by Detectives");
        assert_eq!(cases[0].page_number, 2);
    }

    #[test]
    fn test_pending_headline_promoted_when_next_page_has_no_headline() {
        let page1 = lines(&["Crime Ring Exposed"]);
        let page2 = lines(&["arrests were made at dawn."]);

        let cases = segment_document(&[page1, page2]).unwrap();

        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].headline, "Crime Ring Exposed");
        assert_eq!(cases[0].content, vec!["arrests were made at dawn."]);
    }

    #[test]
    fn test_blank_only_document_is_no_content() {
        let pages = vec![lines(&["", "  "]), lines(&[])];
        let err = segment_document(&pages).unwrap_err();
        assert!(matches!(err, SegmentError::NoContent));
    }

    #[test]
    fn test_zero_pages_yield_no_cases() {
        let cases = segment_document(&[]).unwrap();
        assert!(cases.is_empty());
    }

    #[test]
    fn test_trailing_pending_headline_becomes_final_case() {
        let pages = vec![lines(&["story text for the first case.", "", "Final Brief"])];
        let cases = segment_document(&pages).unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].headline, "Final Brief");
        assert!(cases[1].content.is_empty());
    }
}
