use corpus::RetrievedCase;

/// Build the extraction prompt for one case. Retrieved similar cases, when
/// any exist, ride along as grounding examples of the expected output.
pub fn build_extraction_prompt(
    headline: &str,
    content: &[String],
    similar: &[RetrievedCase],
) -> String {
    let mut prompt = String::from(
        "Analyze the following investigative case text and build a relationship network. \
         Identify entities (persons, organizations, emails, phone numbers, locations, tools, \
         activities), relationships between them, and anomalies worth an investigator's \
         attention.\n\n\
         Respond with a single JSON object of this shape:\n\
         {\n\
           \"entities\": [{\"value\": \"...\", \"type\": \"PERSON\", \"context\": \"...\", \"confidence\": 0.9}],\n\
           \"relations\": [{\"source\": \"...\", \"target\": \"...\", \"type\": \"CONTACTED\", \"confidence\": 0.8}],\n\
           \"anomalies\": [{\"description\": \"...\", \"severity\": \"HIGH\", \"related_entities\": [\"...\"], \"potential_impact\": \"...\"}]\n\
         }\n\n\
         Rules: relation source and target must be entity values from the entities list; \
         severity is LOW, MEDIUM or HIGH; confidence is between 0 and 1; \
         return only the JSON object, no commentary.\n",
    );

    if !headline.is_empty() {
        prompt.push_str("\nHeadline: ");
        prompt.push_str(headline);
        prompt.push('\n');
    }

    prompt.push_str("\nCase text:\n");
    for line in content {
        prompt.push_str(line);
        prompt.push('\n');
    }

    if !similar.is_empty() {
        prompt.push_str("\nAnalyses of similar past cases, for reference only:\n");
        for (i, case) in similar.iter().enumerate() {
            prompt.push_str(&format!(
                "[Similar case {} | {} | similarity {:.2}]\n{}\n",
                i + 1,
                case.case_type,
                case.similarity_score,
                case.analysis
            ));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_case_text_and_headline() {
        let prompt = build_extraction_prompt(
            "Bank Fraud Ring Busted",
            &["A man was arrested for fraud today.".to_string()],
            &[],
        );

        assert!(prompt.contains("Bank Fraud Ring Busted"));
        assert!(prompt.contains("A man was arrested for fraud today."));
        assert!(!prompt.contains("Similar case"));
    }

    #[test]
    fn test_prompt_includes_similar_case_context() {
        let similar = vec![RetrievedCase {
            case_type: "FRAUD".to_string(),
            content: "an earlier phishing case".to_string(),
            analysis: r#"{"entities":[]}"#.to_string(),
            similarity_score: 0.87,
        }];
        let prompt = build_extraction_prompt("", &["case text".to_string()], &similar);

        assert!(prompt.contains("[Similar case 1 | FRAUD | similarity 0.87]"));
        assert!(prompt.contains(r#"{"entities":[]}"#));
    }
}
