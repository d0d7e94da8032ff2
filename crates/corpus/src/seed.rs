use segment::{Chunker, ChunkerConfig};
use serde_json::json;

/// A pre-analyzed example case used to seed a freshly created collection,
/// so the very first retrievals have something to ground on.
pub struct SeedCase {
    pub case_type: String,
    pub text: String,
    pub analysis: String,
}

impl SeedCase {
    fn new(case_type: &str, text: &str, analysis: serde_json::Value) -> Self {
        Self {
            case_type: case_type.to_string(),
            text: text.to_string(),
            analysis: analysis.to_string(),
        }
    }

    pub fn chunks(&self) -> Vec<String> {
        Chunker::new(ChunkerConfig::default()).chunk(&self.text)
    }
}

pub fn seed_cases() -> Vec<SeedCase> {
    vec![
        SeedCase::new(
            "FRAUD",
            "A large-scale phishing operation was dismantled after victims reported \
             emails from secure@banking-alerts.com directing them to call +1-800-123-4567. \
             Investigators traced the number to a call center operated by Marcus Webb, \
             who posed as a bank representative to collect account credentials. \
             Losses across forty-one victims exceeded two million dollars.",
            json!({
                "entities": [
                    {"value": "Marcus Webb", "type": "PERSON", "confidence": 0.95},
                    {"value": "secure@banking-alerts.com", "type": "EMAIL", "confidence": 0.95},
                    {"value": "+1-800-123-4567", "type": "PHONE", "confidence": 0.9}
                ],
                "relations": [
                    {"source": "Marcus Webb", "target": "+1-800-123-4567",
                     "type": "OPERATED", "confidence": 0.9},
                    {"source": "secure@banking-alerts.com", "target": "+1-800-123-4567",
                     "type": "DIRECTED_TO", "confidence": 0.85}
                ],
                "anomalies": [
                    {"description": "Single call center behind multiple spoofed bank domains",
                     "severity": "HIGH",
                     "related_entities": ["secure@banking-alerts.com"]}
                ]
            }),
        ),
        SeedCase::new(
            "THEFT",
            "Police recovered three crates of stolen electronics from a warehouse on \
             Harbor Road. Surveillance footage placed Dana Ortiz at the loading dock \
             on the night of the robbery. A second suspect drove a rented box truck \
             later found abandoned near the rail yard.",
            json!({
                "entities": [
                    {"value": "Dana Ortiz", "type": "PERSON", "confidence": 0.9},
                    {"value": "Harbor Road warehouse", "type": "LOCATION", "confidence": 0.85},
                    {"value": "rented box truck", "type": "VEHICLE", "confidence": 0.8}
                ],
                "relations": [
                    {"source": "Dana Ortiz", "target": "Harbor Road warehouse",
                     "type": "SEEN_AT", "confidence": 0.85}
                ],
                "anomalies": [
                    {"description": "Truck rented under a name with no other records",
                     "severity": "MEDIUM",
                     "related_entities": ["rented box truck"]}
                ]
            }),
        ),
        SeedCase::new(
            "DRUG_TRAFFICKING",
            "Customs officers intercepted a shipping container holding narcotics \
             concealed in machine parts. Manifests listed Vantage Freight Ltd as the \
             consignee. Phone records connected the company's dispatcher to Luis \
             Herrera, previously charged in a trafficking case that collapsed in 2019.",
            json!({
                "entities": [
                    {"value": "Luis Herrera", "type": "PERSON", "confidence": 0.9},
                    {"value": "Vantage Freight Ltd", "type": "ORGANIZATION", "confidence": 0.9}
                ],
                "relations": [
                    {"source": "Luis Herrera", "target": "Vantage Freight Ltd",
                     "type": "CONNECTED_TO", "confidence": 0.8}
                ],
                "anomalies": [
                    {"description": "Consignee shares an address with two dissolved shell companies",
                     "severity": "HIGH",
                     "related_entities": ["Vantage Freight Ltd"]}
                ]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_cases_are_well_formed() {
        let cases = seed_cases();
        assert!(!cases.is_empty());

        for case in &cases {
            assert!(!case.case_type.is_empty());
            assert!(!case.chunks().is_empty());
            // Every seed analysis must round-trip as JSON.
            let parsed: serde_json::Value = serde_json::from_str(&case.analysis).unwrap();
            assert!(parsed["entities"].is_array());
        }
    }
}
