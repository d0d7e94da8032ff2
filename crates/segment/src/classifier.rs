/// Incident-type taxonomy: an ordered list of (type, keyword phrases).
/// Order matters, it is the tie-break for the frequency vote. The taxonomy
/// is plain data so new types are a table edit, not a code change.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    types: Vec<(String, Vec<String>)>,
}

pub const FALLBACK_TYPE: &str = "OTHER";

impl Taxonomy {
    pub fn new(types: Vec<(String, Vec<String>)>) -> Self {
        Self { types }
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|(t, _)| t.as_str())
    }
}

impl Default for Taxonomy {
    fn default() -> Self {
        let table: &[(&str, &[&str])] = &[
            ("THEFT", &["theft", "stolen", "robbery", "burglary", "shoplifting"]),
            ("DRUG_TRAFFICKING", &["drug", "narcotics", "trafficking", "cartel"]),
            ("FRAUD", &["fraud", "scam", "phishing", "embezzlement"]),
            ("GANG_ACTIVITY", &["gang", "violence", "shooting"]),
            ("CYBERCRIME", &["hacking", "malware", "ransomware", "data breach"]),
        ];
        Self::new(
            table
                .iter()
                .map(|(t, kws)| {
                    (t.to_string(), kws.iter().map(|k| k.to_string()).collect())
                })
                .collect(),
        )
    }
}

/// Frequency vote over content lines: a type scores one point per line
/// containing any of its keyword phrases (case-insensitive substring).
/// Highest count wins, ties go to the type declared first, an all-zero
/// vote falls back to `OTHER`. No smoothing, no length normalization.
pub fn classify(content: &[String], taxonomy: &Taxonomy) -> String {
    let lowered: Vec<String> = content.iter().map(|l| l.to_lowercase()).collect();

    let mut best: Option<(&str, usize)> = None;
    for (case_type, keywords) in &taxonomy.types {
        let count = lowered
            .iter()
            .filter(|line| keywords.iter().any(|kw| line.contains(kw.as_str())))
            .count();
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((case_type, count));
        }
    }

    best.map_or_else(|| FALLBACK_TYPE.to_string(), |(t, _)| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_match() {
        let taxonomy = Taxonomy::default();
        let content = lines(&["A man was arrested for fraud today."]);
        assert_eq!(classify(&content, &taxonomy), "FRAUD");
    }

    #[test]
    fn test_majority_vote() {
        let taxonomy = Taxonomy::default();
        let content = lines(&[
            "the gang operated across three states.",
            "gang members were detained.",
            "one stolen vehicle was recovered.",
        ]);
        assert_eq!(classify(&content, &taxonomy), "GANG_ACTIVITY");
    }

    #[test]
    fn test_tie_breaks_to_first_declared_type() {
        let taxonomy = Taxonomy::new(vec![
            ("ARSON".to_string(), vec!["fire".to_string()]),
            ("VANDALISM".to_string(), vec!["graffiti".to_string()]),
        ]);
        let content = lines(&["a fire was set near the bridge.", "graffiti covered the wall."]);
        assert_eq!(classify(&content, &taxonomy), "ARSON");
    }

    #[test]
    fn test_no_match_falls_back_to_other() {
        let taxonomy = Taxonomy::default();
        let content = lines(&["a quiet afternoon at the market."]);
        assert_eq!(classify(&content, &taxonomy), "OTHER");
    }

    #[test]
    fn test_case_insensitive_substring_match() {
        let taxonomy = Taxonomy::default();
        let content = lines(&["RANSOMWARE crippled the hospital network."]);
        assert_eq!(classify(&content, &taxonomy), "CYBERCRIME");
    }
}
