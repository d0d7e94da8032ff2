use serde::{Deserialize, Serialize};

/// One segmented unit of a document: a headline plus the body lines that
/// followed it, annotated with the page it came from and, once classified,
/// an incident type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub headline: String,
    pub content: Vec<String>,
    pub case_type: String,
    pub page_number: usize,
}

impl Case {
    pub fn new(headline: String, content: Vec<String>, page_number: usize) -> Self {
        Self {
            headline,
            content,
            case_type: String::new(),
            page_number,
        }
    }

    /// Body text as a single string, the form the chunker and the prompt
    /// builder both consume.
    pub fn joined_content(&self) -> String {
        self.content.join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.headline.is_empty() && self.content.is_empty()
    }
}
