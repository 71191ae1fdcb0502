use crate::config::CategoryRule;

/// Label reported when no category group matches.
pub const NO_CATEGORY: &str = "N/A";

/// Multi-label tagger over an ordered table of keyword groups. Every group
/// with at least one keyword found in the line contributes its label.
#[derive(Debug, Clone)]
pub struct CategoryClassifier {
    rules: Vec<CategoryRule>,
}

impl CategoryClassifier {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let rules = rules
            .iter()
            .map(|rule| CategoryRule {
                label: rule.label.clone(),
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// Matched labels in table order.
    pub fn labels<'a>(&'a self, line: &str) -> Vec<&'a str> {
        let lower = line.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| rule.keywords.iter().any(|word| lower.contains(word.as_str())))
            .map(|rule| rule.label.as_str())
            .collect()
    }

    /// Comma-joined labels, or [`NO_CATEGORY`] when nothing matched.
    pub fn classify(&self, line: &str) -> String {
        let labels = self.labels(line);
        if labels.is_empty() {
            NO_CATEGORY.to_string()
        } else {
            labels.join(",")
        }
    }
}
