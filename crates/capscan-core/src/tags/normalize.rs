use crate::config::TagConfig;

/// Result of cleaning one caption line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCaption {
    pub cleaned: String,
    pub is_sensitive: bool,
}

impl NormalizedCaption {
    /// Number of characters in the cleaned caption.
    pub fn cleaned_len(&self) -> usize {
        self.cleaned.chars().count()
    }

    /// Lower-cased, non-empty tokens of the cleaned caption.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.cleaned
            .split(',')
            .map(|tag| tag.trim().to_lowercase())
            .filter(|tag| !tag.is_empty())
    }
}

/// Removes category-marker tokens from a caption line and appends the
/// sentinel tag when the original line carried sensitive tokens.
#[derive(Debug, Clone)]
pub struct CaptionNormalizer {
    sentinel: String,
    cleanup_keywords: Vec<String>,
    sensitive_keywords: Vec<String>,
}

impl CaptionNormalizer {
    pub fn new(tags: &TagConfig) -> Self {
        Self {
            sentinel: tags.sentinel.trim().to_string(),
            cleanup_keywords: tags.cleanup_keywords(),
            sensitive_keywords: tags.sensitive_keywords(),
        }
    }

    pub fn normalize(&self, line: &str) -> NormalizedCaption {
        let tokens: Vec<&str> = line.trim().split(',').map(str::trim).collect();
        let sentinel_lower = self.sentinel.to_lowercase();

        // Judged on the original tokens, before any are cleaned away.
        let is_sensitive = tokens.iter().any(|token| {
            let lower = token.to_lowercase();
            self.sensitive_keywords.iter().any(|word| lower.contains(word.as_str()))
        });

        let mut kept: Vec<&str> = Vec::with_capacity(tokens.len());
        for &token in &tokens {
            if token.is_empty() {
                continue;
            }
            let lower = token.to_lowercase();
            if lower == sentinel_lower {
                kept.push(token);
                continue;
            }
            if !self.cleanup_keywords.iter().any(|word| lower.contains(word.as_str())) {
                kept.push(token);
            }
        }

        let has_sentinel = kept.iter().any(|token| token.to_lowercase() == sentinel_lower);
        if is_sensitive && !has_sentinel && !self.sentinel.is_empty() {
            kept.push(self.sentinel.as_str());
        }

        NormalizedCaption {
            cleaned: kept.join(", "),
            is_sensitive,
        }
    }
}
