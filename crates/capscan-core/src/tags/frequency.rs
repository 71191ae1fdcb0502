use ahash::AHashMap;

/// Run-wide tag occurrence counts. Keys are lower-cased cleaned tags;
/// counts only ever grow.
#[derive(Debug, Default, Clone)]
pub struct TagFrequency {
    index: AHashMap<String, usize>,
    counts: Vec<(String, u64)>,
}

impl TagFrequency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: &str) {
        let key = tag.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        match self.index.get(&key) {
            Some(&slot) => self.counts[slot].1 += 1,
            None => {
                self.index.insert(key.clone(), self.counts.len());
                self.counts.push((key, 1));
            }
        }
    }

    pub fn extend<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for tag in tags {
            self.add(tag.as_ref());
        }
    }

    pub fn get(&self, tag: &str) -> u64 {
        self.index
            .get(&tag.trim().to_lowercase())
            .map(|&slot| self.counts[slot].1)
            .unwrap_or(0)
    }

    /// Number of distinct tags.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|(_, count)| count).sum()
    }

    /// Tags by descending count; equal counts keep first-seen order.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut sorted: Vec<(&str, u64)> = self
            .counts
            .iter()
            .map(|(tag, count)| (tag.as_str(), *count))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}
