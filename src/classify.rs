use crate::aggregate::Counts;
use crate::config::PhraseTag;

pub const BLANK: &str = "Blank";

pub fn matching_tags<'v>(text: &str, vocabulary: &'v [PhraseTag]) -> Vec<&'v str> {
    let normalized = text.to_lowercase();
    if normalized.trim().is_empty() {
        return Vec::new();
    }

    vocabulary
        .iter()
        .filter(|entry| normalized.contains(entry.phrase.as_str()))
        .map(|entry| entry.tag.as_str())
        .collect()
}

#[derive(Debug, Clone)]
pub struct EvidenceTally<'v> {
    vocabulary: &'v [PhraseTag],
    counts: Counts,
}

impl<'v> EvidenceTally<'v> {
    pub fn new(vocabulary: &'v [PhraseTag]) -> Self {
        let mut counts: Counts = vocabulary
            .iter()
            .map(|entry| (entry.tag.clone(), 0))
            .collect();
        counts.insert(BLANK.to_string(), 0);
        Self { vocabulary, counts }
    }

    pub fn record(&mut self, text: &str) -> Option<&'v str> {
        let tags = matching_tags(text, self.vocabulary);
        if tags.is_empty() {
            *self.counts.entry(BLANK.to_string()).or_insert(0) += 1;
            return None;
        }

        for tag in &tags {
            *self.counts.entry(tag.to_string()).or_insert(0) += 1;
        }
        tags.first().copied()
    }

    pub fn into_counts(self) -> Counts {
        self.counts
    }
}
