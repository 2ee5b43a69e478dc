//! Frequency table over per-subject reports.

use serde::Serialize;

/// One distinct report and how many subjects produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pattern {
    pub report: String,
    pub count: usize,
}

/// Counts identical reports, remembering first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProtocolCounter {
    patterns: Vec<Pattern>,
}

impl ProtocolCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one subject's report.
    pub fn add(&mut self, report: impl Into<String>) {
        let report = report.into();
        match self.patterns.iter_mut().find(|p| p.report == report) {
            Some(pattern) => pattern.count += 1,
            None => self.patterns.push(Pattern { report, count: 1 }),
        }
    }

    pub fn count(&self, report: &str) -> usize {
        self.patterns
            .iter()
            .find(|p| p.report == report)
            .map(|p| p.count)
            .unwrap_or(0)
    }

    /// Number of distinct reports.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Patterns by descending count; ties keep first-seen order.
    pub fn most_common(&self) -> Vec<&Pattern> {
        let mut sorted: Vec<&Pattern> = self.patterns.iter().collect();
        sorted.sort_by(|a, b| b.count.cmp(&a.count));
        sorted
    }

    /// Patterns in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for ProtocolCounter {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut counter = Self::new();
        for report in iter {
            counter.add(report);
        }
        counter
    }
}
