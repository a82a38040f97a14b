/// Per-target outcomes of one batch run.
///
/// Every attempted target lands in exactly one of the two lists, in the
/// order it was processed.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct BatchResult {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, name: impl Into<String>) {
        self.succeeded.push(name.into());
    }

    pub fn record_failure(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.failed.push((name.into(), reason.into()));
    }

    /// Number of targets accounted for so far.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// The first `limit` succeeded names.
    pub fn succeeded_preview(&self, limit: usize) -> &[String] {
        &self.succeeded[..self.succeeded.len().min(limit)]
    }

    /// The first `limit` failures.
    pub fn failed_preview(&self, limit: usize) -> &[(String, String)] {
        &self.failed[..self.failed.len().min(limit)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_processing_order() {
        let mut result = BatchResult::new();
        result.record_success("a");
        result.record_failure("b", "nope");
        result.record_success("c");

        assert_eq!(result.succeeded, vec!["a", "c"]);
        assert_eq!(result.failed, vec![("b".to_owned(), "nope".to_owned())]);
        assert_eq!(result.attempted(), 3);
    }

    #[test]
    fn previews_clip_silently() {
        let mut result = BatchResult::new();
        for index in 0..5 {
            result.record_success(format!("user{index}"));
        }

        assert_eq!(result.succeeded_preview(2), ["user0", "user1"]);
        assert_eq!(result.succeeded_preview(10).len(), 5);
        assert!(result.failed_preview(3).is_empty());
    }
}
