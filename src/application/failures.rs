use dashmap::DashSet;

/// Raw expressions that have already been reported as failing.
///
/// Grows for the lifetime of the process; failing conditions come from static
/// configuration, so the set stays small.
#[derive(Debug, Default)]
pub struct FailureLog {
    seen: DashSet<String>,
}

impl FailureLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure of `expression`.
    ///
    /// Returns `true` only for the first caller to record this exact text, even
    /// when several threads race on it.
    pub fn record(&self, expression: &str) -> bool {
        if self.seen.contains(expression) {
            return false;
        }
        self.seen.insert(expression.to_string())
    }

    pub fn contains(&self, expression: &str) -> bool {
        self.seen.contains(expression)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn first_record_wins() {
        let log = FailureLog::new();
        assert!(log.record("level >"));
        assert!(!log.record("level >"));
        assert!(log.record("rank =="));
        assert_eq!(log.len(), 2);
        assert!(log.contains("level >"));
    }

    #[test]
    fn concurrent_records_report_once() {
        let log = FailureLog::new();
        let reported = AtomicUsize::new(0);

        thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        if log.record("broken ((") {
                            reported.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }
}
