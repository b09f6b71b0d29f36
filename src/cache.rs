//! Cache of already analyzed reports, keyed by document id.

use crate::document::Report;
use crate::error::{Result, VidsageError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Store of analyzed reports shared by the components that need them.
pub trait ReportCache: Send + Sync {
    fn get(&self, document_id: &str) -> Result<Option<Report>>;

    /// Insert or overwrite the report for its document id.
    fn put(&self, report: Report) -> Result<()>;

    /// Drop one entry. Returns whether it was present.
    fn invalidate(&self, document_id: &str) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn len(&self) -> Result<usize>;
}

/// Process-local [`ReportCache`].
#[derive(Default)]
pub struct MemoryReportCache {
    reports: Mutex<HashMap<String, Report>>,
}

impl MemoryReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Report>>> {
        self.reports
            .lock()
            .map_err(|e| VidsageError::Cache(format!("Failed to acquire report cache lock: {}", e)))
    }
}

impl ReportCache for MemoryReportCache {
    fn get(&self, document_id: &str) -> Result<Option<Report>> {
        Ok(self.lock()?.get(document_id).cloned())
    }

    fn put(&self, report: Report) -> Result<()> {
        self.lock()?.insert(report.document_id.clone(), report);
        Ok(())
    }

    fn invalidate(&self, document_id: &str) -> Result<bool> {
        Ok(self.lock()?.remove(document_id).is_some())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put_invalidate() {
        let cache = MemoryReportCache::new();
        assert!(cache.get("v1").unwrap().is_none());

        cache.put(Report::new("v1", "First")).unwrap();
        cache.put(Report::new("v1", "First, revised")).unwrap();
        assert_eq!(cache.len().unwrap(), 1);
        assert_eq!(cache.get("v1").unwrap().unwrap().title, "First, revised");

        assert!(cache.invalidate("v1").unwrap());
        assert!(!cache.invalidate("v1").unwrap());
        assert!(cache.get("v1").unwrap().is_none());
    }

    #[test]
    fn test_clear() {
        let cache = MemoryReportCache::new();
        cache.put(Report::new("a", "A")).unwrap();
        cache.put(Report::new("b", "B")).unwrap();
        cache.clear().unwrap();
        assert_eq!(cache.len().unwrap(), 0);
    }

    #[test]
    fn test_poisoned_lock_is_a_cache_error() {
        let cache = MemoryReportCache::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.reports.lock().unwrap();
            panic!("writer died");
        }));

        assert!(matches!(cache.get("v1"), Err(VidsageError::Cache(_))));
        assert!(matches!(cache.put(Report::new("v1", "T")), Err(VidsageError::Cache(_))));
    }
}
