use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use super::model::{IncentivePolicy, PolicyScope};
use super::store::{PolicyProvider, PolicyStoreError};

/// Upper bound on memoized `(scope, date)` pairs; the map is cleared when full.
const MAX_CACHED_LOOKUPS: usize = 4_096;

/// Memoizes lookups per `(scope, date)`. Policies are effective per day, so an
/// entry stays valid until the underlying table changes; every lookup compares
/// the store generation and drops all entries on a change. Misses are cached
/// too; store failures are not.
pub struct CachedPolicyProvider {
    inner: Arc<dyn PolicyProvider>,
    state: Mutex<CacheState>,
}

struct CacheState {
    generation: u64,
    entries: HashMap<(PolicyScope, NaiveDate), Option<IncentivePolicy>>,
}

impl CachedPolicyProvider {
    pub fn new(inner: Arc<dyn PolicyProvider>) -> Self {
        let state = CacheState {
            generation: inner.generation(),
            entries: HashMap::new(),
        };
        Self {
            inner,
            state: Mutex::new(state),
        }
    }

    /// Drop every memoized entry.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.state.lock() {
            guard.entries.clear();
        }
    }

    pub fn cached_entries(&self) -> usize {
        self.state
            .lock()
            .map(|guard| guard.entries.len())
            .unwrap_or(0)
    }
}

impl PolicyProvider for CachedPolicyProvider {
    fn find_active_policy(
        &self,
        scope: PolicyScope,
        date: NaiveDate,
    ) -> Result<Option<IncentivePolicy>, PolicyStoreError> {
        let key = (scope, date);
        let generation = self.inner.generation();
        if let Ok(mut guard) = self.state.lock() {
            if guard.generation != generation {
                guard.entries.clear();
                guard.generation = generation;
            }
            if let Some(hit) = guard.entries.get(&key) {
                return Ok(hit.clone());
            }
        }

        let found = self.inner.find_active_policy(scope, date)?;
        if let Ok(mut guard) = self.state.lock() {
            // A newer generation already cleared the map; this result may be stale.
            if guard.generation == generation {
                if guard.entries.len() >= MAX_CACHED_LOOKUPS {
                    guard.entries.clear();
                }
                guard.entries.insert(key, found.clone());
            }
        }
        Ok(found)
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::contributions::domain::PublicationType;
    use crate::workflows::contributions::policy::{PolicyCatalog, PolicyDefaults};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl PolicyProvider for CountingProvider {
        fn find_active_policy(
            &self,
            _scope: PolicyScope,
            _date: NaiveDate,
        ) -> Result<Option<IncentivePolicy>, PolicyStoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let inner = Arc::new(CountingProvider::default());
        let cache = CachedPolicyProvider::new(inner.clone());
        let scope = PolicyScope::new(PublicationType::Book, None);

        for _ in 0..3 {
            assert!(cache
                .find_active_policy(scope, day())
                .expect("lookup succeeds")
                .is_none());
        }
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        let next_day = day().succ_opt().expect("valid date");
        cache
            .find_active_policy(scope, next_day)
            .expect("lookup succeeds");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        cache.invalidate();
        assert_eq!(cache.cached_entries(), 0);
    }

    #[test]
    fn policy_added_after_a_miss_is_picked_up() {
        let catalog = Arc::new(PolicyCatalog::new());
        let cache = CachedPolicyProvider::new(catalog.clone());
        let scope = PolicyScope::new(PublicationType::ResearchPaper, None);

        assert!(cache
            .find_active_policy(scope, day())
            .expect("lookup succeeds")
            .is_none());

        let rules = PolicyDefaults::standard()
            .rules_for(PublicationType::ResearchPaper, None)
            .expect("research paper defaults");
        catalog
            .insert(IncentivePolicy {
                id: "rp-2025".to_string(),
                scope,
                effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
                effective_to: None,
                rules,
            })
            .expect("policy stored");

        let found = cache
            .find_active_policy(scope, day())
            .expect("lookup succeeds")
            .expect("new policy visible");
        assert_eq!(found.id, "rp-2025");
    }

    #[test]
    fn cache_never_exceeds_its_bound() {
        let inner = Arc::new(CountingProvider::default());
        let cache = CachedPolicyProvider::new(inner);
        let scope = PolicyScope::new(PublicationType::Grant, None);

        let mut date = day();
        for _ in 0..=MAX_CACHED_LOOKUPS {
            cache
                .find_active_policy(scope, date)
                .expect("lookup succeeds");
            date = date.succ_opt().expect("valid date");
        }
        assert!(cache.cached_entries() <= MAX_CACHED_LOOKUPS);
        assert!(cache.cached_entries() > 0);
    }
}
