use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::NaiveDate;

use super::model::{IncentivePolicy, PolicyScope};

/// Read-only view of the administrator-maintained policy table.
pub trait PolicyProvider: Send + Sync {
    /// The single policy active for `scope` on `date`, if any.
    fn find_active_policy(
        &self,
        scope: PolicyScope,
        date: NaiveDate,
    ) -> Result<Option<IncentivePolicy>, PolicyStoreError>;

    /// Changes whenever the table is edited. Stores that never change keep 0.
    fn generation(&self) -> u64 {
        0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyStoreError {
    #[error("policy {incoming} overlaps effective range of policy {existing}")]
    OverlappingRange { existing: String, incoming: String },
    #[error("policy {0} rules do not match its publication scope")]
    ScopeMismatch(String),
    #[error("policy {0} ends before it starts")]
    InvertedRange(String),
    #[error("policy store unavailable: {0}")]
    Unavailable(String),
}

/// In-memory policy table enforcing the one-active-policy-per-scope invariant.
#[derive(Debug, Default)]
pub struct PolicyCatalog {
    policies: RwLock<Vec<IncentivePolicy>>,
    generation: AtomicU64,
}

impl PolicyCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policies(
        policies: impl IntoIterator<Item = IncentivePolicy>,
    ) -> Result<Self, PolicyStoreError> {
        let catalog = Self::new();
        for policy in policies {
            catalog.insert(policy)?;
        }
        Ok(catalog)
    }

    pub fn insert(&self, policy: IncentivePolicy) -> Result<(), PolicyStoreError> {
        if !policy.rules.fits(&policy.scope) {
            return Err(PolicyStoreError::ScopeMismatch(policy.id));
        }
        if policy
            .effective_to
            .is_some_and(|to| to < policy.effective_from)
        {
            return Err(PolicyStoreError::InvertedRange(policy.id));
        }

        let mut guard = self
            .policies
            .write()
            .map_err(|_| PolicyStoreError::Unavailable("catalog lock poisoned".to_string()))?;
        if let Some(existing) = guard.iter().find(|existing| existing.overlaps(&policy)) {
            return Err(PolicyStoreError::OverlappingRange {
                existing: existing.id.clone(),
                incoming: policy.id,
            });
        }
        guard.push(policy);
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.policies.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyProvider for PolicyCatalog {
    fn find_active_policy(
        &self,
        scope: PolicyScope,
        date: NaiveDate,
    ) -> Result<Option<IncentivePolicy>, PolicyStoreError> {
        let guard = self
            .policies
            .read()
            .map_err(|_| PolicyStoreError::Unavailable("catalog lock poisoned".to_string()))?;
        Ok(guard
            .iter()
            .find(|policy| policy.scope == scope && policy.is_active_on(date))
            .cloned())
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
