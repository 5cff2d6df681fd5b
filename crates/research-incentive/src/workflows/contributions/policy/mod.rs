mod cache;
mod defaults;
mod model;
mod store;

pub use cache::CachedPolicyProvider;
pub use defaults::PolicyDefaults;
pub use model::{
    Award, BookRules, FlatConferenceRules, GrantRules, IncentivePolicy, IndexedConferenceRules,
    PolicyRules, PolicyScope, ResearchPaperRules, RoleSplit, ScopeAwards, SjrBand,
};
pub use store::{PolicyCatalog, PolicyProvider, PolicyStoreError};

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ConferenceSubType, PublicationType};

/// Where the rules applied to a calculation came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PolicySource {
    Configured { policy_id: String },
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPolicy {
    pub rules: PolicyRules,
    pub source: PolicySource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedPolicy),
    /// Conference claim without a chosen sub-type; nothing can be priced yet.
    AwaitingSubType,
}

/// Looks up the active policy and falls back to the built-in table on a miss.
#[derive(Clone)]
pub struct PolicyResolver {
    provider: Arc<dyn PolicyProvider>,
    defaults: Arc<PolicyDefaults>,
}

impl PolicyResolver {
    pub fn new(provider: Arc<dyn PolicyProvider>, defaults: Arc<PolicyDefaults>) -> Self {
        Self { provider, defaults }
    }

    /// Wraps `provider` in a [`CachedPolicyProvider`] when `cache` is set.
    pub fn with_cache(
        provider: Arc<dyn PolicyProvider>,
        defaults: Arc<PolicyDefaults>,
        cache: bool,
    ) -> Self {
        let provider: Arc<dyn PolicyProvider> = if cache {
            Arc::new(CachedPolicyProvider::new(provider))
        } else {
            provider
        };
        Self::new(provider, defaults)
    }

    /// Resolver with no administrator policies at all.
    pub fn built_in(defaults: Arc<PolicyDefaults>) -> Self {
        Self::new(Arc::new(PolicyCatalog::new()), defaults)
    }

    pub fn defaults(&self) -> &PolicyDefaults {
        &self.defaults
    }

    pub fn resolve(
        &self,
        publication_type: PublicationType,
        sub_type: Option<ConferenceSubType>,
        date: NaiveDate,
    ) -> Result<Resolution, PolicyStoreError> {
        let sub_type = match publication_type {
            PublicationType::ConferencePaper => match sub_type {
                Some(sub_type) => Some(sub_type),
                None => return Ok(Resolution::AwaitingSubType),
            },
            _ => None,
        };

        let scope = PolicyScope::new(publication_type, sub_type);
        if let Some(policy) = self.provider.find_active_policy(scope, date)? {
            if policy.rules.fits(&scope) {
                return Ok(Resolution::Resolved(ResolvedPolicy {
                    rules: policy.rules,
                    source: PolicySource::Configured {
                        policy_id: policy.id,
                    },
                }));
            }
            tracing::warn!(
                policy_id = %policy.id,
                publication_type = publication_type.label(),
                "active policy rules do not fit their scope; using built-in defaults"
            );
        }

        match self.defaults.rules_for(publication_type, sub_type) {
            Some(rules) => Ok(Resolution::Resolved(ResolvedPolicy {
                rules,
                source: PolicySource::BuiltIn,
            })),
            None => Ok(Resolution::AwaitingSubType),
        }
    }
}
