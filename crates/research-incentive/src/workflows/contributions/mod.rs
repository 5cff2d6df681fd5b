//! Research contribution incentive claims: policy resolution, share
//! calculation, and the review workflow from draft to completion.

pub mod calculator;
pub mod composition;
pub mod domain;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;
pub mod suggestions;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use calculator::{
    CalculationError, CalculationOutcome, CalculationRequest, CalculationStatus, CalculationTrace,
    Distribution, IncentiveCalculator, PoolBranch, ShareAssessment,
};
pub use composition::{AuthorComposition, Participant};
pub use domain::{
    Actor, Applicant, AuthorRole, BookDetails, BookIndexing, BookType, ConferenceDetails,
    ConferenceSubType, Contribution, ContributionId, ContributionStatus, Contributor,
    ContributorCategory, EditSuggestion, GrantDetails, JournalDetails, Permission,
    PublicationDetails, PublicationType, Quartile, Review, ReviewDecision, ReviewId,
    StatusHistoryEntry, SuggestionId, SuggestionStatus, UserId, VenueScope,
};
pub use policy::{
    Award, CachedPolicyProvider, IncentivePolicy, PolicyCatalog, PolicyDefaults, PolicyProvider,
    PolicyResolver, PolicyRules, PolicyScope, PolicySource, PolicyStoreError, RoleSplit,
};
pub use repository::{
    ContributionRecord, ContributionRepository, ContributionStatusView, DepartmentDirectory,
    DirectoryError, Notification, NotificationError, NotificationKind, NotificationSink,
    RepositoryError, UserDirectory, UserRecord, UserRole,
};
pub use router::contribution_router;
pub use service::{
    ContributionDraft, ContributionWorkflowService, ContributorDraft, TransitionReceipt,
    WorkflowError,
};
pub use suggestions::{ContributionField, SuggestionDraft, SuggestionError, SuggestionResponse};
pub use workflow::{TransitionError, WorkflowAction};
