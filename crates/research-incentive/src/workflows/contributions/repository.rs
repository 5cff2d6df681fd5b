use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Contribution, ContributionId, ContributionStatus, Review, ReviewDecision, StatusHistoryEntry,
    UserId,
};

/// Repository record: the claim, its reviews, and the optimistic-lock version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionRecord {
    pub contribution: Contribution,
    pub reviews: Vec<Review>,
    /// Bumped by the repository on every successful commit.
    pub version: u64,
}

impl ContributionRecord {
    /// Reviews are appended in decision order.
    pub fn latest_review(&self) -> Option<&Review> {
        self.reviews.last()
    }

    pub fn is_recommended(&self) -> bool {
        self.reviews
            .iter()
            .any(|review| review.decision == ReviewDecision::Recommended)
    }

    /// Reviewers who recommended the claim, in order of first recommendation.
    pub fn recommenders(&self) -> Vec<UserId> {
        let mut recommenders: Vec<UserId> = Vec::new();
        for review in &self.reviews {
            if review.decision == ReviewDecision::Recommended
                && !recommenders.contains(&review.reviewer_id)
            {
                recommenders.push(review.reviewer_id.clone());
            }
        }
        recommenders
    }

    pub fn status_view(&self) -> ContributionStatusView {
        let contribution = &self.contribution;
        ContributionStatusView {
            contribution_id: contribution.id.clone(),
            application_number: contribution.application_number.clone(),
            publication_type: contribution.publication_type().label(),
            status: contribution.status.label(),
            revision: contribution.revision,
            calculated_incentive_amount: contribution.calculated_incentive_amount,
            calculated_points: contribution.calculated_points,
            total_incentive_amount: contribution.total_incentive_amount,
            total_points: contribution.total_points,
            recommended: self.is_recommended(),
            submitted_at: contribution.submitted_at,
            approved_at: contribution.approved_at,
            completed_at: contribution.completed_at,
        }
    }
}

/// Storage abstraction. `insert` and `commit` are each one atomic unit: the
/// claim row, its contributor rows, reviews, and the history rows land together
/// or not at all.
pub trait ContributionRepository: Send + Sync {
    fn insert(
        &self,
        record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError>;
    /// Fails with [`RepositoryError::VersionConflict`] unless `record.version`
    /// still matches the stored version.
    fn commit(
        &self,
        record: ContributionRecord,
        history: Vec<StatusHistoryEntry>,
    ) -> Result<ContributionRecord, RepositoryError>;
    fn fetch(&self, id: &ContributionId) -> Result<Option<ContributionRecord>, RepositoryError>;
    fn history(&self, id: &ContributionId) -> Result<Vec<StatusHistoryEntry>, RepositoryError>;
    fn by_status(
        &self,
        statuses: &[ContributionStatus],
        limit: usize,
    ) -> Result<Vec<ContributionRecord>, RepositoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently (expected version {expected}, found {found})")]
    VersionConflict { expected: u64, found: u64 },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Submitted,
    MentorReviewRequested,
    MentorApproved,
    MentorReturned,
    ChangesRequested,
    Recommended,
    Approved,
    IncentiveCredited,
    Rejected,
    Resubmitted,
    Completed,
}

/// Outbound notification payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub metadata: BTreeMap<String, String>,
}

/// Fire-and-forget delivery; failures are logged by the caller, never retried inline.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Faculty,
    Staff,
    Student,
    Reviewer,
    Approver,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub uid: String,
    pub name: String,
    pub role: UserRole,
    pub is_internal: bool,
}

/// Identity provider lookups.
pub trait UserDirectory: Send + Sync {
    fn find_user_by_uid(&self, uid: &str) -> Result<Option<UserRecord>, DirectoryError>;
    /// Users holding final-approve authority; recipients of recommendations.
    fn approvers(&self) -> Result<Vec<UserRecord>, DirectoryError>;
}

/// School/department lookups, used only to validate references.
pub trait DepartmentDirectory: Send + Sync {
    fn department_exists(&self, school_id: &str, department_id: &str)
        -> Result<bool, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Sanitized representation of a claim's exposed status.
#[derive(Debug, Clone, Serialize)]
pub struct ContributionStatusView {
    pub contribution_id: ContributionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_number: Option<String>,
    pub publication_type: &'static str,
    pub status: &'static str,
    pub revision: u32,
    pub calculated_incentive_amount: u64,
    pub calculated_points: u64,
    pub total_incentive_amount: u64,
    pub total_points: u64,
    pub recommended: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
