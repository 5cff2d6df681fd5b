use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::calculator::{IncentiveCalculator, ShareAssessment};
use super::domain::{
    Actor, Applicant, AuthorRole, Contribution, ContributionId, ContributionStatus, Contributor,
    ContributorCategory, EditSuggestion, PublicationDetails, PublicationType, Review,
    ReviewDecision, ReviewId, StatusHistoryEntry, SuggestionId, SuggestionStatus, UserId,
};
use super::repository::{
    ContributionRecord, ContributionRepository, DepartmentDirectory, DirectoryError, Notification,
    NotificationKind, NotificationSink, RepositoryError, UserDirectory,
};
use super::suggestions::{
    apply_suggestion, ContributionField, SuggestionDraft, SuggestionError, SuggestionResponse,
};
use super::workflow::{self, TransitionContext, TransitionError, WorkflowAction};
use crate::config::WorkflowConfig;

/// Claim fields as entered on the contribution form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionDraft {
    pub title: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    pub details: PublicationDetails,
    #[serde(default)]
    pub declared_author_count: Option<u16>,
    pub applicant: Applicant,
    pub school_id: String,
    pub department_id: String,
    #[serde(default)]
    pub contributors: Vec<ContributorDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorDraft {
    pub name: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
    pub category: ContributorCategory,
    pub role: AuthorRole,
}

/// Everything a single transition produced.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionReceipt {
    pub record: ContributionRecord,
    pub history: StatusHistoryEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    pub notifications: Vec<Notification>,
}

/// Service driving claims from draft to completion.
pub struct ContributionWorkflowService<R, N> {
    repository: Arc<R>,
    notifications: Arc<N>,
    users: Arc<dyn UserDirectory>,
    departments: Arc<dyn DepartmentDirectory>,
    calculator: Arc<IncentiveCalculator>,
    config: WorkflowConfig,
}

static CONTRIBUTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);
static SUGGESTION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_contribution_id() -> ContributionId {
    let id = CONTRIBUTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ContributionId(format!("rc-{id:06}"))
}

fn next_application_number(publication_type: PublicationType, year: i32) -> String {
    let sequence = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}-{year}-{sequence:05}",
        publication_type.application_prefix()
    )
}

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

fn next_suggestion_id() -> SuggestionId {
    let id = SUGGESTION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SuggestionId(format!("sug-{id:06}"))
}

impl<R, N> ContributionWorkflowService<R, N>
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(
        repository: Arc<R>,
        notifications: Arc<N>,
        users: Arc<dyn UserDirectory>,
        departments: Arc<dyn DepartmentDirectory>,
        calculator: Arc<IncentiveCalculator>,
    ) -> Self {
        Self {
            repository,
            notifications,
            users,
            departments,
            calculator,
            config: WorkflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn calculator(&self) -> &IncentiveCalculator {
        &self.calculator
    }

    /// File a new draft claim for the acting applicant and price it.
    pub fn create_draft(
        &self,
        actor: &Actor,
        draft: ContributionDraft,
    ) -> Result<ContributionRecord, WorkflowError> {
        if draft.applicant.user_id != actor.user_id {
            return Err(WorkflowError::Validation(
                "drafts must be filed by the applicant".to_string(),
            ));
        }
        self.validate_draft(&draft)?;

        let now = Utc::now();
        let contributors = self.resolve_contributors(&draft.contributors)?;
        let mut contribution = Contribution {
            id: next_contribution_id(),
            application_number: None,
            title: draft.title.trim().to_string(),
            doi: draft.doi,
            keywords: draft.keywords,
            publication_date: draft.publication_date,
            details: draft.details,
            declared_author_count: draft.declared_author_count,
            applicant: draft.applicant,
            school_id: draft.school_id,
            department_id: draft.department_id,
            contributors,
            status: ContributionStatus::Draft,
            calculated_incentive_amount: 0,
            calculated_points: 0,
            total_incentive_amount: 0,
            total_points: 0,
            revision: 0,
            mentor_id: None,
            mentor_remarks: None,
            current_reviewer_id: None,
            created_at: now,
            submitted_at: None,
            approved_at: None,
            credited_at: None,
            completed_at: None,
        };
        self.calculator
            .assess(&contribution, now.date_naive())
            .apply_to(&mut contribution);

        let history = StatusHistoryEntry {
            contribution_id: contribution.id.clone(),
            from: None,
            to: ContributionStatus::Draft,
            actor_id: actor.user_id.clone(),
            comment: None,
            recorded_at: now,
        };
        let record = ContributionRecord {
            contribution,
            reviews: Vec::new(),
            version: 0,
        };

        let stored = self.repository.insert(record, vec![history])?;
        info!(
            contribution_id = %stored.contribution.id.0,
            publication_type = stored.contribution.publication_type().label(),
            incentive = stored.contribution.calculated_incentive_amount,
            points = stored.contribution.calculated_points,
            "draft contribution created"
        );
        Ok(stored)
    }

    /// Replace the editable fields of a claim and recompute its shares.
    /// Contributor rows are replaced wholesale.
    pub fn update_draft(
        &self,
        id: &ContributionId,
        actor: &Actor,
        draft: ContributionDraft,
        expected_version: Option<u64>,
    ) -> Result<ContributionRecord, WorkflowError> {
        let mut record = self.load(id, expected_version)?;
        let status = record.contribution.status;
        if !status.is_editable() {
            return Err(WorkflowError::InvalidTransition {
                status,
                action: "update",
                reason: "claim is no longer editable".to_string(),
            });
        }
        if record.contribution.applicant.user_id != actor.user_id
            || draft.applicant.user_id != actor.user_id
        {
            return Err(WorkflowError::InvalidTransition {
                status,
                action: "update",
                reason: "only the applicant can edit the claim".to_string(),
            });
        }
        if draft.details.publication_type() != record.contribution.publication_type() {
            return Err(WorkflowError::Validation(
                "publication type cannot change after filing".to_string(),
            ));
        }
        self.validate_draft(&draft)?;

        let contributors = self.resolve_contributors(&draft.contributors)?;
        let contribution = &mut record.contribution;
        contribution.title = draft.title.trim().to_string();
        contribution.doi = draft.doi;
        contribution.keywords = draft.keywords;
        contribution.publication_date = draft.publication_date;
        contribution.details = draft.details;
        contribution.declared_author_count = draft.declared_author_count;
        contribution.applicant = draft.applicant;
        contribution.school_id = draft.school_id;
        contribution.department_id = draft.department_id;
        contribution.contributors = contributors;

        let assessment = self.calculator.assess(contribution, Utc::now().date_naive());
        assessment.apply_to(contribution);

        let stored = self.repository.commit(record, Vec::new())?;
        debug!(contribution_id = %id.0, version = stored.version, "draft contribution updated");
        Ok(stored)
    }

    /// Apply a workflow action. The status change, review, recalculated
    /// shares, and history row are committed together; notifications are
    /// dispatched afterwards and never roll the transition back.
    pub fn transition(
        &self,
        id: &ContributionId,
        actor: &Actor,
        action: WorkflowAction,
        expected_version: Option<u64>,
    ) -> Result<TransitionReceipt, WorkflowError> {
        let mut record = self.load(id, expected_version)?;
        let current = record.contribution.status;
        let now = Utc::now();

        let route_to_mentor = matches!(action, WorkflowAction::Submit)
            && self.config.mentor_gate
            && record.contribution.applicant.category.is_student()
            && record.contribution.applicant.mentor_uid.is_some();

        let target = {
            let context = TransitionContext {
                actor,
                applicant_id: &record.contribution.applicant.user_id,
                mentor_id: record.contribution.mentor_id.as_ref(),
                route_to_mentor,
            };
            workflow::next_status(current, &action, &context)
                .map_err(|err| WorkflowError::from_transition(err, current))?
        };

        let mut notifications = Vec::new();
        let mut review = None;
        let applicant_id = record.contribution.applicant.user_id.clone();

        match &action {
            WorkflowAction::Submit => {
                let contribution = &mut record.contribution;
                if contribution.application_number.is_none() {
                    contribution.application_number = Some(next_application_number(
                        contribution.publication_type(),
                        now.year(),
                    ));
                }
                contribution.submitted_at = Some(now);
                if route_to_mentor {
                    let mentor = self.resolve_mentor(contribution)?;
                    contribution.mentor_id = Some(mentor.clone());
                    notifications.push(self.notice(
                        mentor,
                        NotificationKind::MentorReviewRequested,
                        "Mentor approval requested",
                        format!("{} awaits your approval.", contribution.title),
                        contribution,
                    ));
                }
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::Submitted,
                    "Contribution submitted",
                    format!("{} was submitted for review.", contribution.title),
                    contribution,
                ));
            }
            WorkflowAction::MentorApprove { remarks } => {
                let contribution = &mut record.contribution;
                contribution.mentor_remarks = remarks.clone();
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::MentorApproved,
                    "Mentor approved",
                    format!("Your mentor approved {}.", contribution.title),
                    contribution,
                ));
            }
            WorkflowAction::MentorReject { comments } => {
                let contribution = &mut record.contribution;
                contribution.mentor_remarks = Some(comments.trim().to_string());
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::MentorReturned,
                    "Returned by mentor",
                    format!("Your mentor returned {}: {}", contribution.title, comments.trim()),
                    contribution,
                ));
            }
            WorkflowAction::ClaimReview => {
                record.contribution.current_reviewer_id = Some(actor.user_id.clone());
                review = Some(self.review(
                    &record,
                    actor,
                    ReviewDecision::Reviewing,
                    None,
                    Vec::new(),
                    now,
                ));
            }
            WorkflowAction::RequestChanges {
                comments,
                suggestions,
            } => {
                let suggestions = self.build_suggestions(&record.contribution, suggestions)?;
                review = Some(self.review(
                    &record,
                    actor,
                    ReviewDecision::ChangesRequired,
                    action.comment(),
                    suggestions,
                    now,
                ));
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::ChangesRequested,
                    "Changes requested",
                    format!("A reviewer requested changes: {}", comments.trim()),
                    &record.contribution,
                ));
            }
            WorkflowAction::Recommend { .. } => {
                review = Some(self.review(
                    &record,
                    actor,
                    ReviewDecision::Recommended,
                    action.comment(),
                    Vec::new(),
                    now,
                ));
                for approver in self.users.approvers()? {
                    notifications.push(self.notice(
                        approver.id,
                        NotificationKind::Recommended,
                        "Contribution recommended",
                        format!("{} is recommended for approval.", record.contribution.title),
                        &record.contribution,
                    ));
                }
            }
            WorkflowAction::Approve { .. } => {
                let assessment = self.calculator.assess(&record.contribution, now.date_naive());
                let recommenders = record.recommenders();
                let contribution = &mut record.contribution;
                credit(contribution, &assessment, now);
                notifications.extend(self.credit_notices(contribution, &recommenders));
                review = Some(self.review(
                    &record,
                    actor,
                    ReviewDecision::Approved,
                    action.comment(),
                    Vec::new(),
                    now,
                ));
            }
            WorkflowAction::Reject { reason } => {
                review = Some(self.review(
                    &record,
                    actor,
                    ReviewDecision::Rejected,
                    action.comment(),
                    Vec::new(),
                    now,
                ));
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::Rejected,
                    "Contribution rejected",
                    format!("{} was rejected: {}", record.contribution.title, reason.trim()),
                    &record.contribution,
                ));
            }
            WorkflowAction::Resubmit { .. } => {
                let contribution = &mut record.contribution;
                contribution.revision += 1;
                if let Some(reviewer) = contribution.current_reviewer_id.clone() {
                    notifications.push(self.notice(
                        reviewer,
                        NotificationKind::Resubmitted,
                        "Contribution resubmitted",
                        format!(
                            "{} was resubmitted (revision {}).",
                            contribution.title, contribution.revision
                        ),
                        contribution,
                    ));
                }
            }
            WorkflowAction::Complete { .. } => {
                let contribution = &mut record.contribution;
                contribution.completed_at = Some(now);
                notifications.push(self.notice(
                    applicant_id,
                    NotificationKind::Completed,
                    "Incentive processed",
                    format!("Processing of {} is complete.", contribution.title),
                    contribution,
                ));
            }
        }

        record.contribution.status = target;
        if let Some(review) = &review {
            record.reviews.push(review.clone());
        }
        let history = StatusHistoryEntry {
            contribution_id: id.clone(),
            from: Some(current),
            to: target,
            actor_id: actor.user_id.clone(),
            comment: action.comment().map(str::to_string),
            recorded_at: now,
        };

        let stored = self.repository.commit(record, vec![history.clone()])?;
        info!(
            contribution_id = %id.0,
            action = action.name(),
            from = current.label(),
            to = target.label(),
            actor = %actor.user_id.0,
            version = stored.version,
            "contribution transition committed"
        );

        self.dispatch(&notifications);

        Ok(TransitionReceipt {
            record: stored,
            history,
            review,
            notifications,
        })
    }

    /// Accept or reject one suggestion of the latest review.
    pub fn respond_to_suggestion(
        &self,
        id: &ContributionId,
        suggestion_id: &SuggestionId,
        actor: &Actor,
        response: SuggestionResponse,
        expected_version: Option<u64>,
    ) -> Result<ContributionRecord, WorkflowError> {
        let mut record = self.load(id, expected_version)?;
        let status = record.contribution.status;
        if status != ContributionStatus::ChangesRequired {
            return Err(WorkflowError::InvalidTransition {
                status,
                action: "respond_to_suggestion",
                reason: "suggestions can only be answered while changes are required"
                    .to_string(),
            });
        }
        if record.contribution.applicant.user_id != actor.user_id {
            return Err(WorkflowError::InvalidTransition {
                status,
                action: "respond_to_suggestion",
                reason: "only the applicant can answer suggestions".to_string(),
            });
        }

        let not_found = || SuggestionError::NotFound {
            suggestion_id: suggestion_id.0.clone(),
        };
        let review = record.reviews.last_mut().ok_or_else(not_found)?;
        let suggestion = review
            .suggestions
            .iter_mut()
            .find(|suggestion| &suggestion.id == suggestion_id)
            .ok_or_else(not_found)?;
        if suggestion.status != SuggestionStatus::Pending {
            return Err(SuggestionError::AlreadyAnswered {
                suggestion_id: suggestion_id.0.clone(),
            }
            .into());
        }

        let mut recompute = false;
        match response {
            SuggestionResponse::Accept => {
                let field = ContributionField::parse(&suggestion.field)?;
                apply_suggestion(&mut record.contribution, field, &suggestion.suggested_value)?;
                suggestion.status = SuggestionStatus::Accepted;
                review.pending_suggestions = review.pending_suggestions.saturating_sub(1);
                recompute = field.is_policy_relevant();
            }
            SuggestionResponse::Reject => suggestion.status = SuggestionStatus::Rejected,
        }

        if recompute {
            let assessment = self
                .calculator
                .assess(&record.contribution, Utc::now().date_naive());
            assessment.apply_to(&mut record.contribution);
        }

        let stored = self.repository.commit(record, Vec::new())?;
        debug!(
            contribution_id = %id.0,
            suggestion_id = %suggestion_id.0,
            ?response,
            recomputed = recompute,
            "suggestion answered"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ContributionId) -> Result<ContributionRecord, WorkflowError> {
        self.load(id, None)
    }

    pub fn history(&self, id: &ContributionId) -> Result<Vec<StatusHistoryEntry>, WorkflowError> {
        self.load(id, None)?;
        Ok(self.repository.history(id)?)
    }

    pub fn reviews(&self, id: &ContributionId) -> Result<Vec<Review>, WorkflowError> {
        Ok(self.load(id, None)?.reviews)
    }

    /// Claims waiting for, or currently in, review.
    pub fn review_queue(&self, limit: usize) -> Result<Vec<ContributionRecord>, WorkflowError> {
        Ok(self.repository.by_status(
            &[
                ContributionStatus::Submitted,
                ContributionStatus::Resubmitted,
                ContributionStatus::UnderReview,
            ],
            limit,
        )?)
    }

    /// Claims under review that carry at least one recommendation.
    pub fn approver_queue(&self, limit: usize) -> Result<Vec<ContributionRecord>, WorkflowError> {
        let records = self
            .repository
            .by_status(&[ContributionStatus::UnderReview], usize::MAX)?;
        Ok(records
            .into_iter()
            .filter(ContributionRecord::is_recommended)
            .take(limit)
            .collect())
    }

    fn load(
        &self,
        id: &ContributionId,
        expected_version: Option<u64>,
    ) -> Result<ContributionRecord, WorkflowError> {
        let record = self
            .repository
            .fetch(id)?
            .ok_or_else(|| WorkflowError::NotFound { id: id.0.clone() })?;
        if let Some(expected) = expected_version {
            if expected != record.version {
                return Err(WorkflowError::ConcurrencyConflict {
                    expected,
                    found: record.version,
                });
            }
        }
        Ok(record)
    }

    fn validate_draft(&self, draft: &ContributionDraft) -> Result<(), WorkflowError> {
        if draft.title.trim().is_empty() {
            return Err(WorkflowError::Validation("title is required".to_string()));
        }
        if draft.declared_author_count == Some(0) {
            return Err(WorkflowError::Validation(
                "declared author count must be at least 1".to_string(),
            ));
        }
        if draft
            .contributors
            .iter()
            .any(|contributor| contributor.name.trim().is_empty())
        {
            return Err(WorkflowError::Validation(
                "every contributor needs a name".to_string(),
            ));
        }
        if !self
            .departments
            .department_exists(&draft.school_id, &draft.department_id)?
        {
            return Err(WorkflowError::Validation(format!(
                "unknown department {}/{}",
                draft.school_id, draft.department_id
            )));
        }
        Ok(())
    }

    /// Internal contributors with a uid are linked to their portal account.
    fn resolve_contributors(
        &self,
        drafts: &[ContributorDraft],
    ) -> Result<Vec<Contributor>, WorkflowError> {
        drafts
            .iter()
            .enumerate()
            .map(|(index, draft)| {
                let is_internal = draft.is_internal || draft.category.is_internal();
                let user_id = match (&draft.uid, is_internal) {
                    (Some(uid), true) => match self.users.find_user_by_uid(uid)? {
                        Some(user) => Some(user.id),
                        None => {
                            debug!(uid = %uid, "internal contributor has no portal account");
                            None
                        }
                    },
                    _ => None,
                };
                Ok(Contributor {
                    name: draft.name.trim().to_string(),
                    uid: draft.uid.clone(),
                    user_id,
                    is_internal,
                    category: draft.category,
                    role: draft.role,
                    order: u16::try_from(index + 1).unwrap_or(u16::MAX),
                    incentive_share: 0,
                    points_share: 0,
                })
            })
            .collect()
    }

    fn resolve_mentor(&self, contribution: &Contribution) -> Result<UserId, WorkflowError> {
        let uid = contribution
            .applicant
            .mentor_uid
            .as_deref()
            .ok_or_else(|| WorkflowError::Validation("mentor uid is required".to_string()))?;
        self.users
            .find_user_by_uid(uid)?
            .map(|user| user.id)
            .ok_or_else(|| WorkflowError::Validation(format!("mentor {uid} is not a known user")))
    }

    fn build_suggestions(
        &self,
        contribution: &Contribution,
        drafts: &[SuggestionDraft],
    ) -> Result<Vec<EditSuggestion>, WorkflowError> {
        drafts
            .iter()
            .map(|draft| {
                let field = ContributionField::parse(&draft.field)?;
                // The applicant must be able to accept it as filed.
                apply_suggestion(&mut contribution.clone(), field, &draft.suggested_value)?;
                Ok(EditSuggestion {
                    id: next_suggestion_id(),
                    field: field.label().to_string(),
                    original_value: field.current_value(contribution),
                    suggested_value: draft.suggested_value.trim().to_string(),
                    note: draft.note.clone(),
                    status: SuggestionStatus::Pending,
                })
            })
            .collect()
    }

    fn review(
        &self,
        record: &ContributionRecord,
        actor: &Actor,
        decision: ReviewDecision,
        comments: Option<&str>,
        suggestions: Vec<EditSuggestion>,
        now: DateTime<Utc>,
    ) -> Review {
        Review {
            id: next_review_id(),
            contribution_id: record.contribution.id.clone(),
            reviewer_id: actor.user_id.clone(),
            decision,
            comments: comments.map(str::to_string),
            pending_suggestions: u32::try_from(suggestions.len()).unwrap_or(u32::MAX),
            suggestions,
            created_at: now,
        }
    }

    fn notice(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        title: &str,
        message: String,
        contribution: &Contribution,
    ) -> Notification {
        let mut metadata = BTreeMap::new();
        metadata.insert("contribution_id".to_string(), contribution.id.0.clone());
        if let Some(number) = &contribution.application_number {
            metadata.insert("application_number".to_string(), number.clone());
        }
        Notification {
            recipient,
            kind,
            title: title.to_string(),
            message,
            metadata,
        }
    }

    /// Applicant, linked internal contributors, then every recommender.
    fn credit_notices(
        &self,
        contribution: &Contribution,
        recommenders: &[UserId],
    ) -> Vec<Notification> {
        let mut notices = Vec::new();

        let mut applicant = self.notice(
            contribution.applicant.user_id.clone(),
            NotificationKind::IncentiveCredited,
            "Incentive credited",
            format!(
                "{} approved: {} incentive and {} points credited.",
                contribution.title,
                contribution.calculated_incentive_amount,
                contribution.calculated_points
            ),
            contribution,
        );
        insert_amounts(
            &mut applicant,
            contribution.calculated_incentive_amount,
            contribution.calculated_points,
        );
        notices.push(applicant);

        for contributor in &contribution.contributors {
            let Some(user_id) = contributor.user_id.clone().filter(|_| contributor.is_internal)
            else {
                continue;
            };
            let mut notice = self.notice(
                user_id,
                NotificationKind::IncentiveCredited,
                "Incentive credited",
                format!(
                    "{} approved: {} incentive and {} points credited.",
                    contribution.title, contributor.incentive_share, contributor.points_share
                ),
                contribution,
            );
            insert_amounts(&mut notice, contributor.incentive_share, contributor.points_share);
            notices.push(notice);
        }

        for recommender in recommenders {
            notices.push(self.notice(
                recommender.clone(),
                NotificationKind::Approved,
                "Recommended contribution approved",
                format!("{} was approved.", contribution.title),
                contribution,
            ));
        }

        notices
    }

    fn dispatch(&self, notifications: &[Notification]) {
        for notification in notifications {
            if let Err(err) = self.notifications.notify(notification.clone()) {
                warn!(
                    recipient = %notification.recipient.0,
                    kind = ?notification.kind,
                    error = %err,
                    "notification delivery failed"
                );
            }
        }
    }
}

fn credit(contribution: &mut Contribution, assessment: &ShareAssessment, now: DateTime<Utc>) {
    assessment.apply_to(contribution);
    contribution.total_incentive_amount = assessment.total_incentive();
    contribution.total_points = assessment.total_points();
    contribution.approved_at = Some(now);
    contribution.credited_at = Some(now);
}

fn insert_amounts(notification: &mut Notification, amount: u64, points: u64) {
    notification
        .metadata
        .insert("incentive_amount".to_string(), amount.to_string());
    notification
        .metadata
        .insert("points".to_string(), points.to_string());
}

/// Error raised by the contribution workflow service.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("cannot {action} a claim in status {}: {reason}", .status.label())]
    InvalidTransition {
        status: ContributionStatus,
        action: &'static str,
        reason: String,
    },
    #[error("{0}")]
    Validation(String),
    #[error("contribution {id} not found")]
    NotFound { id: String },
    #[error("contribution changed concurrently (expected version {expected}, found {found})")]
    ConcurrencyConflict { expected: u64, found: u64 },
    #[error(transparent)]
    Repository(RepositoryError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error(transparent)]
    Suggestion(#[from] SuggestionError),
}

impl WorkflowError {
    fn from_transition(err: TransitionError, status: ContributionStatus) -> Self {
        match err {
            TransitionError::Denied { action, reason, .. } => WorkflowError::InvalidTransition {
                status,
                action,
                reason: reason.to_string(),
            },
            missing @ TransitionError::MissingComments { .. } => {
                WorkflowError::Validation(missing.to_string())
            }
        }
    }
}

impl From<RepositoryError> for WorkflowError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::VersionConflict { expected, found } => {
                WorkflowError::ConcurrencyConflict { expected, found }
            }
            other => WorkflowError::Repository(other),
        }
    }
}
