//! Review workflow transition table.
//!
//! Decides, without touching storage, whether an actor may apply an action to
//! a claim in its current status and which status results. Side effects
//! (recalculation, history rows, notifications) belong to the service.

use serde::{Deserialize, Serialize};

use super::domain::{Actor, ContributionStatus, UserId};
use super::suggestions::SuggestionDraft;

/// Action requested against a claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkflowAction {
    Submit,
    MentorApprove {
        #[serde(default)]
        remarks: Option<String>,
    },
    MentorReject {
        #[serde(default)]
        comments: String,
    },
    ClaimReview,
    RequestChanges {
        #[serde(default)]
        comments: String,
        #[serde(default)]
        suggestions: Vec<SuggestionDraft>,
    },
    Recommend {
        #[serde(default)]
        comments: Option<String>,
    },
    Approve {
        #[serde(default)]
        comments: Option<String>,
    },
    Reject {
        #[serde(default)]
        reason: String,
    },
    Resubmit {
        #[serde(default)]
        comments: Option<String>,
    },
    Complete {
        #[serde(default)]
        comments: Option<String>,
    },
}

impl WorkflowAction {
    pub const fn name(&self) -> &'static str {
        match self {
            WorkflowAction::Submit => "submit",
            WorkflowAction::MentorApprove { .. } => "mentor_approve",
            WorkflowAction::MentorReject { .. } => "mentor_reject",
            WorkflowAction::ClaimReview => "claim_review",
            WorkflowAction::RequestChanges { .. } => "request_changes",
            WorkflowAction::Recommend { .. } => "recommend",
            WorkflowAction::Approve { .. } => "approve",
            WorkflowAction::Reject { .. } => "reject",
            WorkflowAction::Resubmit { .. } => "resubmit",
            WorkflowAction::Complete { .. } => "complete",
        }
    }

    /// Free-text comment recorded on the history row.
    pub fn comment(&self) -> Option<&str> {
        let text = match self {
            WorkflowAction::Submit | WorkflowAction::ClaimReview => None,
            WorkflowAction::MentorApprove { remarks } => remarks.as_deref(),
            WorkflowAction::MentorReject { comments }
            | WorkflowAction::RequestChanges { comments, .. } => Some(comments.as_str()),
            WorkflowAction::Reject { reason } => Some(reason.as_str()),
            WorkflowAction::Recommend { comments }
            | WorkflowAction::Approve { comments }
            | WorkflowAction::Resubmit { comments }
            | WorkflowAction::Complete { comments } => comments.as_deref(),
        };
        text.map(str::trim).filter(|text| !text.is_empty())
    }

    fn requires_comment(&self) -> bool {
        matches!(
            self,
            WorkflowAction::MentorReject { .. }
                | WorkflowAction::RequestChanges { .. }
                | WorkflowAction::Reject { .. }
        )
    }
}

/// Who the actor is relative to the claim.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub actor: &'a Actor,
    pub applicant_id: &'a UserId,
    pub mentor_id: Option<&'a UserId>,
    /// Submission goes to the mentor first (student applicant with a mentor).
    pub route_to_mentor: bool,
}

impl TransitionContext<'_> {
    fn is_applicant(&self) -> bool {
        &self.actor.user_id == self.applicant_id
    }

    fn is_mentor(&self) -> bool {
        self.mentor_id == Some(&self.actor.user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot {action} a claim in status {}: {reason}", .status.label())]
    Denied {
        status: ContributionStatus,
        action: &'static str,
        reason: &'static str,
    },
    #[error("{action} requires comments")]
    MissingComments { action: &'static str },
}

/// Resulting status for `action`, or why it is refused. Comment validation
/// runs before status and authority checks.
pub fn next_status(
    current: ContributionStatus,
    action: &WorkflowAction,
    context: &TransitionContext<'_>,
) -> Result<ContributionStatus, TransitionError> {
    use ContributionStatus as S;

    if action.requires_comment() && action.comment().is_none() {
        return Err(TransitionError::MissingComments {
            action: action.name(),
        });
    }

    let deny = |reason: &'static str| TransitionError::Denied {
        status: current,
        action: action.name(),
        reason,
    };

    match action {
        WorkflowAction::Submit => {
            if current != S::Draft {
                return Err(deny("only drafts can be submitted"));
            }
            if !context.is_applicant() {
                return Err(deny("only the applicant can submit"));
            }
            Ok(if context.route_to_mentor {
                S::PendingMentorApproval
            } else {
                S::Submitted
            })
        }
        WorkflowAction::MentorApprove { .. } | WorkflowAction::MentorReject { .. } => {
            if current != S::PendingMentorApproval {
                return Err(deny("claim is not awaiting mentor approval"));
            }
            if !context.is_mentor() {
                return Err(deny("only the named mentor can decide"));
            }
            Ok(match action {
                WorkflowAction::MentorApprove { .. } => S::Submitted,
                _ => S::ChangesRequired,
            })
        }
        WorkflowAction::ClaimReview => {
            if !matches!(current, S::Submitted | S::Resubmitted) {
                return Err(deny("only submitted or resubmitted claims can be taken up"));
            }
            if !context.actor.can_review() {
                return Err(deny("actor lacks review permission"));
            }
            Ok(S::UnderReview)
        }
        WorkflowAction::RequestChanges { .. } => {
            if current != S::UnderReview {
                return Err(deny("changes can only be requested during review"));
            }
            if !context.actor.can_review() {
                return Err(deny("actor lacks review permission"));
            }
            Ok(S::ChangesRequired)
        }
        WorkflowAction::Recommend { .. } => {
            if current != S::UnderReview {
                return Err(deny("only claims under review can be recommended"));
            }
            if !context.actor.can_review() {
                return Err(deny("actor lacks review permission"));
            }
            if context.actor.can_approve() {
                return Err(deny("approvers decide claims instead of recommending them"));
            }
            Ok(S::UnderReview)
        }
        WorkflowAction::Approve { .. } => {
            if !matches!(current, S::Submitted | S::UnderReview | S::Resubmitted) {
                return Err(deny("claim is not awaiting a decision"));
            }
            if !context.actor.can_approve() {
                return Err(deny("actor lacks approve authority"));
            }
            Ok(S::Approved)
        }
        WorkflowAction::Reject { .. } => {
            if !matches!(current, S::Submitted | S::UnderReview | S::Resubmitted) {
                return Err(deny("claim is not awaiting a decision"));
            }
            if !context.actor.can_review() {
                return Err(deny("actor lacks review permission"));
            }
            Ok(S::Rejected)
        }
        WorkflowAction::Resubmit { .. } => {
            if current != S::ChangesRequired {
                return Err(deny("only claims returned for changes can be resubmitted"));
            }
            if !context.is_applicant() {
                return Err(deny("only the applicant can resubmit"));
            }
            Ok(S::Resubmitted)
        }
        WorkflowAction::Complete { .. } => {
            if current != S::Approved {
                return Err(deny("only approved claims can be completed"));
            }
            if !context.actor.can_administer() {
                return Err(deny("actor lacks administer permission"));
            }
            Ok(S::Completed)
        }
    }
}
