use super::common::*;
use crate::workflows::contributions::domain::{Actor, ContributionStatus, Permission, UserId};
use crate::workflows::contributions::workflow::{
    next_status, TransitionContext, TransitionError, WorkflowAction,
};

fn context<'a>(
    actor: &'a Actor,
    applicant: &'a UserId,
    mentor: Option<&'a UserId>,
) -> TransitionContext<'a> {
    TransitionContext {
        actor,
        applicant_id: applicant,
        mentor_id: mentor,
        route_to_mentor: false,
    }
}

fn applicant_id() -> UserId {
    UserId("fac-100".to_string())
}

const ALL_STATUSES: [ContributionStatus; 9] = [
    ContributionStatus::Draft,
    ContributionStatus::Submitted,
    ContributionStatus::PendingMentorApproval,
    ContributionStatus::UnderReview,
    ContributionStatus::ChangesRequired,
    ContributionStatus::Resubmitted,
    ContributionStatus::Approved,
    ContributionStatus::Rejected,
    ContributionStatus::Completed,
];

#[test]
fn submit_routes_students_with_mentors_to_mentor_approval() {
    let student = student_actor();
    let applicant = student.user_id.clone();
    let mut ctx = context(&student, &applicant, None);

    assert_eq!(
        next_status(ContributionStatus::Draft, &WorkflowAction::Submit, &ctx),
        Ok(ContributionStatus::Submitted)
    );

    ctx.route_to_mentor = true;
    assert_eq!(
        next_status(ContributionStatus::Draft, &WorkflowAction::Submit, &ctx),
        Ok(ContributionStatus::PendingMentorApproval)
    );
}

#[test]
fn only_the_applicant_submits_and_resubmits() {
    let applicant = applicant_id();
    let stranger = Actor::new("fac-999");
    let ctx = context(&stranger, &applicant, None);

    assert!(matches!(
        next_status(ContributionStatus::Draft, &WorkflowAction::Submit, &ctx),
        Err(TransitionError::Denied { .. })
    ));
    assert!(matches!(
        next_status(
            ContributionStatus::ChangesRequired,
            &WorkflowAction::Resubmit { comments: None },
            &ctx
        ),
        Err(TransitionError::Denied { .. })
    ));
}

#[test]
fn mentor_decisions_require_the_named_mentor() {
    let applicant = UserId("stu-300".to_string());
    let mentor_id = UserId("fac-100".to_string());
    let mentor = mentor_actor();
    let other = Actor::new("fac-200");

    let approve = WorkflowAction::MentorApprove {
        remarks: Some("Looks complete".to_string()),
    };
    assert_eq!(
        next_status(
            ContributionStatus::PendingMentorApproval,
            &approve,
            &context(&mentor, &applicant, Some(&mentor_id))
        ),
        Ok(ContributionStatus::Submitted)
    );
    assert!(next_status(
        ContributionStatus::PendingMentorApproval,
        &approve,
        &context(&other, &applicant, Some(&mentor_id))
    )
    .is_err());
}

#[test]
fn rejections_and_change_requests_need_comments() {
    let applicant = applicant_id();
    let reviewer = reviewer();
    let ctx = context(&reviewer, &applicant, None);

    let blank_reject = WorkflowAction::Reject {
        reason: "   ".to_string(),
    };
    assert_eq!(
        next_status(ContributionStatus::UnderReview, &blank_reject, &ctx),
        Err(TransitionError::MissingComments { action: "reject" })
    );

    let blank_changes = WorkflowAction::RequestChanges {
        comments: String::new(),
        suggestions: Vec::new(),
    };
    assert!(matches!(
        next_status(ContributionStatus::UnderReview, &blank_changes, &ctx),
        Err(TransitionError::MissingComments { .. })
    ));

    let mentor = mentor_actor();
    let student = UserId("stu-300".to_string());
    let mentor_id = mentor.user_id.clone();
    assert!(matches!(
        next_status(
            ContributionStatus::PendingMentorApproval,
            &WorkflowAction::MentorReject {
                comments: String::new()
            },
            &context(&mentor, &student, Some(&mentor_id))
        ),
        Err(TransitionError::MissingComments { .. })
    ));
}

#[test]
fn approval_requires_approve_authority() {
    let applicant = applicant_id();
    let approve = WorkflowAction::Approve { comments: None };

    let reviewer = reviewer();
    assert!(next_status(
        ContributionStatus::UnderReview,
        &approve,
        &context(&reviewer, &applicant, None)
    )
    .is_err());

    let approver = approver();
    for status in [
        ContributionStatus::Submitted,
        ContributionStatus::UnderReview,
        ContributionStatus::Resubmitted,
    ] {
        assert_eq!(
            next_status(status, &approve, &context(&approver, &applicant, None)),
            Ok(ContributionStatus::Approved)
        );
    }
}

#[test]
fn approve_is_only_reachable_from_decision_states() {
    let applicant = applicant_id();
    let approver = approver();
    let ctx = context(&approver, &applicant, None);
    let approve = WorkflowAction::Approve { comments: None };

    for status in ALL_STATUSES {
        let allowed = matches!(
            status,
            ContributionStatus::Submitted
                | ContributionStatus::UnderReview
                | ContributionStatus::Resubmitted
        );
        assert_eq!(
            next_status(status, &approve, &ctx).is_ok(),
            allowed,
            "approve from {}",
            status.label()
        );
    }
}

#[test]
fn terminal_states_accept_nothing_but_completion() {
    let applicant = applicant_id();
    let admin = administrator().with_permission(Permission::Approve);
    let ctx = context(&admin, &applicant, None);
    let actions = [
        WorkflowAction::Submit,
        WorkflowAction::ClaimReview,
        WorkflowAction::Recommend { comments: None },
        WorkflowAction::Approve { comments: None },
        WorkflowAction::Reject {
            reason: "duplicate".to_string(),
        },
        WorkflowAction::Resubmit { comments: None },
    ];

    for status in [ContributionStatus::Rejected, ContributionStatus::Completed] {
        for action in &actions {
            assert!(next_status(status, action, &ctx).is_err());
        }
        assert!(next_status(status, &WorkflowAction::Complete { comments: None }, &ctx).is_err());
    }

    assert_eq!(
        next_status(
            ContributionStatus::Approved,
            &WorkflowAction::Complete { comments: None },
            &ctx
        ),
        Ok(ContributionStatus::Completed)
    );
}

#[test]
fn recommend_keeps_the_claim_under_review() {
    let applicant = applicant_id();
    let reviewer = reviewer();
    assert_eq!(
        next_status(
            ContributionStatus::UnderReview,
            &WorkflowAction::Recommend {
                comments: Some("Strong venue".to_string())
            },
            &context(&reviewer, &applicant, None)
        ),
        Ok(ContributionStatus::UnderReview)
    );
}

#[test]
fn approvers_cannot_recommend_to_themselves() {
    let applicant = applicant_id();
    let approver = approver();
    let recommend = WorkflowAction::Recommend { comments: None };
    let ctx = context(&approver, &applicant, None);

    assert!(matches!(
        next_status(ContributionStatus::UnderReview, &recommend, &ctx),
        Err(TransitionError::Denied { .. })
    ));
    assert_eq!(
        next_status(
            ContributionStatus::UnderReview,
            &WorkflowAction::Approve { comments: None },
            &ctx
        ),
        Ok(ContributionStatus::Approved)
    );
}

#[test]
fn denial_reports_current_status() {
    let applicant = applicant_id();
    let reviewer = reviewer();
    let err = next_status(
        ContributionStatus::Draft,
        &WorkflowAction::ClaimReview,
        &context(&reviewer, &applicant, None),
    )
    .expect_err("drafts cannot be reviewed");

    assert!(err.to_string().contains("status draft"));
}

#[test]
fn actions_deserialize_from_tagged_json() {
    let action: WorkflowAction = serde_json::from_value(serde_json::json!({
        "action": "request_changes",
        "comments": "Please attach the acceptance letter",
        "suggestions": [{ "field": "quartile", "suggested_value": "Q2" }]
    }))
    .expect("valid action");

    match action {
        WorkflowAction::RequestChanges { suggestions, .. } => {
            assert_eq!(suggestions.len(), 1);
            assert_eq!(suggestions[0].field, "quartile");
        }
        other => panic!("unexpected action {other:?}"),
    }
}
