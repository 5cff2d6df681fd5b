use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::composition::Participant;
use super::domain::{
    Actor, AuthorRole, ContributionId, ContributorCategory, PublicationDetails, SuggestionId,
};
use super::repository::{ContributionRepository, NotificationSink, RepositoryError};
use super::service::{ContributionDraft, ContributionWorkflowService, WorkflowError};
use super::suggestions::{SuggestionError, SuggestionResponse};
use super::workflow::WorkflowAction;

const QUEUE_LIMIT: usize = 100;

/// Router builder exposing the contribution workflow over HTTP.
pub fn contribution_router<R, N>(service: Arc<ContributionWorkflowService<R, N>>) -> Router
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    Router::new()
        .route("/api/v1/contributions", post(create_handler::<R, N>))
        .route(
            "/api/v1/contributions/:contribution_id",
            get(get_handler::<R, N>).put(update_handler::<R, N>),
        )
        .route(
            "/api/v1/contributions/:contribution_id/transitions",
            post(transition_handler::<R, N>),
        )
        .route(
            "/api/v1/contributions/:contribution_id/suggestions/:suggestion_id",
            post(suggestion_handler::<R, N>),
        )
        .route(
            "/api/v1/contributions/:contribution_id/history",
            get(history_handler::<R, N>),
        )
        .route("/api/v1/review-queue", get(review_queue_handler::<R, N>))
        .route("/api/v1/approver-queue", get(approver_queue_handler::<R, N>))
        .route("/api/v1/incentives/calculate", post(calculate_handler::<R, N>))
        .route("/api/v1/policies/defaults", get(defaults_handler::<R, N>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DraftRequest {
    pub(crate) actor: Actor,
    pub(crate) contribution: ContributionDraft,
    #[serde(default)]
    pub(crate) expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest {
    pub(crate) actor: Actor,
    #[serde(flatten)]
    pub(crate) action: WorkflowAction,
    #[serde(default)]
    pub(crate) expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SuggestionRequest {
    pub(crate) actor: Actor,
    pub(crate) response: SuggestionResponse,
    #[serde(default)]
    pub(crate) expected_version: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct PreviewParticipant {
    pub(crate) category: ContributorCategory,
    #[serde(default)]
    pub(crate) is_internal: bool,
    #[serde(default)]
    pub(crate) role: Option<AuthorRole>,
}

/// Pure calculation request; nothing is persisted.
#[derive(Debug, Deserialize)]
pub(crate) struct PreviewRequest {
    pub(crate) details: PublicationDetails,
    #[serde(default)]
    pub(crate) publication_date: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) declared_author_count: Option<u16>,
    pub(crate) applicant: PreviewParticipant,
    #[serde(default)]
    pub(crate) contributors: Vec<PreviewParticipant>,
}

pub(crate) async fn create_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.create_draft(&request.actor, request.contribution) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    Path(contribution_id): Path<String>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.get(&ContributionId(contribution_id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    Path(contribution_id): Path<String>,
    axum::Json(request): axum::Json<DraftRequest>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    let id = ContributionId(contribution_id);
    match service.update_draft(
        &id,
        &request.actor,
        request.contribution,
        request.expected_version,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn transition_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    Path(contribution_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    let id = ContributionId(contribution_id);
    match service.transition(&id, &request.actor, request.action, request.expected_version) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn suggestion_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    Path((contribution_id, suggestion_id)): Path<(String, String)>,
    axum::Json(request): axum::Json<SuggestionRequest>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.respond_to_suggestion(
        &ContributionId(contribution_id),
        &SuggestionId(suggestion_id),
        &request.actor,
        request.response,
        request.expected_version,
    ) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    Path(contribution_id): Path<String>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.history(&ContributionId(contribution_id)) {
        Ok(history) => (StatusCode::OK, axum::Json(history)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn review_queue_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.review_queue(QUEUE_LIMIT) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn approver_queue_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    match service.approver_queue(QUEUE_LIMIT) {
        Ok(records) => {
            let views: Vec<_> = records.iter().map(|record| record.status_view()).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn calculate_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
    axum::Json(request): axum::Json<PreviewRequest>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    let sole_author =
        request.contributors.is_empty() && request.declared_author_count.unwrap_or(1) <= 1;
    let applicant_role = request.applicant.role.unwrap_or(if sole_author {
        AuthorRole::FirstAndCorrespondingAuthor
    } else {
        AuthorRole::CoAuthor
    });
    let applicant = Participant::classify(
        request.applicant.is_internal,
        request.applicant.category,
        applicant_role,
    );
    let contributors: Vec<Participant> = request
        .contributors
        .iter()
        .map(|participant| {
            Participant::classify(
                participant.is_internal,
                participant.category,
                participant.role.unwrap_or(AuthorRole::CoAuthor),
            )
        })
        .collect();

    let assessment = service.calculator().assess_participants(
        &request.details,
        request.publication_date,
        request.declared_author_count,
        applicant,
        &contributors,
        Utc::now().date_naive(),
    );
    (StatusCode::OK, axum::Json(assessment)).into_response()
}

pub(crate) async fn defaults_handler<R, N>(
    State(service): State<Arc<ContributionWorkflowService<R, N>>>,
) -> Response
where
    R: ContributionRepository + 'static,
    N: NotificationSink + 'static,
{
    (StatusCode::OK, axum::Json(service.calculator().defaults())).into_response()
}

pub(crate) fn error_response(err: WorkflowError) -> Response {
    let status = match &err {
        WorkflowError::InvalidTransition { status, reason, .. } => {
            let payload = json!({
                "error": err.to_string(),
                "status": status.label(),
                "reason": reason,
            });
            return (StatusCode::CONFLICT, axum::Json(payload)).into_response();
        }
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
        WorkflowError::ConcurrencyConflict { .. } => StatusCode::CONFLICT,
        WorkflowError::Suggestion(SuggestionError::NotFound { .. }) => StatusCode::NOT_FOUND,
        WorkflowError::Suggestion(SuggestionError::AlreadyAnswered { .. }) => StatusCode::CONFLICT,
        WorkflowError::Suggestion(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        WorkflowError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        WorkflowError::Repository(_) | WorkflowError::Directory(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
