use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{ensure_owner_or_admin, CurrentUser, MaybeUser};
use crate::core::state::AppState;
use crate::db::models::User;
use crate::repositories;
use crate::schemas::attempt::{
    AttemptDetailResponse, AttemptSummaryResponse, LegacyAnswerResponse, LegacyAnswersQuery,
    SubmitAttemptRequest, SubmitAttemptResponse,
};
use crate::services::submission::{self, PersistMode, Submission, SubmissionOutcome};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit_attempt))
        .route("/legacy", get(list_legacy_answers).post(submit_legacy))
        .route("/mine", get(list_my_attempts))
        .route("/:attempt_id", get(get_attempt))
}

/// Scores and stores one attempt. Guests may submit anonymously; a body
/// `student_id` must belong to the bearer.
async fn submit_attempt(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<(StatusCode, Json<SubmitAttemptResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student_id = resolve_student(user.as_ref(), payload.student_id.as_deref())?;
    if let Some(student_id) = student_id.as_deref() {
        enforce_submit_rate_limit(&state, student_id).await?;
    }

    let submission = into_submission(payload, student_id);
    let outcome = submission::submit(
        state.store(),
        submission,
        PersistMode::Attempt,
        state.settings().scoring().max_answers_per_submission,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome_response(outcome))))
}

/// Per-question submission path kept for older clients. Requires a student.
async fn submit_legacy(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<(StatusCode, Json<SubmitAttemptResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let student_id = resolve_student(Some(&user), payload.student_id.as_deref())?
        .unwrap_or_else(|| user.id.clone());
    enforce_submit_rate_limit(&state, &student_id).await?;

    let submission = into_submission(payload, Some(student_id.clone()));
    let outcome = submission::submit(
        state.store(),
        submission,
        PersistMode::ReplaceForStudent { student_id },
        state.settings().scoring().max_answers_per_submission,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(outcome_response(outcome))))
}

async fn list_legacy_answers(
    Query(query): Query<LegacyAnswersQuery>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<LegacyAnswerResponse>>, ApiError> {
    let rows =
        repositories::exam_answers::list_for_student(state.db(), &user.id, query.exam_variant_id.trim())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list stored answers"))?;
    Ok(Json(rows.into_iter().map(LegacyAnswerResponse::from).collect()))
}

async fn list_my_attempts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AttemptSummaryResponse>>, ApiError> {
    let attempts = state.store().list_for_student(&user.id).await?;
    Ok(Json(attempts.into_iter().map(AttemptSummaryResponse::from).collect()))
}

async fn get_attempt(
    Path(attempt_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AttemptDetailResponse>, ApiError> {
    let attempt = state
        .store()
        .find_attempt(&attempt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Attempt not found".to_string()))?;

    ensure_owner_or_admin(&user, attempt.student_id.as_deref())?;
    Ok(Json(AttemptDetailResponse::from(attempt)))
}

/// The attempt owner: the body value when it matches the bearer, otherwise the
/// bearer itself. A body value without a bearer is rejected.
fn resolve_student(user: Option<&User>, claimed: Option<&str>) -> Result<Option<String>, ApiError> {
    let claimed = claimed.map(str::trim).filter(|value| !value.is_empty());
    match (user, claimed) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ApiError::Unauthorized("Authentication required to submit as a student")),
        (Some(user), Some(claimed)) if claimed != user.id => {
            Err(ApiError::Forbidden("Cannot submit attempts for another student"))
        }
        (Some(user), _) => Ok(Some(user.id.clone())),
    }
}

async fn enforce_submit_rate_limit(state: &AppState, student_id: &str) -> Result<(), ApiError> {
    let scoring = state.settings().scoring();
    let allowed = state
        .redis()
        .rate_limit(
            &format!("rl:submit:{student_id}"),
            scoring.submit_rate_limit,
            scoring.submit_rate_window_seconds,
        )
        .await
        .unwrap_or(true);
    if allowed {
        Ok(())
    } else {
        Err(ApiError::TooManyRequests("Too many submissions, try again later"))
    }
}

fn into_submission(payload: SubmitAttemptRequest, student_id: Option<String>) -> Submission {
    Submission {
        exam_variant_id: payload.exam_variant_id,
        mock_variant_id: payload.mock_variant_id,
        student_id,
        auto_submitted: payload.auto_submitted,
        started_at: payload.started_at,
        ended_at: payload.ended_at,
        answers: payload.attempts,
    }
}

fn outcome_response(outcome: SubmissionOutcome) -> SubmitAttemptResponse {
    SubmitAttemptResponse::new(
        outcome.attempt_id,
        outcome.target.exam_variant_id().to_string(),
        outcome.target.mock_variant_id().map(str::to_string),
        outcome.scored.totals,
        outcome.scored.records,
    )
}
