use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{ExamVariant, QuestionRow};
use crate::repositories;
use crate::repositories::questions::{Bank, Removal};
use crate::schemas::question::{
    BankQuery, ExamVariantCreate, ExamVariantResponse, MockVariantCreate, MockVariantResponse,
    PaperQuestionResponse, QuestionCreate, QuestionResponse,
};
use crate::services::question_bank::validate_question;
use crate::services::scoring::ExamTarget;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_variants).post(create_variant))
        .route("/:exam_variant_id", get(get_variant))
        .route("/:exam_variant_id/mocks", get(list_mocks).post(create_mock))
        .route("/:exam_variant_id/questions", get(list_questions).post(create_question))
        .route("/:exam_variant_id/paper", get(get_paper))
}

pub(crate) fn questions_router() -> Router<AppState> {
    Router::new().route("/:question_id", get(get_question).delete(delete_question))
}

async fn create_variant(
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<ExamVariantCreate>,
) -> Result<(StatusCode, Json<ExamVariantResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let variant = repositories::exam_variants::create(
        state.db(),
        &Uuid::new_v4().to_string(),
        payload.title.trim(),
        payload.description.as_deref(),
        &admin.id,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam variant"))?;

    tracing::info!(exam_variant_id = %variant.id, admin_id = %admin.id, "Exam variant created");
    Ok((StatusCode::CREATED, Json(ExamVariantResponse::from(variant))))
}

async fn list_variants(
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<ExamVariantResponse>>, ApiError> {
    let variants = repositories::exam_variants::list(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list exam variants"))?;
    Ok(Json(variants.into_iter().map(ExamVariantResponse::from).collect()))
}

async fn get_variant(
    Path(exam_variant_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<ExamVariantResponse>, ApiError> {
    let variant = fetch_variant(&state, &exam_variant_id).await?;
    Ok(Json(ExamVariantResponse::from(variant)))
}

async fn create_mock(
    Path(exam_variant_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<MockVariantCreate>,
) -> Result<(StatusCode, Json<MockVariantResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_variant(&state, &exam_variant_id).await?;

    let mock = repositories::exam_variants::create_mock(
        state.db(),
        &Uuid::new_v4().to_string(),
        &exam_variant_id,
        payload.title.trim(),
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create mock variant"))?;

    tracing::info!(
        exam_variant_id = %exam_variant_id,
        mock_variant_id = %mock.id,
        admin_id = %admin.id,
        "Mock variant created"
    );
    Ok((StatusCode::CREATED, Json(MockVariantResponse::from(mock))))
}

async fn list_mocks(
    Path(exam_variant_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<MockVariantResponse>>, ApiError> {
    fetch_variant(&state, &exam_variant_id).await?;
    let mocks = repositories::exam_variants::list_mocks(state.db(), &exam_variant_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list mock variants"))?;
    Ok(Json(mocks.into_iter().map(MockVariantResponse::from).collect()))
}

async fn create_question(
    Path(exam_variant_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
    Json(payload): Json<QuestionCreate>,
) -> Result<(StatusCode, Json<QuestionResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
    fetch_variant(&state, &exam_variant_id).await?;

    let mock_variant_id =
        payload.mock_variant_id.as_deref().map(str::trim).filter(|value| !value.is_empty());
    if let Some(mock_variant_id) = mock_variant_id {
        repositories::exam_variants::find_mock(state.db(), &exam_variant_id, mock_variant_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch mock variant"))?
            .ok_or_else(|| ApiError::NotFound("Mock variant not found".to_string()))?;
    }

    let bank = Bank::new(&exam_variant_id, mock_variant_id);
    let parent_type = match payload.parent_question {
        Some(number) => repositories::questions::find_type_by_number(state.db(), bank, number)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch parent question"))?,
        None => None,
    };
    let question = validate_question(&payload, parent_type)?;

    let row = repositories::questions::create_numbered(
        state.db(),
        &Uuid::new_v4().to_string(),
        bank,
        &question,
        primitive_now_utc(),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create question"))?;

    tracing::info!(
        question_id = %row.id,
        exam_variant_id = %exam_variant_id,
        mock_variant_id = ?mock_variant_id,
        question_number = row.question_number,
        question_type = question.question_type.as_str(),
        admin_id = %admin.id,
        "Question created"
    );
    Ok((StatusCode::CREATED, Json(QuestionResponse::from(row))))
}

/// Admin listing with answer keys. Mock banks fall back to co-mingled rows
/// the same way submissions do.
async fn list_questions(
    Path(exam_variant_id): Path<String>,
    Query(query): Query<BankQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<QuestionResponse>>, ApiError> {
    let target = ExamTarget::select(Some(&exam_variant_id), query.mock_variant_id.as_deref())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let mut rows: Vec<QuestionRow> = Vec::new();
    for source in target.bank_sources() {
        rows = repositories::questions::list_for_source(
            state.db(),
            *source,
            target.exam_variant_id(),
            target.mock_variant_id(),
        )
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list questions"))?;
        if !rows.is_empty() {
            break;
        }
    }

    Ok(Json(rows.into_iter().map(QuestionResponse::from).collect()))
}

/// Candidate view of a bank: no answer keys, open to guests.
async fn get_paper(
    Path(exam_variant_id): Path<String>,
    Query(query): Query<BankQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PaperQuestionResponse>>, ApiError> {
    let target = ExamTarget::select(Some(&exam_variant_id), query.mock_variant_id.as_deref())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let questions = state.store().find_by_variant(&target).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound("no questions found for this variant".to_string()));
    }

    Ok(Json(questions.into_iter().map(PaperQuestionResponse::from).collect()))
}

async fn get_question(
    Path(question_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let row = repositories::questions::find_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch question"))?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;
    Ok(Json(QuestionResponse::from(row)))
}

async fn delete_question(
    Path(question_id): Path<String>,
    CurrentAdmin(admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let removal = repositories::questions::delete_by_id(state.db(), &question_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete question"))?;
    match removal {
        Removal::Deleted => {}
        Removal::NotFound => return Err(ApiError::NotFound("Question not found".to_string())),
        Removal::Blocked(linked) => return Err(linked.into()),
    }

    tracing::info!(question_id = %question_id, admin_id = %admin.id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_variant(state: &AppState, exam_variant_id: &str) -> Result<ExamVariant, ApiError> {
    repositories::exam_variants::find_by_id(state.db(), exam_variant_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch exam variant"))?
        .ok_or_else(|| ApiError::NotFound("Exam variant not found".to_string()))
}
