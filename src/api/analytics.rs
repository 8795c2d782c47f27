use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::schemas::analytics::{
    StudentAnalyticsResponse, VariantAnalyticsQuery, VariantAnalyticsResponse,
};
use crate::services::analytics::{summarize_student, summarize_variant};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/variants/:exam_variant_id", get(variant_analytics))
        .route("/students/:student_id", get(student_analytics))
}

async fn variant_analytics(
    Path(exam_variant_id): Path<String>,
    Query(query): Query<VariantAnalyticsQuery>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<VariantAnalyticsResponse>, ApiError> {
    let mock_variant_id =
        query.mock_variant_id.as_deref().map(str::trim).filter(|value| !value.is_empty());

    let attempts = state.store().list_for_variant(&exam_variant_id, mock_variant_id).await?;
    Ok(Json(summarize_variant(&exam_variant_id, mock_variant_id, &attempts)))
}

async fn student_analytics(
    Path(student_id): Path<String>,
    CurrentAdmin(_admin): CurrentAdmin,
    State(state): State<AppState>,
) -> Result<Json<StudentAnalyticsResponse>, ApiError> {
    let attempts = state.store().list_for_student(&student_id).await?;
    Ok(Json(summarize_student(&student_id, &attempts)))
}
