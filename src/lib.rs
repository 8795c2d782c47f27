pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::repositories::store::PgExamStore;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without rate limits");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let store = Arc::new(PgExamStore::new(db_pool.clone()));
    let state = AppState::new(settings, db_pool, redis.clone(), store);

    if let Err(err) = core::bootstrap::ensure_superuser(&state).await {
        tracing::error!(error = %err, "Failed to ensure default superuser");
    }
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Examhall API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Fills in `question_type` for rows stored before the column was required.
/// Returns the number of rows updated.
pub async fn backfill_question_types(dry_run: bool) -> anyhow::Result<usize> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let rows = repositories::questions::list_untyped(&db_pool).await?;
    tracing::info!(rows = rows.len(), dry_run, "Questions without a stored type");

    let mut updated = 0;
    for row in &rows {
        let inferred = services::question_bank::infer_question_type(row);
        tracing::info!(
            question_id = %row.id,
            exam_variant_id = %row.exam_variant_id,
            question_number = row.question_number,
            question_type = inferred.as_str(),
            "Inferred question type"
        );
        if !dry_run {
            repositories::questions::set_type(&db_pool, &row.id, inferred).await?;
            updated += 1;
        }
    }

    db_pool.close().await;
    Ok(updated)
}
