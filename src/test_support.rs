use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request},
    Router,
};
use sqlx::types::Json;

use crate::api;
use crate::core::{config::Settings, redis::RedisHandle, state::AppState};
use crate::db::models::AttemptRow;
use crate::services::scoring::{AnswerRecord, BankSource, Question};
use crate::services::submission::{
    AttemptReader, AttemptReplacer, AttemptWriter, NewAttempt, QuestionBankReader, StoreError,
};

type BankKey = (BankSource, String, Option<String>);

#[derive(Default)]
struct StoreData {
    banks: HashMap<BankKey, Vec<Question>>,
    attempts: Vec<NewAttempt>,
    /// `(student, exam variant)` -> `(submission id, answer)` rows.
    legacy: HashMap<(String, String), Vec<(String, AnswerRecord)>>,
    fail_writes: bool,
}

/// Exam storage held in memory so pipeline and HTTP tests run without Postgres.
#[derive(Clone, Default)]
pub(crate) struct InMemoryStore {
    data: Arc<Mutex<StoreData>>,
}

impl InMemoryStore {
    fn data(&self) -> MutexGuard<'_, StoreData> {
        self.data.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn put_bank(
        &self,
        source: BankSource,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
        questions: Vec<Question>,
    ) {
        self.data().banks.insert(
            (source, exam_variant_id.to_string(), mock_variant_id.map(str::to_string)),
            questions,
        );
    }

    pub(crate) fn saved_attempts(&self) -> Vec<NewAttempt> {
        self.data().attempts.clone()
    }

    /// Stored legacy rows for one student and variant, by question number.
    pub(crate) fn legacy_answers(
        &self,
        student_id: &str,
        exam_variant_id: &str,
    ) -> Vec<(String, AnswerRecord)> {
        let mut rows = self
            .data()
            .legacy
            .get(&(student_id.to_string(), exam_variant_id.to_string()))
            .cloned()
            .unwrap_or_default();
        rows.sort_by_key(|(_, record)| record.question_number);
        rows
    }

    pub(crate) fn fail_writes(&self) {
        self.data().fail_writes = true;
    }
}

fn attempt_row(attempt: &NewAttempt) -> AttemptRow {
    AttemptRow {
        id: attempt.id.clone(),
        student_id: attempt.student_id.clone(),
        exam_variant_id: attempt.exam_variant_id.clone(),
        mock_variant_id: attempt.mock_variant_id.clone(),
        total_marks: attempt.totals.total_marks,
        attempted_count: attempt.totals.attempted_count,
        skipped_count: attempt.totals.skipped_count,
        correct_count: attempt.totals.correct_count,
        wrong_count: attempt.totals.wrong_count,
        not_visited_count: attempt.totals.not_visited_count,
        auto_submitted: attempt.auto_submitted,
        started_at: attempt.started_at,
        ended_at: attempt.ended_at,
        answers: Json(attempt.answers.clone()),
        submitted_at: attempt.submitted_at,
    }
}

#[async_trait]
impl QuestionBankReader for InMemoryStore {
    async fn find_in(
        &self,
        source: BankSource,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<Question>, StoreError> {
        let key = (source, exam_variant_id.to_string(), mock_variant_id.map(str::to_string));
        Ok(self.data().banks.get(&key).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl AttemptWriter for InMemoryStore {
    async fn save(&self, attempt: &NewAttempt) -> Result<String, StoreError> {
        let mut data = self.data();
        if data.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        data.attempts.push(attempt.clone());
        Ok(attempt.id.clone())
    }
}

#[async_trait]
impl AttemptReplacer for InMemoryStore {
    async fn replace(
        &self,
        student_id: &str,
        exam_variant_id: &str,
        submission_id: &str,
        answers: &[AnswerRecord],
    ) -> Result<(), StoreError> {
        let mut data = self.data();
        if data.fail_writes {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        let rows = answers
            .iter()
            .map(|record| (submission_id.to_string(), record.clone()))
            .collect();
        data.legacy.insert((student_id.to_string(), exam_variant_id.to_string()), rows);
        Ok(())
    }
}

#[async_trait]
impl AttemptReader for InMemoryStore {
    async fn find_attempt(&self, attempt_id: &str) -> Result<Option<AttemptRow>, StoreError> {
        Ok(self.data().attempts.iter().find(|attempt| attempt.id == attempt_id).map(attempt_row))
    }

    async fn list_for_student(&self, student_id: &str) -> Result<Vec<AttemptRow>, StoreError> {
        Ok(self
            .data()
            .attempts
            .iter()
            .rev()
            .filter(|attempt| attempt.student_id.as_deref() == Some(student_id))
            .map(attempt_row)
            .collect())
    }

    async fn list_for_variant(
        &self,
        exam_variant_id: &str,
        mock_variant_id: Option<&str>,
    ) -> Result<Vec<AttemptRow>, StoreError> {
        Ok(self
            .data()
            .attempts
            .iter()
            .filter(|attempt| {
                attempt.exam_variant_id == exam_variant_id
                    && attempt.mock_variant_id.as_deref() == mock_variant_id
            })
            .map(attempt_row)
            .collect())
    }
}

/// App state over `store` with a lazy pool and a disconnected Redis handle:
/// nothing touches the network until a handler queries Postgres.
pub(crate) fn test_state(settings: Settings, store: InMemoryStore) -> AppState {
    let db = sqlx::PgPool::connect_lazy(&settings.database().database_url()).expect("lazy pool");
    let redis = RedisHandle::new(settings.redis().redis_url());
    AppState::new(settings, db, redis, Arc::new(store))
}

pub(crate) fn test_app(settings: Settings, store: InMemoryStore) -> Router {
    api::router::router(test_state(settings, store))
}

pub(crate) fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    if let Some(body) = body {
        let bytes = serde_json::to_vec(&body).expect("serialize body");
        builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(bytes))
            .expect("request body")
    } else {
        builder.body(Body::empty()).expect("request body")
    }
}

pub(crate) async fn read_json(response: axum::response::Response<Body>) -> serde_json::Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("response body");
    serde_json::from_slice(&body).unwrap_or_else(|err| {
        let body_text = String::from_utf8_lossy(&body);
        panic!("json parse: {err}; body: {body_text}");
    })
}
