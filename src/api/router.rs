use axum::{
    http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
    http::{HeaderName, Method, Request, Response},
    routing::get,
    Router,
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    normalize_path::NormalizePathLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::api::{analytics, attempts, auth, handlers, students, variants};
use crate::core::{config::Settings, state::AppState};

pub(crate) fn router(state: AppState) -> Router {
    let cors = build_cors_layer(state.settings());
    let api_v1_prefix = state.settings().api().api_v1_str.clone();
    let api_v1 = Router::new()
        .nest("/auth", auth::router())
        .nest("/students", students::router())
        .nest("/exam-variants", variants::router())
        .nest("/questions", variants::questions_router())
        .nest("/attempts", attempts::router())
        .nest("/analytics", analytics::router());

    let request_id_header = HeaderName::from_static("x-request-id");
    let request_id_header_for_span = request_id_header.clone();
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(move |request: &Request<_>| {
            let request_id = request
                .headers()
                .get(&request_id_header_for_span)
                .and_then(|value| value.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id
            )
        })
        .on_response(|response: &Response<axum::body::Body>, latency: Duration, _span: &Span| {
            let status_label = response.status().as_u16().to_string();
            metrics::counter!(
                "http_requests_total",
                "status" => status_label.clone()
            )
            .increment(1);
            metrics::histogram!(
                "http_request_duration_seconds",
                "status" => status_label
            )
            .record(latency.as_secs_f64());
        });

    let mut router: Router<AppState> = Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz).head(handlers::healthz))
        .nest(&api_v1_prefix, api_v1);

    if state.settings().telemetry().prometheus_enabled {
        router = router.route("/metrics", get(handlers::metrics));
    }

    router
        .layer(NormalizePathLayer::trim_trailing_slash())
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

fn build_cors_layer(settings: &Settings) -> CorsLayer {
    let origins = settings
        .cors()
        .origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            ACCEPT,
            ORIGIN,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([HeaderName::from_static("x-request-id")])
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() {
        // Wildcard origin cannot be combined with allow_credentials
        base.allow_origin(Any)
    } else {
        base.allow_credentials(true).allow_origin(AllowOrigin::list(origins))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::core::{config::Settings, metrics};
    use crate::db::types::{BranchKey, OptionLabel};
    use crate::services::scoring::{BankSource, BranchLink, Question, QuestionKind};
    use crate::test_support::{self, json_request, read_json, InMemoryStore};

    fn simple(number: i32, correct: OptionLabel) -> Question {
        Question {
            id: format!("q-{number}"),
            number,
            text: format!("Question {number}"),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            kind: QuestionKind::Simple { correct },
        }
    }

    fn branch_bank() -> Vec<Question> {
        vec![
            Question {
                id: "q-1".into(),
                number: 1,
                text: "Pick a path".into(),
                options: vec!["left".into(), "right".into()],
                kind: QuestionKind::BranchParent,
            },
            Question {
                kind: QuestionKind::BranchChild {
                    correct: OptionLabel::A,
                    link: Some(BranchLink { parent_question: 1, branch_key: BranchKey::A }),
                },
                ..simple(2, OptionLabel::A)
            },
            Question {
                kind: QuestionKind::BranchChild {
                    correct: OptionLabel::B,
                    link: Some(BranchLink { parent_question: 1, branch_key: BranchKey::B }),
                },
                ..simple(3, OptionLabel::B)
            },
        ]
    }

    #[tokio::test]
    async fn root_returns_message() {
        let app = test_support::test_app(Settings::for_tests(), InMemoryStore::default());

        let response = app.oneshot(json_request(Method::GET, "/", None, None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        assert_eq!(json["message"], "Examhall API");
        assert_eq!(json["api_prefix"], "/api/v1");
    }

    #[tokio::test]
    async fn metrics_disabled_returns_404() {
        let app = test_support::test_app(Settings::for_tests(), InMemoryStore::default());

        let response =
            app.oneshot(json_request(Method::GET, "/metrics", None, None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_enabled_returns_200() {
        let settings = Settings::for_tests().with_prometheus(true);
        metrics::init(&settings).expect("metrics init");
        let app = test_support::test_app(settings, InMemoryStore::default());

        let response =
            app.oneshot(json_request(Method::GET, "/metrics", None, None)).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn guest_submission_is_scored_with_branch_visibility() {
        let store = InMemoryStore::default();
        store.put_bank(BankSource::Primary, "ev-1", None, branch_bank());
        let app = test_support::test_app(Settings::for_tests(), store.clone());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/attempts",
                None,
                Some(json!({
                    "examVariantId": "ev-1",
                    "attempts": [
                        {"questionNumber": 1, "selectedAnswer": "A", "status": "attempted"},
                        {"questionNumber": 2, "selectedAnswer": "A", "status": "attempted"},
                        {"questionNumber": 3, "selectedAnswer": "B", "status": "attempted"}
                    ]
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = read_json(response).await;
        assert_eq!(json["total_marks"], 1.0);
        assert_eq!(json["attempted_count"], 1);
        assert_eq!(json["correct_count"], 1);
        let details = json["detailed_attempts"].as_array().expect("details");
        assert_eq!(details.len(), 3);
        assert_eq!(details[2]["status"], "not_visited");
        assert!(details[2]["selected_answer"].is_null());

        let saved = store.saved_attempts();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].student_id.is_none());
    }

    #[tokio::test]
    async fn missing_exam_variant_is_bad_request() {
        let app = test_support::test_app(Settings::for_tests(), InMemoryStore::default());

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/attempts", None, Some(json!({"attempts": []}))))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = read_json(response).await;
        assert_eq!(json["detail"], "examVariantId required");
    }

    #[tokio::test]
    async fn unknown_variant_is_not_found() {
        let app = test_support::test_app(Settings::for_tests(), InMemoryStore::default());

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/attempts",
                None,
                Some(json!({"examVariantId": "missing", "attempts": []})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn claimed_student_without_token_is_unauthorized() {
        let store = InMemoryStore::default();
        store.put_bank(BankSource::Primary, "ev-1", None, vec![simple(1, OptionLabel::A)]);
        let app = test_support::test_app(Settings::for_tests(), store);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/attempts",
                None,
                Some(json!({"examVariantId": "ev-1", "studentId": "s-1", "attempts": []})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn paper_hides_answer_keys() {
        let store = InMemoryStore::default();
        store.put_bank(BankSource::Primary, "ev-1", None, vec![simple(1, OptionLabel::C)]);
        let app = test_support::test_app(Settings::for_tests(), store);

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/exam-variants/ev-1/paper", None, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = read_json(response).await;
        let questions = json.as_array().expect("questions");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0]["question_type"], "simple");
        assert!(questions[0].get("correct_answer").is_none());
    }

    #[tokio::test]
    async fn admin_routes_require_authentication() {
        let app = test_support::test_app(Settings::for_tests(), InMemoryStore::default());

        let response = app
            .oneshot(json_request(Method::GET, "/api/v1/students", None, None))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
