//! Graduation Dashboard Server
//!
//! Role-based backend for on-time graduation predictions.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  GRADUATION DASHBOARD                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────┐  ┌─────────────────────────┐ │
//! │  │  API      │  │  Auth     │  │  Prediction Pipeline    │ │
//! │  │  Gateway  │  │  Service  │  │  (prediction-core)      │ │
//! │  │  (Axum)   │  │  (JWT)    │  │                         │ │
//! │  └─────┬─────┘  └─────┬─────┘  └────────────┬────────────┘ │
//! │        └──────────────┼──────────────────────┘              │
//! │                       ▼                                     │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │                             │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod middleware;
mod error;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post, put, delete},
    middleware as axum_middleware,
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use prediction_core::{Classifier, PredictionService, PredictionStore, ProfileDirectory};

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging (also captures `log` records from prediction-core)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "dashboard_server=debug,prediction_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    tracing::info!("Graduation Dashboard Server starting...");
    tracing::info!("Database: {}", config.database_url.split('@').last().unwrap_or("***"));

    // Load the classifier; a missing model only disables prediction routes
    let classifier = prediction_core::model::init(&config.model_path);
    match classifier.unavailable_cause() {
        None => tracing::info!("Classifier ready ({})", config.model_path),
        Some(cause) => tracing::warn!("Classifier unavailable, predictions disabled: {}", cause),
    }

    // Initialize database pool
    let pool = db::create_pool(&config.database_url).await
        .context("Failed to create database pool")?;

    // Run migrations
    tracing::info!("Running database migrations...");
    db::run_migrations(&pool).await
        .context("Failed to run migrations")?;

    if let Some((username, password)) = &config.bootstrap_admin {
        if config.is_production() {
            tracing::warn!("ADMIN_PASSWORD is set in production; unset it once the account exists");
        }
        handlers::auth::bootstrap_admin(&pool, username, password).await
            .context("Failed to create bootstrap account")?;
    }

    // Build application state
    let state = AppState::new(
        pool.clone(),
        config.clone(),
        classifier,
        Arc::new(models::PgPredictionStore::new(pool.clone())),
        Arc::new(models::PgProfileDirectory::new(pool)),
    );

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: sqlx::PgPool,
    pub config: config::Config,
    pub service: PredictionService,
    pub predictions: Arc<dyn PredictionStore>,
    pub profiles: Arc<dyn ProfileDirectory>,
}

impl AppState {
    pub fn new(
        pool: sqlx::PgPool,
        config: config::Config,
        classifier: Arc<Classifier>,
        predictions: Arc<dyn PredictionStore>,
        profiles: Arc<dyn ProfileDirectory>,
    ) -> Self {
        Self {
            pool,
            config,
            service: PredictionService::new(classifier, Arc::clone(&profiles)),
            predictions,
            profiles,
        }
    }
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/api/v1/auth/login", post(handlers::auth::login));

    // Authenticated routes (user JWT auth, role checked per handler)
    let user_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::me))

        // Student
        .route("/api/v1/student/dashboard", get(handlers::student::dashboard))
        .route("/api/v1/student/predictions", post(handlers::student::predict))

        // Lecturer
        .route("/api/v1/lecturer/dashboard", get(handlers::lecturer::dashboard))

        // Academic: predictions and reports
        .route("/api/v1/academic/predictions", get(handlers::academic::list_predictions))
        .route("/api/v1/academic/predictions", delete(handlers::academic::delete_all))
        .route("/api/v1/academic/predictions/student/:student_id", delete(handlers::academic::delete_by_student))
        .route("/api/v1/academic/predictions/:record_id", delete(handlers::academic::delete_record))
        .route("/api/v1/academic/risk-summary", get(handlers::academic::risk_summary))
        .route("/api/v1/academic/summary", get(handlers::academic::summary))
        .route("/api/v1/academic/students/:id/history", get(handlers::academic::student_detail))
        .route("/api/v1/academic/export.csv", get(handlers::academic::export_csv))
        .route("/api/v1/academic/batch", post(handlers::academic::batch))

        // Academic: directory
        .route("/api/v1/academic/lecturers", get(handlers::users::list_lecturers))
        .route("/api/v1/academic/lecturers", post(handlers::users::create_lecturer))
        .route("/api/v1/academic/lecturers/:id", put(handlers::users::update_lecturer))
        .route("/api/v1/academic/lecturers/:id", delete(handlers::users::delete_lecturer))
        .route("/api/v1/academic/students", get(handlers::users::list_students))
        .route("/api/v1/academic/students", post(handlers::users::create_student))
        .route("/api/v1/academic/students/:id", put(handlers::users::update_student))
        .route("/api/v1/academic/students/:id", delete(handlers::users::delete_student))
        .route("/api/v1/academic/students/:id/advisor", put(handlers::users::assign_advisor))

        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_user_auth
        ));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use prediction_core::model::artifact::parse_json_model;
    use prediction_core::store::{MemoryPredictionStore, MemoryProfileDirectory};
    use prediction_core::{PredictionRecord, StoreError, StudentProfile};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::middleware::auth::generate_jwt;
    use crate::models::User;

    const HALF_MODEL: &str =
        r#"{"kind": "logistic", "coefficients": [0.0, 0.0, 0.0, 0.0], "intercept": 0.0}"#;

    struct Harness {
        app: Router,
        store: Arc<MemoryPredictionStore>,
        config: config::Config,
    }

    /// Router over the given stores; the pool is never connected
    fn router(config: &config::Config, classifier: Classifier, store: Arc<dyn PredictionStore>) -> Router {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        let profiles = MemoryProfileDirectory::new().with_profile(
            "siti",
            StudentProfile::new("Siti Aminah", "2101001", "Informatics", "2021", "IF-A"),
        );

        create_router(AppState::new(
            pool,
            config.clone(),
            Arc::new(classifier),
            store,
            Arc::new(profiles),
        ))
    }

    fn harness(classifier: Classifier) -> Harness {
        let config = config::Config::for_tests();
        let store = Arc::new(MemoryPredictionStore::new());
        let app = router(&config, classifier, store.clone());
        Harness { app, store, config }
    }

    /// Fails any write of more than one record, keeping nothing
    struct FailsOnSecondInsert {
        inner: MemoryPredictionStore,
    }

    #[async_trait::async_trait]
    impl PredictionStore for FailsOnSecondInsert {
        async fn save(&self, record: &PredictionRecord) -> Result<(), StoreError> {
            self.inner.save(record).await
        }
        async fn save_all(&self, records: &[PredictionRecord]) -> Result<u64, StoreError> {
            if records.len() > 1 {
                return Err(StoreError::Backend("connection reset on insert 2".to_string()));
            }
            self.inner.save_all(records).await
        }
        async fn load_all(&self) -> Result<Vec<PredictionRecord>, StoreError> {
            self.inner.load_all().await
        }
        async fn delete_all(&self) -> Result<u64, StoreError> {
            self.inner.delete_all().await
        }
        async fn delete_by_student_id(&self, student_id: &str) -> Result<u64, StoreError> {
            self.inner.delete_by_student_id(student_id).await
        }
        async fn delete_by_record_id(&self, id: Uuid) -> Result<u64, StoreError> {
            self.inner.delete_by_record_id(id).await
        }
    }

    fn ready() -> Classifier {
        Classifier::from_model(parse_json_model(HALF_MODEL).unwrap())
    }

    fn token(config: &config::Config, username: &str, role: &str) -> String {
        let now = chrono::Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: String::new(),
            name: None,
            role: role.to_string(),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        format!("Bearer {}", generate_jwt(&user, &config.jwt_secret, 1).unwrap())
    }

    fn request(method: &str, uri: &str, auth: Option<&str>, body: Body) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.header(header::CONTENT_TYPE, "application/json").body(body).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_missing_model() {
        let h = harness(Classifier::unavailable("Model not found: model/graduation_model.json"));
        let response = h.app.oneshot(request("GET", "/health", None, Body::empty())).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["classifier"]["model_loaded"], false);
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = harness(ready());
        let response = h
            .app
            .oneshot(request("GET", "/api/v1/student/dashboard", None, Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_wrong_role_is_forbidden() {
        let h = harness(ready());
        let auth = token(&h.config, "dosen", "lecturer");
        let response = h
            .app
            .oneshot(request("GET", "/api/v1/academic/predictions", Some(&auth), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_student_prediction_is_saved() {
        let h = harness(ready());
        let auth = token(&h.config, "siti", "student");
        let body = Body::from(
            r#"{"gpa": "3.2", "repeat_count": 2, "attendance_percent": 80, "credits_passed": 90}"#,
        );

        let response = h
            .app
            .oneshot(request("POST", "/api/v1/student/predictions", Some(&auth), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let record = json_body(response).await;
        assert_eq!(record["probability"], 50.0);
        assert_eq!(record["risk"], "High Risk");
        assert_eq!(record["student_id"], "2101001");
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_gpa_names_field() {
        let h = harness(ready());
        let auth = token(&h.config, "siti", "student");
        let body = Body::from(
            r#"{"gpa": "", "repeat_count": 0, "attendance_percent": 90, "credits_passed": 100}"#,
        );

        let response = h
            .app
            .oneshot(request("POST", "/api/v1/student/predictions", Some(&auth), body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["field"], "gpa");
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_profile_is_not_found() {
        let h = harness(ready());
        let auth = token(&h.config, "budi", "student");
        let body = Body::from(
            r#"{"gpa": 3.0, "repeat_count": 0, "attendance_percent": 90, "credits_passed": 100}"#,
        );

        let response = h
            .app
            .oneshot(request("POST", "/api/v1/student/predictions", Some(&auth), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_model_is_service_unavailable() {
        let h = harness(Classifier::unavailable("Model not found"));
        let auth = token(&h.config, "siti", "student");
        let body = Body::from(
            r#"{"gpa": 3.0, "repeat_count": 0, "attendance_percent": 90, "credits_passed": 100}"#,
        );

        let response = h
            .app
            .oneshot(request("POST", "/api/v1/student/predictions", Some(&auth), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_batch_upload_saves_good_rows() {
        let h = harness(ready());
        let auth = token(&h.config, "admin", "academic");
        let csv = "name,student_id,gpa,repeat_count,attendance_percent,credits_passed\n\
                   Siti,2101001,3.2,2,80,90\n\
                   Budi,2101002,abc,0,90,100\n";

        let response = h
            .app
            .clone()
            .oneshot(request("POST", "/api/v1/academic/batch?save=true", Some(&auth), Body::from(csv)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["saved"], 1);
        assert_eq!(body["failed"], 1);
        assert_eq!(body["rows"][1]["error"]["field"], "gpa");
        assert_eq!(h.store.len(), 1);

        let response = h
            .app
            .oneshot(request("GET", "/api/v1/academic/students/2101001.0/history", Some(&auth), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await[0]["username"], "admin");
    }

    #[tokio::test]
    async fn test_history_not_found_and_export() {
        let h = harness(ready());
        let auth = token(&h.config, "admin", "academic");

        let response = h
            .app
            .clone()
            .oneshot(request("GET", "/api/v1/academic/students/999/history", Some(&auth), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = h
            .app
            .oneshot(request("GET", "/api/v1/academic/export.csv", Some(&auth), Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    }

    #[tokio::test]
    async fn test_purge_by_student() {
        let h = harness(ready());
        let student = token(&h.config, "siti", "student");
        let academic = token(&h.config, "admin", "academic");
        let body = r#"{"gpa": 3.0, "repeat_count": 0, "attendance_percent": 90, "credits_passed": 100}"#;

        for _ in 0..2 {
            let response = h
                .app
                .clone()
                .oneshot(request("POST", "/api/v1/student/predictions", Some(&student), Body::from(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = h
            .app
            .oneshot(request(
                "DELETE",
                "/api/v1/academic/predictions/student/2101001",
                Some(&academic),
                Body::empty(),
            ))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["deleted"], 2);
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_batch_save_failure_keeps_nothing() {
        let config = config::Config::for_tests();
        let store = Arc::new(FailsOnSecondInsert { inner: MemoryPredictionStore::new() });
        let app = router(&config, ready(), store.clone());
        let auth = token(&config, "admin", "academic");
        let two_rows = "name,student_id,gpa,repeat_count,attendance_percent,credits_passed\n\
                        Siti,2101001,3.2,2,80,90\n\
                        Budi,2101002,3.0,0,90,100\n";

        let response = app
            .clone()
            .oneshot(request("POST", "/api/v1/academic/batch?save=true", Some(&auth), Body::from(two_rows)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "Database error occurred");
        assert!(store.inner.is_empty());

        let one_row = "name,student_id,gpa,repeat_count,attendance_percent,credits_passed\n\
                       Siti,2101001,3.2,2,80,90\n";
        let response = app
            .oneshot(request("POST", "/api/v1/academic/batch?save=true", Some(&auth), Body::from(one_row)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["saved"], 1);
        assert_eq!(store.inner.len(), 1);
    }

    #[tokio::test]
    async fn test_directory_bodies_rejected_before_storage() {
        let h = harness(ready());
        let auth = token(&h.config, "admin", "academic");
        let id = Uuid::new_v4();

        let cases = [
            ("PUT", format!("/api/v1/academic/lecturers/{}", id), r#"{"username": "x"}"#.to_string()),
            (
                "PUT",
                format!("/api/v1/academic/students/{}", id),
                r#"{"student_id": "2101001", "name": ""}"#.to_string(),
            ),
            (
                "POST",
                "/api/v1/academic/students".to_string(),
                format!(
                    r#"{{"student_id": "2101001", "name": "Siti", "username": "{}", "password": "long-enough"}}"#,
                    "u".repeat(101)
                ),
            ),
        ];

        for (method, uri, body) in cases {
            let response = h
                .app
                .clone()
                .oneshot(request(method, &uri, Some(&auth), Body::from(body)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        }
    }

    #[tokio::test]
    async fn test_directory_updates_need_academic_role() {
        let h = harness(ready());
        let auth = token(&h.config, "dosen", "lecturer");
        let uri = format!("/api/v1/academic/students/{}", Uuid::new_v4());

        let response = h
            .app
            .oneshot(request("PUT", &uri, Some(&auth), Body::from(r#"{"student_id": "1", "name": "A"}"#)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
