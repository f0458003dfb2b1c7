use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use syllabus_core::{BatchConfig, BatchCoordinator, ItemError, WorkflowEngine, submit_plan};
use syllabus_store::{
    InMemoryPlanRegistry, LearningPlan, ListQuery, Page, PlanRequest, PlanStore, RegistryConfig,
    RegistryError, StageKind, StoredPlan, ValidationError,
};

use crate::batch_cmd::{BatchItemResponse, DecodedBatch, GENERATION_FAILED, success_summary};
use crate::config::SyllabusConfig;

const PLAN_NOT_FOUND: &str = "Learning plan not found";

fn timestamp() -> String {
    Utc::now().to_rfc3339()
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    /// Logs the cause; the client only sees a generic message.
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: GENERATION_FAILED.to_string(),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(_) => Self::not_found(PLAN_NOT_FOUND),
        }
    }
}

impl From<ItemError> for AppError {
    fn from(e: ItemError) -> Self {
        match e {
            ItemError::Validation(v) => v.into(),
            other => Self::internal(other),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({
            "success": false,
            "message": self.message,
            "timestamp": timestamp(),
        });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// State and response types
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    pub store: Arc<dyn PlanStore>,
    pub batch: BatchCoordinator,
    pub registry: RegistryConfig,
    /// Cancelled on shutdown; in-flight plans stop before their next stage.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        engine: WorkflowEngine,
        store: Arc<dyn PlanStore>,
        batch: BatchConfig,
        registry: RegistryConfig,
    ) -> Self {
        let batch = BatchCoordinator::new(engine.clone(), Arc::clone(&store), batch);
        Self {
            engine,
            store,
            batch,
            registry,
            shutdown: CancellationToken::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
    pub generator: String,
}

#[derive(Debug, Serialize)]
pub struct GeneratePlanResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: LearningPlan,
    pub request_id: Uuid,
    pub degraded: bool,
    pub fallbacks: Vec<StageKind>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

impl<T> DataResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: timestamp(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<BatchItemResponse>,
    pub timestamp: String,
}

/// Raw pagination parameters; parsed by hand so bad values get a 400 in
/// the standard error envelope.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

fn parse_param(name: &str, value: Option<&str>) -> Result<Option<usize>, AppError> {
    value
        .map(|v| {
            v.trim().parse::<usize>().map_err(|_| {
                AppError::bad_request(format!("{name} must be a non-negative integer (got {v:?})"))
            })
        })
        .transpose()
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/v1/generate-plan", post(generate_plan))
        .route("/api/v1/plan/{request_id}", get(get_plan).delete(delete_plan))
        .route("/api/v1/plans", get(list_plans))
        .route("/api/v1/batch-generate", post(batch_generate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(config: &SyllabusConfig) -> Result<()> {
    let engine = WorkflowEngine::new(config.build_generator()?, config.workflow.clone());
    let store: Arc<dyn PlanStore> = Arc::new(InMemoryPlanRegistry::new());
    let state = AppState::new(engine, store, config.batch.clone(), config.registry);
    let shutdown = state.shutdown.clone();

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.bind, config.port).parse()?;
    tracing::info!("syllabus serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    tracing::info!("syllabus serve shut down");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    shutdown.cancel();
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index() -> Json<serde_json::Value> {
    let endpoints: HashMap<&str, &str> = HashMap::from([
        ("health", "GET /health"),
        ("generate_plan", "POST /api/v1/generate-plan"),
        ("get_plan", "GET /api/v1/plan/{request_id}"),
        ("list_plans", "GET /api/v1/plans?limit&offset"),
        ("delete_plan", "DELETE /api/v1/plan/{request_id}"),
        ("batch_generate", "POST /api/v1/batch-generate"),
    ]);
    Json(serde_json::json!({
        "name": "syllabus",
        "message": "Learning Plan Generator API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
    }))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: timestamp(),
        version: env!("CARGO_PKG_VERSION"),
        generator: state.engine.generator_name().to_string(),
    })
}

async fn generate_plan(
    State(state): State<AppState>,
    body: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<GeneratePlanResponse>, AppError> {
    let Json(request) = body?;
    // Reject before doing any work so the log shows why.
    request.validate()?;
    tracing::info!(topic = %request.topic.trim(), "generating learning plan");

    let stored = submit_plan(
        &state.engine,
        state.store.as_ref(),
        &request,
        state.shutdown.child_token(),
    )
    .await?;

    Ok(Json(GeneratePlanResponse {
        success: true,
        message: "Learning plan generated successfully",
        request_id: stored.request_id,
        degraded: stored.is_degraded(),
        fallbacks: stored.metadata.fallbacks,
        data: stored.plan,
        timestamp: timestamp(),
    }))
}

fn parse_request_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(PLAN_NOT_FOUND))
}

async fn get_plan(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<DataResponse<StoredPlan>>, AppError> {
    let id = parse_request_id(&request_id)?;
    let stored = state.store.get(id).await?;
    Ok(Json(DataResponse::ok(stored)))
}

async fn list_plans(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<DataResponse<Page>>, AppError> {
    let limit = parse_param("limit", params.limit.as_deref())?;
    let offset = parse_param("offset", params.offset.as_deref())?.unwrap_or(0);
    let query = ListQuery::new(state.registry.effective_limit(limit), offset);
    let page = state.store.list(query).await?;
    Ok(Json(DataResponse::ok(page)))
}

async fn delete_plan(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_request_id(&request_id)?;
    state.store.delete(id).await?;
    tracing::info!(request_id = %id, "learning plan deleted");
    Ok(Json(MessageResponse {
        success: true,
        message: "Learning plan deleted successfully".to_string(),
        timestamp: timestamp(),
    }))
}

/// Items are decoded one by one so a malformed entry fails only itself.
async fn batch_generate(
    State(state): State<AppState>,
    body: Result<Json<Vec<serde_json::Value>>, JsonRejection>,
) -> Result<Json<BatchResponse>, AppError> {
    let Json(raw_items) = body?;
    let results = DecodedBatch::decode(raw_items)
        .run(&state.batch, state.shutdown.child_token())
        .await;

    Ok(Json(BatchResponse {
        success: true,
        message: format!("Batch processing completed. {}", success_summary(&results)),
        results,
        timestamp: timestamp(),
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
