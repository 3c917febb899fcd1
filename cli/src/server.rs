use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use vigil_core::content::ContentStore;
use vigil_core::models::{Prayer, ProgressRecord, ProgressStatus, Reflection};
use vigil_core::store::ProgressStore;
use vigil_core::{ContentError, ProgressError, ProgressTracker};

const BODY_LIMIT: usize = 16 * 1024; // 16 KB

/// Storage that can sit behind the shared tracker.
trait SharedStore: ProgressStore + Send + 'static {}

impl<T: ProgressStore + Send + 'static> SharedStore for T {}

struct AppState<S> {
    tracker: Arc<Mutex<ProgressTracker<S>>>,
    content: Arc<ContentStore>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            tracker: Arc::clone(&self.tracker),
            content: Arc::clone(&self.content),
        }
    }
}

impl<S> AppState<S> {
    fn tracker(&self) -> MutexGuard<'_, ProgressTracker<S>> {
        self.tracker
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct StartRequest {
    #[serde(default)]
    date: Option<String>,
}

#[derive(Deserialize)]
struct SetDayRequest {
    day: i64,
}

#[derive(Deserialize)]
struct SetStartDateRequest {
    date: String,
}

#[derive(Serialize)]
struct ReflectionsResponse {
    reflections: Vec<Reflection>,
}

#[derive(Serialize)]
struct WeekResponse {
    week: i64,
    reflections: Vec<Reflection>,
}

#[derive(Serialize)]
struct PrayersResponse {
    prayers: Vec<Prayer>,
}

#[derive(Serialize)]
struct FavoritesResponse {
    favorites: Vec<u32>,
}

#[derive(Serialize)]
struct TodayResponse {
    status: ProgressStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    reflection: Option<Reflection>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Internal(err) => {
                let error = format!("{err:#}");
                tracing::error!(error = %error, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        match err {
            ProgressError::NotStarted => Self::Conflict(err.to_string()),
            ProgressError::OutOfRange(_)
            | ProgressError::InvalidStartDay(_)
            | ProgressError::NotSunday(_) => Self::BadRequest(err.to_string()),
            ProgressError::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::InvalidDay(_) | ContentError::InvalidWeek(_) => {
                Self::BadRequest(err.to_string())
            }
            ContentError::NotFound(_) => Self::NotFound(err.to_string()),
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("Invalid date '{s}'. Use YYYY-MM-DD")))
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Reflection handlers ---

async fn list_reflections<S: SharedStore>(
    State(state): State<AppState<S>>,
) -> Json<ReflectionsResponse> {
    Json(ReflectionsResponse {
        reflections: state.content.all(),
    })
}

async fn get_reflection<S: SharedStore>(
    State(state): State<AppState<S>>,
    Path(day): Path<i64>,
) -> Result<Json<Reflection>, ApiError> {
    Ok(Json(state.content.reflection(day)?))
}

async fn get_week<S: SharedStore>(
    State(state): State<AppState<S>>,
    Path(week): Path<i64>,
) -> Result<Json<WeekResponse>, ApiError> {
    let reflections = state.content.week(week)?;
    Ok(Json(WeekResponse { week, reflections }))
}

async fn list_prayers<S: SharedStore>(State(state): State<AppState<S>>) -> Json<PrayersResponse> {
    Json(PrayersResponse {
        prayers: state.content.prayers().to_vec(),
    })
}

// --- Progress handlers ---

async fn get_progress<S: SharedStore>(State(state): State<AppState<S>>) -> Json<ProgressStatus> {
    Json(state.tracker().status())
}

async fn get_today<S: SharedStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<TodayResponse>, ApiError> {
    let status = state.tracker().status();

    let reflection = match &status.progress {
        Some(record) if !record.is_completed() => {
            match state.content.reflection(i64::from(record.current_day)) {
                Ok(r) => Some(r),
                Err(ContentError::NotFound(day)) => {
                    tracing::warn!(day, "no reflection content for current day");
                    None
                }
                Err(e) => return Err(e.into()),
            }
        }
        _ => None,
    };

    Ok(Json(TodayResponse { status, reflection }))
}

async fn start_program<S: SharedStore>(
    State(state): State<AppState<S>>,
    body: Option<Json<StartRequest>>,
) -> Result<(StatusCode, Json<ProgressRecord>), ApiError> {
    let date = body
        .and_then(|Json(req)| req.date)
        .as_deref()
        .map(parse_date)
        .transpose()?;
    let record = state.tracker().start(date)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn restart_program<S: SharedStore>(
    State(state): State<AppState<S>>,
) -> Result<(StatusCode, Json<ProgressRecord>), ApiError> {
    let record = state.tracker().restart()?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn reset_progress<S: SharedStore>(
    State(state): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    state.tracker().reset()?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_day<S: SharedStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<SetDayRequest>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let record = state.tracker().set_manual_day(req.day)?;
    Ok(Json(record))
}

async fn set_start_date<S: SharedStore>(
    State(state): State<AppState<S>>,
    Json(req): Json<SetStartDateRequest>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let date = parse_date(&req.date)?;
    let record = state.tracker().set_start_date(date)?;
    Ok(Json(record))
}

async fn get_favorites<S: SharedStore>(
    State(state): State<AppState<S>>,
) -> Json<FavoritesResponse> {
    Json(FavoritesResponse {
        favorites: state.tracker().favorites(),
    })
}

async fn toggle_favorite<S: SharedStore>(
    State(state): State<AppState<S>>,
    Path(day): Path<i64>,
) -> Result<Json<ProgressRecord>, ApiError> {
    let record = state.tracker().toggle_favorite(day)?;
    Ok(Json(record))
}

fn build_router<S: SharedStore>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/reflections", get(list_reflections::<S>))
        .route("/api/reflections/{day}", get(get_reflection::<S>))
        .route("/api/reflections/week/{week}", get(get_week::<S>))
        .route("/api/prayers", get(list_prayers::<S>))
        .route(
            "/api/progress",
            get(get_progress::<S>).delete(reset_progress::<S>),
        )
        .route("/api/progress/start", post(start_program::<S>))
        .route("/api/progress/restart", post(restart_program::<S>))
        .route("/api/progress/day", put(set_day::<S>))
        .route("/api/progress/start-date", put(set_start_date::<S>))
        .route("/api/progress/favorites", get(get_favorites::<S>))
        .route("/api/progress/favorites/{day}", post(toggle_favorite::<S>))
        .route("/api/today", get(get_today::<S>))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server<S: ProgressStore + Send + 'static>(
    tracker: ProgressTracker<S>,
    content: ContentStore,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    let state = AppState {
        tracker: Arc::new(Mutex::new(tracker)),
        content: Arc::new(content),
    };

    let app = build_router(state);

    if bind != "127.0.0.1" && bind != "localhost" {
        tracing::warn!(
            "Listening on {bind}. Any device on your network can read and change your progress."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
