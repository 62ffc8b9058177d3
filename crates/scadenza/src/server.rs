use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::calendar::{CalendarCell, WeekStart};
use crate::clock::Clock;
use crate::config::Settings;
use crate::db;
use crate::format;
use crate::html;
use crate::picker::{DueDatePicker, IssueUpdater, PickerError, PickerState};
use crate::types::{format_timestamp, parse_timestamp, DueDatePatch, Issue};

/// Application state shared across requests
pub struct AppState {
    pub db: Mutex<Connection>,
    /// One picker per issue id
    pub pickers: Mutex<HashMap<String, DueDatePicker>>,
    pub clock: Arc<dyn Clock>,
    pub week_start: WeekStart,
}

impl AppState {
    pub fn new(conn: Connection, clock: Arc<dyn Clock>, week_start: WeekStart) -> Self {
        Self {
            db: Mutex::new(conn),
            pickers: Mutex::new(HashMap::new()),
            clock,
            week_start,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Issue {0} not found")]
    IssueNotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Picker(#[from] PickerError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::IssueNotFound(_) => (StatusCode::NOT_FOUND, "ISSUE_NOT_FOUND"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Picker(PickerError::InvalidTime { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TIME")
            }
            AppError::Picker(PickerError::DateOutOfRange(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_DATE")
            }
            AppError::Picker(_) => (StatusCode::CONFLICT, "PICKER_STATE"),
            AppError::Internal(e) => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let body = json!({
            "error": {
                "code": code,
                "message": self.to_string(),
                "status": status.as_u16(),
            }
        });
        (status, Json(body)).into_response()
    }
}

type AppResult<T> = Result<T, AppError>;

/// Writes picker patches to the issue store.
///
/// Failures are logged and swallowed: the picker has already closed and does
/// not roll back.
struct StoreUpdater<'a> {
    conn: &'a Connection,
    issue_id: &'a str,
    clock: &'a dyn Clock,
}

impl IssueUpdater for StoreUpdater<'_> {
    fn update_issue(&mut self, patch: DueDatePatch) {
        match db::apply_due_date_patch(self.conn, self.issue_id, &patch, self.clock.now()) {
            Ok(true) => {
                info!(issue = %self.issue_id, due_date = ?patch.due_date, "Due date updated")
            }
            Ok(false) => warn!(issue = %self.issue_id, "Due date update hit no issue"),
            Err(e) => error!(issue = %self.issue_id, error = %e, "Failed to update due date"),
        }
    }
}

/// Start the web server
pub async fn serve(settings: Settings, clock: Arc<dyn Clock>) -> anyhow::Result<()> {
    let conn = db::init_db(&settings.db_path)?;
    let count = db::count_issues(&conn)?;
    info!(count, path = %settings.db_path.display(), "Loaded issue store");

    let state = Arc::new(AppState::new(conn, clock, settings.week_start));
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], settings.port));
    info!(%addr, week_start = %settings.week_start, "Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/issues/{id}", get(issue_handler))
        .route("/issues/{id}/due-date/open", post(open_handler))
        .route("/issues/{id}/due-date/prev", post(prev_handler))
        .route("/issues/{id}/due-date/next", post(next_handler))
        .route("/issues/{id}/due-date/select", post(select_handler))
        .route("/issues/{id}/due-date/time", post(time_handler))
        .route("/issues/{id}/due-date/commit", post(commit_handler))
        .route("/issues/{id}/due-date/cancel", post(cancel_handler))
        .route("/issues/{id}/due-date/clear", post(clear_handler))
        .route("/api/issues", get(list_issues_handler).post(create_issue_handler))
        .route(
            "/api/issues/{id}",
            get(get_issue_handler).patch(patch_issue_handler),
        )
        .route("/api/issues/{id}/picker", get(picker_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn load_issue(state: &AppState, id: &str) -> AppResult<Issue> {
    let conn = state.db.lock().await;
    db::get_issue(&conn, id)?.ok_or_else(|| AppError::IssueNotFound(id.to_string()))
}

fn issue_redirect(id: &str) -> Redirect {
    Redirect::to(&format!("/issues/{id}"))
}

/// Run `f` against the picker for `id`, creating a closed one on first use
async fn with_picker<T>(
    state: &AppState,
    id: &str,
    f: impl FnOnce(&mut DueDatePicker) -> T,
) -> T {
    let mut pickers = state.pickers.lock().await;
    let picker = pickers
        .entry(id.to_string())
        .or_insert_with(|| DueDatePicker::new(state.week_start));
    f(picker)
}

// ========== HTML pages ==========

async fn index_handler(State(state): State<Arc<AppState>>) -> AppResult<Html<String>> {
    let conn = state.db.lock().await;
    let issues = db::list_issues(&conn)?;
    Ok(Html(html::render_index(&issues).into_string()))
}

async fn issue_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Html<String>> {
    let issue = load_issue(&state, &id).await?;
    let markup = with_picker(&state, &id, |picker| {
        html::render_issue_page(&issue, picker, state.clock.as_ref())
    })
    .await;
    Ok(Html(markup.into_string()))
}

// ========== picker actions ==========

#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub date: NaiveDate,
}

/// Either field may be sent alone, as when only one of the two selects changed
#[derive(Debug, Deserialize)]
pub struct TimeForm {
    pub hour: Option<u32>,
    pub minute: Option<u32>,
}

async fn open_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let issue = load_issue(&state, &id).await?;
    with_picker(&state, &id, |picker| {
        picker.open(issue.due_date.as_deref(), state.clock.as_ref())
    })
    .await;
    Ok(issue_redirect(&id))
}

async fn prev_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;
    with_picker(&state, &id, |picker| picker.previous_month()).await?;
    Ok(issue_redirect(&id))
}

async fn next_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;
    with_picker(&state, &id, |picker| picker.next_month()).await?;
    Ok(issue_redirect(&id))
}

async fn select_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<SelectForm>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;
    with_picker(&state, &id, |picker| picker.select_day(form.date)).await?;
    Ok(issue_redirect(&id))
}

async fn time_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<TimeForm>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;
    if form.hour.is_none() && form.minute.is_none() {
        return Err(AppError::BadRequest("hour or minute is required".to_string()));
    }
    with_picker(&state, &id, |picker| match (form.hour, form.minute) {
        (Some(hour), Some(minute)) => picker.set_time(hour, minute),
        (Some(hour), None) => picker.set_hour(hour),
        (None, Some(minute)) => picker.set_minute(minute),
        (None, None) => picker.working().ok_or(PickerError::NotOpen),
    })
    .await?;
    Ok(issue_redirect(&id))
}

async fn commit_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;

    let mut pickers = state.pickers.lock().await;
    let picker = pickers
        .entry(id.clone())
        .or_insert_with(|| DueDatePicker::new(state.week_start));

    let conn = state.db.lock().await;
    let mut updater = StoreUpdater {
        conn: &conn,
        issue_id: &id,
        clock: state.clock.as_ref(),
    };
    picker.commit(&mut updater)?;

    Ok(issue_redirect(&id))
}

async fn cancel_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    load_issue(&state, &id).await?;
    with_picker(&state, &id, |picker| picker.cancel()).await;
    Ok(issue_redirect(&id))
}

async fn clear_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Redirect> {
    let issue = load_issue(&state, &id).await?;

    let mut pickers = state.pickers.lock().await;
    let picker = pickers
        .entry(id.clone())
        .or_insert_with(|| DueDatePicker::new(state.week_start));

    let conn = state.db.lock().await;
    let mut updater = StoreUpdater {
        conn: &conn,
        issue_id: &id,
        clock: state.clock.as_ref(),
    };
    picker.clear(issue.due_date.as_deref(), &mut updater)?;

    Ok(issue_redirect(&id))
}

// ========== JSON API ==========

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssue {
    pub title: String,
    #[serde(default)]
    pub due_date: Option<String>,
}

/// Picker snapshot for API clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerView {
    #[serde(flatten)]
    pub state: PickerState,
    pub month_title: Option<String>,
    pub weekdays: [&'static str; 7],
    pub cells: Vec<CalendarCell>,
}

/// Validate and normalize an incoming timestamp
fn normalize_due_date(due_date: Option<String>) -> AppResult<Option<String>> {
    due_date
        .map(|s| {
            parse_timestamp(&s)
                .map(format_timestamp)
                .map_err(|e| AppError::BadRequest(e.to_string()))
        })
        .transpose()
}

async fn list_issues_handler(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Issue>>> {
    let conn = state.db.lock().await;
    Ok(Json(db::list_issues(&conn)?))
}

async fn create_issue_handler(
    State(state): State<Arc<AppState>>,
    Json(new): Json<NewIssue>,
) -> AppResult<(StatusCode, Json<Issue>)> {
    let title = new.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    let due_date = normalize_due_date(new.due_date)?;

    let issue = Issue::new(title, due_date, state.clock.now());
    let conn = state.db.lock().await;
    db::insert_issue(&conn, &issue)?;
    info!(issue = %issue.id, title = %issue.title, "Issue created");

    Ok((StatusCode::CREATED, Json(issue)))
}

async fn get_issue_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Issue>> {
    Ok(Json(load_issue(&state, &id).await?))
}

/// The update endpoint: `{ "dueDate": "<iso>" | null }`
async fn patch_issue_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<DueDatePatch>,
) -> AppResult<Json<Issue>> {
    let patch = DueDatePatch {
        due_date: normalize_due_date(patch.due_date)?,
    };

    let conn = state.db.lock().await;
    if !db::apply_due_date_patch(&conn, &id, &patch, state.clock.now())? {
        return Err(AppError::IssueNotFound(id));
    }
    let issue = db::get_issue(&conn, &id)?.ok_or_else(|| AppError::IssueNotFound(id.clone()))?;
    info!(issue = %id, due_date = ?issue.due_date, "Due date patched");

    Ok(Json(issue))
}

async fn picker_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<PickerView>> {
    load_issue(&state, &id).await?;
    let view = with_picker(&state, &id, |picker| PickerView {
        state: picker.state(),
        month_title: picker.working().map(format::month_title),
        weekdays: format::weekday_headers(picker.week_start()),
        cells: picker.grid(state.clock.as_ref()).unwrap_or_default(),
    })
    .await;
    Ok(Json(view))
}
