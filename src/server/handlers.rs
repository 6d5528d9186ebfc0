// HTTP request handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::middleware::require_admin_token;
use super::session::{Banner, SessionState};
use super::SupportServer;
use crate::dashboard::{self, catalog, ApiProfile, UsageLog};
use crate::errors::{ServiceError, StoreError};
use crate::keys::{ApiKeyRecord, KeyStatus, MaskedKeys};
use crate::router::{RouteOutcome, Verdict};
use crate::tickets::{manual_ticket_reply, Ticket, RECENTLY_CLOSED_LIMIT};
use crate::users::{UserRecord, UserRole};

const DEFAULT_USAGE_DAYS: i64 = 30;
const KEY_EXPIRY_WARNING_DAYS: i64 = 30;

/// Build the HTTP router. Operator routes sit behind the admin token check.
pub fn create_router(server: Arc<SupportServer>) -> Router {
    let operator: Router<Arc<SupportServer>> = Router::new()
        .route("/v1/tickets/:id/close", post(close_ticket))
        .route("/v1/dashboard/tickets", get(dashboard_tickets))
        .route("/v1/dashboard/usage", get(dashboard_usage))
        .route("/v1/dashboard/apis/:name", get(dashboard_api))
        .route("/v1/dashboard/users", get(list_users).post(add_user))
        .route("/v1/dashboard/keys", post(issue_key))
        .route("/v1/dashboard/users/:user_id/keys", get(user_keys))
        .route("/v1/dashboard/keys/:key_id/status", post(set_key_status))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&server),
            require_admin_token,
        ));

    Router::new()
        // Chat widget
        .route("/v1/chat", post(handle_chat))
        .route("/v1/session/:id", get(get_session).delete(delete_session))
        .route("/v1/tickets", post(create_manual_ticket).get(list_open_tickets))
        .route("/v1/api-keys", post(save_api_key))
        .route("/v1/api-keys/:user_id", get(list_api_keys))
        // Gateway ingestion
        .route("/v1/usage", post(record_usage))
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .merge(operator)
        .with_state(server)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Request body for POST /v1/chat
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: String,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
    pub show_manual_form: bool,
    pub show_api_keys: bool,
}

/// Widget flags of a session after a turn
struct SessionView {
    id: String,
    banner: Option<Banner>,
    show_manual_form: bool,
    show_api_keys: bool,
}

impl SessionView {
    fn of(session: &SessionState) -> Self {
        Self {
            id: session.id.clone(),
            banner: session.banner.clone(),
            show_manual_form: session.show_manual_form,
            show_api_keys: session.show_api_keys,
        }
    }
}

impl ChatResponse {
    fn new(view: SessionView, outcome: RouteOutcome) -> Self {
        Self {
            session_id: view.id,
            ticket_id: outcome.ticket_id().map(str::to_string),
            reply: outcome.reply,
            verdict: outcome.verdict,
            banner: view.banner,
            show_manual_form: view.show_manual_form,
            show_api_keys: view.show_api_keys,
        }
    }
}

/// Handle POST /v1/chat - one chat turn
async fn handle_chat(
    State(server): State<Arc<SupportServer>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    if request.message.trim().is_empty() {
        return Err(ServiceError::Validation("Message must not be empty".to_string()).into());
    }

    let sessions = server.session_manager();
    let (session_id, turn_lock) = {
        let session = sessions.get_or_create(request.session_id.as_deref())?;
        (session.id.clone(), session.turn_lock())
    };
    let _turn = turn_lock.lock().await;

    let history = sessions.recent_turns(&session_id, server.router().history_window());
    let outcome = server.router().route(&request.message, &history).await;

    let view = sessions.modify_or_restore(&session_id, |session| {
        session.conversation.add_user_message(request.message.as_str());
        session.conversation.add_assistant_message(outcome.reply.as_str());
        session.banner = None;
        session.apply(outcome.effect.as_ref());
        SessionView::of(session)
    });

    tracing::debug!(
        session_id = %session_id,
        verdict = outcome.verdict.as_str(),
        "Chat turn complete"
    );

    Ok(Json(ChatResponse::new(view, outcome)))
}

/// Session information
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: String,
    pub last_activity: String,
    pub message_count: usize,
    pub messages: Vec<crate::conversation::ChatTurn>,
    pub show_manual_form: bool,
    pub show_api_keys: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<Banner>,
}

/// Handle GET /v1/session/:id - history and widget flags
async fn get_session(
    State(server): State<Arc<SupportServer>>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let session = server
        .session_manager()
        .get(&session_id)
        .ok_or_else(|| ServiceError::NotFound(format!("Session not found: {}", session_id)))?;

    Ok(Json(SessionInfo {
        id: session.id.clone(),
        created_at: session.created_at.to_rfc3339(),
        last_activity: session.last_activity.to_rfc3339(),
        message_count: session.conversation.message_count(),
        messages: session.conversation.turns().to_vec(),
        show_manual_form: session.show_manual_form,
        show_api_keys: session.show_api_keys,
        banner: session.banner,
    }))
}

/// Handle DELETE /v1/session/:id
async fn delete_session(
    State(server): State<Arc<SupportServer>>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if server.session_manager().delete(&session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServiceError::NotFound(format!("Session not found: {}", session_id)).into())
    }
}

/// Request body for the manual ticket form
#[derive(Debug, Deserialize)]
pub struct ManualTicketRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ManualTicketResponse {
    pub ticket: Ticket,
    pub reply: String,
}

/// Handle POST /v1/tickets - manual ticket form
async fn create_manual_ticket(
    State(server): State<Arc<SupportServer>>,
    Json(request): Json<ManualTicketRequest>,
) -> Result<(StatusCode, Json<ManualTicketResponse>), AppError> {
    let ticket = server
        .desk()
        .submit_manual(
            &request.subject,
            &request.description,
            request.contact.as_deref(),
        )
        .await?;
    let reply = manual_ticket_reply(&ticket);

    if let Some(session_id) = request.session_id.as_deref() {
        server.session_manager().modify(session_id, |session| {
            session.conversation.add_assistant_message(reply.as_str());
            session.show_manual_form = false;
            session.banner = Some(Banner::ticket_created(&ticket.id));
        });
    }

    Ok((StatusCode::CREATED, Json(ManualTicketResponse { ticket, reply })))
}

/// Handle GET /v1/tickets - open tickets, newest first
async fn list_open_tickets(
    State(server): State<Arc<SupportServer>>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    Ok(Json(server.desk().open_tickets().await?))
}

/// Handle POST /v1/tickets/:id/close
async fn close_ticket(
    State(server): State<Arc<SupportServer>>,
    Path(ticket_id): Path<String>,
) -> Result<Json<Ticket>, AppError> {
    Ok(Json(server.desk().close(&ticket_id).await?))
}

/// Ticket row on the operator dashboard
#[derive(Debug, Serialize)]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub hours_open: f64,
}

#[derive(Debug, Serialize)]
pub struct DashboardTickets {
    pub open: Vec<TicketView>,
    pub recently_closed: Vec<TicketView>,
}

fn ticket_views(tickets: Vec<Ticket>, now: DateTime<Utc>) -> Vec<TicketView> {
    tickets
        .into_iter()
        .map(|ticket| TicketView {
            hours_open: ticket.hours_open(now),
            ticket,
        })
        .collect()
}

/// Handle GET /v1/dashboard/tickets
async fn dashboard_tickets(
    State(server): State<Arc<SupportServer>>,
) -> Result<Json<DashboardTickets>, AppError> {
    let now = Utc::now();
    let open = server.desk().open_tickets().await?;
    let closed = server.desk().recently_closed(RECENTLY_CLOSED_LIMIT).await?;

    Ok(Json(DashboardTickets {
        open: ticket_views(open, now),
        recently_closed: ticket_views(closed, now),
    }))
}

/// Reporting window; both bounds optional
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UsageReport {
    pub summary: dashboard::UsageSummary,
    pub top_consumers: Vec<dashboard::Consumer>,
    pub by_country: Vec<dashboard::CallCount>,
    pub monthly_projection: dashboard::MonthlyProjection,
}

/// Handle GET /v1/dashboard/usage
async fn dashboard_usage(
    State(server): State<Arc<SupportServer>>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<UsageReport>, AppError> {
    let now = Utc::now();
    let logs = server.usage().usage_between(period.start, period.end).await?;
    let month_logs = server
        .usage()
        .usage_between(Some(now - Duration::days(31)), Some(now))
        .await?;

    Ok(Json(UsageReport {
        summary: dashboard::summarize(&logs),
        top_consumers: dashboard::top_consumers(&logs),
        by_country: dashboard::by_country(&logs),
        monthly_projection: dashboard::monthly_projection(&month_logs, now),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ApiDetailQuery {
    #[serde(default)]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ApiDetail {
    pub profile: ApiProfile,
    pub quota: dashboard::QuotaStatus,
    pub cost_projection: dashboard::DailyCostProjection,
    pub daily_usage: Vec<dashboard::DailyCount>,
    pub by_endpoint: Vec<dashboard::CallCount>,
    pub by_version: Vec<dashboard::CallCount>,
}

/// Handle GET /v1/dashboard/apis/:name
async fn dashboard_api(
    State(server): State<Arc<SupportServer>>,
    Path(name): Path<String>,
    Query(query): Query<ApiDetailQuery>,
) -> Result<Json<ApiDetail>, AppError> {
    let profile = catalog::find(&name)
        .ok_or_else(|| ServiceError::NotFound(format!("Unknown API: {}", name)))?;

    let now = Utc::now();
    let days = query.days.unwrap_or(DEFAULT_USAGE_DAYS).clamp(1, 366);
    let window_start = dashboard::usage::start_of_day(now) - Duration::days(days - 1);
    let logs = server
        .usage()
        .usage_between(Some(window_start), Some(now))
        .await?;

    Ok(Json(ApiDetail {
        profile: *profile,
        quota: dashboard::quota_status(&logs, profile, now),
        cost_projection: dashboard::daily_cost_projection(&logs, profile, now),
        daily_usage: dashboard::daily_usage(
            &logs,
            profile.name,
            window_start.date_naive(),
            now.date_naive(),
        ),
        by_endpoint: dashboard::by_endpoint(&logs, profile.name),
        by_version: dashboard::by_version(&logs, profile.name),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SaveKeyRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SavedKey {
    pub key_id: String,
    pub user_id: String,
    pub masked_key: String,
    pub message: String,
}

/// Handle POST /v1/api-keys - user saves a key for reference
async fn save_api_key(
    State(server): State<Arc<SupportServer>>,
    Json(request): Json<SaveKeyRequest>,
) -> Result<Json<SavedKey>, AppError> {
    let record = server
        .keys()
        .save_user_key(&request.user_id, &request.api_key)
        .await?;

    Ok(Json(SavedKey {
        message: format!("API Key saved for user {}", record.user_id),
        masked_key: record.masked(),
        key_id: record.key_id,
        user_id: record.user_id,
    }))
}

/// Handle GET /v1/api-keys/:user_id - masked keys only
async fn list_api_keys(
    State(server): State<Arc<SupportServer>>,
    Path(user_id): Path<String>,
) -> Result<Json<MaskedKeys>, AppError> {
    Ok(Json(server.keys().masked_keys(&user_id).await?))
}

/// Handle GET /v1/dashboard/users
async fn list_users(
    State(server): State<Arc<SupportServer>>,
) -> Result<Json<Vec<UserRecord>>, AppError> {
    Ok(Json(server.users().users().await?))
}

#[derive(Debug, Deserialize)]
pub struct AddUserRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Handle POST /v1/dashboard/users
async fn add_user(
    State(server): State<Arc<SupportServer>>,
    Json(request): Json<AddUserRequest>,
) -> Result<(StatusCode, Json<UserRecord>), AppError> {
    let user = server
        .users()
        .add_user(&request.user_id, &request.email, request.role)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct IssueKeyRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub api: String,
}

/// Handle POST /v1/dashboard/keys - issue a new key for one API
async fn issue_key(
    State(server): State<Arc<SupportServer>>,
    Json(request): Json<IssueKeyRequest>,
) -> Result<(StatusCode, Json<ApiKeyRecord>), AppError> {
    let record = server.keys().issue_key(&request.user_id, &request.api).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Full key record for operators, flagged when it expires soon
#[derive(Debug, Serialize)]
pub struct KeyView {
    #[serde(flatten)]
    pub record: ApiKeyRecord,
    pub expiring_soon: bool,
}

/// Handle GET /v1/dashboard/users/:user_id/keys
async fn user_keys(
    State(server): State<Arc<SupportServer>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<KeyView>>, AppError> {
    let now = Utc::now();
    let views = server
        .keys()
        .keys_for_user(&user_id)
        .await?
        .into_iter()
        .map(|record| KeyView {
            expiring_soon: record.expires_within(now, KEY_EXPIRY_WARNING_DAYS),
            record,
        })
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct KeyStatusRequest {
    pub status: KeyStatus,
}

/// Handle POST /v1/dashboard/keys/:key_id/status
async fn set_key_status(
    State(server): State<Arc<SupportServer>>,
    Path(key_id): Path<String>,
    Json(request): Json<KeyStatusRequest>,
) -> Result<Json<ApiKeyRecord>, AppError> {
    Ok(Json(server.keys().set_status(&key_id, request.status).await?))
}

/// Handle POST /v1/usage - ingest one gateway log
async fn record_usage(
    State(server): State<Arc<SupportServer>>,
    Json(log): Json<UsageLog>,
) -> Result<StatusCode, AppError> {
    if log.api.trim().is_empty() || log.user_id.trim().is_empty() {
        return Err(ServiceError::Validation("Usage logs need an api and a user_id".to_string()).into());
    }
    server.usage().record_usage(log).await?;
    Ok(StatusCode::CREATED)
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_seconds: u64,
    pub active_sessions: usize,
}

/// Handle GET /health
pub async fn health_check(State(server): State<Arc<SupportServer>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        uptime_seconds: server.uptime_seconds(),
        active_sessions: server.session_manager().active_count(),
    })
}

/// Handle GET /metrics - Prometheus text exposition
pub async fn metrics_endpoint(
    State(server): State<Arc<SupportServer>>,
) -> Result<Response, AppError> {
    let body = server.metrics().render()?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

/// Application error wrapper for HTTP error responses
#[derive(Debug)]
pub struct AppError(pub ServiceError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::NotFound(_)
            | ServiceError::Store(StoreError::TicketNotFound(_))
            | ServiceError::Store(StoreError::KeyNotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Store(StoreError::DuplicateUser(_)) => StatusCode::CONFLICT,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Store(_) | ServiceError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, status = status.as_u16(), "Request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "message": self.0.to_string(),
                "type": self.0.kind()
            }
        });

        (status, Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<ServiceError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
