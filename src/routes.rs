use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{clock, error::ScheduleError, models::*, schedule::ScheduleService};

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

pub fn router(schedule: ScheduleService) -> Router {
    Router::new()
        // sessions
        .route("/api/sessions", post(create_session).get(list_sessions))
        .route("/api/sessions/bulk", post(bulk_create))
        .route(
            "/api/sessions/:id",
            get(get_session).patch(update_session).delete(delete_session),
        )
        // conflict engine
        .route("/api/sessions/check-conflicts", post(check_conflicts))
        .route("/api/sessions/bulk-check", post(bulk_check))
        .route("/api/sessions/room-availability", get(room_availability))
        .route("/api/sessions/available-rooms", get(available_rooms))
        .with_state(schedule)
}

async fn create_session(
    State(svc): State<ScheduleService>,
    payload: Result<Json<CreateSessionReq>, JsonRejection>,
) -> Result<(StatusCode, Json<ScheduledSession>), (StatusCode, String)> {
    let req = body(payload)?;
    let created = svc.create_session(req).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_sessions(
    State(svc): State<ScheduleService>,
    Query(filter): Query<SessionFilter>,
) -> ApiResult<Vec<Session>> {
    Ok(Json(svc.list_sessions(&filter).await.map_err(reject)?))
}

async fn bulk_create(
    State(svc): State<ScheduleService>,
    payload: Result<Json<BulkCreateReq>, JsonRejection>,
) -> Result<(StatusCode, Json<Vec<ScheduledSession>>), (StatusCode, String)> {
    let req = body(payload)?;
    let created = svc.bulk_create(req.sessions).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_session(
    State(svc): State<ScheduleService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Session> {
    Ok(Json(svc.get_session(id).await.map_err(reject)?))
}

async fn update_session(
    State(svc): State<ScheduleService>,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateSessionReq>, JsonRejection>,
) -> ApiResult<ScheduledSession> {
    let patch = body(payload)?;
    Ok(Json(svc.update_session(id, patch).await.map_err(reject)?))
}

async fn delete_session(
    State(svc): State<ScheduleService>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    svc.delete_session(id).await.map_err(reject)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

// --- conflict engine ---

async fn check_conflicts(
    State(svc): State<ScheduleService>,
    payload: Result<Json<ConflictCheckReq>, JsonRejection>,
) -> ApiResult<Vec<Conflict>> {
    let req = body(payload)?;
    let conflicts = svc
        .engine()
        .check_conflicts(&req.candidate, req.exclude_id)
        .await
        .map_err(reject)?;
    Ok(Json(conflicts))
}

async fn bulk_check(
    State(svc): State<ScheduleService>,
    payload: Result<Json<BulkCheckReq>, JsonRejection>,
) -> ApiResult<Vec<Vec<Conflict>>> {
    let req = body(payload)?;
    Ok(Json(
        svc.engine().bulk_check(&req.candidates).await.map_err(reject)?,
    ))
}

async fn room_availability(
    State(svc): State<ScheduleService>,
    Query(q): Query<RoomAvailabilityQuery>,
) -> ApiResult<RoomAvailability> {
    let window = clock::TimeRange::parse(&q.start_time, &q.end_time).map_err(reject)?;
    let availability = svc
        .engine()
        .check_room_availability(&q.room, q.building.as_deref(), q.day, window.start, window.end)
        .await
        .map_err(reject)?;
    Ok(Json(availability))
}

async fn available_rooms(
    State(svc): State<ScheduleService>,
    Query(q): Query<AvailableRoomsQuery>,
) -> ApiResult<Vec<String>> {
    let window = clock::TimeRange::parse(&q.start_time, &q.end_time).map_err(reject)?;
    let rooms = svc
        .engine()
        .get_available_rooms(q.day, window.start, window.end, q.building.as_deref())
        .await
        .map_err(reject)?;
    Ok(Json(rooms))
}

// --- helpers ---
/// Undecodable bodies (bad times included) are validation errors, not axum's 422.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, (StatusCode, String)> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| reject(ScheduleError::validation(rejection.body_text())))
}

fn reject(e: ScheduleError) -> (StatusCode, String) {
    let status = e.status();
    if status.is_server_error() {
        tracing::error!(error=%e, "internal error");
    }
    (status, e.to_string())
}
