use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::types::Json as SqlJson;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::errors::ServerError;
use crate::models::hostel::{
    default_facilities, derive_room_status, ApplicationQuery, HostelApplicationRequest,
    HostelApplicationRow, MealPlan, ProcessApplicationRequest, RoomQuery, RoomRequest,
    RoomResponse, RoomRow, APPLICATION_STATUSES, FEE_STATUSES, HOSTEL_APPLICATION_COLUMNS,
    ROOM_COLUMNS, ROOM_STATUSES, ROOM_TYPES,
};
use crate::models::users::{MessageResponse, Role};

use super::{non_empty, one_of, required};

pub async fn list_rooms(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RoomQuery>,
) -> Result<Json<Vec<RoomResponse>>, ServerError> {
    auth_user(&state, &headers).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE 1 = 1"));
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    if let Some(block) = non_empty(&query.block) {
        qb.push(" AND block_name = ");
        qb.push_bind(block);
    }
    qb.push(" ORDER BY block_name, floor, room_number");

    let rows = qb
        .build_query_as::<RoomRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(rows.into_iter().map(RoomResponse::from).collect()))
}

pub async fn get_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<RoomResponse>, ServerError> {
    auth_user(&state, &headers).await?;
    Ok(Json(load_room(&state, id).await?.into()))
}

pub async fn create_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RoomRequest>,
) -> Result<(StatusCode, Json<RoomResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let block_name = required(&payload.block_name)?;
    let room_number = required(&payload.room_number)?;
    let room_type = required(&payload.room_type)?;
    let (Some(floor), Some(capacity)) = (payload.floor, payload.capacity) else {
        return Err(ServerError::bad_request("Missing required fields"));
    };

    let room = RoomRow {
        id: 0,
        block_name,
        room_number,
        floor,
        room_type,
        capacity,
        occupants: SqlJson(payload.occupants.unwrap_or_default()),
        facilities: SqlJson(payload.facilities.unwrap_or_else(default_facilities)),
        status: payload.status.unwrap_or_default(),
        warden: payload.warden.map(SqlJson),
        mess_menu: SqlJson(payload.mess_menu.unwrap_or_default()),
        created_at: String::new(),
        updated_at: String::new(),
    };
    let room = settle_room(room)?;

    let sql = format!(
        "INSERT INTO hostel_rooms (block_name, room_number, floor, room_type, capacity, occupants, \
         facilities, status, warden, mess_menu) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) \
         RETURNING {ROOM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RoomRow>(&sql)
        .bind(&room.block_name)
        .bind(&room.room_number)
        .bind(room.floor)
        .bind(&room.room_type)
        .bind(room.capacity)
        .bind(&room.occupants)
        .bind(&room.facilities)
        .bind(&room.status)
        .bind(&room.warden)
        .bind(&room.mess_menu)
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<RoomRequest>,
) -> Result<Json<RoomResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut room = load_room(&state, id).await?;
    if let Some(v) = non_empty(&payload.block_name) {
        room.block_name = v;
    }
    if let Some(v) = non_empty(&payload.room_number) {
        room.room_number = v;
    }
    if let Some(v) = non_empty(&payload.room_type) {
        room.room_type = v;
    }
    if let Some(v) = payload.floor {
        room.floor = v;
    }
    if let Some(v) = payload.capacity {
        room.capacity = v;
    }
    if let Some(v) = payload.occupants {
        room.occupants = SqlJson(v);
    }
    if let Some(v) = payload.facilities {
        room.facilities = SqlJson(v);
    }
    if let Some(v) = payload.warden {
        room.warden = Some(SqlJson(v));
    }
    if let Some(v) = payload.mess_menu {
        room.mess_menu = SqlJson(v);
    }
    if let Some(v) = payload.status {
        room.status = v;
    }
    let room = settle_room(room)?;

    let sql = format!(
        "UPDATE hostel_rooms SET block_name = ?1, room_number = ?2, floor = ?3, room_type = ?4, \
         capacity = ?5, occupants = ?6, facilities = ?7, status = ?8, warden = ?9, mess_menu = ?10, \
         updated_at = datetime('now') WHERE id = ?11 RETURNING {ROOM_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RoomRow>(&sql)
        .bind(&room.block_name)
        .bind(&room.room_number)
        .bind(room.floor)
        .bind(&room.room_type)
        .bind(room.capacity)
        .bind(&room.occupants)
        .bind(&room.facilities)
        .bind(&room.status)
        .bind(&room.warden)
        .bind(&room.mess_menu)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    Ok(Json(row.into()))
}

pub async fn delete_room(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let result = sqlx::query("DELETE FROM hostel_rooms WHERE id = ?1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    if result.rows_affected() == 0 {
        return Err(ServerError::not_found("Room not found"));
    }

    Ok(Json(MessageResponse::new("Room deleted successfully")))
}

/// Every room carries the same menu; the first non-empty one wins.
pub async fn mess_menu(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MealPlan>>, ServerError> {
    auth_user(&state, &headers).await?;

    let menu: Option<SqlJson<Vec<MealPlan>>> = sqlx::query_scalar(
        "SELECT mess_menu FROM hostel_rooms WHERE json_array_length(mess_menu) > 0 \
         ORDER BY id LIMIT 1",
    )
    .fetch_optional(&state.pool)
    .await
    .map_err(ServerError::internal)?;

    Ok(Json(menu.map(|m| m.0).unwrap_or_default()))
}

pub async fn submit_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<HostelApplicationRequest>,
) -> Result<(StatusCode, Json<HostelApplicationRow>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Student])?;

    one_of("roomPreference", &payload.room_preference, &ROOM_TYPES)?;
    let user = &caller.user;
    let student_usn = non_empty(&payload.student_usn).or_else(|| user.usn.clone());
    let department = non_empty(&payload.department).or_else(|| user.department.clone());
    let semester = payload.semester.or(user.semester);
    let (Some(student_usn), Some(department), Some(semester)) = (student_usn, department, semester)
    else {
        return Err(ServerError::bad_request("Missing required fields"));
    };
    for field in [
        &payload.phone,
        &payload.block_preference,
        &payload.guardian_name,
        &payload.guardian_phone,
        &payload.guardian_relation,
    ] {
        if field.trim().is_empty() {
            return Err(ServerError::bad_request("Missing required fields"));
        }
    }

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM hostel_applications WHERE student_id = ?1 AND status = 'pending'",
    )
    .bind(caller.id())
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;
    if pending > 0 {
        return Err(ServerError::bad_request("You already have a pending application"));
    }

    let sql = format!(
        "INSERT INTO hostel_applications (student_id, student_usn, student_name, email, phone, \
         semester, department, room_preference, block_preference, guardian_name, guardian_phone, \
         guardian_relation, permanent_address, any_medical_conditions, medical_details) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15) \
         RETURNING {HOSTEL_APPLICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, HostelApplicationRow>(&sql)
        .bind(caller.id())
        .bind(student_usn)
        .bind(non_empty(&payload.student_name).unwrap_or_else(|| user.name.clone()))
        .bind(non_empty(&payload.email).unwrap_or_else(|| user.email.clone()))
        .bind(payload.phone.trim())
        .bind(semester)
        .bind(department)
        .bind(&payload.room_preference)
        .bind(payload.block_preference.trim())
        .bind(payload.guardian_name.trim())
        .bind(payload.guardian_phone.trim())
        .bind(payload.guardian_relation.trim())
        .bind(non_empty(&payload.permanent_address))
        .bind(payload.any_medical_conditions)
        .bind(payload.medical_details.as_deref().unwrap_or(""))
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    tracing::info!(application = row.id, student = caller.id(), "hostel application submitted");
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_applications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<HostelApplicationRow>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {HOSTEL_APPLICATION_COLUMNS} FROM hostel_applications WHERE 1 = 1"
    ));
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    qb.push(" ORDER BY applied_date DESC, id DESC");

    let rows = qb
        .build_query_as::<HostelApplicationRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows))
}

pub async fn my_application(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<HostelApplicationRow>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let sql = format!(
        "SELECT {HOSTEL_APPLICATION_COLUMNS} FROM hostel_applications WHERE student_id = ?1 \
         ORDER BY applied_date DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, HostelApplicationRow>(&sql)
        .bind(caller.id())
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(row))
}

pub async fn process_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<ProcessApplicationRequest>,
) -> Result<Json<HostelApplicationRow>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;
    one_of("status", &payload.status, &APPLICATION_STATUSES)?;

    let sql = format!(
        "UPDATE hostel_applications SET status = ?1, remarks = COALESCE(?2, remarks), \
         processed_date = datetime('now'), processed_by = ?3, updated_at = datetime('now') \
         WHERE id = ?4 RETURNING {HOSTEL_APPLICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, HostelApplicationRow>(&sql)
        .bind(&payload.status)
        .bind(payload.remarks.as_deref())
        .bind(caller.id())
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Application not found"))?;

    tracing::info!(application = id, status = %row.status, "hostel application processed");
    Ok(Json(row))
}

async fn load_room(state: &AppState, id: i64) -> Result<RoomRow, ServerError> {
    let sql = format!("SELECT {ROOM_COLUMNS} FROM hostel_rooms WHERE id = ?1");
    sqlx::query_as::<_, RoomRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Room not found"))
}

/// Validates enums and capacity, then recomputes the status.
fn settle_room(mut room: RoomRow) -> Result<RoomRow, ServerError> {
    one_of("roomType", &room.room_type, &ROOM_TYPES)?;
    if !room.status.is_empty() {
        one_of("status", &room.status, &ROOM_STATUSES)?;
    }
    if room.capacity <= 0 {
        return Err(ServerError::bad_request("Capacity must be positive"));
    }
    for occupant in room.occupants.iter() {
        if let Some(fee) = occupant.fee_status.as_deref() {
            one_of("feeStatus", fee, &FEE_STATUSES)?;
        }
    }
    room.status =
        derive_room_status(Some(room.status.as_str()), room.occupants.len(), room.capacity).to_string();
    Ok(room)
}
