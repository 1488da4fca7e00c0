use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use sqlx::types::Json as SqlJson;
use sqlx::{QueryBuilder, Sqlite};

use crate::app_state::AppState;
use crate::auth::auth_user;
use crate::errors::{map_db_error, ServerError};
use crate::models::hostel::{
    ApplicationQuery, ProcessApplicationRequest, APPLICATION_STATUSES, FEE_STATUSES,
};
use crate::models::transport::{
    RouteQuery, RouteRequest, RouteResponse, RouteRow, TransportApplicationRequest,
    TransportApplicationRow, ROUTE_COLUMNS, ROUTE_STATUSES, TRANSPORT_APPLICATION_COLUMNS,
};
use crate::models::users::{MessageResponse, Role};

use super::{non_empty, one_of, required};

const DUPLICATE_ROUTE: &str = "Route number already exists";

pub async fn list_routes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RouteQuery>,
) -> Result<Json<Vec<RouteResponse>>, ServerError> {
    auth_user(&state, &headers).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {ROUTE_COLUMNS} FROM transport_routes WHERE 1 = 1"
    ));
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    qb.push(" ORDER BY route_number");

    let rows = qb
        .build_query_as::<RouteRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows.into_iter().map(RouteResponse::from).collect()))
}

pub async fn get_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<RouteResponse>, ServerError> {
    auth_user(&state, &headers).await?;
    Ok(Json(load_route(&state, id).await?.into()))
}

pub async fn create_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RouteRequest>,
) -> Result<(StatusCode, Json<RouteResponse>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let capacity = payload
        .capacity
        .ok_or_else(|| ServerError::bad_request("Missing required fields"))?;
    let route = RouteRow {
        id: 0,
        route_number: required(&payload.route_number)?,
        route_name: required(&payload.route_name)?,
        driver_name: required(&payload.driver_name)?,
        driver_phone: required(&payload.driver_phone)?,
        bus_number: required(&payload.bus_number)?,
        capacity,
        stops: SqlJson(payload.stops.unwrap_or_default()),
        students_assigned: SqlJson(payload.students_assigned.unwrap_or_default()),
        status: payload.status.unwrap_or_else(|| "active".to_string()),
        schedule: payload.schedule.map(SqlJson),
        created_at: String::new(),
        updated_at: String::new(),
    };
    check_route(&route)?;

    let sql = format!(
        "INSERT INTO transport_routes (route_number, route_name, driver_name, driver_phone, \
         bus_number, capacity, stops, students_assigned, status, schedule) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {ROUTE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RouteRow>(&sql)
        .bind(&route.route_number)
        .bind(&route.route_name)
        .bind(&route.driver_name)
        .bind(&route.driver_phone)
        .bind(&route.bus_number)
        .bind(route.capacity)
        .bind(&route.stops)
        .bind(&route.students_assigned)
        .bind(&route.status)
        .bind(&route.schedule)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_ROUTE))?;

    Ok((StatusCode::CREATED, Json(row.into())))
}

pub async fn update_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
    Json(payload): Json<RouteRequest>,
) -> Result<Json<RouteResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut route = load_route(&state, id).await?;
    if let Some(v) = non_empty(&payload.route_number) {
        route.route_number = v;
    }
    if let Some(v) = non_empty(&payload.route_name) {
        route.route_name = v;
    }
    if let Some(v) = non_empty(&payload.driver_name) {
        route.driver_name = v;
    }
    if let Some(v) = non_empty(&payload.driver_phone) {
        route.driver_phone = v;
    }
    if let Some(v) = non_empty(&payload.bus_number) {
        route.bus_number = v;
    }
    if let Some(v) = payload.capacity {
        route.capacity = v;
    }
    if let Some(v) = payload.stops {
        route.stops = SqlJson(v);
    }
    if let Some(v) = payload.students_assigned {
        route.students_assigned = SqlJson(v);
    }
    if let Some(v) = payload.status {
        route.status = v;
    }
    if let Some(v) = payload.schedule {
        route.schedule = Some(SqlJson(v));
    }
    check_route(&route)?;

    let sql = format!(
        "UPDATE transport_routes SET route_number = ?1, route_name = ?2, driver_name = ?3, \
         driver_phone = ?4, bus_number = ?5, capacity = ?6, stops = ?7, students_assigned = ?8, \
         status = ?9, schedule = ?10, updated_at = datetime('now') WHERE id = ?11 \
         RETURNING {ROUTE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, RouteRow>(&sql)
        .bind(&route.route_number)
        .bind(&route.route_name)
        .bind(&route.driver_name)
        .bind(&route.driver_phone)
        .bind(&route.bus_number)
        .bind(route.capacity)
        .bind(&route.stops)
        .bind(&route.students_assigned)
        .bind(&route.status)
        .bind(&route.schedule)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(|e| map_db_error(e, DUPLICATE_ROUTE))?;

    Ok(Json(row.into()))
}

pub async fn delete_route(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<MessageResponse>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let result = sqlx::query("DELETE FROM transport_routes WHERE id = ?1")
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    if result.rows_affected() == 0 {
        return Err(ServerError::not_found("Route not found"));
    }
    Ok(Json(MessageResponse::new("Route deleted successfully")))
}

pub async fn submit_application(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TransportApplicationRequest>,
) -> Result<(StatusCode, Json<TransportApplicationRow>), ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require(&[Role::Student])?;

    let user = &caller.user;
    let student_usn = non_empty(&payload.student_usn).or_else(|| user.usn.clone());
    let department = non_empty(&payload.department).or_else(|| user.department.clone());
    let semester = payload.semester.or(user.semester);
    let (Some(student_usn), Some(department), Some(semester), Some(route_id)) =
        (student_usn, department, semester, payload.route_id)
    else {
        return Err(ServerError::bad_request("Missing required fields"));
    };
    if payload.phone.trim().is_empty() || payload.pickup_point.trim().is_empty() {
        return Err(ServerError::bad_request("Missing required fields"));
    }

    let route = load_route(&state, route_id).await?;

    let pending: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM transport_applications WHERE student_id = ?1 AND status = 'pending'",
    )
    .bind(caller.id())
    .fetch_one(&state.pool)
    .await
    .map_err(ServerError::internal)?;
    if pending > 0 {
        return Err(ServerError::bad_request("You already have a pending application"));
    }

    let sql = format!(
        "INSERT INTO transport_applications (student_id, student_usn, student_name, email, phone, \
         semester, department, route_id, route_name, pickup_point) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10) RETURNING {TRANSPORT_APPLICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TransportApplicationRow>(&sql)
        .bind(caller.id())
        .bind(student_usn)
        .bind(non_empty(&payload.student_name).unwrap_or_else(|| user.name.clone()))
        .bind(non_empty(&payload.email).unwrap_or_else(|| user.email.clone()))
        .bind(payload.phone.trim())
        .bind(semester)
        .bind(department)
        .bind(route.id)
        .bind(&route.route_name)
        .bind(payload.pickup_point.trim())
        .fetch_one(&state.pool)
        .await
        .map_err(ServerError::internal)?;

    tracing::info!(application = row.id, route = route.id, "transport application submitted");
    Ok((StatusCode::CREATED, Json(row)))
}

pub async fn list_applications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Vec<TransportApplicationRow>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {TRANSPORT_APPLICATION_COLUMNS} FROM transport_applications WHERE 1 = 1"
    ));
    if let Some(status) = non_empty(&query.status) {
        qb.push(" AND status = ");
        qb.push_bind(status);
    }
    qb.push(" ORDER BY applied_date DESC, id DESC");

    let rows = qb
        .build_query_as::<TransportApplicationRow>()
        .fetch_all(&state.pool)
        .await
        .map_err(ServerError::internal)?;
    Ok(Json(rows))
}

pub async fn my_application(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Option<TransportApplicationRow>>, ServerError> {
    let caller = auth_user(&state, &headers).await?;

    let sql = format!(
        "SELECT {TRANSPORT_APPLICATION_COLUMNS} FROM transport_applications WHERE student_id = ?1 \
         ORDER BY applied_date DESC, id DESC LIMIT 1"
    );
    let row = sqlx::query_as::<_, TransportApplicationRow>(&sql)
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
) -> Result<Json<TransportApplicationRow>, ServerError> {
    let caller = auth_user(&state, &headers).await?;
    caller.require_admin()?;
    one_of("status", &payload.status, &APPLICATION_STATUSES)?;

    let sql = format!(
        "UPDATE transport_applications SET status = ?1, remarks = COALESCE(?2, remarks), \
         processed_date = datetime('now'), processed_by = ?3, updated_at = datetime('now') \
         WHERE id = ?4 RETURNING {TRANSPORT_APPLICATION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, TransportApplicationRow>(&sql)
        .bind(&payload.status)
        .bind(payload.remarks.as_deref())
        .bind(caller.id())
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Application not found"))?;

    Ok(Json(row))
}

async fn load_route(state: &AppState, id: i64) -> Result<RouteRow, ServerError> {
    let sql = format!("SELECT {ROUTE_COLUMNS} FROM transport_routes WHERE id = ?1");
    sqlx::query_as::<_, RouteRow>(&sql)
        .bind(id)
        .fetch_optional(&state.pool)
        .await
        .map_err(ServerError::internal)?
        .ok_or_else(|| ServerError::not_found("Route not found"))
}

fn check_route(route: &RouteRow) -> Result<(), ServerError> {
    one_of("status", &route.status, &ROUTE_STATUSES)?;
    if route.capacity <= 0 {
        return Err(ServerError::bad_request("Capacity must be positive"));
    }
    for student in route.students_assigned.iter() {
        if let Some(fee) = student.fee_status.as_deref() {
            one_of("feeStatus", fee, &FEE_STATUSES)?;
        }
    }
    Ok(())
}
