use serde::{Deserialize, Serialize};
use sqlx::types::Json;

pub const ROUTE_STATUSES: [&str; 3] = ["active", "inactive", "maintenance"];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stop {
    pub stop_name: String,
    pub arrival_time: String,
    pub departure_time: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignedStudent {
    pub student_id: Option<i64>,
    pub student_usn: String,
    pub student_name: String,
    pub boarding_stop: String,
    pub fee_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    pub morning_start: String,
    pub morning_end: String,
    pub evening_start: String,
    pub evening_end: String,
}

pub const ROUTE_COLUMNS: &str = "id, route_number, route_name, driver_name, driver_phone, \
     bus_number, capacity, stops, students_assigned, status, schedule, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RouteRow {
    pub id: i64,
    pub route_number: String,
    pub route_name: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub bus_number: String,
    pub capacity: i64,
    pub stops: Json<Vec<Stop>>,
    pub students_assigned: Json<Vec<AssignedStudent>>,
    pub status: String,
    pub schedule: Option<Json<Schedule>>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub id: i64,
    pub route_number: String,
    pub route_name: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub bus_number: String,
    pub capacity: i64,
    pub stops: Vec<Stop>,
    pub students_assigned: Vec<AssignedStudent>,
    pub status: String,
    pub schedule: Option<Schedule>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RouteRow> for RouteResponse {
    fn from(row: RouteRow) -> Self {
        Self {
            id: row.id,
            route_number: row.route_number,
            route_name: row.route_name,
            driver_name: row.driver_name,
            driver_phone: row.driver_phone,
            bus_number: row.bus_number,
            capacity: row.capacity,
            stops: row.stops.0,
            students_assigned: row.students_assigned.0,
            status: row.status,
            schedule: row.schedule.map(|s| s.0),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteRequest {
    pub route_number: Option<String>,
    pub route_name: Option<String>,
    pub driver_name: Option<String>,
    pub driver_phone: Option<String>,
    pub bus_number: Option<String>,
    pub capacity: Option<i64>,
    pub stops: Option<Vec<Stop>>,
    pub students_assigned: Option<Vec<AssignedStudent>>,
    pub status: Option<String>,
    pub schedule: Option<Schedule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RouteQuery {
    pub status: Option<String>,
}

pub const TRANSPORT_APPLICATION_COLUMNS: &str = "id, student_id, student_usn, student_name, \
     email, phone, semester, department, route_id, route_name, pickup_point, status, \
     applied_date, processed_date, processed_by, remarks, created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransportApplicationRow {
    pub id: i64,
    pub student_id: i64,
    pub student_usn: String,
    pub student_name: String,
    pub email: String,
    pub phone: String,
    pub semester: i64,
    pub department: String,
    pub route_id: i64,
    pub route_name: String,
    pub pickup_point: String,
    pub status: String,
    pub applied_date: String,
    pub processed_date: Option<String>,
    pub processed_by: Option<i64>,
    pub remarks: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransportApplicationRequest {
    pub student_usn: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub semester: Option<i64>,
    pub department: Option<String>,
    pub route_id: Option<i64>,
    pub pickup_point: String,
}
