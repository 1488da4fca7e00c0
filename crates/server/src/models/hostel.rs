use serde::{Deserialize, Serialize};
use sqlx::types::Json;

pub const ROOM_TYPES: [&str; 4] = ["single", "double", "triple", "quad"];
pub const ROOM_STATUSES: [&str; 4] = ["available", "occupied", "full", "maintenance"];
pub const APPLICATION_STATUSES: [&str; 3] = ["pending", "approved", "rejected"];
pub const FEE_STATUSES: [&str; 3] = ["paid", "pending", "overdue"];

pub fn default_facilities() -> Vec<String> {
    ["bed", "table", "chair", "wardrobe"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Occupancy decides the status unless the room is under maintenance.
pub fn derive_room_status(requested: Option<&str>, occupants: usize, capacity: i64) -> &'static str {
    if requested == Some("maintenance") {
        return "maintenance";
    }
    if occupants == 0 {
        "available"
    } else if (occupants as i64) < capacity {
        "occupied"
    } else {
        "full"
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Occupant {
    pub student_id: Option<i64>,
    pub student_usn: String,
    pub student_name: String,
    pub admission_date: Option<String>,
    pub fee_status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Warden {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MealPlan {
    pub day: String,
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
}

pub const ROOM_COLUMNS: &str = "id, block_name, room_number, floor, room_type, capacity, occupants, \
     facilities, status, warden, mess_menu, created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomRow {
    pub id: i64,
    pub block_name: String,
    pub room_number: String,
    pub floor: i64,
    pub room_type: String,
    pub capacity: i64,
    pub occupants: Json<Vec<Occupant>>,
    pub facilities: Json<Vec<String>>,
    pub status: String,
    pub warden: Option<Json<Warden>>,
    pub mess_menu: Json<Vec<MealPlan>>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub id: i64,
    pub block_name: String,
    pub room_number: String,
    pub floor: i64,
    pub room_type: String,
    pub capacity: i64,
    pub occupants: Vec<Occupant>,
    pub facilities: Vec<String>,
    pub status: String,
    pub warden: Option<Warden>,
    pub mess_menu: Vec<MealPlan>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<RoomRow> for RoomResponse {
    fn from(row: RoomRow) -> Self {
        Self {
            id: row.id,
            block_name: row.block_name,
            room_number: row.room_number,
            floor: row.floor,
            room_type: row.room_type,
            capacity: row.capacity,
            occupants: row.occupants.0,
            facilities: row.facilities.0,
            status: row.status,
            warden: row.warden.map(|w| w.0),
            mess_menu: row.mess_menu.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Create and update share one shape; create requires the identity fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoomRequest {
    pub block_name: Option<String>,
    pub room_number: Option<String>,
    pub floor: Option<i64>,
    pub room_type: Option<String>,
    pub capacity: Option<i64>,
    pub occupants: Option<Vec<Occupant>>,
    pub facilities: Option<Vec<String>>,
    pub status: Option<String>,
    pub warden: Option<Warden>,
    pub mess_menu: Option<Vec<MealPlan>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RoomQuery {
    pub status: Option<String>,
    pub block: Option<String>,
}

pub const HOSTEL_APPLICATION_COLUMNS: &str = "id, student_id, student_usn, student_name, email, \
     phone, semester, department, room_preference, block_preference, guardian_name, \
     guardian_phone, guardian_relation, permanent_address, any_medical_conditions, \
     medical_details, status, applied_date, processed_date, processed_by, remarks, \
     created_at, updated_at";

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HostelApplicationRow {
    pub id: i64,
    pub student_id: i64,
    pub student_usn: String,
    pub student_name: String,
    pub email: String,
    pub phone: String,
    pub semester: i64,
    pub department: String,
    pub room_preference: String,
    pub block_preference: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_relation: String,
    pub permanent_address: Option<String>,
    pub any_medical_conditions: bool,
    pub medical_details: String,
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
pub struct HostelApplicationRequest {
    pub student_usn: Option<String>,
    pub student_name: Option<String>,
    pub email: Option<String>,
    pub phone: String,
    pub semester: Option<i64>,
    pub department: Option<String>,
    pub room_preference: String,
    pub block_preference: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub guardian_relation: String,
    pub permanent_address: Option<String>,
    pub any_medical_conditions: bool,
    pub medical_details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApplicationQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProcessApplicationRequest {
    pub status: String,
    pub remarks: Option<String>,
}
