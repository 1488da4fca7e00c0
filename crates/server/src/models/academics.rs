use serde::{Deserialize, Serialize};
use sqlx::types::Json;

pub const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub duration: String,
    pub students: i64,
    pub hod: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DepartmentRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub duration: Option<String>,
    pub students: Option<i64>,
    pub hod: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub semester: String,
    pub credits: i64,
    pub department: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubjectRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub semester: Option<String>,
    pub credits: Option<i64>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TimetableRow {
    pub id: i64,
    pub class_name: String,
    pub day: String,
    pub slots: Json<Vec<String>>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableResponse {
    pub id: i64,
    pub class_name: String,
    pub day: String,
    pub slots: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<TimetableRow> for TimetableResponse {
    fn from(row: TimetableRow) -> Self {
        Self {
            id: row.id,
            class_name: row.class_name,
            day: row.day,
            slots: row.slots.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimetableRequest {
    pub class_name: Option<String>,
    pub day: Option<String>,
    pub slots: Option<Vec<String>>,
}
