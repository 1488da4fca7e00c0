use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    Student,
    Parent,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "faculty" => Some(Role::Faculty),
            "student" => Some(Role::Student),
            "parent" => Some(Role::Parent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Faculty => "faculty",
            Role::Student => "student",
            Role::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, usn, class_name, \
     semester, department, attendance, cgpa, employee_id, designation, child_usn, child_name, \
     created_at, updated_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub phone: Option<String>,
    pub usn: Option<String>,
    pub class_name: Option<String>,
    pub semester: Option<i64>,
    pub department: Option<String>,
    pub attendance: f64,
    pub cgpa: f64,
    pub employee_id: Option<String>,
    pub designation: Option<String>,
    pub child_usn: Option<String>,
    pub child_name: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StudentData {
    pub usn: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub semester: Option<i64>,
    pub department: Option<String>,
    pub attendance: f64,
    pub cgpa: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FacultyData {
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParentData {
    pub child_usn: Option<String>,
    pub child_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_data: Option<StudentData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faculty_data: Option<FacultyData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_data: Option<ParentData>,
    pub created_at: String,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        let role = Role::parse(&row.role);
        let student_data = (role == Some(Role::Student)).then(|| StudentData {
            usn: row.usn.clone(),
            class_name: row.class_name.clone(),
            semester: row.semester,
            department: row.department.clone(),
            attendance: row.attendance,
            cgpa: row.cgpa,
        });
        let faculty_data = (role == Some(Role::Faculty)).then(|| FacultyData {
            employee_id: row.employee_id.clone(),
            department: row.department.clone(),
            designation: row.designation.clone(),
        });
        let parent_data = (role == Some(Role::Parent)).then(|| ParentData {
            child_usn: row.child_usn.clone(),
            child_name: row.child_name.clone(),
        });

        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
            phone: row.phone,
            student_data,
            faculty_data,
            parent_data,
            created_at: row.created_at,
        }
    }
}

/// Publisher/uploader/reporter summary embedded in other records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub phone: Option<String>,
    pub student_data: Option<StudentData>,
    pub faculty_data: Option<FacultyData>,
    pub parent_data: Option<ParentData>,
}

/// One row of a bulk registration upload (flat, spreadsheet-shaped).
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkUserRow {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub usn: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub semester: Option<i64>,
    pub department: Option<String>,
    pub employee_id: Option<String>,
    pub designation: Option<String>,
    pub child_usn: Option<String>,
    pub child_name: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct BulkResults {
    pub success: u32,
    pub failed: u32,
    pub errors: Vec<BulkRowError>,
}

#[derive(Debug, Serialize)]
pub struct BulkRowError {
    pub email: Option<String>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkRegisterResponse {
    pub message: String,
    pub results: BulkResults,
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileUpdateRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
