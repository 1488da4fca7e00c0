use std::path::Path;

use portal_core::infra::sqlite_pool::create_pool;
use portal_core::infra::sqlite_probe::quote_ident;
use sqlx::types::Json as SqlJson;
use sqlx::SqlitePool;

use crate::auth::hash_password;
use crate::config::{
  ConfigError,
  ServerConfig
};
use crate::models::users::Role;

/// Everything needed to insert one
/// `users` row. The password is already
/// hashed.
#[derive(Debug, Clone)]

pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
  pub role:          Role,
  pub phone:         Option<String>,
  pub usn:           Option<String>,
  pub class_name:    Option<String>,
  pub semester:      Option<i64>,
  pub department:    Option<String>,
  pub employee_id:   Option<String>,
  pub designation:   Option<String>,
  pub child_usn:     Option<String>,
  pub child_name:    Option<String>
}

impl NewUser {
  pub fn new(
    name: &str,
    email: &str,
    password_hash: String,
    role: Role
  ) -> Self {
    Self {
      name: name.trim().to_string(),
      email: normalize_email(email),
      password_hash,
      role,
      phone: None,
      usn: None,
      class_name: None,
      semester: None,
      department: None,
      employee_id: None,
      designation: None,
      child_usn: None,
      child_name: None
    }
  }
}

pub fn normalize_email(
  raw: &str
) -> String {
  raw.trim().to_lowercase()
}

pub async fn connect_db(
  config: &ServerConfig,
  config_path: &Path
) -> Result<SqlitePool, ConfigError> {
  let base_dir = config_path
    .parent()
    .ok_or_else(|| {
      ConfigError::Invalid(
        "config path has no parent"
          .into()
      )
    })?;

  let path =
    config.sqlite_path(base_dir);

  let pool = create_pool(
    &path,
    config
      .sqlite
      .max_connections
      .unwrap_or(10)
  )
  .await
  .map_err(|e| {
    ConfigError::Invalid(format!(
      "sqlite connect failed: {e}"
    ))
  })?;

  tracing::info!(
    path = %path.display(),
    "sqlite pool ready"
  );

  Ok(pool)
}

pub async fn insert_user(
  pool: &SqlitePool,
  user: &NewUser
) -> Result<i64, sqlx::Error> {
  let id = sqlx::query_scalar::<_, i64>(
    "INSERT INTO users (name, email, \
     password_hash, role, phone, usn, \
     class_name, semester, department, \
     employee_id, designation, \
     child_usn, child_name) VALUES \
     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, \
     ?9, ?10, ?11, ?12, ?13) \
     RETURNING id"
  )
  .bind(&user.name)
  .bind(&user.email)
  .bind(&user.password_hash)
  .bind(user.role.as_str())
  .bind(&user.phone)
  .bind(&user.usn)
  .bind(&user.class_name)
  .bind(user.semester)
  .bind(&user.department)
  .bind(&user.employee_id)
  .bind(&user.designation)
  .bind(&user.child_usn)
  .bind(&user.child_name)
  .fetch_one(pool)
  .await?;

  Ok(id)
}

pub async fn reset_server_data(
  pool: &SqlitePool
) -> Result<(), ConfigError> {
  let tables = [
    "user_tokens",
    "announcement_reads",
    "announcements",
    "attendance",
    "marks",
    "exam_results",
    "exam_questions",
    "exams",
    "hostel_applications",
    "hostel_rooms",
    "transport_applications",
    "transport_routes",
    "study_materials",
    "lost_found",
    "timetables",
    "subjects",
    "departments",
    "users"
  ];

  for table in tables {
    let query = format!(
      "DELETE FROM {}",
      quote_ident(table)
    );

    sqlx::query(&query)
      .execute(pool)
      .await
      .map_err(|e| {
        ConfigError::Invalid(format!(
          "cleanup {table} failed: {e}"
        ))
      })?;
  }

  tracing::warn!(
    "dev reset: all portal data removed"
  );

  Ok(())
}

/// Creates the configured admin account
/// unless the email is already taken.
pub async fn ensure_default_admin(
  config: &ServerConfig,
  pool: &SqlitePool
) -> Result<(), ConfigError> {
  let seed = &config.seed;

  let created = insert_if_missing(
    pool,
    &seed.admin_name,
    &seed.admin_email,
    &seed.admin_password,
    Role::Admin,
    |_| {}
  )
  .await?;

  if created {
    tracing::info!(
      email = %seed.admin_email,
      "default admin created"
    );
  }

  Ok(())
}

/// One demo account per non-admin role,
/// all sharing the default password.
pub async fn seed_demo_users(
  config: &ServerConfig,
  pool: &SqlitePool
) -> Result<u32, ConfigError> {
  let password =
    &config.auth.default_password;
  let mut created = 0;

  if insert_if_missing(
    pool,
    "Demo Faculty",
    "faculty@campus.local",
    password,
    Role::Faculty,
    |u| {
      u.employee_id =
        Some("FAC001".into());
      u.department = Some("CSE".into());
      u.designation =
        Some("Assistant Professor".into());
    }
  )
  .await?
  {
    created += 1;
  }

  if insert_if_missing(
    pool,
    "Demo Student",
    "student@campus.local",
    password,
    Role::Student,
    |u| {
      u.usn = Some("1CS21CS001".into());
      u.class_name =
        Some("CSE Sem 5".into());
      u.semester = Some(5);
      u.department = Some("CSE".into());
    }
  )
  .await?
  {
    created += 1;
  }

  if insert_if_missing(
    pool,
    "Demo Parent",
    "parent@campus.local",
    password,
    Role::Parent,
    |u| {
      u.child_usn =
        Some("1CS21CS001".into());
      u.child_name =
        Some("Demo Student".into());
    }
  )
  .await?
  {
    created += 1;
  }

  Ok(created)
}

/// Rows written by [`seed_academics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]

pub struct AcademicSeed {
  pub departments: usize,
  pub subjects:    usize,
  pub timetables:  usize
}

const DEPARTMENTS: [(
  &str,
  &str,
  i64,
  &str
); 4] = [
  (
    "Computer Science & Engineering",
    "CSE",
    240,
    "Dr. N C Mahendra Babu"
  ),
  (
    "Electronics & Communication",
    "ECE",
    180,
    "Dr. R. Kumar"
  ),
  (
    "Information Science & Engineering",
    "ISE",
    120,
    "Dr. B. S. Prasad"
  ),
  (
    "Electrical & Electronics",
    "EEE",
    120,
    "Dr. S. Sharma"
  )
];

const SUBJECTS: [(
  &str,
  &str,
  &str,
  i64,
  &str
); 4] = [
  ("Data Structures", "CS301", "3", 4, "CSE"),
  ("Operating Systems", "CS401", "4", 4, "CSE"),
  ("Database Management", "CS402", "4", 3, "CSE"),
  ("Digital Logic Design", "EC201", "2", 4, "ECE")
];

const TIMETABLES: [(
  &str,
  &str,
  [&str; 6]
); 10] = [
  ("CSE 5A", "Monday", [
    "Data Structures", "OS Lab", "DBMS",
    "Break", "Mathematics", "Physics"
  ]),
  ("CSE 5A", "Tuesday", [
    "DBMS", "Data Structures", "OS",
    "Break", "Chemistry", "English"
  ]),
  ("CSE 5A", "Wednesday", [
    "Operating Systems", "DBMS Lab",
    "Mathematics", "Break",
    "Data Structures", "Sports"
  ]),
  ("CSE 5A", "Thursday", [
    "Mathematics", "Physics", "DBMS",
    "Break", "OS", "Data Structures"
  ]),
  ("CSE 5A", "Friday", [
    "Chemistry", "English",
    "Data Structures", "Break",
    "Project Work", "Project Work"
  ]),
  ("ISE 3A", "Monday", [
    "Discrete Mathematics",
    "Java Programming", "Data Comm",
    "Break", "Physics", "Chemistry"
  ]),
  ("ISE 3A", "Tuesday", [
    "Java Lab", "Discrete Math",
    "English", "Break", "Data Comm",
    "Mathematics"
  ]),
  ("ISE 3A", "Wednesday", [
    "Data Comm", "Java", "Sports",
    "Break", "Math Lab", "Discrete Math"
  ]),
  ("ISE 3A", "Thursday", [
    "Physics", "Chemistry", "Java",
    "Break", "Data Comm", "Discrete Math"
  ]),
  ("ISE 3A", "Friday", [
    "English", "Mathematics",
    "Project Work", "Break",
    "Project Work", "Java"
  ])
];

/// Replaces departments, subjects and
/// timetables with the stock catalogue.
/// Runs in one transaction.
pub async fn seed_academics(
  pool: &SqlitePool
) -> Result<AcademicSeed, ConfigError> {
  let fail = |step: &str, e: sqlx::Error| {
    ConfigError::Invalid(format!(
      "academic seed {step} failed: {e}"
    ))
  };

  let mut tx = pool
    .begin()
    .await
    .map_err(|e| fail("begin", e))?;

  for table in
    ["timetables", "subjects", "departments"]
  {
    let query = format!(
      "DELETE FROM {}",
      quote_ident(table)
    );
    sqlx::query(&query)
      .execute(&mut *tx)
      .await
      .map_err(|e| fail(table, e))?;
  }

  for (name, code, students, hod) in
    DEPARTMENTS
  {
    sqlx::query(
      "INSERT INTO departments (name, \
       code, duration, students, hod) \
       VALUES (?1, ?2, '4 Years', ?3, ?4)"
    )
    .bind(name)
    .bind(code)
    .bind(students)
    .bind(hod)
    .execute(&mut *tx)
    .await
    .map_err(|e| fail("departments", e))?;
  }

  for (name, code, semester, credits, dept) in
    SUBJECTS
  {
    sqlx::query(
      "INSERT INTO subjects (name, code, \
       semester, credits, department) \
       VALUES (?1, ?2, ?3, ?4, ?5)"
    )
    .bind(name)
    .bind(code)
    .bind(semester)
    .bind(credits)
    .bind(dept)
    .execute(&mut *tx)
    .await
    .map_err(|e| fail("subjects", e))?;
  }

  for (class_name, day, slots) in
    TIMETABLES
  {
    sqlx::query(
      "INSERT INTO timetables \
       (class_name, day, slots) VALUES \
       (?1, ?2, ?3)"
    )
    .bind(class_name)
    .bind(day)
    .bind(SqlJson(slots.to_vec()))
    .execute(&mut *tx)
    .await
    .map_err(|e| fail("timetables", e))?;
  }

  tx.commit()
    .await
    .map_err(|e| fail("commit", e))?;

  tracing::info!(
    departments = DEPARTMENTS.len(),
    subjects = SUBJECTS.len(),
    timetables = TIMETABLES.len(),
    "academic catalogue seeded"
  );

  Ok(AcademicSeed {
    departments: DEPARTMENTS.len(),
    subjects:    SUBJECTS.len(),
    timetables:  TIMETABLES.len()
  })
}

async fn insert_if_missing(
  pool: &SqlitePool,
  name: &str,
  email: &str,
  password: &str,
  role: Role,
  customize: impl FnOnce(&mut NewUser)
) -> Result<bool, ConfigError> {
  let email = normalize_email(email);

  let exists: Option<i64> =
    sqlx::query_scalar(
      "SELECT id FROM users WHERE \
       email = ?1"
    )
    .bind(&email)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
      ConfigError::Invalid(format!(
        "user lookup failed: {e}"
      ))
    })?;

  if exists.is_some() {
    return Ok(false);
  }

  let password_hash = hash_password(
    password
  )
  .map_err(|e| {
    ConfigError::Invalid(format!(
      "hash password: {e}"
    ))
  })?;

  let mut user = NewUser::new(
    name,
    &email,
    password_hash,
    role
  );
  customize(&mut user);

  insert_user(pool, &user)
    .await
    .map_err(|e| {
      ConfigError::Invalid(format!(
        "seed user insert failed: {e}"
      ))
    })?;

  Ok(true)
}
