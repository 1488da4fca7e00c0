pub mod academics;
pub mod ai;
pub mod announcements;
pub mod attendance;
pub mod auth;
pub mod exams;
pub mod guardian;
pub mod hostel;
pub mod lostfound;
pub mod marks;
pub mod materials;
pub mod public;
pub mod transport;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, put};
use axum::Router;

use crate::app_state::AppState;
use crate::errors::ServerError;
use crate::rate_limit::{limit_ai, limit_api, limit_auth, limit_heavy};

pub fn router(state: AppState) -> Router {
    let heavy = || from_fn_with_state(state.clone(), limit_heavy);

    let auth = Router::new()
        .route(
            "/login",
            post(auth::login).route_layer(from_fn_with_state(state.clone(), limit_auth)),
        )
        .route("/logout", post(auth::logout))
        .route("/register", post(auth::register))
        .route("/bulk-register", post(auth::bulk_register).route_layer(heavy()))
        .route("/me", get(auth::me))
        .route("/users", get(auth::list_users))
        .route("/profile", put(auth::update_profile))
        .route("/password", put(auth::change_password));

    let announcements = Router::new()
        .route(
            "/",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/:id",
            get(announcements::get_announcement)
                .put(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        )
        .route("/:id/read", post(announcements::mark_read));

    let attendance = Router::new()
        .route("/", get(attendance::list_attendance))
        .route("/mark", post(attendance::mark_attendance).route_layer(heavy()))
        .route("/report", get(attendance::attendance_report).route_layer(heavy()))
        .route("/students", get(attendance::class_students))
        .route("/classes", get(attendance::list_classes))
        .route("/stats", get(attendance::attendance_stats));

    let marks = Router::new()
        .route(
            "/",
            get(marks::list_marks).merge(post(marks::upload_marks).route_layer(heavy())),
        )
        .route("/stats", get(marks::marks_stats))
        .route("/publish", post(marks::publish_results));

    let exams = Router::new()
        .route("/", get(exams::list_exams).post(exams::create_exam))
        .route("/:id", get(exams::get_exam))
        .route("/:id/submit", post(exams::submit_exam))
        .route("/:id/invite", post(exams::invite_students));

    let hostel = Router::new()
        .route("/", get(hostel::list_rooms).post(hostel::create_room))
        .route("/mess/menu", get(hostel::mess_menu))
        .route("/applications", get(hostel::list_applications))
        .route("/application", post(hostel::submit_application))
        .route("/application/my", get(hostel::my_application))
        .route("/application/:id", put(hostel::process_application))
        .route(
            "/:id",
            get(hostel::get_room)
                .put(hostel::update_room)
                .delete(hostel::delete_room),
        );

    let transport = Router::new()
        .route("/", get(transport::list_routes).post(transport::create_route))
        .route("/applications", get(transport::list_applications))
        .route("/application", post(transport::submit_application))
        .route("/application/my", get(transport::my_application))
        .route("/application/:id", put(transport::process_application))
        .route(
            "/:id",
            get(transport::get_route)
                .put(transport::update_route)
                .delete(transport::delete_route),
        );

    let materials = Router::new()
        .route(
            "/",
            get(materials::list_materials).post(materials::upload_material),
        )
        .route("/:id", axum::routing::delete(materials::delete_material));

    let lostfound = Router::new()
        .route("/", get(lostfound::list_items).post(lostfound::create_item))
        .route(
            "/:id",
            get(lostfound::get_item)
                .put(lostfound::update_item)
                .delete(lostfound::delete_item),
        );

    let academics = Router::new()
        .route(
            "/departments",
            get(academics::list_departments).post(academics::create_department),
        )
        .route(
            "/departments/:id",
            put(academics::update_department).delete(academics::delete_department),
        )
        .route(
            "/subjects",
            get(academics::list_subjects).post(academics::create_subject),
        )
        .route(
            "/subjects/:id",
            put(academics::update_subject).delete(academics::delete_subject),
        )
        .route(
            "/timetables",
            get(academics::list_timetables).post(academics::create_timetable),
        )
        .route(
            "/timetables/:id",
            put(academics::update_timetable).delete(academics::delete_timetable),
        );

    let guardian = Router::new()
        .route("/health", get(guardian::health))
        .route("/stats", get(guardian::stats))
        .route("/bloat", get(guardian::bloat))
        .route("/prediction", get(guardian::prediction))
        .route("/cleanup", post(guardian::cleanup))
        .route("/survival", post(guardian::survival))
        .route("/status", get(guardian::status));

    let ai = Router::new()
        .route("/chat", post(ai::chat))
        .route_layer(from_fn_with_state(state.clone(), limit_ai));

    let api = Router::new()
        .route("/", get(public::banner))
        .route("/public/stats", get(public::public_stats))
        .nest("/auth", auth)
        .nest("/announcements", announcements)
        .nest("/attendance", attendance)
        .nest("/marks", marks)
        .nest("/exams", exams)
        .nest("/hostel", hostel)
        .nest("/transport", transport)
        .nest("/materials", materials)
        .nest("/lostfound", lostfound)
        .nest("/academics", academics)
        .nest("/guardian", guardian)
        .nest("/ai", ai)
        .layer(from_fn_with_state(state.clone(), limit_api));

    Router::new()
        .route("/", get(public::banner))
        .route("/health", get(public::health))
        .nest("/api", api)
        .with_state(state)
}

/// 400 unless `value` is one of `allowed`.
pub(crate) fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<(), ServerError> {
    if allowed.contains(&value) {
        return Ok(());
    }
    Err(ServerError::bad_request(format!(
        "Invalid {field} '{value}'. Expected one of: {}",
        allowed.join(", ")
    )))
}

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn required(value: &Option<String>) -> Result<String, ServerError> {
    non_empty(value).ok_or_else(|| ServerError::bad_request("Missing required fields"))
}

/// Returns `(page, limit, offset)`; page is at least 1, limit in `1..=max`.
pub(crate) fn page_window(page: Option<i64>, limit: Option<i64>, default: i64, max: i64) -> (i64, i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default).clamp(1, max);
    (page, limit, (page - 1) * limit)
}
