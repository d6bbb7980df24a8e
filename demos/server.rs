//! Simple REST API server demo for the course marketplace.
//!
//! Run with: `cargo run --example server`
//!
//! The `x-user-id` header stands in for an authentication layer: it carries
//! the id of the calling user.
//!
//! ## Endpoints
//!
//! - `POST /users` - Register a user
//! - `GET /users/{id}/enrollments` - List a user's enrollments
//! - `GET /courses` - List courses open for purchase
//! - `POST /courses` - Create a course (staff)
//! - `POST /courses/{id}/pay` - Buy a course with bonuses
//! - `GET /courses/{id}/groups` - List a course's groups
//! - `POST /courses/{id}/lessons` - Add a lesson (staff)
//! - `GET /courses/{id}/lessons` - List lessons (staff or students)
//!
//! ## Example Usage
//!
//! ```bash
//! curl -X POST http://localhost:3000/users \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "admin@example.com", "is_staff": true}'
//!
//! curl -X POST http://localhost:3000/courses \
//!   -H "Content-Type: application/json" -H "x-user-id: 1" \
//!   -d '{"title": "Rust basics", "price": 10}'
//!
//! curl -X POST http://localhost:3000/courses/1/pay -H "x-user-id: 2"
//! ```

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, State},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use course_market::{
    Course, CourseId, Enrollment, GroupSnapshot, Lesson, MarketError, Marketplace, NewUser, User,
    UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    pub price: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateLessonRequest {
    pub title: String,
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: u32,
    pub email: String,
    pub bonuses: u32,
    pub is_staff: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id().0,
            email: user.email().to_string(),
            bonuses: user.balance().bonuses(),
            is_staff: user.is_staff(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseResponse {
    pub id: u32,
    pub title: String,
    pub price: u32,
    pub students_count: usize,
    pub lessons_count: usize,
    pub is_available: bool,
}

impl From<&Course> for CourseResponse {
    fn from(course: &Course) -> Self {
        Self {
            id: course.id().0,
            title: course.title().to_string(),
            price: course.price(),
            students_count: course.students_count(),
            lessons_count: course.lessons_count(),
            is_available: course.is_available(),
        }
    }
}

/// Response body for errors.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

#[derive(Clone)]
pub struct AppState {
    pub market: Arc<Marketplace>,
}

// === Error Handling ===

pub enum AppError {
    Market(MarketError),
    Unauthenticated,
}

impl From<MarketError> for AppError {
    fn from(err: MarketError) -> Self {
        AppError::Market(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = match &self {
            AppError::Market(err) => (
                StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.code(),
                err.to_string(),
            ),
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHENTICATED",
                "missing or invalid x-user-id header".to_string(),
            ),
        };

        (
            status,
            Json(ErrorResponse {
                error,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

/// Caller identity taken from the `x-user-id` header.
pub struct Caller(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse().ok())
            .map(|id| Caller(UserId(id)))
            .ok_or(AppError::Unauthenticated)
    }
}

// === Handlers ===

/// POST /users - Register a user.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    let user = state.market.register(request)?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(&*user))))
}

/// GET /users/{id}/enrollments - List a user's enrollments.
async fn list_enrollments(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<Enrollment>>, AppError> {
    let enrollments = state.market.enrollments_of(UserId(id))?;
    Ok(Json(enrollments.iter().map(|e| (**e).clone()).collect()))
}

/// GET /courses - List courses open for purchase.
async fn list_courses(State(state): State<AppState>) -> Json<Vec<CourseResponse>> {
    Json(
        state
            .market
            .available_courses()
            .iter()
            .map(|course| CourseResponse::from(&**course))
            .collect(),
    )
}

/// POST /courses - Create a course.
async fn create_course(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Json(request): Json<CreateCourseRequest>,
) -> Result<(StatusCode, Json<CourseResponse>), AppError> {
    let course = state
        .market
        .create_course(actor, request.title, request.price)?;
    Ok((StatusCode::CREATED, Json(CourseResponse::from(&*course))))
}

/// POST /courses/{id}/pay - Buy a course with bonuses.
async fn pay(
    State(state): State<AppState>,
    Caller(user): Caller,
    Path(id): Path<u32>,
) -> Result<(StatusCode, Json<Enrollment>), AppError> {
    let enrollment = state.market.purchase(user, CourseId(id))?;
    Ok((StatusCode::CREATED, Json((*enrollment).clone())))
}

/// GET /courses/{id}/groups - List a course's groups.
async fn list_groups(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<GroupSnapshot>>, AppError> {
    Ok(Json(state.market.groups(CourseId(id))?))
}

/// POST /courses/{id}/lessons - Add a lesson.
async fn create_lesson(
    State(state): State<AppState>,
    Caller(actor): Caller,
    Path(id): Path<u32>,
    Json(request): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let lesson = state
        .market
        .add_lesson(actor, CourseId(id), request.title, request.link)?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

/// GET /courses/{id}/lessons - List lessons.
async fn list_lessons(
    State(state): State<AppState>,
    Caller(viewer): Caller,
    Path(id): Path<u32>,
) -> Result<Json<Vec<Lesson>>, AppError> {
    Ok(Json(state.market.lessons(viewer, CourseId(id))?))
}

// === Router ===

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/users", post(register))
        .route("/users/{id}/enrollments", get(list_enrollments))
        .route("/courses", get(list_courses).post(create_course))
        .route("/courses/{id}/pay", post(pay))
        .route("/courses/{id}/groups", get(list_groups))
        .route("/courses/{id}/lessons", get(list_lessons).post(create_lesson))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let state = AppState {
        market: Arc::new(Marketplace::new()),
    };

    let app = create_router(state);

    let listener = match TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Error binding 127.0.0.1:3000: {}", e);
            std::process::exit(1);
        }
    };
    println!("Course market API server running on http://127.0.0.1:3000");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
    }
}
