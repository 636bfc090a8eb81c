use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query};
use axum::http::{HeaderValue, Method, header};
use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthUser;
use crate::db::repository::{self, Facet};
use crate::error::AppError;
use crate::models::*;
use crate::services::{CourseListingService, ListRequest, ListResponse};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseFilters {
    pub categories: Vec<String>,
    pub instructors: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseEnvelope {
    pub message: String,
    pub course: Course,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/courses", course_routes())
        .with_state(state)
}

fn course_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_courses).post(create_course))
        .route("/list", get(list_courses))
        .route("/filters/all", get(course_filters))
        .route(
            "/{id}",
            get(get_course).put(update_course).delete(delete_course),
        )
}

/// Browser access from the single front-end origin, cookies included.
pub fn cors(origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
}

pub fn app(state: AppState, cors_origin: HeaderValue) -> Router {
    router(state)
        .layer(cors(cors_origin))
        .layer(TraceLayer::new_for_http())
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

async fn list_all_courses(State(state): State<AppState>) -> Result<Json<Vec<Course>>, AppError> {
    let courses = repository::fetch_courses(&state.db).await?;
    Ok(Json(courses))
}

async fn list_courses(
    State(state): State<AppState>,
    Query(req): Query<ListRequest>,
) -> Result<Json<ListResponse>, AppError> {
    let service = CourseListingService::new(state.db.clone(), state.max_page_size);
    let page = service.list(req).await?;
    Ok(Json(page))
}

async fn course_filters(State(state): State<AppState>) -> Result<Json<CourseFilters>, AppError> {
    let categories = repository::distinct_values(&state.db, Facet::Category).await?;
    let instructors = repository::distinct_values(&state.db, Facet::Instructor).await?;
    Ok(Json(CourseFilters { categories, instructors }))
}

async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Course>, AppError> {
    let course = repository::find_course_by_id(&state.db, &id)
        .await?
        .ok_or_else(AppError::course_not_found)?;
    Ok(Json(course))
}

async fn create_course(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<NewCourseRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CourseEnvelope>), AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let new_course = req.validate()?;

    let course = repository::insert_course(&state.db, new_course, &user.user_id).await?;
    info!(course_id = %course.id, user_id = %user.user_id, "course created");

    Ok((
        StatusCode::CREATED,
        Json(CourseEnvelope {
            message: "Course created successfully".to_string(),
            course,
        }),
    ))
}

async fn update_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCourseRequest>, JsonRejection>,
) -> Result<Json<CourseEnvelope>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    let patch = req.validate()?;

    let course = repository::update_course(&state.db, &id, patch)
        .await?
        .ok_or_else(AppError::course_not_found)?;
    info!(course_id = %course.id, user_id = %user.user_id, "course updated");

    Ok(Json(CourseEnvelope {
        message: "Course updated successfully".to_string(),
        course,
    }))
}

async fn delete_course(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !repository::delete_course(&state.db, &id).await? {
        return Err(AppError::course_not_found());
    }
    info!(course_id = %id, user_id = %user.user_id, "course deleted");

    Ok(Json(json!({ "message": "Course deleted successfully" })))
}
