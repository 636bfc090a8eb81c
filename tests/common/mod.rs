#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderValue, Request, StatusCode, header};
use chrono::Duration;
use coursemaster::api;
use coursemaster::auth::JwtVerifier;
use coursemaster::db::{self, repository};
use coursemaster::models::{Batch, Course, Level, NewCourse};
use coursemaster::state::AppState;
use serde_json::Value;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const OWNER_ID: &str = "user-ada";
pub const FRONTEND: &str = "http://localhost:3000";

pub async fn test_pool() -> SqlitePool {
    // One connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    db::migrate(&pool).await.expect("Failed to run migrations");

    sqlx::query("INSERT INTO users (id, full_name, email) VALUES (?, ?, ?)")
        .bind(OWNER_ID)
        .bind("Ada Lovelace")
        .bind("ada@example.com")
        .execute(&pool)
        .await
        .expect("Failed to insert owner");

    pool
}

pub fn app(pool: SqlitePool) -> Router {
    let state = AppState {
        db: pool,
        identity: Arc::new(JwtVerifier::new(SECRET)),
        max_page_size: 100,
    };
    api::app(state, HeaderValue::from_static(FRONTEND))
}

pub fn token_for(user_id: &str) -> String {
    JwtVerifier::new(SECRET)
        .issue(user_id, Duration::hours(1))
        .expect("Failed to sign token")
}

pub fn batch(current_students: i64) -> Batch {
    Batch {
        id: format!("batch-{}", current_students),
        name: Some("Cohort".to_string()),
        start_date: None,
        end_date: None,
        max_students: Some(50),
        current_students,
    }
}

pub fn new_course(title: &str, instructor: &str, category: &str, price: f64) -> NewCourse {
    NewCourse {
        title: title.to_string(),
        description: None,
        instructor: instructor.to_string(),
        price,
        category: category.to_string(),
        syllabus: "Week 1: basics".to_string(),
        duration: Some("6 weeks".to_string()),
        level: Level::Beginner,
        batches: Vec::new(),
        thumbnail: None,
    }
}

pub async fn seed(pool: &SqlitePool, course: NewCourse) -> Course {
    repository::insert_course(pool, course, OWNER_ID)
        .await
        .expect("Failed to insert course")
}

/// Pins `created_at` so newest-first ordering is deterministic.
pub async fn set_created_at(pool: &SqlitePool, id: &str, created_at: &str) {
    sqlx::query("UPDATE courses SET created_at = ? WHERE id = ?")
        .bind(created_at)
        .bind(id)
        .execute(pool)
        .await
        .expect("Failed to set created_at");
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("request failed");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is not JSON")
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("theme=dark; token={}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}
