use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::db::query::{CourseFilter, CourseSort, Page, fold};
use crate::models::{Batch, Course, CourseOwner, CoursePatch, Level, NewCourse};

const COURSE_SELECT: &str = r#"
    SELECT
        c.id, c.title, c.description, c.instructor, c.price, c.category,
        c.syllabus, c.duration, c.level, c.batches, c.thumbnail,
        c.is_published, c.created_by, c.created_at, c.updated_at,
        u.full_name AS owner_name, u.email AS owner_email
    FROM courses c
    LEFT JOIN users u ON u.id = c.created_by"#;

#[derive(Debug, FromRow)]
struct CourseRow {
    id: String,
    title: String,
    description: Option<String>,
    instructor: String,
    price: f64,
    category: String,
    syllabus: String,
    duration: Option<String>,
    level: String,
    batches: Json<Vec<Batch>>,
    thumbnail: Option<String>,
    is_published: bool,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: Option<String>,
    owner_email: Option<String>,
}

impl TryFrom<CourseRow> for Course {
    type Error = sqlx::Error;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        let level = row.level.parse::<Level>().map_err(|e: String| sqlx::Error::Decode(e.into()))?;
        let created_by = match (row.created_by, row.owner_name, row.owner_email) {
            (Some(id), Some(full_name), Some(email)) => Some(CourseOwner { id, full_name, email }),
            _ => None,
        };

        Ok(Course {
            id: row.id,
            title: row.title,
            description: row.description,
            instructor: row.instructor,
            price: row.price,
            category: row.category,
            syllabus: row.syllabus,
            duration: row.duration,
            level,
            batches: row.batches.0,
            thumbnail: row.thumbnail,
            is_published: row.is_published,
            created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Distinct-value lookups offered to the UI as filter choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facet {
    Category,
    Instructor,
}

// Stored with fixed precision so text ordering matches time ordering.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn into_courses(rows: Vec<CourseRow>) -> Result<Vec<Course>, sqlx::Error> {
    rows.into_iter().map(Course::try_from).collect()
}

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(COURSE_SELECT);
    qb.push(CourseSort::Newest.order_by());
    let rows = qb.build_query_as::<CourseRow>().fetch_all(db).await?;
    into_courses(rows)
}

pub async fn find_course_by_id(db: &SqlitePool, id: &str) -> Result<Option<Course>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(COURSE_SELECT);
    qb.push(" WHERE c.id = ").push_bind(id.to_string());
    qb.build_query_as::<CourseRow>()
        .fetch_optional(db)
        .await?
        .map(Course::try_from)
        .transpose()
}

pub async fn count_courses(db: &SqlitePool, filter: &CourseFilter) -> Result<u64, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM courses c");
    filter.push_where(&mut qb);
    let count: i64 = qb.build_query_scalar().fetch_one(db).await?;
    Ok(count.max(0) as u64)
}

pub async fn fetch_course_page(
    db: &SqlitePool,
    filter: &CourseFilter,
    sort: CourseSort,
    page: &Page,
) -> Result<Vec<Course>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(COURSE_SELECT);
    filter.push_where(&mut qb);
    qb.push(sort.order_by());
    page.push_limit(&mut qb);
    let rows = qb.build_query_as::<CourseRow>().fetch_all(db).await?;
    into_courses(rows)
}

pub async fn insert_course(
    db: &SqlitePool,
    course: NewCourse,
    owner_id: &str,
) -> Result<Course, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let stamp = timestamp(&now());

    sqlx::query(
        r#"
        INSERT INTO courses
            (id, title, description, instructor, price, category, syllabus,
            duration, level, batches, thumbnail, is_published, created_by,
            created_at, updated_at, title_folded, instructor_folded)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&course.title)
    .bind(course.description)
    .bind(&course.instructor)
    .bind(course.price)
    .bind(course.category)
    .bind(course.syllabus)
    .bind(course.duration)
    .bind(course.level.as_str())
    .bind(Json(course.batches))
    .bind(course.thumbnail)
    .bind(owner_id)
    .bind(&stamp)
    .bind(&stamp)
    .bind(fold(&course.title))
    .bind(fold(&course.instructor))
    .execute(db)
    .await?;

    find_course_by_id(db, &id)
        .await?
        .ok_or_else(|| sqlx::Error::RowNotFound)
}

/// Applies `patch` over the stored course and bumps `updated_at`. Returns
/// `None` when there is no such course, including one deleted mid-update.
pub async fn update_course(
    db: &SqlitePool,
    id: &str,
    patch: CoursePatch,
) -> Result<Option<Course>, sqlx::Error> {
    let mut current = match find_course_by_id(db, id).await? {
        Some(c) => c,
        None => return Ok(None),
    };

    patch.apply(&mut current);
    current.updated_at = now();

    let result = sqlx::query(
        r#"
        UPDATE courses
        SET title = ?,
            description = ?,
            instructor = ?,
            price = ?,
            category = ?,
            syllabus = ?,
            duration = ?,
            level = ?,
            batches = ?,
            thumbnail = ?,
            is_published = ?,
            updated_at = ?,
            title_folded = ?,
            instructor_folded = ?
        WHERE id = ?
        "#,
    )
    .bind(&current.title)
    .bind(&current.description)
    .bind(&current.instructor)
    .bind(current.price)
    .bind(&current.category)
    .bind(&current.syllabus)
    .bind(&current.duration)
    .bind(current.level.as_str())
    .bind(Json(&current.batches))
    .bind(&current.thumbnail)
    .bind(current.is_published)
    .bind(timestamp(&current.updated_at))
    .bind(fold(&current.title))
    .bind(fold(&current.instructor))
    .bind(id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(current))
}

pub async fn delete_course(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Sorted distinct non-empty values of a facet column.
pub async fn distinct_values(db: &SqlitePool, facet: Facet) -> Result<Vec<String>, sqlx::Error> {
    let sql = match facet {
        Facet::Category => {
            "SELECT DISTINCT category FROM courses WHERE category <> '' ORDER BY category"
        }
        Facet::Instructor => {
            "SELECT DISTINCT instructor FROM courses WHERE instructor <> '' ORDER BY instructor"
        }
    };
    sqlx::query_scalar::<_, String>(sql).fetch_all(db).await
}
