use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::query::{CourseFilter, CourseSort, Page};
use crate::db::repository;
use crate::error::AppError;
use crate::models::CourseWithStats;

/// Raw query string of `GET /api/courses/list`. Numbers stay text here so a
/// malformed value falls back to its default instead of failing the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRequest {
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub courses: Vec<CourseWithStats>,
    pub current_page: u32,
    pub total_pages: u64,
    pub total_count: u64,
    pub items_per_page: u32,
}

pub struct CourseListingService {
    db: SqlitePool,
    max_page_size: u32,
}

impl CourseListingService {
    pub fn new(db: SqlitePool, max_page_size: u32) -> Self {
        Self { db, max_page_size }
    }

    pub async fn list(&self, req: ListRequest) -> Result<ListResponse, AppError> {
        let filter = CourseFilter::new()
            .search(req.search.as_deref())
            .category(req.category.as_deref());
        let sort = CourseSort::parse(req.sort.as_deref());
        let page = Page::from_params(req.page.as_deref(), req.limit.as_deref(), self.max_page_size);

        debug!(?filter, ?sort, ?page, "listing courses");

        let total_count = repository::count_courses(&self.db, &filter).await?;
        let courses = repository::fetch_course_page(&self.db, &filter, sort, &page)
            .await?
            .into_iter()
            .map(CourseWithStats::from)
            .collect();

        Ok(ListResponse {
            courses,
            current_page: page.number,
            total_pages: page.total_pages(total_count),
            total_count,
            items_per_page: page.size,
        })
    }
}
