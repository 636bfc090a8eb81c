pub mod listing;

pub use listing::{CourseListingService, ListRequest, ListResponse};
