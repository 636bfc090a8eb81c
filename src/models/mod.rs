pub mod course;
pub mod payload;

pub use course::{Batch, Course, CourseOwner, CourseWithStats, Level, MAX_BATCH_STUDENTS};
pub use payload::{CoursePatch, NewCourse, NewCourseRequest, UpdateCourseRequest};
