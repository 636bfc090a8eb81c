use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::models::course::{Batch, Course, Level, MAX_BATCH_STUDENTS};

/// Body of `POST /api/courses`. Everything is optional here so that missing
/// fields surface as a validation error rather than a deserialization one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub syllabus: Option<String>,
    pub duration: Option<String>,
    pub level: Option<String>,
    pub batches: Option<Vec<Batch>>,
    pub thumbnail: Option<String>,
}

/// A create payload that passed validation.
#[derive(Debug, Clone)]
pub struct NewCourse {
    pub title: String,
    pub description: Option<String>,
    pub instructor: String,
    pub price: f64,
    pub category: String,
    pub syllabus: String,
    pub duration: Option<String>,
    pub level: Level,
    pub batches: Vec<Batch>,
    pub thumbnail: Option<String>,
}

impl NewCourseRequest {
    pub fn validate(self) -> Result<NewCourse, AppError> {
        let mut missing = Vec::new();
        let title = required_text("title", self.title, &mut missing);
        let instructor = required_text("instructor", self.instructor, &mut missing);
        if self.price.is_none() {
            missing.push("price");
        }
        let category = required_text("category", self.category, &mut missing);
        let syllabus = required_text("syllabus", self.syllabus, &mut missing);

        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        Ok(NewCourse {
            title,
            description: self.description.map(trimmed),
            instructor,
            price: check_price(self.price.unwrap_or_default())?,
            category,
            syllabus,
            duration: self.duration.map(trimmed),
            level: parse_level(self.level)?.unwrap_or_default(),
            batches: check_batches(self.batches.unwrap_or_default())?,
            thumbnail: self.thumbnail.map(trimmed),
        })
    }
}

/// Body of `PUT /api/courses/{id}`.
///
/// Each field is `None` when absent from the JSON and `Some(None)` when sent
/// as `null`, so absent fields can be left alone while nullable ones can be
/// cleared.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseRequest {
    #[serde(default, deserialize_with = "patch_field")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub instructor: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub syllabus: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub duration: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub level: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub batches: Option<Option<Vec<Batch>>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub thumbnail: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_field")]
    pub is_published: Option<Option<bool>>,
}

fn patch_field<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct CoursePatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub instructor: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub syllabus: Option<String>,
    pub duration: Option<Option<String>>,
    pub level: Option<Level>,
    pub batches: Option<Vec<Batch>>,
    pub thumbnail: Option<Option<String>>,
    pub is_published: Option<bool>,
}

impl UpdateCourseRequest {
    pub fn validate(self) -> Result<CoursePatch, AppError> {
        let price = match not_null("price", self.price)? {
            Some(price) => Some(check_price(price)?),
            None => None,
        };

        Ok(CoursePatch {
            title: present_text("title", self.title)?,
            description: self.description.map(|v| v.map(trimmed)),
            instructor: present_text("instructor", self.instructor)?,
            price,
            category: present_text("category", self.category)?,
            syllabus: present_text("syllabus", self.syllabus)?,
            duration: self.duration.map(|v| v.map(trimmed)),
            level: parse_level(not_null("level", self.level)?)?,
            batches: not_null("batches", self.batches)?.map(check_batches).transpose()?,
            thumbnail: self.thumbnail.map(|v| v.map(trimmed)),
            is_published: not_null("isPublished", self.is_published)?,
        })
    }
}

impl CoursePatch {
    pub fn apply(self, course: &mut Course) {
        if let Some(title) = self.title {
            course.title = title;
        }
        if let Some(description) = self.description {
            course.description = description;
        }
        if let Some(instructor) = self.instructor {
            course.instructor = instructor;
        }
        if let Some(price) = self.price {
            course.price = price;
        }
        if let Some(category) = self.category {
            course.category = category;
        }
        if let Some(syllabus) = self.syllabus {
            course.syllabus = syllabus;
        }
        if let Some(duration) = self.duration {
            course.duration = duration;
        }
        if let Some(level) = self.level {
            course.level = level;
        }
        if let Some(batches) = self.batches {
            course.batches = batches;
        }
        if let Some(thumbnail) = self.thumbnail {
            course.thumbnail = thumbnail;
        }
        if let Some(is_published) = self.is_published {
            course.is_published = is_published;
        }
    }
}

fn trimmed(s: String) -> String {
    s.trim().to_string()
}

fn required_text(name: &'static str, value: Option<String>, missing: &mut Vec<&'static str>) -> String {
    let value = value.map(trimmed).unwrap_or_default();
    if value.is_empty() {
        missing.push(name);
    }
    value
}

fn not_null<T>(name: &str, value: Option<Option<T>>) -> Result<Option<T>, AppError> {
    match value {
        None => Ok(None),
        Some(None) => Err(AppError::Validation(format!("{} cannot be null", name))),
        Some(Some(v)) => Ok(Some(v)),
    }
}

fn present_text(name: &str, value: Option<Option<String>>) -> Result<Option<String>, AppError> {
    match not_null(name, value)?.map(trimmed) {
        Some(v) if v.is_empty() => Err(AppError::Validation(format!("{} cannot be empty", name))),
        other => Ok(other),
    }
}

fn check_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "price must be a non-negative number".to_string(),
        ));
    }
    Ok(price)
}

fn check_batches(batches: Vec<Batch>) -> Result<Vec<Batch>, AppError> {
    let in_range = |n: i64| (0..=MAX_BATCH_STUDENTS).contains(&n);
    for batch in &batches {
        if !in_range(batch.current_students) {
            return Err(AppError::Validation(format!(
                "currentStudents must be between 0 and {}",
                MAX_BATCH_STUDENTS
            )));
        }
        if batch.max_students.is_some_and(|n| !in_range(n)) {
            return Err(AppError::Validation(format!(
                "maxStudents must be between 0 and {}",
                MAX_BATCH_STUDENTS
            )));
        }
    }
    Ok(batches)
}

fn parse_level(level: Option<String>) -> Result<Option<Level>, AppError> {
    level
        .map(|l| l.trim().parse::<Level>().map_err(AppError::Validation))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_request() -> NewCourseRequest {
        serde_json::from_value(json!({
            "title": "  Algorithms ",
            "instructor": "Ada",
            "price": 49.5,
            "category": "CS",
            "syllabus": "Sorting, graphs",
        }))
        .unwrap()
    }

    #[test]
    fn create_trims_text_and_fills_defaults() {
        let course = full_request().validate().unwrap();
        assert_eq!(course.title, "Algorithms");
        assert_eq!(course.level, Level::Beginner);
        assert!(course.batches.is_empty());
        assert!(course.description.is_none());
    }

    #[test]
    fn create_lists_every_missing_field() {
        let req = NewCourseRequest {
            syllabus: None,
            title: Some("   ".to_string()),
            ..full_request()
        };
        match req.validate() {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Missing required fields: title, syllabus");
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn create_accepts_free_courses_but_not_negative_prices() {
        let free = NewCourseRequest { price: Some(0.0), ..full_request() };
        assert_eq!(free.validate().unwrap().price, 0.0);

        let negative = NewCourseRequest { price: Some(-1.0), ..full_request() };
        assert!(matches!(negative.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_unknown_level() {
        let req = NewCourseRequest { level: Some("Expert".to_string()), ..full_request() };
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_out_of_range_enrolment() {
        for batch in [
            json!({ "currentStudents": -1 }),
            json!({ "currentStudents": i64::MAX }),
            json!({ "maxStudents": -5 }),
            json!({ "maxStudents": MAX_BATCH_STUDENTS + 1 }),
        ] {
            let req = NewCourseRequest {
                batches: Some(vec![serde_json::from_value(batch.clone()).unwrap()]),
                ..full_request()
            };
            assert!(matches!(req.validate(), Err(AppError::Validation(_))), "{}", batch);
        }

        let ok = NewCourseRequest {
            batches: Some(vec![
                serde_json::from_value(json!({ "currentStudents": MAX_BATCH_STUDENTS, "maxStudents": 0 }))
                    .unwrap(),
            ]),
            ..full_request()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn update_checks_replacement_batches() {
        let req: UpdateCourseRequest =
            serde_json::from_value(json!({ "batches": [{ "currentStudents": -3 }] })).unwrap();
        assert!(matches!(req.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_distinguishes_absent_from_null() {
        let req: UpdateCourseRequest = serde_json::from_value(json!({
            "description": null,
            "duration": "",
            "price": 0,
        }))
        .unwrap();
        let patch = req.validate().unwrap();

        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.duration, Some(Some(String::new())));
        assert_eq!(patch.price, Some(0.0));
        assert!(patch.thumbnail.is_none());
        assert!(patch.title.is_none());
        assert!(patch.is_published.is_none());
    }

    #[test]
    fn update_refuses_to_blank_required_fields() {
        let null_title: UpdateCourseRequest =
            serde_json::from_value(json!({ "title": null })).unwrap();
        assert!(matches!(null_title.validate(), Err(AppError::Validation(_))));

        let empty_syllabus: UpdateCourseRequest =
            serde_json::from_value(json!({ "syllabus": "  " })).unwrap();
        assert!(matches!(empty_syllabus.validate(), Err(AppError::Validation(_))));
    }
}
