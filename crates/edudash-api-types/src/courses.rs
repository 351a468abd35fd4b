use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub status: Option<CourseStatus>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub enrollment_count: Option<u64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CourseStats {
    pub total: u64,
    pub published: u64,
    pub draft: u64,
    pub archived: u64,
    pub total_enrollments: u64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn course_accepts_sparse_payload() {
        let course: Course =
            serde_json::from_value(json!({ "id": 3, "title": "Algebra" })).unwrap();
        assert_eq!(course.id, 3);
        assert!(course.teacher_id.is_none());
        assert!(course.created_at.is_none());
    }

    #[test]
    fn course_reads_rfc3339_timestamps() {
        let course: Course = serde_json::from_value(json!({
            "id": 1,
            "title": "Physics",
            "status": "published",
            "createdAt": "2024-03-01T08:30:00Z"
        }))
        .unwrap();
        assert_eq!(course.status, Some(CourseStatus::Published));
        assert_eq!(course.created_at.map(|at| at.year()), Some(2024));
    }

    #[test]
    fn new_course_omits_unset_fields() {
        let input = NewCourse {
            title: "X".to_string(),
            teacher_id: Some(3),
            ..NewCourse::default()
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({ "title": "X", "teacherId": 3 })
        );
    }
}
