use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A note tied to a course. Backlog lectures are placeholders for missed classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub is_backlog: bool,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLectureRequest {
    pub course_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLectureRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
}

/// Backlog filters. Empty lists match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacklogQuery {
    #[serde(default)]
    pub course_ids: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
}
