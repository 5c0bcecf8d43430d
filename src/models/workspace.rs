use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{AttendanceRecord, Course, Lecture, ScheduleItem, StudySession, Task};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester_start: Option<NaiveDate>,
}

impl WorkspaceSettings {
    /// Falls back to two months before `today` when no start was configured.
    pub fn semester_start_or_default(&self, today: NaiveDate) -> NaiveDate {
        self.semester_start
            .or_else(|| today.checked_sub_months(Months::new(2)))
            .unwrap_or(today)
    }
}

/// Full per-user snapshot. This is the persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
    #[serde(default)]
    pub sessions: Vec<StudySession>,
    #[serde(default)]
    pub schedule: Vec<ScheduleItem>,
    #[serde(default)]
    pub class_sessions: Vec<AttendanceRecord>,
    #[serde(default)]
    pub settings: WorkspaceSettings,
}

impl Workspace {
    pub fn find_course(&self, id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn find_schedule_item(&self, id: &str) -> Option<&ScheduleItem> {
        self.schedule.iter().find(|s| s.id == id)
    }

    pub fn find_lecture(&self, id: &str) -> Option<&Lecture> {
        self.lectures.iter().find(|l| l.id == id)
    }

    pub fn find_task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsRequest {
    pub semester_start: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_fields_default_to_empty() {
        let ws: Workspace = serde_json::from_str(r#"{"tasks":[]}"#).unwrap();
        assert!(ws.courses.is_empty());
        assert!(ws.class_sessions.is_empty());
        assert_eq!(ws.settings.semester_start, None);
    }

    #[test]
    fn semester_start_defaults_two_months_back() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let settings = WorkspaceSettings::default();
        assert_eq!(
            settings.semester_start_or_default(today),
            NaiveDate::from_ymd_opt(2024, 3, 20).unwrap()
        );
    }
}
