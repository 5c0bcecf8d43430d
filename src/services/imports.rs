use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{info, warn};

use super::context::{WorkspaceContext, new_id};
use super::study::GENERAL_CATEGORY;
use crate::error::AppError;
use crate::extraction::{ExtractedClass, ExtractedTask, NoteAnalysis};
use crate::models::schedule::validate_slot;
use crate::models::{
    ClassType, ClockTime, Lecture, NewCourseRequest, ScheduleItem, Task, TaskPriority, TaskStatus,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAnalysisApplied {
    pub lecture: Lecture,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleImport {
    pub courses_created: usize,
    pub items: Vec<ScheduleItem>,
    pub backlog_created: usize,
    pub skipped: usize,
}

struct ParsedClass {
    day_of_week: u8,
    start_time: ClockTime,
    end_time: ClockTime,
    class_type: ClassType,
}

fn parse_class(class: &ExtractedClass) -> Result<ParsedClass, AppError> {
    let day_of_week = u8::try_from(class.day_of_week)
        .map_err(|_| AppError::BadRequest(format!("dayOfWeek out of range: {}", class.day_of_week)))?;
    let start_time: ClockTime = class.start_time.parse()?;
    let end_time: ClockTime = class.end_time.parse()?;
    validate_slot(day_of_week, start_time, end_time)?;
    let class_type = if class.class_type.trim().is_empty() {
        ClassType::Lecture
    } else {
        class.class_type.parse()?
    };

    Ok(ParsedClass {
        day_of_week,
        start_time,
        end_time,
        class_type,
    })
}

impl WorkspaceContext {
    /// Stores the summary and turns each action item into a task for the lecture's course, due `today`.
    pub fn apply_note_analysis(
        &mut self,
        lecture_id: &str,
        analysis: NoteAnalysis,
        today: NaiveDate,
    ) -> Result<NoteAnalysisApplied, AppError> {
        let course_id = self.lecture(lecture_id)?.course_id.clone();
        let category = self.category_for(Some(course_id.as_str()));
        let course_link = self.workspace.find_course(&course_id).map(|c| c.id.clone());

        let tasks: Vec<Task> = analysis
            .tasks
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(|title| Task {
                id: new_id(),
                title: title.to_string(),
                status: TaskStatus::NotStarted,
                priority: TaskPriority::Medium,
                category: category.clone(),
                course_id: course_link.clone(),
                due_date: Some(today),
                description: None,
            })
            .collect();
        self.workspace.tasks.extend(tasks.iter().cloned());

        let lecture = self
            .workspace
            .lectures
            .iter_mut()
            .find(|l| l.id == lecture_id)
            .ok_or(AppError::NotFound)?;
        lecture.summary = Some(analysis.summary).filter(|s| !s.trim().is_empty());

        Ok(NoteAnalysisApplied {
            lecture: lecture.clone(),
            tasks,
        })
    }

    /// Appends extracted tasks, linking courses by case-insensitive title.
    pub fn import_tasks(&mut self, extracted: Vec<ExtractedTask>) -> Vec<Task> {
        let mut imported = Vec::new();
        for item in extracted {
            let title = item.title.trim();
            if title.is_empty() {
                warn!("skipping extracted task without a title");
                continue;
            }
            let course_name = item.course_name.trim();
            let course_id = self.find_course_by_title(course_name).map(|c| c.id.clone());
            let due_date = NaiveDate::parse_from_str(item.due_date.trim(), "%Y-%m-%d").ok();

            imported.push(Task {
                id: new_id(),
                title: title.to_string(),
                status: TaskStatus::NotStarted,
                priority: item.priority.unwrap_or_default(),
                category: if course_name.is_empty() {
                    GENERAL_CATEGORY.to_string()
                } else {
                    course_name.to_string()
                },
                course_id,
                due_date,
                description: None,
            });
        }

        info!("user {} imported {} tasks", self.user.id, imported.len());
        self.workspace.tasks.extend(imported.iter().cloned());
        imported
    }

    /// Adds extracted slots, creating courses that do not exist yet.
    /// Each new slot gets the same backlog sweep as a manual add.
    pub fn import_schedule(&mut self, extracted: Vec<ExtractedClass>, now: NaiveDateTime) -> ScheduleImport {
        let mut report = ScheduleImport::default();

        for class in extracted {
            let title = class.course_title.trim();
            if title.is_empty() {
                warn!("skipping extracted class without a course title");
                report.skipped += 1;
                continue;
            }
            let parsed = match parse_class(&class) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping extracted class {}: {}", title, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let existing = self.find_course_by_title(title).map(|c| c.id.clone());
            let course_id = match existing {
                Some(id) => id,
                None => match self.add_course(NewCourseRequest {
                    title: title.to_string(),
                    description: None,
                }) {
                    Ok(course) => {
                        report.courses_created += 1;
                        course.id
                    }
                    Err(e) => {
                        warn!("skipping extracted class {}: {}", title, e);
                        report.skipped += 1;
                        continue;
                    }
                },
            };

            let item = ScheduleItem {
                id: new_id(),
                course_id,
                day_of_week: parsed.day_of_week,
                start_time: parsed.start_time,
                end_time: parsed.end_time,
                class_type: parsed.class_type,
                location: class.location.filter(|l| !l.trim().is_empty()),
            };
            self.workspace.schedule.push(item.clone());
            report.backlog_created += self.sweep_backlog(&item, now).len();
            report.items.push(item);
        }

        info!(
            "user {} imported {} slots ({} skipped, {} new courses)",
            self.user.id,
            report.items.len(),
            report.skipped,
            report.courses_created
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewLectureRequest, SettingsRequest, User, Workspace};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> WorkspaceContext {
        WorkspaceContext::new(User::local("tal").unwrap(), Workspace::default())
    }

    fn class(title: &str, day: i64, start: &str, end: &str, kind: &str) -> ExtractedClass {
        ExtractedClass {
            course_title: title.to_string(),
            class_type: kind.to_string(),
            day_of_week: day,
            start_time: start.to_string(),
            end_time: end.to_string(),
            location: Some(String::new()),
        }
    }

    #[test]
    fn note_analysis_sets_summary_and_tasks() {
        let mut ctx = context();
        let course = ctx
            .add_course(NewCourseRequest {
                title: "Economics".to_string(),
                description: None,
            })
            .unwrap();
        let lecture = ctx
            .add_lecture(NewLectureRequest { course_id: course.id.clone() }, date(2024, 3, 4))
            .unwrap();

        let applied = ctx
            .apply_note_analysis(
                &lecture.id,
                NoteAnalysis {
                    summary: "Supply meets demand.".to_string(),
                    tasks: vec!["Review elasticity".to_string(), "  ".to_string()],
                },
                date(2024, 3, 5),
            )
            .unwrap();

        assert_eq!(applied.lecture.summary.as_deref(), Some("Supply meets demand."));
        assert_eq!(applied.tasks.len(), 1);
        assert_eq!(applied.tasks[0].category, "Economics");
        assert_eq!(applied.tasks[0].course_id.as_deref(), Some(course.id.as_str()));
        assert_eq!(applied.tasks[0].due_date, Some(date(2024, 3, 5)));
        assert_eq!(ctx.workspace().tasks.len(), 1);
    }

    #[test]
    fn note_analysis_on_missing_lecture_changes_nothing() {
        let mut ctx = context();
        let result = ctx.apply_note_analysis(
            "missing",
            NoteAnalysis {
                summary: "x".to_string(),
                tasks: vec!["y".to_string()],
            },
            date(2024, 3, 5),
        );
        assert!(matches!(result, Err(AppError::NotFound)));
        assert!(ctx.workspace().tasks.is_empty());
    }

    #[test]
    fn import_tasks_links_courses_and_parses_dates() {
        let mut ctx = context();
        let course = ctx
            .add_course(NewCourseRequest {
                title: "Statistics".to_string(),
                description: None,
            })
            .unwrap();

        let imported = ctx.import_tasks(vec![
            ExtractedTask {
                title: "Problem set 2".to_string(),
                course_name: "statistics".to_string(),
                due_date: "2024-03-10".to_string(),
                priority: Some(TaskPriority::High),
            },
            ExtractedTask {
                title: "Essay".to_string(),
                course_name: "Philosophy".to_string(),
                due_date: "next week".to_string(),
                priority: None,
            },
            ExtractedTask {
                title: " ".to_string(),
                course_name: String::new(),
                due_date: String::new(),
                priority: None,
            },
        ]);

        assert_eq!(imported.len(), 2);
        assert_eq!(imported[0].course_id.as_deref(), Some(course.id.as_str()));
        assert_eq!(imported[0].due_date, Some(date(2024, 3, 10)));
        assert_eq!(imported[0].priority, TaskPriority::High);
        assert_eq!(imported[1].course_id, None);
        assert_eq!(imported[1].category, "Philosophy");
        assert_eq!(imported[1].due_date, None);
        assert_eq!(imported[1].priority, TaskPriority::Medium);
    }

    #[test]
    fn import_schedule_creates_courses_and_skips_invalid() {
        let mut ctx = context();
        ctx.update_settings(SettingsRequest {
            semester_start: date(2024, 1, 1),
        });
        let now = date(2024, 1, 10).and_hms_opt(12, 0, 0).unwrap();

        let report = ctx.import_schedule(
            vec![
                class("Biology", 1, "10:00", "12:00", "Lecture"),
                class("biology", 3, "14:00", "15:00", "Lab"),
                class("Physics", 2, "12:00", "10:00", "Lecture"),
                class("Physics", 8, "10:00", "12:00", "Lecture"),
                class("Art", 4, "9:00", "11:00", "Seminar"),
            ],
            now,
        );

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.courses_created, 1);
        assert_eq!(ctx.courses().len(), 1);
        // Mondays 1st and 8th, Wednesday 3rd
        assert_eq!(report.backlog_created, 3);
        assert!(report.items.iter().all(|i| i.location.is_none()));
    }
}
