use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use super::context::{WorkspaceContext, new_id, require_text};
use crate::error::AppError;
use crate::models::{
    BacklogQuery, Lecture, NewLectureRequest, NewTaskRequest, RecordSessionRequest, StudySession,
    Task, TaskQuery, TaskStatus, UpdateLectureRequest, UpdateTaskRequest,
};
use crate::timer::{TimerAction, TimerMode};

pub const GENERAL_CATEGORY: &str = "General";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotal {
    pub date: NaiveDate,
    pub weekday: &'static str,
    pub minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyStats {
    pub total_minutes: u64,
    pub total_hours: f64,
    pub session_count: usize,
    pub last_seven_days: Vec<DayTotal>,
}

/// The focus timer as seen by the client, plus the session a finished focus block logged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub mode: TimerMode,
    pub remaining_secs: u32,
    pub active: bool,
    pub display: String,
    pub progress: f64,
    pub recorded: Option<StudySession>,
}

impl WorkspaceContext {
    pub fn lectures(&self, course_id: Option<&str>) -> Vec<&Lecture> {
        self.workspace
            .lectures
            .iter()
            .filter(|l| course_id.is_none_or(|id| l.course_id == id))
            .collect()
    }

    pub fn lecture(&self, id: &str) -> Result<&Lecture, AppError> {
        self.workspace.find_lecture(id).ok_or(AppError::NotFound)
    }

    fn lecture_mut(&mut self, id: &str) -> Result<&mut Lecture, AppError> {
        self.workspace
            .lectures
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or(AppError::NotFound)
    }

    /// Outstanding backlog: synthesized lectures not yet caught up on.
    pub fn backlog(&self, query: &BacklogQuery) -> Vec<&Lecture> {
        let types: Vec<String> = query.types.iter().map(|t| t.to_lowercase()).collect();
        self.workspace
            .lectures
            .iter()
            .filter(|l| l.is_backlog && !l.completed)
            .filter(|l| query.course_ids.is_empty() || query.course_ids.contains(&l.course_id))
            .filter(|l| {
                let title = l.title.to_lowercase();
                types.is_empty() || types.iter().any(|t| title.contains(t.as_str()))
            })
            .collect()
    }

    /// Regular lectures only; backlog entries come from attendance.
    pub fn add_lecture(&mut self, req: NewLectureRequest, today: NaiveDate) -> Result<Lecture, AppError> {
        self.course(&req.course_id)?;
        let count = self
            .workspace
            .lectures
            .iter()
            .filter(|l| l.course_id == req.course_id)
            .count();

        let lecture = Lecture {
            id: new_id(),
            course_id: req.course_id,
            title: format!("Lecture {}", count + 1),
            date: today,
            content: String::new(),
            summary: None,
            is_backlog: false,
            completed: false,
        };
        self.workspace.lectures.push(lecture.clone());
        Ok(lecture)
    }

    pub fn update_lecture(&mut self, id: &str, req: UpdateLectureRequest) -> Result<Lecture, AppError> {
        let title = req.title.as_deref().map(|t| require_text(t, "title")).transpose()?;
        let lecture = self.lecture_mut(id)?;
        if let Some(title) = title {
            lecture.title = title;
        }
        if let Some(content) = req.content {
            lecture.content = content;
        }
        if let Some(summary) = req.summary {
            lecture.summary = Some(summary).filter(|s| !s.trim().is_empty());
        }
        Ok(lecture.clone())
    }

    pub fn toggle_lecture(&mut self, id: &str) -> Result<Lecture, AppError> {
        let lecture = self.lecture_mut(id)?;
        lecture.completed = !lecture.completed;
        Ok(lecture.clone())
    }

    pub fn tasks(&self, query: &TaskQuery) -> Vec<&Task> {
        let search = query.search.as_deref().map(str::to_lowercase);
        self.workspace
            .tasks
            .iter()
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .filter(|t| query.priority.is_none_or(|p| t.priority == p))
            .filter(|t| {
                query
                    .course_id
                    .as_deref()
                    .is_none_or(|id| t.course_id.as_deref() == Some(id))
            })
            .filter(|t| {
                search
                    .as_deref()
                    .is_none_or(|s| t.title.to_lowercase().contains(s))
            })
            .collect()
    }

    pub fn task(&self, id: &str) -> Result<&Task, AppError> {
        self.workspace.find_task(id).ok_or(AppError::NotFound)
    }

    pub(crate) fn category_for(&self, course_id: Option<&str>) -> String {
        course_id
            .and_then(|id| self.workspace.find_course(id))
            .map(|c| c.title.clone())
            .unwrap_or_else(|| GENERAL_CATEGORY.to_string())
    }

    pub fn add_task(&mut self, req: NewTaskRequest, today: NaiveDate) -> Result<Task, AppError> {
        let title = require_text(&req.title, "title")?;
        let course_id = req.course_id.filter(|id| !id.trim().is_empty());

        let task = Task {
            id: new_id(),
            title,
            status: TaskStatus::NotStarted,
            priority: req.priority,
            category: self.category_for(course_id.as_deref()),
            course_id,
            due_date: Some(req.due_date.unwrap_or(today)),
            description: req.description.filter(|d| !d.trim().is_empty()),
        };
        self.workspace.tasks.push(task.clone());
        Ok(task)
    }

    pub fn update_task(&mut self, id: &str, req: UpdateTaskRequest) -> Result<Task, AppError> {
        let title = req.title.as_deref().map(|t| require_text(t, "title")).transpose()?;
        let task = self
            .workspace
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AppError::NotFound)?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(status) = req.status {
            task.status = status;
        }
        if let Some(priority) = req.priority {
            task.priority = priority;
        }
        if let Some(due_date) = req.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(description) = req.description {
            task.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        Ok(task.clone())
    }

    pub fn delete_task(&mut self, id: &str) -> Result<(), AppError> {
        let before = self.workspace.tasks.len();
        self.workspace.tasks.retain(|t| t.id != id);
        if self.workspace.tasks.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn record_session(&mut self, req: RecordSessionRequest, now: DateTime<Utc>) -> Result<StudySession, AppError> {
        let duration_minutes = req
            .duration_minutes
            .unwrap_or_else(|| req.mode.unwrap_or_default().duration_minutes());
        if duration_minutes == 0 {
            return Err(AppError::bad_request("durationMinutes must be positive"));
        }
        let default_category = match req.mode.unwrap_or_default() {
            TimerMode::Focus => "Focus",
            TimerMode::ShortBreak | TimerMode::LongBreak => "Break",
        };

        let session = StudySession {
            date: now,
            duration_minutes,
            category: req
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| default_category.to_string()),
        };
        info!("user {} logged {} study minutes", self.user.id, duration_minutes);
        self.workspace.sessions.push(session.clone());
        Ok(session)
    }

    pub fn timer_state(&self) -> TimerState {
        TimerState {
            mode: self.timer.mode(),
            remaining_secs: self.timer.remaining_secs(),
            active: self.timer.is_active(),
            display: self.timer.display(),
            progress: self.timer.progress(),
            recorded: None,
        }
    }

    /// Drives the session's timer. A focus block that runs out is logged as a study session.
    pub fn control_timer(&mut self, action: TimerAction, now: DateTime<Utc>) -> Result<TimerState, AppError> {
        let completed = match action {
            TimerAction::Toggle => {
                self.timer.toggle();
                None
            }
            TimerAction::Reset => {
                self.timer.reset();
                None
            }
            TimerAction::ChangeMode { mode } => {
                self.timer.change_mode(mode);
                None
            }
            TimerAction::Tick { elapsed_secs } => self.timer.tick(elapsed_secs),
        };

        let recorded = match completed {
            Some(minutes) => Some(self.record_session(
                RecordSessionRequest {
                    duration_minutes: Some(minutes),
                    mode: Some(self.timer.mode()),
                    category: None,
                },
                now,
            )?),
            None => None,
        };

        Ok(TimerState {
            recorded,
            ..self.timer_state()
        })
    }

    pub fn stats(&self, today: NaiveDate) -> StudyStats {
        let total_minutes: u64 = self
            .workspace
            .sessions
            .iter()
            .map(|s| u64::from(s.duration_minutes))
            .sum();

        let first = today.checked_sub_days(Days::new(6)).unwrap_or(today);
        let last_seven_days = first
            .iter_days()
            .take_while(|d| *d <= today)
            .map(|date| DayTotal {
                date,
                weekday: weekday_label(date),
                minutes: self
                    .workspace
                    .sessions
                    .iter()
                    .filter(|s| s.date.date_naive() == date)
                    .map(|s| u64::from(s.duration_minutes))
                    .sum(),
            })
            .collect();

        StudyStats {
            total_minutes,
            total_hours: (total_minutes as f64 / 60.0 * 10.0).round() / 10.0,
            session_count: self.workspace.sessions.len(),
            last_seven_days,
        }
    }
}

/// Weekday name for a stats bucket, Sunday first.
pub fn weekday_label(date: NaiveDate) -> &'static str {
    const NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    NAMES[date.weekday().num_days_from_sunday() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCourseRequest, TaskPriority, User, Workspace};
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (WorkspaceContext, String) {
        let mut ctx = WorkspaceContext::new(User::local("noa").unwrap(), Workspace::default());
        let course = ctx
            .add_course(NewCourseRequest {
                title: "Chemistry".to_string(),
                description: None,
            })
            .unwrap();
        (ctx, course.id)
    }

    fn task_req(title: &str, course_id: Option<&str>) -> NewTaskRequest {
        NewTaskRequest {
            title: title.to_string(),
            course_id: course_id.map(str::to_string),
            due_date: None,
            priority: TaskPriority::Medium,
            description: None,
        }
    }

    #[test]
    fn lectures_are_numbered_per_course() {
        let (mut ctx, course_id) = setup();
        let today = date(2024, 3, 4);
        let first = ctx.add_lecture(NewLectureRequest { course_id: course_id.clone() }, today).unwrap();
        let second = ctx.add_lecture(NewLectureRequest { course_id: course_id.clone() }, today).unwrap();
        assert_eq!(first.title, "Lecture 1");
        assert_eq!(second.title, "Lecture 2");
        assert!(!second.is_backlog);
        assert_eq!(ctx.lectures(Some(&course_id)).len(), 2);
        assert!(ctx.lectures(Some("other")).is_empty());
    }

    #[test]
    fn backlog_filters_by_course_and_type() {
        let (mut ctx, course_id) = setup();
        let mk = |id: &str, course: &str, title: &str, completed: bool| Lecture {
            id: id.to_string(),
            course_id: course.to_string(),
            title: title.to_string(),
            date: date(2024, 1, 8),
            content: String::new(),
            summary: None,
            is_backlog: true,
            completed,
        };
        ctx.workspace.lectures = vec![
            mk("a", &course_id, "Missed Lecture (2024-01-08)", false),
            mk("b", &course_id, "Missed Lab (2024-01-08)", false),
            mk("c", "other", "Missed Lab (2024-01-08)", false),
            mk("d", &course_id, "Missed Lab (2024-01-01)", true),
        ];

        assert_eq!(ctx.backlog(&BacklogQuery::default()).len(), 3);

        let labs = ctx.backlog(&BacklogQuery {
            course_ids: vec![],
            types: vec!["LAB".to_string()],
        });
        assert_eq!(labs.iter().map(|l| l.id.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);

        let mine = ctx.backlog(&BacklogQuery {
            course_ids: vec![course_id.clone()],
            types: vec![],
        });
        assert_eq!(mine.len(), 2);
    }

    #[test]
    fn toggle_lecture_flips_completion() {
        let (mut ctx, course_id) = setup();
        let lecture = ctx.add_lecture(NewLectureRequest { course_id }, date(2024, 3, 4)).unwrap();
        assert!(ctx.toggle_lecture(&lecture.id).unwrap().completed);
        assert!(!ctx.toggle_lecture(&lecture.id).unwrap().completed);
        assert!(matches!(ctx.toggle_lecture("nope"), Err(AppError::NotFound)));
    }

    #[test]
    fn add_task_derives_category_and_due_date() {
        let (mut ctx, course_id) = setup();
        let today = date(2024, 3, 4);

        let linked = ctx.add_task(task_req("Lab report", Some(&course_id)), today).unwrap();
        assert_eq!(linked.category, "Chemistry");
        assert_eq!(linked.due_date, Some(today));
        assert_eq!(linked.status, TaskStatus::NotStarted);

        let general = ctx.add_task(task_req("Buy notebook", None), today).unwrap();
        assert_eq!(general.category, GENERAL_CATEGORY);

        assert!(matches!(ctx.add_task(task_req("   ", None), today), Err(AppError::BadRequest(_))));
        assert_eq!(ctx.workspace().tasks.len(), 2);
    }

    #[test]
    fn task_query_filters() {
        let (mut ctx, course_id) = setup();
        let today = date(2024, 3, 4);
        let report = ctx.add_task(task_req("Lab report", Some(&course_id)), today).unwrap();
        ctx.add_task(task_req("Read chapter 3", None), today).unwrap();
        ctx.update_task(
            &report.id,
            UpdateTaskRequest {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
        )
        .unwrap();

        let done = ctx.tasks(&TaskQuery {
            status: Some(TaskStatus::Done),
            ..Default::default()
        });
        assert_eq!(done.len(), 1);

        let search = ctx.tasks(&TaskQuery {
            search: Some("CHAPTER".to_string()),
            ..Default::default()
        });
        assert_eq!(search.len(), 1);

        let by_course = ctx.tasks(&TaskQuery {
            course_id: Some(course_id),
            ..Default::default()
        });
        assert_eq!(by_course[0].id, report.id);

        ctx.delete_task(&report.id).unwrap();
        assert!(matches!(ctx.delete_task(&report.id), Err(AppError::NotFound)));
    }

    #[test]
    fn sessions_default_to_focus_length() {
        let (mut ctx, _) = setup();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let session = ctx.record_session(RecordSessionRequest::default(), now).unwrap();
        assert_eq!(session.duration_minutes, 25);
        assert_eq!(session.category, "Focus");

        let zero = RecordSessionRequest {
            duration_minutes: Some(0),
            ..Default::default()
        };
        assert!(ctx.record_session(zero, now).is_err());
    }

    #[test]
    fn finished_focus_block_logs_a_session() {
        let (mut ctx, _) = setup();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();

        let paused = ctx.control_timer(TimerAction::Tick { elapsed_secs: 60 }, now).unwrap();
        assert_eq!(paused.remaining_secs, 25 * 60);

        assert!(ctx.control_timer(TimerAction::Toggle, now).unwrap().active);
        let halfway = ctx.control_timer(TimerAction::Tick { elapsed_secs: 750 }, now).unwrap();
        assert_eq!(halfway.display, "12:30");
        assert_eq!(halfway.progress, 50.0);
        assert!(halfway.recorded.is_none());

        let done = ctx.control_timer(TimerAction::Tick { elapsed_secs: 750 }, now).unwrap();
        assert!(!done.active);
        let recorded = done.recorded.expect("focus block should be logged");
        assert_eq!(recorded.duration_minutes, 25);
        assert_eq!(recorded.category, "Focus");
        assert_eq!(ctx.workspace().sessions.len(), 1);
        assert!(ctx.timer_state().recorded.is_none());
    }

    #[test]
    fn finished_break_logs_nothing() {
        let (mut ctx, _) = setup();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        let mode = ctx
            .control_timer(TimerAction::ChangeMode { mode: TimerMode::ShortBreak }, now)
            .unwrap();
        assert_eq!(mode.remaining_secs, 5 * 60);

        ctx.control_timer(TimerAction::Toggle, now).unwrap();
        let done = ctx.control_timer(TimerAction::Tick { elapsed_secs: 600 }, now).unwrap();
        assert!(!done.active);
        assert!(done.recorded.is_none());
        assert!(ctx.workspace().sessions.is_empty());

        let reset = ctx.control_timer(TimerAction::Reset, now).unwrap();
        assert_eq!(reset.display, "05:00");
    }

    #[test]
    fn stats_bucket_last_seven_days() {
        let (mut ctx, _) = setup();
        let at = |d: u32| Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap();
        for (day, minutes) in [(4, 30), (4, 45), (1, 60), (20, 10)] {
            ctx.record_session(
                RecordSessionRequest {
                    duration_minutes: Some(minutes),
                    ..Default::default()
                },
                at(day),
            )
            .unwrap();
        }

        let stats = ctx.stats(date(2024, 3, 4));
        assert_eq!(stats.total_minutes, 145);
        assert_eq!(stats.total_hours, 2.4);
        assert_eq!(stats.session_count, 4);
        assert_eq!(stats.last_seven_days.len(), 7);
        assert_eq!(stats.last_seven_days[0].date, date(2024, 2, 27));
        assert_eq!(stats.last_seven_days[6].minutes, 75);
        assert_eq!(stats.last_seven_days[3].minutes, 60);
        assert_eq!(stats.last_seven_days[6].weekday, "Mon");
    }
}
