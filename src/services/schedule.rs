use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info};

use super::context::{WorkspaceContext, new_id};
use crate::attendance::{self, BacklogOutcome};
use crate::error::AppError;
use crate::layout::{self, GridConfig, Placement};
use crate::models::schedule::validate_slot;
use crate::models::{
    AttendanceRecord, AttendanceStatus, Lecture, MarkAttendanceRequest, NewScheduleItemRequest,
    ScheduleItem, UpdateScheduleItemRequest,
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItemCreated {
    pub item: ScheduleItem,
    pub backlog: Vec<Lecture>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceUpdate {
    pub record: AttendanceRecord,
    pub backlog_lecture_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub item: ScheduleItem,
    pub course_title: String,
    pub course_color: String,
    pub status: Option<AttendanceStatus>,
    pub placement: Placement,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayColumn {
    pub date: NaiveDate,
    pub day_of_week: u8,
    pub is_today: bool,
    pub slots: Vec<SlotView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekView {
    pub week_number: u32,
    pub semester_start: NaiveDate,
    pub days: Vec<DayColumn>,
}

fn day_index(date: NaiveDate) -> u8 {
    // num_days_from_sunday is always below 7
    date.weekday().num_days_from_sunday() as u8
}

impl WorkspaceContext {
    pub fn schedule(&self) -> &[ScheduleItem] {
        &self.workspace.schedule
    }

    pub fn schedule_item(&self, id: &str) -> Result<&ScheduleItem, AppError> {
        self.workspace.find_schedule_item(id).ok_or(AppError::NotFound)
    }

    /// Adds a slot and back-fills backlog lectures for its past occurrences.
    pub fn add_schedule_item(
        &mut self,
        req: NewScheduleItemRequest,
        now: NaiveDateTime,
    ) -> Result<ScheduleItemCreated, AppError> {
        self.course(&req.course_id)?;
        validate_slot(req.day_of_week, req.start_time, req.end_time)?;

        let item = ScheduleItem {
            id: new_id(),
            course_id: req.course_id,
            day_of_week: req.day_of_week,
            start_time: req.start_time,
            end_time: req.end_time,
            class_type: req.class_type,
            location: req.location.filter(|l| !l.trim().is_empty()),
        };
        self.workspace.schedule.push(item.clone());
        let backlog = self.sweep_backlog(&item, now);

        info!(
            "user {} added {} slot {} with {} backfilled backlog entries",
            self.user.id,
            item.class_type,
            item.id,
            backlog.len()
        );
        Ok(ScheduleItemCreated { item, backlog })
    }

    /// Appends sweep results, skipping entries the store already holds.
    pub(crate) fn sweep_backlog(&mut self, item: &ScheduleItem, now: NaiveDateTime) -> Vec<Lecture> {
        let semester_start = self.semester_start(now.date());
        let generated: Vec<Lecture> = attendance::retroactive_backlog(item, semester_start, now)
            .into_iter()
            .filter(|candidate| {
                !self.workspace.lectures.iter().any(|l| {
                    l.is_backlog
                        && l.course_id == candidate.course_id
                        && l.date == candidate.date
                        && l.title == candidate.title
                })
            })
            .collect();
        self.workspace.lectures.extend(generated.iter().cloned());
        generated
    }

    /// Edits in place. Existing backlog and attendance are left as they are.
    pub fn update_schedule_item(&mut self, id: &str, req: UpdateScheduleItemRequest) -> Result<ScheduleItem, AppError> {
        let current = self.schedule_item(id)?.clone();
        let course_id = req.course_id.unwrap_or(current.course_id);
        let day_of_week = req.day_of_week.unwrap_or(current.day_of_week);
        let start_time = req.start_time.unwrap_or(current.start_time);
        let end_time = req.end_time.unwrap_or(current.end_time);

        self.course(&course_id)?;
        validate_slot(day_of_week, start_time, end_time)?;

        let item = self
            .workspace
            .schedule
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound)?;
        item.course_id = course_id;
        item.day_of_week = day_of_week;
        item.start_time = start_time;
        item.end_time = end_time;
        if let Some(class_type) = req.class_type {
            item.class_type = class_type;
        }
        if let Some(location) = req.location {
            item.location = Some(location).filter(|l| !l.trim().is_empty());
        }
        Ok(item.clone())
    }

    /// Attendance records and backlog lectures of the slot stay behind.
    pub fn delete_schedule_item(&mut self, id: &str) -> Result<(), AppError> {
        let before = self.workspace.schedule.len();
        self.workspace.schedule.retain(|s| s.id != id);
        if self.workspace.schedule.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn mark_attendance(&mut self, req: MarkAttendanceRequest) -> Result<AttendanceUpdate, AppError> {
        let item = self.schedule_item(&req.schedule_item_id)?.clone();

        let change = attendance::record_attendance(&mut self.workspace.class_sessions, &item, req.date, req.status);
        let outcome = attendance::reconcile(&mut self.workspace.lectures, &item, req.date, &change);
        debug!("attendance {:?} on {} -> {:?}", req.status, req.date, outcome);

        let backlog_lecture_ids = match outcome {
            BacklogOutcome::Created(id) => vec![id],
            BacklogOutcome::Reopened(ids) | BacklogOutcome::Completed(ids) => ids,
            BacklogOutcome::AlreadyPresent | BacklogOutcome::Untouched => Vec::new(),
        };

        Ok(AttendanceUpdate {
            record: change.record().clone(),
            backlog_lecture_ids,
        })
    }

    /// Works for slots that were deleted since the record was made.
    pub fn clear_attendance(&mut self, schedule_item_id: &str, date: NaiveDate) -> Result<AttendanceRecord, AppError> {
        let change = attendance::clear_attendance(&mut self.workspace.class_sessions, schedule_item_id, date)
            .ok_or(AppError::NotFound)?;

        if let Some(item) = self.workspace.find_schedule_item(schedule_item_id).cloned() {
            attendance::reconcile(&mut self.workspace.lectures, &item, date, &change);
        }
        Ok(change.record().clone())
    }

    pub fn attendance_status(&self, schedule_item_id: &str, date: NaiveDate) -> Option<AttendanceStatus> {
        attendance::status_for(&self.workspace.class_sessions, schedule_item_id, date)
    }

    fn slots_on(&self, date: NaiveDate, grid: GridConfig) -> Vec<SlotView> {
        let mut slots: Vec<SlotView> = self
            .workspace
            .schedule
            .iter()
            .filter(|item| item.day_of_week == day_index(date))
            .filter_map(|item| {
                // slots of deleted courses are not rendered
                let course = self.workspace.find_course(&item.course_id)?;
                Some(SlotView {
                    item: item.clone(),
                    course_title: course.title.clone(),
                    course_color: course.color.clone(),
                    status: self.attendance_status(&item.id, date),
                    placement: grid.place(item.start_time, item.end_time),
                })
            })
            .collect();
        slots.sort_by_key(|s| s.item.start_time);
        slots
    }

    pub fn today_classes(&self, today: NaiveDate, grid: GridConfig) -> Vec<SlotView> {
        self.slots_on(today, grid)
    }

    pub fn week_view(&self, anchor: NaiveDate, days: usize, today: NaiveDate, grid: GridConfig) -> WeekView {
        let semester_start = self.semester_start(today);
        let days = layout::week_days(anchor, days.clamp(1, 7))
            .into_iter()
            .map(|date| DayColumn {
                date,
                day_of_week: day_index(date),
                is_today: date == today,
                slots: self.slots_on(date, grid),
            })
            .collect();

        WeekView {
            week_number: layout::week_number(semester_start, anchor),
            semester_start,
            days,
        }
    }
}
