use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use tracing::debug;
use uuid::Uuid;

use super::ledger::LedgerChange;
use crate::models::{AttendanceStatus, ClassType, ClockTime, Lecture, ScheduleItem};

/// What the reconciler did to the lecture store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BacklogOutcome {
    Created(String),
    Reopened(Vec<String>),
    AlreadyPresent,
    Completed(Vec<String>),
    Untouched,
}

pub fn backlog_title(class_type: ClassType, date: NaiveDate) -> String {
    format!("Missed {} ({})", class_type, date)
}

fn is_backlog_for(lecture: &Lecture, course_id: &str, date: NaiveDate) -> bool {
    lecture.is_backlog && lecture.course_id == course_id && lecture.date == date
}

/// Keeps backlog lectures consistent with one ledger change.
///
/// `missed` ensures a single backlog entry for `(course, date, title)`,
/// reopening a completed one. `attended` marks every backlog entry for
/// `(course, date)` completed. A cleared record leaves the store as is.
pub fn reconcile(
    lectures: &mut Vec<Lecture>,
    item: &ScheduleItem,
    date: NaiveDate,
    change: &LedgerChange,
) -> BacklogOutcome {
    match change.new_status() {
        Some(AttendanceStatus::Missed) => ensure_backlog(lectures, item, date),
        Some(AttendanceStatus::Attended) => retract_backlog(lectures, &item.course_id, date),
        None => BacklogOutcome::Untouched,
    }
}

fn ensure_backlog(lectures: &mut Vec<Lecture>, item: &ScheduleItem, date: NaiveDate) -> BacklogOutcome {
    let title = backlog_title(item.class_type, date);
    let mut found = false;
    let mut reopened = Vec::new();

    for lecture in lectures
        .iter_mut()
        .filter(|l| is_backlog_for(l, &item.course_id, date) && l.title == title)
    {
        found = true;
        if lecture.completed {
            lecture.completed = false;
            reopened.push(lecture.id.clone());
        }
    }

    if !reopened.is_empty() {
        debug!("reopened backlog {:?} for course {} on {}", reopened, item.course_id, date);
        return BacklogOutcome::Reopened(reopened);
    }
    if found {
        return BacklogOutcome::AlreadyPresent;
    }

    let lecture = Lecture {
        id: Uuid::new_v4().to_string(),
        course_id: item.course_id.clone(),
        title,
        date,
        content: format!("Missed {} on {}.", item.class_type, date),
        summary: None,
        is_backlog: true,
        completed: false,
    };
    let id = lecture.id.clone();
    lectures.push(lecture);
    BacklogOutcome::Created(id)
}

fn retract_backlog(lectures: &mut [Lecture], course_id: &str, date: NaiveDate) -> BacklogOutcome {
    let completed: Vec<String> = lectures
        .iter_mut()
        .filter(|l| is_backlog_for(l, course_id, date) && !l.completed)
        .map(|l| {
            l.completed = true;
            l.id.clone()
        })
        .collect();

    if completed.is_empty() {
        BacklogOutcome::Untouched
    } else {
        BacklogOutcome::Completed(completed)
    }
}

/// Weekly occurrences of a slot from `semester_start` that already began by `now`.
///
/// An occurrence on `now`'s date counts only once its start time has passed.
pub fn past_occurrences(
    day_of_week: u8,
    start_time: ClockTime,
    semester_start: NaiveDate,
    now: NaiveDateTime,
) -> Vec<NaiveDate> {
    let start_dow = semester_start.weekday().num_days_from_sunday();
    let offset = (u32::from(day_of_week) + 7 - start_dow) % 7;

    let mut occurrences = Vec::new();
    let mut current = semester_start.checked_add_days(Days::new(u64::from(offset)));

    while let Some(date) = current {
        if date.and_time(chrono::NaiveTime::MIN) >= now {
            break;
        }
        if date != now.date() || date.and_time(start_time.to_naive_time()) <= now {
            occurrences.push(date);
        }
        current = date.checked_add_days(Days::new(7));
    }
    occurrences
}

/// Backlog lectures for every past occurrence of a newly added slot.
///
/// Does not consult the ledger: a slot that did not exist yet has no records.
pub fn retroactive_backlog(item: &ScheduleItem, semester_start: NaiveDate, now: NaiveDateTime) -> Vec<Lecture> {
    past_occurrences(item.day_of_week, item.start_time, semester_start, now)
        .into_iter()
        .map(|date| Lecture {
            id: Uuid::new_v4().to_string(),
            course_id: item.course_id.clone(),
            title: backlog_title(item.class_type, date),
            date,
            content: "Automatically generated backlog.".to_string(),
            summary: None,
            is_backlog: true,
            completed: false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::ledger::record_attendance;

    fn monday_slot(hour: u8) -> ScheduleItem {
        ScheduleItem {
            id: "slot-1".to_string(),
            course_id: "bio".to_string(),
            day_of_week: 1,
            start_time: ClockTime::new(hour, 0).unwrap(),
            end_time: ClockTime::new(hour + 2, 0).unwrap(),
            class_type: ClassType::Lecture,
            location: None,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        d.and_hms_opt(h, m, 0).unwrap()
    }

    fn mark(
        records: &mut Vec<crate::models::AttendanceRecord>,
        lectures: &mut Vec<Lecture>,
        item: &ScheduleItem,
        day: NaiveDate,
        status: AttendanceStatus,
    ) -> BacklogOutcome {
        let change = record_attendance(records, item, day, status);
        reconcile(lectures, item, day, &change)
    }

    #[test]
    fn missed_twice_creates_one_backlog_entry() {
        let item = monday_slot(10);
        let day = date(2024, 1, 8);
        let (mut records, mut lectures) = (Vec::new(), Vec::new());

        assert!(matches!(
            mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed),
            BacklogOutcome::Created(_)
        ));
        assert_eq!(
            mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed),
            BacklogOutcome::AlreadyPresent
        );

        assert_eq!(lectures.len(), 1);
        assert_eq!(lectures[0].title, "Missed Lecture (2024-01-08)");
        assert!(lectures[0].is_backlog);
        assert!(!lectures[0].completed);
    }

    #[test]
    fn attended_completes_previous_backlog() {
        let item = monday_slot(10);
        let day = date(2024, 1, 8);
        let (mut records, mut lectures) = (Vec::new(), Vec::new());

        mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed);
        let outcome = mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Attended);

        assert_eq!(outcome, BacklogOutcome::Completed(vec![lectures[0].id.clone()]));
        assert!(lectures[0].completed);
    }

    #[test]
    fn attended_on_fresh_slot_creates_nothing() {
        let item = monday_slot(10);
        let (mut records, mut lectures) = (Vec::new(), Vec::new());
        let outcome = mark(&mut records, &mut lectures, &item, date(2024, 1, 8), AttendanceStatus::Attended);
        assert_eq!(outcome, BacklogOutcome::Untouched);
        assert!(lectures.is_empty());
    }

    #[test]
    fn missed_again_reopens_completed_entry() {
        let item = monday_slot(10);
        let day = date(2024, 1, 8);
        let (mut records, mut lectures) = (Vec::new(), Vec::new());

        mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed);
        mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Attended);
        let outcome = mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed);

        assert_eq!(outcome, BacklogOutcome::Reopened(vec![lectures[0].id.clone()]));
        assert_eq!(lectures.len(), 1);
        assert!(!lectures[0].completed);
    }

    #[test]
    fn cleared_record_leaves_backlog_alone() {
        let item = monday_slot(10);
        let day = date(2024, 1, 8);
        let (mut records, mut lectures) = (Vec::new(), Vec::new());

        mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Missed);
        let change = crate::attendance::ledger::clear_attendance(&mut records, &item.id, day).unwrap();
        assert_eq!(reconcile(&mut lectures, &item, day, &change), BacklogOutcome::Untouched);
        assert_eq!(lectures.len(), 1);
        assert!(!lectures[0].completed);
    }

    #[test]
    fn regular_lectures_are_never_retracted() {
        let item = monday_slot(10);
        let day = date(2024, 1, 8);
        let mut lectures = vec![Lecture {
            id: "note".to_string(),
            course_id: "bio".to_string(),
            title: "Lecture 1".to_string(),
            date: day,
            content: String::new(),
            summary: None,
            is_backlog: false,
            completed: false,
        }];
        let mut records = Vec::new();
        mark(&mut records, &mut lectures, &item, day, AttendanceStatus::Attended);
        assert!(!lectures[0].completed);
    }

    #[test]
    fn sweep_excludes_today_before_start_time() {
        let start = date(2024, 1, 1);
        let now = at(date(2024, 1, 22), 9, 0);
        let dates = past_occurrences(1, ClockTime::new(10, 0).unwrap(), start, now);
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 1, 8), date(2024, 1, 15)]);
    }

    #[test]
    fn sweep_includes_today_after_start_time() {
        let start = date(2024, 1, 1);
        let now = at(date(2024, 1, 22), 9, 0);
        let dates = past_occurrences(1, ClockTime::new(8, 30).unwrap(), start, now);
        assert_eq!(dates.len(), 4);
        assert_eq!(dates.last(), Some(&date(2024, 1, 22)));
    }

    #[test]
    fn sweep_offsets_to_first_matching_weekday() {
        // 2024-01-01 is a Monday; Wednesday slots start on the 3rd.
        let dates = past_occurrences(3, ClockTime::new(10, 0).unwrap(), date(2024, 1, 1), at(date(2024, 1, 20), 12, 0));
        assert_eq!(dates, vec![date(2024, 1, 3), date(2024, 1, 10), date(2024, 1, 17)]);

        // Sunday slot wraps forward to the 7th.
        let dates = past_occurrences(0, ClockTime::new(10, 0).unwrap(), date(2024, 1, 1), at(date(2024, 1, 10), 12, 0));
        assert_eq!(dates, vec![date(2024, 1, 7)]);
    }

    #[test]
    fn sweep_with_future_semester_is_empty() {
        let dates = past_occurrences(1, ClockTime::new(10, 0).unwrap(), date(2024, 2, 1), at(date(2024, 1, 22), 9, 0));
        assert!(dates.is_empty());
    }

    #[test]
    fn retroactive_backlog_builds_lectures() {
        let item = monday_slot(10);
        let lectures = retroactive_backlog(&item, date(2024, 1, 1), at(date(2024, 1, 22), 9, 0));
        let titles: Vec<&str> = lectures.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "Missed Lecture (2024-01-01)",
                "Missed Lecture (2024-01-08)",
                "Missed Lecture (2024-01-15)",
            ]
        );
        assert!(lectures.iter().all(|l| l.is_backlog && !l.completed && l.course_id == "bio"));
    }
}
