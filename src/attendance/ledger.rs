use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{AttendanceRecord, AttendanceStatus, ScheduleItem};

/// Result of a ledger mutation, consumed by the backlog reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerChange {
    Created(AttendanceRecord),
    Updated {
        record: AttendanceRecord,
        previous: AttendanceStatus,
    },
    /// Re-marked with the status it already had.
    Unchanged(AttendanceRecord),
    Cleared(AttendanceRecord),
}

impl LedgerChange {
    pub fn record(&self) -> &AttendanceRecord {
        match self {
            LedgerChange::Created(record)
            | LedgerChange::Updated { record, .. }
            | LedgerChange::Unchanged(record)
            | LedgerChange::Cleared(record) => record,
        }
    }

    /// Status after the change; `None` once the record is gone.
    pub fn new_status(&self) -> Option<AttendanceStatus> {
        match self {
            LedgerChange::Cleared(_) => None,
            other => Some(other.record().status),
        }
    }
}

fn matches(record: &AttendanceRecord, schedule_item_id: &str, date: NaiveDate) -> bool {
    record.schedule_item_id == schedule_item_id && record.date == date
}

/// Creates or overwrites the record for `(item.id, date)`.
///
/// Re-marking with the same status leaves the record in place. Removing a
/// record is [`clear_attendance`]'s job.
pub fn record_attendance(
    records: &mut Vec<AttendanceRecord>,
    item: &ScheduleItem,
    date: NaiveDate,
    status: AttendanceStatus,
) -> LedgerChange {
    // Snapshots written by older clients may hold duplicates; keep the first.
    let mut seen = false;
    records.retain(|r| {
        if !matches(r, &item.id, date) {
            return true;
        }
        let keep = !seen;
        seen = true;
        keep
    });

    match records.iter_mut().find(|r| matches(r, &item.id, date)) {
        Some(existing) if existing.status == status => LedgerChange::Unchanged(existing.clone()),
        Some(existing) => {
            let previous = existing.status;
            existing.status = status;
            LedgerChange::Updated {
                record: existing.clone(),
                previous,
            }
        }
        None => {
            let record = AttendanceRecord {
                id: Uuid::new_v4().to_string(),
                schedule_item_id: item.id.clone(),
                course_id: item.course_id.clone(),
                date,
                status,
            };
            records.push(record.clone());
            LedgerChange::Created(record)
        }
    }
}

/// Removes the record for `(schedule_item_id, date)` if present.
pub fn clear_attendance(
    records: &mut Vec<AttendanceRecord>,
    schedule_item_id: &str,
    date: NaiveDate,
) -> Option<LedgerChange> {
    let position = records.iter().position(|r| matches(r, schedule_item_id, date))?;
    let removed = records.remove(position);
    records.retain(|r| !matches(r, schedule_item_id, date));
    Some(LedgerChange::Cleared(removed))
}

pub fn status_for(
    records: &[AttendanceRecord],
    schedule_item_id: &str,
    date: NaiveDate,
) -> Option<AttendanceStatus> {
    records
        .iter()
        .find(|r| matches(r, schedule_item_id, date))
        .map(|r| r.status)
}
