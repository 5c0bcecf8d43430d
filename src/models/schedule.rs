use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Wall-clock time of day, serialized as 24-hour `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// `h + m/60`
    pub fn fractional_hours(&self) -> f64 {
        f64::from(self.hour) + f64::from(self.minute) / 60.0
    }

    pub fn to_naive_time(&self) -> chrono::NaiveTime {
        chrono::NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(chrono::NaiveTime::MIN)
    }
}

impl FromStr for ClockTime {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AppError::BadRequest(format!("Invalid time (expected HH:MM): {}", s));
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour = h.parse::<u8>().map_err(|_| invalid())?;
        let minute = m.parse::<u8>().map_err(|_| invalid())?;
        ClockTime::new(hour, minute).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ClockTime {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassType {
    Lecture,
    Recitation,
    Lab,
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClassType::Lecture => "Lecture",
            ClassType::Recitation => "Recitation",
            ClassType::Lab => "Lab",
        };
        f.write_str(name)
    }
}

impl FromStr for ClassType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lecture" => Ok(ClassType::Lecture),
            "recitation" => Ok(ClassType::Recitation),
            "lab" => Ok(ClassType::Lab),
            other => Err(AppError::BadRequest(format!("Unknown class type: {}", other))),
        }
    }
}

/// A recurring weekly class slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleItem {
    pub id: String,
    pub course_id: String,
    /// 0 = Sunday
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(rename = "type")]
    pub class_type: ClassType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScheduleItemRequest {
    pub course_id: String,
    pub day_of_week: u8,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    #[serde(rename = "type")]
    pub class_type: ClassType,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleItemRequest {
    pub course_id: Option<String>,
    pub day_of_week: Option<u8>,
    pub start_time: Option<ClockTime>,
    pub end_time: Option<ClockTime>,
    #[serde(rename = "type")]
    pub class_type: Option<ClassType>,
    pub location: Option<String>,
}

/// Checks the slot shape shared by create and edit.
pub fn validate_slot(day_of_week: u8, start: ClockTime, end: ClockTime) -> Result<(), AppError> {
    if day_of_week > 6 {
        return Err(AppError::BadRequest(format!(
            "dayOfWeek must be between 0 and 6, got {}",
            day_of_week
        )));
    }
    if start >= end {
        return Err(AppError::BadRequest(format!(
            "startTime {} must be before endTime {}",
            start, end
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_clock_time() {
        let t: ClockTime = "9:05".parse().unwrap();
        assert_eq!(t.hour(), 9);
        assert_eq!(t.minute(), 5);
        assert_eq!(t.to_string(), "09:05");
        assert!((t.fractional_hours() - (9.0 + 5.0 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn rejects_malformed_clock_time() {
        for bad in ["", "10", "24:00", "10:60", "1:5", "ab:cd", "100:00"] {
            assert!(bad.parse::<ClockTime>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn schedule_item_uses_wire_names() {
        let json = r#"{"id":"s1","courseId":"c1","dayOfWeek":1,"startTime":"10:00","endTime":"11:30","type":"Lab"}"#;
        let item: ScheduleItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.class_type, ClassType::Lab);
        assert_eq!(item.location, None);

        let back = serde_json::to_value(&item).unwrap();
        assert_eq!(back["startTime"], "10:00");
        assert_eq!(back["type"], "Lab");
    }

    #[test]
    fn slot_validation() {
        let ten = ClockTime::new(10, 0).unwrap();
        let eleven = ClockTime::new(11, 0).unwrap();
        assert!(validate_slot(1, ten, eleven).is_ok());
        assert!(validate_slot(7, ten, eleven).is_err());
        assert!(validate_slot(1, eleven, ten).is_err());
        assert!(validate_slot(1, ten, ten).is_err());
    }
}
