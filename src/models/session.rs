use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::TimerMode;

/// A completed block of focused study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub category: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSessionRequest {
    pub duration_minutes: Option<u32>,
    pub mode: Option<TimerMode>,
    pub category: Option<String>,
}
