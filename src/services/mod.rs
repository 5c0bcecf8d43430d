pub mod context;
pub mod imports;
pub mod schedule;
pub mod session_registry;
pub mod study;

pub use context::{COURSE_COLORS, WorkspaceContext};
pub use imports::{NoteAnalysisApplied, ScheduleImport};
pub use schedule::{AttendanceUpdate, DayColumn, ScheduleItemCreated, SlotView, WeekView};
pub use session_registry::{LiveWorkspace, SessionRegistry, SharedContext};
pub use study::{DayTotal, GENERAL_CATEGORY, StudyStats, TimerState, weekday_label};
