pub mod attendance;
pub mod course;
pub mod lecture;
pub mod schedule;
pub mod session;
pub mod task;
pub mod user;
pub mod workspace;

pub use attendance::{AttendanceQuery, AttendanceRecord, AttendanceStatus, MarkAttendanceRequest};
pub use course::{
    Course, CourseResource, CourseStaff, NewCourseRequest, NewResourceRequest, NewStaffRequest,
    ResourceType, StaffRole, UpdateCourseRequest,
};
pub use lecture::{BacklogQuery, Lecture, NewLectureRequest, UpdateLectureRequest};
pub use schedule::{ClassType, ClockTime, NewScheduleItemRequest, ScheduleItem, UpdateScheduleItemRequest};
pub use session::{RecordSessionRequest, StudySession};
pub use task::{NewTaskRequest, Task, TaskPriority, TaskQuery, TaskStatus, UpdateTaskRequest};
pub use user::{LoginRequest, User, UserKind};
pub use workspace::{SettingsRequest, Workspace, WorkspaceSettings};
