use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Course, CourseResource, CourseStaff, NewCourseRequest, NewResourceRequest, NewStaffRequest,
    ResourceType, SettingsRequest, UpdateCourseRequest, User, Workspace, WorkspaceSettings,
};
use crate::timer::FocusTimer;

pub const COURSE_COLORS: [&str; 8] = [
    "bg-blue-500",
    "bg-emerald-500",
    "bg-purple-500",
    "bg-rose-500",
    "bg-amber-500",
    "bg-indigo-500",
    "bg-cyan-500",
    "bg-teal-500",
];

/// A logged-in user's workspace. Created on login, dropped on logout.
///
/// All mutations run to completion against the in-memory snapshot; saving it
/// is the caller's concern.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub(crate) user: User,
    pub(crate) workspace: Workspace,
    /// Lives with the session only; never saved.
    pub(crate) timer: FocusTimer,
}

pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl WorkspaceContext {
    pub fn new(user: User, workspace: Workspace) -> Self {
        Self {
            user,
            workspace,
            timer: FocusTimer::default(),
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn snapshot(&self) -> Workspace {
        self.workspace.clone()
    }

    pub fn semester_start(&self, today: NaiveDate) -> NaiveDate {
        self.workspace.settings.semester_start_or_default(today)
    }

    pub fn update_settings(&mut self, req: SettingsRequest) -> WorkspaceSettings {
        self.workspace.settings.semester_start = Some(req.semester_start);
        self.workspace.settings.clone()
    }

    pub fn courses(&self) -> &[Course] {
        &self.workspace.courses
    }

    pub fn course(&self, id: &str) -> Result<&Course, AppError> {
        self.workspace.find_course(id).ok_or(AppError::NotFound)
    }

    fn course_mut(&mut self, id: &str) -> Result<&mut Course, AppError> {
        self.workspace
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound)
    }

    pub(crate) fn find_course_by_title(&self, title: &str) -> Option<&Course> {
        let wanted = title.trim().to_lowercase();
        self.workspace
            .courses
            .iter()
            .find(|c| c.title.trim().to_lowercase() == wanted)
    }

    pub fn add_course(&mut self, req: NewCourseRequest) -> Result<Course, AppError> {
        let title = require_text(&req.title, "title")?;
        let color = COURSE_COLORS[self.workspace.courses.len() % COURSE_COLORS.len()];

        let course = Course {
            id: new_id(),
            title,
            color: color.to_string(),
            description: non_blank(req.description),
            staff: Vec::new(),
            resources: Vec::new(),
        };
        info!("user {} added course {}", self.user.id, course.title);
        self.workspace.courses.push(course.clone());
        Ok(course)
    }

    pub fn update_course(&mut self, id: &str, req: UpdateCourseRequest) -> Result<Course, AppError> {
        let title = req.title.as_deref().map(|t| require_text(t, "title")).transpose()?;
        let course = self.course_mut(id)?;

        if let Some(title) = title {
            course.title = title;
        }
        if let Some(color) = non_blank(req.color) {
            course.color = color;
        }
        if let Some(description) = req.description {
            course.description = non_blank(Some(description));
        }
        Ok(course.clone())
    }

    /// Lectures, tasks and slots that reference the course are kept.
    pub fn delete_course(&mut self, id: &str) -> Result<(), AppError> {
        let before = self.workspace.courses.len();
        self.workspace.courses.retain(|c| c.id != id);
        if self.workspace.courses.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub fn add_staff(&mut self, course_id: &str, req: NewStaffRequest) -> Result<CourseStaff, AppError> {
        let name = require_text(&req.name, "name")?;
        let course = self.course_mut(course_id)?;

        let staff = CourseStaff {
            id: new_id(),
            name,
            role: req.role,
            email: non_blank(req.email),
        };
        course.staff.push(staff.clone());
        Ok(staff)
    }

    pub fn add_resource(&mut self, course_id: &str, req: NewResourceRequest) -> Result<CourseResource, AppError> {
        let title = require_text(&req.title, "title")?;
        let (url, content) = match req.resource_type {
            ResourceType::Note => {
                let content = non_blank(req.content)
                    .ok_or_else(|| AppError::bad_request("note resources need content"))?;
                (None, Some(content))
            }
            ResourceType::Link | ResourceType::File => {
                let url = non_blank(req.url)
                    .ok_or_else(|| AppError::bad_request("link and file resources need a url"))?;
                (Some(url), None)
            }
        };
        let course = self.course_mut(course_id)?;

        let resource = CourseResource {
            id: new_id(),
            title,
            resource_type: req.resource_type,
            url,
            content,
        };
        course.resources.push(resource.clone());
        Ok(resource)
    }

    pub fn delete_resource(&mut self, course_id: &str, resource_id: &str) -> Result<(), AppError> {
        let course = self.course_mut(course_id)?;
        let before = course.resources.len();
        course.resources.retain(|r| r.id != resource_id);
        if course.resources.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
