pub mod dto;

use std::env;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::error::AppError;
use crate::models::TaskPriority;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl GeminiConfig {
    /// `Ok(None)` when no API key is configured.
    pub fn new_from_env() -> Result<Option<Self>, AppError> {
        let api_key = match env::var("GEMINI_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => return Ok(None),
        };
        let model = env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
        let base_url = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| GEMINI_BASE_URL.to_string());

        Ok(Some(Self {
            api_key,
            model,
            base_url,
        }))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanRequest {
    pub subject: String,
    pub days_until_exam: u32,
    pub hours_per_day: f64,
    #[serde(default)]
    pub details: String,
}

impl StudyPlanRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.subject.trim().is_empty() {
            return Err(AppError::bad_request("subject must not be empty"));
        }
        if self.days_until_exam == 0 {
            return Err(AppError::bad_request("daysUntilExam must be at least 1"));
        }
        if self.hours_per_day.is_nan() || self.hours_per_day <= 0.0 {
            return Err(AppError::bad_request("hoursPerDay must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDay {
    pub day: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub focus_area: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub plan_name: String,
    #[serde(default)]
    pub schedule: Vec<PlanDay>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NoteAnalysis {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tasks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedTask {
    pub title: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub priority: Option<TaskPriority>,
}

/// A class slot as read off a timetable. Fields stay loose until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedClass {
    pub course_title: String,
    #[serde(rename = "type", default)]
    pub class_type: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExtractionSource {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(default = "default_mime_type", rename = "mimeType")]
        mime_type: String,
    },
}

fn default_mime_type() -> String {
    "image/png".to_string()
}

impl ExtractionSource {
    pub fn is_blank(&self) -> bool {
        match self {
            ExtractionSource::Text { text } => text.trim().is_empty(),
            ExtractionSource::Image { data, .. } => data.trim().is_empty(),
        }
    }
}

/// Turns free text or images into structured records. Best effort, may fail.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn generate_study_plan(&self, request: &StudyPlanRequest) -> Result<StudyPlan, AppError>;
    async fn analyze_notes(&self, notes: &str) -> Result<NoteAnalysis, AppError>;
    async fn extract_tasks(&self, source: &ExtractionSource, today: NaiveDate) -> Result<Vec<ExtractedTask>, AppError>;
    async fn extract_schedule(&self, data: &str, mime_type: &str) -> Result<Vec<ExtractedClass>, AppError>;
}

pub struct GeminiHttpClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiHttpClient {
    pub fn new(config: GeminiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| {
                error!("failed to build http client: {}", e);
                AppError::InternalServerError
            })?;
        Ok(Self { client, config })
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        parts: Vec<dto::Part>,
        schema: serde_json::Value,
    ) -> Result<T, AppError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let request_body = dto::GenerateContentRequest {
            contents: vec![dto::Content { parts }],
            generation_config: dto::GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: schema,
            },
        };

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Extraction(format!("Gemini API error {}: {}", status, body)));
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| AppError::Extraction(format!("Failed to read Gemini response: {}", e)))?;

        let parsed: dto::GenerateContentResponse = serde_json::from_str(&body_text).map_err(|e| {
            error!("Failed to parse Gemini envelope: {}", e);
            AppError::Extraction(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = parsed
            .text()
            .ok_or_else(|| AppError::Extraction("Empty response from Gemini".to_string()))?;
        debug!("Gemini returned {} bytes", text.len());

        serde_json::from_str::<T>(text.trim())
            .map_err(|e| AppError::Extraction(format!("Malformed structured output: {}", e)))
    }
}

fn text_part(text: String) -> dto::Part {
    dto::Part::Text { text }
}

fn image_part(data: &str, mime_type: &str) -> dto::Part {
    dto::Part::InlineData {
        inline_data: dto::Blob {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        },
    }
}

fn string_array() -> serde_json::Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

#[async_trait]
impl ContentExtractor for GeminiHttpClient {
    async fn generate_study_plan(&self, request: &StudyPlanRequest) -> Result<StudyPlan, AppError> {
        let prompt = format!(
            "Build a structured study plan for {subject}.\n\
             Days until the exam: {days}. Study hours available per day: {hours}.\n\
             Extra context: {details}\n\
             Answer with a JSON object holding a plan name and one entry per day. \
             Reply in the language of the request.",
            subject = request.subject,
            days = request.days_until_exam,
            hours = request.hours_per_day,
            details = request.details,
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "planName": { "type": "STRING" },
                "schedule": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "day": { "type": "STRING" },
                            "topics": string_array(),
                            "focusArea": { "type": "STRING" }
                        },
                        "required": ["day", "topics", "focusArea"]
                    }
                }
            },
            "required": ["planName", "schedule"]
        });
        self.generate(vec![text_part(prompt)], schema).await
    }

    async fn analyze_notes(&self, notes: &str) -> Result<NoteAnalysis, AppError> {
        let prompt = format!(
            "Read these lecture notes. Return a short summary and a list of concrete \
             follow-up tasks or study questions.\n\nNotes:\n{}",
            notes
        );
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "summary": { "type": "STRING" },
                "tasks": string_array()
            }
        });
        self.generate(vec![text_part(prompt)], schema).await
    }

    async fn extract_tasks(&self, source: &ExtractionSource, today: NaiveDate) -> Result<Vec<ExtractedTask>, AppError> {
        let prompt = format!(
            "Find every assignment in this course-site content together with its deadline.\n\
             For each one return title, courseName, dueDate (YYYY-MM-DD; resolve relative \
             dates against today, {today}) and priority (High, Medium or Low by urgency). \
             Keep titles in their original language.",
        );
        let parts = match source {
            ExtractionSource::Text { text } => vec![text_part(format!("{}\n\nContent:\n{}", prompt, text))],
            ExtractionSource::Image { data, mime_type } => vec![image_part(data, mime_type), text_part(prompt)],
        };
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "courseName": { "type": "STRING" },
                    "dueDate": { "type": "STRING" },
                    "priority": { "type": "STRING", "enum": ["Low", "Medium", "High"] }
                },
                "required": ["title", "courseName", "dueDate", "priority"]
            }
        });
        self.generate(parts, schema).await
    }

    async fn extract_schedule(&self, data: &str, mime_type: &str) -> Result<Vec<ExtractedClass>, AppError> {
        let prompt = "This image is a weekly class timetable. List every class in it with \
            courseTitle, type (Lecture, Recitation or Lab), dayOfWeek (0 = Sunday through 6), \
            startTime and endTime as 24-hour HH:MM, and location (empty if unknown). \
            Skip headers and anything that is not a class."
            .to_string();
        let schema = json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "courseTitle": { "type": "STRING" },
                    "type": { "type": "STRING", "enum": ["Lecture", "Recitation", "Lab"] },
                    "dayOfWeek": { "type": "INTEGER" },
                    "startTime": { "type": "STRING" },
                    "endTime": { "type": "STRING" },
                    "location": { "type": "STRING" }
                },
                "required": ["courseTitle", "type", "dayOfWeek", "startTime", "endTime"]
            }
        });
        self.generate(vec![image_part(data, mime_type), text_part(prompt)], schema).await
    }
}

/// Used when no API key is configured. Every call fails without side effects.
pub struct NoopExtractor;

impl NoopExtractor {
    fn unavailable() -> AppError {
        AppError::Extraction("Content extraction is not configured (missing GEMINI_API_KEY)".to_string())
    }
}

#[async_trait]
impl ContentExtractor for NoopExtractor {
    async fn generate_study_plan(&self, _request: &StudyPlanRequest) -> Result<StudyPlan, AppError> {
        Err(Self::unavailable())
    }

    async fn analyze_notes(&self, _notes: &str) -> Result<NoteAnalysis, AppError> {
        Err(Self::unavailable())
    }

    async fn extract_tasks(&self, _source: &ExtractionSource, _today: NaiveDate) -> Result<Vec<ExtractedTask>, AppError> {
        Err(Self::unavailable())
    }

    async fn extract_schedule(&self, _data: &str, _mime_type: &str) -> Result<Vec<ExtractedClass>, AppError> {
        Err(Self::unavailable())
    }
}
