use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::extraction::GeminiConfig;
use crate::layout::{DEFAULT_GRID_START_HOUR, DEFAULT_PIXELS_PER_HOUR, GridConfig};

const DEFAULT_DATABASE_URL: &str = "sqlite://studyflow.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_SESSION_IDLE_MINUTES: f64 = 720.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::BadRequest(format!(
                "STORE_BACKEND must be sqlite or memory, got {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub gemini: Option<GeminiConfig>,
    pub grid: GridConfig,
    /// Sessions unused for this long are saved and closed.
    pub session_idle: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let store_backend = match env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Sqlite,
        };

        let grid = GridConfig {
            pixels_per_hour: parse_number("PIXELS_PER_HOUR", env::var("PIXELS_PER_HOUR").ok(), DEFAULT_PIXELS_PER_HOUR)?,
            grid_start_hour: parse_number("GRID_START_HOUR", env::var("GRID_START_HOUR").ok(), DEFAULT_GRID_START_HOUR)?,
        };

        let idle_minutes = parse_number(
            "SESSION_IDLE_MINUTES",
            env::var("SESSION_IDLE_MINUTES").ok(),
            DEFAULT_SESSION_IDLE_MINUTES,
        )?;

        Ok(Self {
            database_url,
            bind_addr,
            store_backend,
            gemini: GeminiConfig::new_from_env()?,
            grid,
            session_idle: idle_duration(idle_minutes)?,
        })
    }
}

fn parse_number(name: &str, raw: Option<String>, default: f64) -> Result<f64, AppError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::BadRequest(format!("{} must be a number, got {}", name, raw))),
    }
}

fn idle_duration(minutes: f64) -> Result<Duration, AppError> {
    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| !d.is_zero())
        .ok_or_else(|| AppError::BadRequest(format!("SESSION_IDLE_MINUTES must be positive, got {}", minutes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!(" memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn numbers_fall_back_and_reject_garbage() {
        assert_eq!(parse_number("PIXELS_PER_HOUR", None, 60.0).unwrap(), 60.0);
        assert_eq!(parse_number("PIXELS_PER_HOUR", Some("80".to_string()), 60.0).unwrap(), 80.0);

        let err = parse_number("GRID_START_HOUR", Some("eight".to_string()), 8.0).unwrap_err();
        match err {
            AppError::BadRequest(msg) => assert!(msg.contains("GRID_START_HOUR")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn idle_limit_must_be_positive() {
        assert_eq!(idle_duration(1.5).unwrap(), Duration::from_secs(90));
        assert!(idle_duration(0.0).is_err());
        assert!(idle_duration(-3.0).is_err());
    }
}
