use std::env;

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub assignment_queue_size: usize,
    pub event_buffer_size: usize,
    /// Two coordinates within this great-circle distance resolve to the
    /// same delivery point.
    pub point_match_tolerance_m: f64,
    /// Proof capture locations further than this from the destination are
    /// flagged in the audit log, never rejected.
    pub proof_distance_flag_m: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 3000,
            log_level: "info".to_string(),
            assignment_queue_size: 1024,
            event_buffer_size: 1024,
            point_match_tolerance_m: 25.0,
            proof_distance_flag_m: 300.0,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            assignment_queue_size: parse_or_default(
                "ASSIGNMENT_QUEUE_SIZE",
                defaults.assignment_queue_size,
            )?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            point_match_tolerance_m: parse_or_default(
                "POINT_MATCH_TOLERANCE_M",
                defaults.point_match_tolerance_m,
            )?,
            proof_distance_flag_m: parse_or_default(
                "PROOF_DISTANCE_FLAG_M",
                defaults.proof_distance_flag_m,
            )?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, EngineError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| EngineError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
