//! Error types for countdown-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid repeat interval: {0} (must be at least 1)")]
    InvalidInterval(u32),

    #[error("Custom weekly recurrence has no weekdays selected")]
    EmptyWeekdayMask,

    #[error("The start date must be earlier than the end date")]
    StartAfterEnd,

    #[error("The repeat end date must be on or after the event end date")]
    RepeatEndBeforeEventEnd,

    #[error("The title cannot be empty")]
    MissingTitle,

    #[error("The icon cannot be empty")]
    MissingIcon,

    #[error("The color cannot be empty")]
    MissingColor,

    #[error("No phase is configured for the active window")]
    NoMatchingPhase,

    #[error("Template encode failed: {0}")]
    TemplateEncode(String),

    #[error("Template decode failed: {0}")]
    TemplateDecode(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
