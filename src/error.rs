//! Error types for smartchef.
//!
//! Only pipeline errors ever reach the user. Storage, narration and alarm
//! failures are logged where they happen and the session carries on.

use thiserror::Error;

/// Failures of the recipe request pipeline (image recognition and recipe
/// generation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Please add some ingredients or leftovers first!")]
    EmptyRequest,

    #[error("Could not identify ingredients from image: {0}")]
    Recognition(String),

    #[error("Failed to generate recipes: {0}")]
    Generation(String),

    #[error("Invalid image: {0}")]
    InvalidImage(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum NarrationError {
    #[error("Speech command '{command}' failed to start: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum AlarmError {
    #[error("Failed to open audio output: {0}")]
    Output(String),

    #[error("Failed to start alarm thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Rejected cooking-mode operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookingError {
    #[error("Recipe has no instructions")]
    NoInstructions,

    #[error("No timer duration found in this step")]
    NoDuration,

    #[error("A timer is already active for this step")]
    TimerActive,
}
