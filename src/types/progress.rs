use std::fmt;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::errors::CompareError;

/// Latest progress reported by the diff engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub percent: u8,
    pub phase: String,
}

impl Progress {
    pub fn new(percent: u8, phase: impl Into<String>) -> Self {
        Self {
            percent: percent.min(100),
            phase: phase.into(),
        }
    }

    pub fn started() -> Self {
        Self::new(0, "Starting comparison")
    }

    pub fn completed() -> Self {
        Self::new(100, "Comparison completed")
    }
}

/// Lifecycle of a comparison session.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CompareState {
    #[default]
    Idle,
    Comparing,
    Succeeded,
    Failed(CompareError),
}

impl CompareState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompareState::Succeeded | CompareState::Failed(_))
    }

    pub fn to_colored_string(&self) -> String {
        match self {
            CompareState::Idle => "IDLE".bright_black().to_string(),
            CompareState::Comparing => "COMPARING".blue().bold().to_string(),
            CompareState::Succeeded => "SUCCEEDED".green().bold().to_string(),
            CompareState::Failed(_) => "FAILED".red().bold().to_string(),
        }
    }
}

impl fmt::Display for CompareState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareState::Idle => write!(f, "IDLE"),
            CompareState::Comparing => write!(f, "COMPARING"),
            CompareState::Succeeded => write!(f, "SUCCEEDED"),
            CompareState::Failed(reason) => write!(f, "FAILED ({})", reason),
        }
    }
}

/// What `poll_progress` hands back: lifecycle plus the latest progress.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionProgress {
    pub state: CompareState,
    pub progress: Progress,
}
