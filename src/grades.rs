//! Grade entries and the pure functions over them
//!
//! Parsing, validation, deletion, averaging and the storage codec. Nothing in
//! here performs I/O.

mod calculator;
mod codec;
mod deletion;
mod parser;
mod validator;


pub use calculator::weighted_average;
pub use codec::{pack_grades, unpack_grades, CodecError};
pub use deletion::{delete_by_indices, parse_indices, DeletionError};
pub use parser::parse_grades;
pub use validator::validate;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One graded course, as stored in a session and in the profile store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeEntry {
    #[serde(default)]
    pub description: String,
    pub score: u32,
    pub credits: u32,
    pub is_advanced: bool,
}

impl GradeEntry {
    pub fn new(description: impl Into<String>, score: u32, credits: u32, is_advanced: bool) -> Self {
        Self {
            description: description.into(),
            score,
            credits,
            is_advanced,
        }
    }
}

/// A line as typed by the user, numbers not yet checked
#[derive(Debug, Clone, PartialEq)]
pub struct RawEntry {
    pub description: String,
    pub score: f64,
    pub credits: f64,
}

/// A validated entry waiting for its course type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingEntry {
    pub description: String,
    pub score: u32,
    pub credits: u32,
}

impl PendingEntry {
    pub fn into_entry(self, is_advanced: bool) -> GradeEntry {
        GradeEntry {
            description: self.description,
            score: self.score,
            credits: self.credits,
            is_advanced,
        }
    }
}

/// Rejections of a grade batch or an average request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("line {line} is not in the `[description] score credits` format")]
    Format { line: usize },
    #[error("score must be within {min_score}-{max_score} and credits within {min_credits}-{max_credits}")]
    Range {
        min_score: u32,
        max_score: u32,
        min_credits: u32,
        max_credits: u32,
    },
    #[error("scores and credits must be whole numbers")]
    NotInteger,
    #[error("description is longer than {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("no grades were entered")]
    NoGrades,
}
