//! Index-based deletion of grade entries
//!
//! Indices are 1-based positions in the list as it stands when the request
//! arrives. A request is all-or-nothing.

use super::GradeEntry;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeletionError {
    #[error("not a valid number")]
    NotANumber,
    #[error("no grade at index {}", join(.0))]
    OutOfRange(Vec<i128>),
    #[error("index listed more than once: {}", join(.0))]
    DuplicateIndices(Vec<i128>),
}

fn join(indices: &[i128]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a whitespace-separated index list. Empty input is not a number.
///
/// Values wider than `i64` still parse and are reported as out of range.
pub fn parse_indices(text: &str) -> Result<Vec<i128>, DeletionError> {
    let indices = text
        .split_whitespace()
        .map(str::parse::<i128>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| DeletionError::NotANumber)?;
    if indices.is_empty() {
        return Err(DeletionError::NotANumber);
    }
    Ok(indices)
}

/// Remove every listed entry, or none of them.
///
/// Out-of-range indices are reported before duplicates.
pub fn delete_by_indices(
    grades: &[GradeEntry],
    indices: &[i128],
) -> Result<Vec<GradeEntry>, DeletionError> {
    let len = i128::try_from(grades.len()).unwrap_or(i128::MAX);
    let out_of_range: Vec<i128> = indices
        .iter()
        .copied()
        .filter(|&i| i < 1 || i > len)
        .collect();
    if !out_of_range.is_empty() {
        return Err(DeletionError::OutOfRange(out_of_range));
    }

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for &index in indices {
        if !seen.insert(index) && !duplicates.contains(&index) {
            duplicates.push(index);
        }
    }
    if !duplicates.is_empty() {
        return Err(DeletionError::DuplicateIndices(duplicates));
    }

    let mut positions: Vec<usize> = indices
        .iter()
        .filter_map(|&i| usize::try_from(i - 1).ok())
        .collect();
    // Highest first so earlier positions stay put
    positions.sort_unstable_by(|a, b| b.cmp(a));

    let mut remaining = grades.to_vec();
    for position in positions {
        remaining.remove(position);
    }
    Ok(remaining)
}
