//! Batch validation of parsed grade lines
//!
//! Rules are checked across the whole batch in a fixed order: range, then
//! integrality, then description length. The first rule any entry violates
//! rejects the entire batch.

use super::{GradeError, PendingEntry, RawEntry};
use crate::config::GradeRules;

pub fn validate(batch: Vec<RawEntry>, rules: &GradeRules) -> Result<Vec<PendingEntry>, GradeError> {
    if batch
        .iter()
        .any(|e| !rules.score_in_range(e.score) || !rules.credits_in_range(e.credits))
    {
        return Err(GradeError::Range {
            min_score: *rules.score_range.start(),
            max_score: *rules.score_range.end(),
            min_credits: *rules.credit_range.start(),
            max_credits: *rules.credit_range.end(),
        });
    }

    if batch
        .iter()
        .any(|e| e.score.fract() != 0.0 || e.credits.fract() != 0.0)
    {
        return Err(GradeError::NotInteger);
    }

    if batch
        .iter()
        .any(|e| e.description.chars().count() > rules.max_description_len)
    {
        return Err(GradeError::DescriptionTooLong {
            max: rules.max_description_len,
        });
    }

    Ok(batch
        .into_iter()
        .map(|e| PendingEntry {
            description: e.description,
            score: whole(e.score),
            credits: whole(e.credits),
        })
        .collect())
}

/// Range and integrality have been checked, so the value fits exactly
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: f64) -> u32 {
    value as u32
}
