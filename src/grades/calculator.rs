//! Weighted grade-point average

use super::{GradeEntry, GradeError};

/// Weighted average of `entries`.
///
/// Credits of advanced courses are multiplied by `advanced_multiplier` only
/// for exact-sciences students. The result is unrounded.
pub fn weighted_average(
    entries: &[GradeEntry],
    is_exact_sciences: bool,
    advanced_multiplier: f64,
) -> Result<f64, GradeError> {
    if entries.is_empty() {
        return Err(GradeError::NoGrades);
    }

    let (weighted_sum, total_weight) =
        entries
            .iter()
            .fold((0.0_f64, 0.0_f64), |(sum, weight_sum), entry| {
                let weight = weight(entry, is_exact_sciences, advanced_multiplier);
                (sum + f64::from(entry.score) * weight, weight_sum + weight)
            });

    if total_weight <= 0.0 {
        return Err(GradeError::NoGrades);
    }
    Ok(weighted_sum / total_weight)
}

fn weight(entry: &GradeEntry, is_exact_sciences: bool, advanced_multiplier: f64) -> f64 {
    let credits = f64::from(entry.credits);
    if is_exact_sciences && entry.is_advanced {
        credits * advanced_multiplier
    } else {
        credits
    }
}
