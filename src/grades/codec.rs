//! Line codec for grade lists stored in the profile table
//!
//! One entry per line: `[description ]score credits is_advanced`. Booleans are
//! written `True`/`False` so rows written by earlier deployments still load.

use super::GradeEntry;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed stored grade on line {line}: {reason}")]
pub struct CodecError {
    pub line: usize,
    pub reason: &'static str,
}

pub fn pack_grades(grades: &[GradeEntry]) -> String {
    let mut out = String::new();
    for grade in grades {
        if !grade.description.is_empty() {
            out.push_str(&grade.description);
            out.push(' ');
        }
        out.push_str(&format!(
            "{} {} {}\n",
            grade.score,
            grade.credits,
            if grade.is_advanced { "True" } else { "False" }
        ));
    }
    out
}

pub fn unpack_grades(packed: &str) -> Result<Vec<GradeEntry>, CodecError> {
    packed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| unpack_line(line, idx + 1))
        .collect()
}

fn unpack_line(line: &str, line_no: usize) -> Result<GradeEntry, CodecError> {
    let err = |reason| CodecError {
        line: line_no,
        reason,
    };

    let mut tokens = line.rsplitn(4, ' ');
    let is_advanced = match tokens.next() {
        Some("True") => true,
        Some("False") => false,
        _ => return Err(err("advanced flag is not True/False")),
    };
    let credits = tokens
        .next()
        .and_then(parse_whole)
        .ok_or_else(|| err("credits are not a whole number"))?;
    let score = tokens
        .next()
        .and_then(parse_whole)
        .ok_or_else(|| err("score is not a whole number"))?;
    let description = tokens.next().unwrap_or_default().to_string();

    Ok(GradeEntry {
        description,
        score,
        credits,
        is_advanced,
    })
}

/// Accepts `90` as well as the legacy `90.0`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_whole(token: &str) -> Option<u32> {
    if let Ok(value) = token.parse::<u32>() {
        return Some(value);
    }
    let value = token.parse::<f64>().ok()?;
    if value.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&value) {
        Some(value as u32)
    } else {
        None
    }
}
