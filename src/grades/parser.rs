//! Free-text grade parsing
//!
//! Each non-blank line reads `[description] score credits`. The description
//! may contain spaces; the two numbers are always the last two tokens.

use super::{GradeError, RawEntry};

/// Parse a multi-line block into raw entries, preserving line order.
///
/// Blank lines are skipped. A block with no entries at all is a format error
/// on line 1.
pub fn parse_grades(text: &str) -> Result<Vec<RawEntry>, GradeError> {
    let mut entries = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = parse_line(line).ok_or(GradeError::Format { line: idx + 1 })?;
        entries.push(entry);
    }

    if entries.is_empty() {
        return Err(GradeError::Format { line: 1 });
    }
    Ok(entries)
}

fn parse_line(line: &str) -> Option<RawEntry> {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut tokens = collapsed.rsplitn(3, ' ');

    let credits = tokens.next()?;
    let score = tokens.next()?;
    let description = tokens.next().unwrap_or_default();

    Some(RawEntry {
        description: description.to_string(),
        score: parse_number(score)?,
        credits: parse_number(credits)?,
    })
}

fn parse_number(token: &str) -> Option<f64> {
    token.parse::<f64>().ok()
}
