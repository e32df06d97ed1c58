//! Answer extraction from free-form response text
//!
//! A response is reduced to one integer by locating a maximal run of
//! decimal digits. [`ScanDirection::Forward`] takes the first run,
//! [`ScanDirection::Backward`] the last one; either way the run is read left
//! to right, so "scored 12" yields 12 in both modes. ASCII and full-width
//! digits are accepted.

use serde::{Deserialize, Serialize};

use crate::survey::types::{LIKERT_MAX, LIKERT_MIN};

/// Which digit run to take when a response contains several
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanDirection {
    /// First run in the text
    Forward,
    /// Last run in the text; suits reasoning models that conclude with the answer
    #[default]
    Backward,
}

/// Reasons a response does not yield a valid answer
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnswerError {
    #[error("no integer found in response")]
    NoInteger,

    #[error("integer {value} outside {min}..={max}")]
    OutOfRange { value: String, min: u8, max: u8 },
}

fn digit_value(c: char) -> Option<u32> {
    match c {
        '0'..='9' => c.to_digit(10),
        '\u{FF10}'..='\u{FF19}' => Some(c as u32 - 0xFF10),
        _ => None,
    }
}

/// Locate the selected digit run and return its normalized ASCII digits
pub fn find_integer(text: &str, direction: ScanDirection) -> Option<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        match digit_value(c).and_then(|d| char::from_digit(d, 10)) {
            Some(digit) => current.push(digit),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    match direction {
        ScanDirection::Forward => runs.into_iter().next(),
        ScanDirection::Backward => runs.pop(),
    }
}

/// Extract a Likert answer from response text
///
/// # Errors
///
/// [`AnswerError::NoInteger`] when the text has no digits,
/// [`AnswerError::OutOfRange`] when the selected integer is not in `1..=6`.
pub fn extract_answer(text: &str, direction: ScanDirection) -> Result<u8, AnswerError> {
    let digits = find_integer(text, direction).ok_or(AnswerError::NoInteger)?;

    let out_of_range = || AnswerError::OutOfRange {
        value: digits.clone(),
        min: LIKERT_MIN,
        max: LIKERT_MAX,
    };

    let value: u8 = digits.parse().map_err(|_| out_of_range())?;
    if (LIKERT_MIN..=LIKERT_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(out_of_range())
    }
}
