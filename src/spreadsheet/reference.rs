//! Spreadsheet coordinate conversions.
//! Column letters use bijective base-26 ("A" = 1, "Z" = 26, "AA" = 27); rows are 1-based.

use crate::error::Result;
use crate::error::WorkbookError;
use regex::Regex;
use std::sync::LazyLock;

static COORDINATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)([0-9]+)$").expect("Hardcode regex pattern"));

/// Converts column letters to a 1-based column number, ignoring case.
pub fn letter_to_number(letters: &str) -> Result<usize> {
    if letters.is_empty() {
        Err(WorkbookError::InvalidColumnError(String::new()))?
    }
    let mut number = 0usize;
    for character in letters.chars() {
        let digit = match character.to_ascii_uppercase() {
            upper @ 'A'..='Z' => upper as usize - 'A' as usize + 1,
            _ => Err(WorkbookError::InvalidColumnError(character.to_string()))?,
        };
        number = number
            .checked_mul(26)
            .and_then(|number| number.checked_add(digit))
            .ok_or_else(|| WorkbookError::InvalidColumnError(letters.to_owned()))?;
    }
    Ok(number)
}

/// Converts a 1-based column number to upper-case column letters.
/// Zero yields an empty string.
pub fn number_to_letter(mut number: usize) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        number -= 1;
        letters.push((b'A' + (number % 26) as u8) as char);
        number /= 26;
    }
    letters.iter().rev().collect()
}

/// Splits a reference such as "AA12" into `(row, column)`.
pub fn split_coordinate(reference: &str) -> Result<(usize, usize)> {
    let malformed = || WorkbookError::MalformedReferenceError(reference.to_owned());
    let captures = COORDINATE_PATTERN.captures(reference).ok_or_else(malformed)?;
    let row = captures[2].parse::<usize>().map_err(|_| malformed())?;
    if row == 0 {
        Err(malformed())?
    }
    let col = letter_to_number(&captures[1]).map_err(|_| malformed())?;
    Ok((row, col))
}

/// Returns true if the token has the `<letters><digits>` shape of a cell reference.
pub(crate) fn is_coordinate(token: &str) -> bool {
    COORDINATE_PATTERN.is_match(token)
}

/// Renders a 1-based `(row, column)` pair as an "A1"-style reference.
pub fn to_reference(row: usize, col: usize) -> String {
    format!("{}{}", number_to_letter(col), row)
}
