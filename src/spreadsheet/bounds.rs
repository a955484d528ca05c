use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::reference::letter_to_number;
use crate::spreadsheet::store::CellStore;
use regex::Regex;
use std::sync::LazyLock;

static REGION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern"));

/// Minimal rectangle containing every non-empty cell of a sheet (1-based, inclusive).
/// All four bounds are `None` exactly when the sheet has no non-empty cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Bounds {
    pub first_row: Option<usize>,
    pub last_row: Option<usize>,
    pub first_col: Option<usize>,
    pub last_col: Option<usize>,
}

impl Bounds {
    /// Computes the bounds of all non-empty entries in a single pass.
    pub fn scan(store: &CellStore) -> Self {
        let mut extent: Option<(usize, usize, usize, usize)> = None;
        for ((row, col), value) in store.iter() {
            if value.is_blank() {
                continue;
            }
            extent = Some(match extent {
                None => (row, row, col, col),
                Some((first_row, last_row, first_col, last_col)) => (
                    first_row.min(row),
                    last_row.max(row),
                    first_col.min(col),
                    last_col.max(col),
                ),
            });
        }
        match extent {
            Some((first_row, last_row, first_col, last_col)) => Bounds {
                first_row: Some(first_row),
                last_row: Some(last_row),
                first_col: Some(first_col),
                last_col: Some(last_col),
            },
            None => Bounds::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_row.is_none()
    }
}

/// A rectangular area of a sheet with optional boundaries (1-based, inclusive).
/// Missing boundaries fall back to the sheet bounds.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub from_row: Option<usize>,
    pub from_col: Option<usize>,
    pub to_row: Option<usize>,
    pub to_col: Option<usize>,
}

impl Region {
    /// Resolves against the sheet bounds into `(from_row, from_col, to_row, to_col)`.
    /// Returns `None` for an empty sheet.
    pub(crate) fn resolve(&self, bounds: &Bounds) -> Option<(usize, usize, usize, usize)> {
        let first_row = bounds.first_row?;
        let first_col = bounds.first_col?;
        let last_row = bounds.last_row?;
        let last_col = bounds.last_col?;
        Some((
            self.from_row.unwrap_or(first_row),
            self.from_col.unwrap_or(first_col),
            self.to_row.unwrap_or(last_row),
            self.to_col.unwrap_or(last_col),
        ))
    }
}

impl TryFrom<&str> for Region {
    type Error = WorkbookError;

    /// Parses an Excel-style range string (e.g., "A1", "B2:C5", "A:C", "1:10").
    fn try_from(value: &str) -> Result<Self> {
        let value = value.to_ascii_uppercase();
        let captures = REGION_PATTERN
            .captures(value.as_str())
            .ok_or_else(|| WorkbookError::MalformedReferenceError(value.to_owned()))?;
        let col = |index: usize| -> Result<Option<usize>> {
            match captures.get(index).map(|matcher| matcher.as_str()) {
                Some(letters) if !letters.is_empty() => Ok(Some(letter_to_number(letters)?)),
                _ => Ok(None),
            }
        };
        let row = |index: usize| -> Result<Option<usize>> {
            match captures.get(index).map(|matcher| matcher.as_str()) {
                Some(digits) if !digits.is_empty() => match digits.parse::<usize>()? {
                    0 => Err(WorkbookError::MalformedReferenceError(value.to_owned())),
                    row => Ok(Some(row)),
                },
                _ => Ok(None),
            }
        };
        Ok(Region {
            from_col: col(1)?,
            from_row: row(2)?,
            to_col: col(4)?,
            to_row: row(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellValue;

    #[test]
    fn bounds_of_sparse_sheet() {
        let mut store = CellStore::new();
        store.set(3, 2, "a").unwrap();
        store.set(7, 5, 1.0).unwrap();
        assert_eq!(
            Bounds::scan(&store),
            Bounds { first_row: Some(3), last_row: Some(7), first_col: Some(2), last_col: Some(5) }
        );
    }

    #[test]
    fn bounds_of_empty_sheet() {
        let bounds = Bounds::scan(&CellStore::new());
        assert!(bounds.is_empty());
        assert_eq!(bounds, Bounds { first_row: None, last_row: None, first_col: None, last_col: None });
    }

    #[test]
    fn bounds_ignore_blank_strings() {
        let mut store = CellStore::new();
        store.set(1, 1, "").unwrap();
        store.set(4, 4, CellValue::Boolean(false)).unwrap();
        store.set(9, 9, "").unwrap();
        assert_eq!(
            Bounds::scan(&store),
            Bounds { first_row: Some(4), last_row: Some(4), first_col: Some(4), last_col: Some(4) }
        );
    }

    #[test]
    fn region_parsing() {
        assert_eq!(
            Region::try_from("B2:c5").unwrap(),
            Region { from_row: Some(2), from_col: Some(2), to_row: Some(5), to_col: Some(3) }
        );
        assert_eq!(
            Region::try_from("2:10").unwrap(),
            Region { from_row: Some(2), from_col: None, to_row: Some(10), to_col: None }
        );
        assert_eq!(
            Region::try_from("A:C").unwrap(),
            Region { from_row: None, from_col: Some(1), to_row: None, to_col: Some(3) }
        );
        assert!(Region::try_from("A1:B2:C3").is_err());
        assert!(Region::try_from("A0").is_err());
    }

    #[test]
    fn region_resolution() {
        let bounds = Bounds { first_row: Some(2), last_row: Some(8), first_col: Some(1), last_col: Some(4) };
        let region = Region { from_row: Some(3), ..Region::default() };
        assert_eq!(region.resolve(&bounds), Some((3, 1, 8, 4)));
        assert_eq!(region.resolve(&Bounds::default()), None);
    }
}
