use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use std::collections::HashMap;

/// Sparse mapping from 1-based `(row, column)` to a typed cell value.
/// Absent cells have no entry; memory grows with the number of stored cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CellStore {
    cells: HashMap<(usize, usize), CellValue>,
}

impl CellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn cell_type(&self, row: usize, col: usize) -> Option<CellType> {
        self.get(row, col).map(CellValue::cell_type)
    }

    /// Stores a value, replacing any previous entry.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) -> Result<()> {
        if row == 0 || col == 0 {
            Err(WorkbookError::InvalidCoordinateError { row, col })?
        }
        self.cells.insert((row, col), value.into());
        Ok(())
    }

    /// Removes an entry, returning its value.
    pub fn remove(&mut self, row: usize, col: usize) -> Option<CellValue> {
        self.cells.remove(&(row, col))
    }

    /// True if the cell is absent or holds a blank string.
    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.get(row, col).map(CellValue::is_blank).unwrap_or(true)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Iterates over entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &CellValue)> + '_ {
        self.cells.iter().map(|(key, value)| (*key, value))
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut CellValue> + '_ {
        self.cells.values_mut()
    }
}

impl FromIterator<((usize, usize), CellValue)> for CellStore {
    /// Collects entries, skipping any with a zero coordinate.
    fn from_iter<T: IntoIterator<Item = ((usize, usize), CellValue)>>(iter: T) -> Self {
        let cells = iter
            .into_iter()
            .filter(|((row, col), _)| *row > 0 && *col > 0)
            .collect();
        Self { cells }
    }
}
