use crate::error::Result;
use crate::spreadsheet::bounds::Bounds;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::store::CellStore;
use std::cell::Cell as ScanCounter;
use std::cell::OnceCell;

/// A named table of cells with a memoized bounds cache.
#[derive(Debug)]
pub struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// All stored cells
    pub(crate) store: CellStore,
    /// Bounds of the current store state, computed on first use
    bounds: OnceCell<Bounds>,
    /// Number of full store scans performed for bounds
    scans: ScanCounter<usize>,
}

impl Sheet {
    pub fn new(name: &str, store: CellStore) -> Self {
        Self {
            name: name.to_owned(),
            store,
            bounds: OnceCell::new(),
            scans: ScanCounter::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &CellStore {
        &self.store
    }

    /// Returns the bounds, scanning the store only when the cache is empty.
    pub fn bounds(&self) -> Bounds {
        *self.bounds.get_or_init(|| {
            self.scans.set(self.scans.get() + 1);
            let bounds = Bounds::scan(&self.store);
            log::trace!("Scanned bounds of sheet '{}': {:?}", self.name, bounds);
            bounds
        })
    }

    /// Marks the bounds as unknown; the next query rescans.
    pub(crate) fn reset_bounds(&mut self) {
        self.bounds.take();
    }

    #[cfg(test)]
    pub(crate) fn scan_count(&self) -> usize {
        self.scans.get()
    }

    pub fn first_row(&self) -> Option<usize> {
        self.bounds().first_row
    }

    pub fn last_row(&self) -> Option<usize> {
        self.bounds().last_row
    }

    pub fn first_column(&self) -> Option<usize> {
        self.bounds().first_col
    }

    pub fn last_column(&self) -> Option<usize> {
        self.bounds().last_col
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.store.get(row, col)
    }

    pub fn cell_type(&self, row: usize, col: usize) -> Option<CellType> {
        self.store.cell_type(row, col)
    }

    pub fn is_empty(&self, row: usize, col: usize) -> bool {
        self.store.is_empty(row, col)
    }

    /// Stores a value in memory only and invalidates the bounds.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<CellValue>) -> Result<()> {
        self.store.set(row, col, value)?;
        self.reset_bounds();
        Ok(())
    }

    /// Removes a cell and invalidates the bounds.
    pub fn clear(&mut self, row: usize, col: usize) -> Option<CellValue> {
        let removed = self.store.remove(row, col);
        if removed.is_some() {
            self.reset_bounds();
        }
        removed
    }

    /// Values of a row across `first_column..=last_column`; missing cells are `None`.
    pub fn row(&self, row: usize) -> Vec<Option<CellValue>> {
        let bounds = self.bounds();
        match bounds.first_col.zip(bounds.last_col) {
            Some((first_col, last_col)) => (first_col..=last_col)
                .map(|col| self.cell(row, col).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Values of a column across `first_row..=last_row`; missing cells are `None`.
    pub fn column(&self, col: usize) -> Vec<Option<CellValue>> {
        let bounds = self.bounds();
        match bounds.first_row.zip(bounds.last_row) {
            Some((first_row, last_row)) => (first_row..=last_row)
                .map(|row| self.cell(row, col).cloned())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Strips non-ASCII and control characters plus surrounding whitespace from every string cell.
    pub(crate) fn clean(&mut self) {
        for value in self.store.values_mut() {
            if let CellValue::String(text) = value {
                *text = sanitize_value(text);
            }
        }
        self.reset_bounds();
    }
}

fn sanitize_value(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|character| character.is_ascii() && !character.is_ascii_control())
        .collect();
    kept.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(cells: &[(usize, usize, &str)]) -> Sheet {
        let store = cells
            .iter()
            .map(|(row, col, value)| ((*row, *col), CellValue::from(*value)))
            .collect();
        Sheet::new("Sheet1", store)
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("", CellStore::new());
        assert_eq!(sheet.first_row(), None);
        assert_eq!(sheet.last_row(), None);
        assert_eq!(sheet.first_column(), None);
        assert_eq!(sheet.last_column(), None);
        assert!(sheet.row(1).is_empty());
    }

    #[test]
    fn bounds_are_memoized() {
        let sheet = sheet(&[(3, 2, "a"), (7, 5, "b")]);
        let first = sheet.bounds();
        let second = sheet.bounds();
        assert_eq!(first, second);
        assert_eq!(sheet.scan_count(), 1);
        assert_eq!(first.first_row, Some(3));
        assert_eq!(first.last_col, Some(5));
    }

    #[test]
    fn set_invalidates_bounds() {
        let mut sheet = sheet(&[(1, 1, "a")]);
        assert_eq!(sheet.last_row(), Some(1));
        sheet.set(4, 6, 2.0).unwrap();
        assert_eq!(sheet.last_row(), Some(4));
        assert_eq!(sheet.last_column(), Some(6));
        assert_eq!(sheet.scan_count(), 2);
        sheet.clear(4, 6);
        assert_eq!(sheet.last_row(), Some(1));
    }

    #[test]
    fn row_and_column_fill_gaps() {
        let sheet = sheet(&[(1, 1, "a"), (1, 3, "c"), (3, 2, "x")]);
        assert_eq!(sheet.row(1), vec![Some(CellValue::from("a")), None, Some(CellValue::from("c"))]);
        assert_eq!(sheet.column(2), vec![None, None, Some(CellValue::from("x"))]);
    }

    #[test]
    fn clean_strips_odd_characters() {
        let mut sheet = sheet(&[(1, 1, "  Pr\u{e9}ice\u{7}  "), (1, 2, "\u{a0}\u{2603}"), (2, 1, "ok")]);
        sheet.set(2, 2, 3.5).unwrap();
        assert_eq!(sheet.last_column(), Some(2));
        sheet.clean();
        assert_eq!(sheet.cell(1, 1), Some(&CellValue::from("Price")));
        assert_eq!(sheet.cell(1, 2), Some(&CellValue::from("")));
        assert_eq!(sheet.cell(2, 2), Some(&CellValue::Float(3.5)));
        sheet.clean();
        assert_eq!(sheet.cell(1, 1), Some(&CellValue::from("Price")));
    }
}
