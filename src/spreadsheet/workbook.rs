use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::header::HeaderMap;
use crate::spreadsheet::loader::Loader;
use crate::spreadsheet::loader::Source;
use crate::spreadsheet::options::OpenOptions;
use crate::spreadsheet::reference::is_coordinate;
use crate::spreadsheet::reference::letter_to_number;
use crate::spreadsheet::reference::number_to_letter;
use crate::spreadsheet::reference::split_coordinate;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxLoader;
use anyhow::Context;
use std::collections::HashSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

static NEXT_WORKBOOK_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a sheet of one particular workbook.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetHandle {
    workbook: u64,
    name: String,
}

impl SheetHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Ways of naming a sheet.
#[derive(Copy, Clone, Debug)]
pub enum SheetRef<'a> {
    /// The workbook's current sheet
    Current,
    /// 1-based position in source order
    Index(usize),
    /// Sheet name
    Name(&'a str),
    /// Handle issued by [`Workbook::handle`]
    Handle(&'a SheetHandle),
}

impl From<usize> for SheetRef<'_> {
    fn from(index: usize) -> Self {
        SheetRef::Index(index)
    }
}

impl<'a> From<&'a str> for SheetRef<'a> {
    fn from(name: &'a str) -> Self {
        SheetRef::Name(name)
    }
}

impl<'a> From<&'a String> for SheetRef<'a> {
    fn from(name: &'a String) -> Self {
        SheetRef::Name(name)
    }
}

impl<'a> From<&'a SheetHandle> for SheetRef<'a> {
    fn from(handle: &'a SheetHandle) -> Self {
        SheetRef::Handle(handle)
    }
}

/// An opened spreadsheet: ordered sheets, a current-sheet selector and the loader
/// that populated them.
pub struct Workbook<L: Loader = XlsxLoader> {
    id: u64,
    source: Source,
    options: OpenOptions,
    loader: L,
    pub(crate) sheets: Vec<Sheet>,
    current: usize,
    pub(crate) header_line: usize,
    pub(crate) headers: Option<HeaderMap>,
    pub(crate) cleaned: HashSet<String>,
}

impl Workbook<XlsxLoader> {
    /// Opens an Excel 2007+ workbook (.xlsx, .xlsm).
    pub fn open(source: impl Into<Source>, options: OpenOptions) -> Result<Self> {
        Self::open_with(XlsxLoader::new(), source, options)
    }
}

impl<L: Loader> Workbook<L> {
    /// Opens a workbook with the given loader.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The source extension does not match the loader and the file warning level is `Error`
    /// - The loader fails to decode the source
    /// - The source contains no sheets
    pub fn open_with(mut loader: L, source: impl Into<Source>, options: OpenOptions) -> Result<Self> {
        let source = source.into();
        options.check_file_type(&source, loader.extensions(), loader.format_name())?;
        let sheets = load_sheets(&mut loader, &source)?;
        Ok(Self {
            id: NEXT_WORKBOOK_ID.fetch_add(1, Ordering::Relaxed),
            header_line: options.header_line.max(1),
            source,
            options,
            loader,
            sheets,
            current: 0,
            headers: None,
            cleaned: HashSet::new(),
        })
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn loader_mut(&mut self) -> &mut L {
        &mut self.loader
    }

    /// Sheet names in source order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    /// Sheets in source order.
    pub fn sheets(&self) -> impl Iterator<Item = &Sheet> + '_ {
        self.sheets.iter()
    }

    /// Resolves a sheet reference to its position in `sheets`.
    pub(crate) fn resolve_index<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<usize> {
        match sheet.into() {
            SheetRef::Current if self.sheets.is_empty() => {
                Err(WorkbookError::EmptyWorkbookError(self.source.name()))
            }
            SheetRef::Current => Ok(self.current),
            SheetRef::Index(index) if index >= 1 && index <= self.sheets.len() => Ok(index - 1),
            SheetRef::Index(index) => Err(WorkbookError::RangeError(index)),
            SheetRef::Name(name) => self
                .position(name)
                .ok_or_else(|| WorkbookError::NotFoundError(name.to_owned())),
            SheetRef::Handle(handle) => match self.position(&handle.name) {
                Some(index) if handle.workbook == self.id => Ok(index),
                _ => Err(WorkbookError::InvalidSheetError(handle.name.to_owned())),
            },
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|sheet| sheet.name == name)
    }

    /// Resolves a sheet reference.
    pub fn sheet<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<&Sheet> {
        let index = self.resolve_index(sheet)?;
        Ok(&self.sheets[index])
    }

    pub(crate) fn sheet_mut<'s>(&mut self, sheet: impl Into<SheetRef<'s>>) -> Result<&mut Sheet> {
        let index = self.resolve_index(sheet)?;
        Ok(&mut self.sheets[index])
    }

    /// Returns a handle that later resolves only against this workbook.
    pub fn handle<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<SheetHandle> {
        let sheet = self.sheet(sheet)?;
        Ok(SheetHandle {
            workbook: self.id,
            name: sheet.name.to_owned(),
        })
    }

    pub fn current_sheet(&self) -> Result<&Sheet> {
        self.sheet(SheetRef::Current)
    }

    /// Selects the current sheet and marks its bounds as unknown.
    pub fn set_current_sheet<'s>(&mut self, sheet: impl Into<SheetRef<'s>>) -> Result<()> {
        let index = self.resolve_index(sheet)?;
        self.current = index;
        self.sheets[index].reset_bounds();
        Ok(())
    }

    pub fn header_line(&self) -> usize {
        self.header_line
    }

    pub fn set_header_line(&mut self, header_line: usize) {
        self.header_line = header_line.max(1);
    }

    /// Header map resolved by the last structured iteration, if any.
    pub fn headers(&self) -> Option<&HeaderMap> {
        self.headers.as_ref()
    }

    pub fn first_row<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<Option<usize>> {
        Ok(self.sheet(sheet)?.first_row())
    }

    pub fn last_row<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<Option<usize>> {
        Ok(self.sheet(sheet)?.last_row())
    }

    pub fn first_column<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<Option<usize>> {
        Ok(self.sheet(sheet)?.first_column())
    }

    pub fn last_column<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<Option<usize>> {
        Ok(self.sheet(sheet)?.last_column())
    }

    /// First non-empty column as letters; empty for an empty sheet.
    pub fn first_column_as_letter<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<String> {
        Ok(number_to_letter(self.first_column(sheet)?.unwrap_or(0)))
    }

    /// Last non-empty column as letters; empty for an empty sheet.
    pub fn last_column_as_letter<'s>(&self, sheet: impl Into<SheetRef<'s>>) -> Result<String> {
        Ok(number_to_letter(self.last_column(sheet)?.unwrap_or(0)))
    }

    pub fn row<'s>(&self, row: usize, sheet: impl Into<SheetRef<'s>>) -> Result<Vec<Option<CellValue>>> {
        Ok(self.sheet(sheet)?.row(row))
    }

    pub fn column<'s>(&self, col: usize, sheet: impl Into<SheetRef<'s>>) -> Result<Vec<Option<CellValue>>> {
        Ok(self.sheet(sheet)?.column(col))
    }

    pub fn cell<'s>(&self, row: usize, col: usize, sheet: impl Into<SheetRef<'s>>) -> Result<Option<&CellValue>> {
        Ok(self.sheet(sheet)?.cell(row, col))
    }

    pub fn cell_type<'s>(&self, row: usize, col: usize, sheet: impl Into<SheetRef<'s>>) -> Result<Option<CellType>> {
        Ok(self.sheet(sheet)?.cell_type(row, col))
    }

    pub fn is_empty<'s>(&self, row: usize, col: usize, sheet: impl Into<SheetRef<'s>>) -> Result<bool> {
        Ok(self.sheet(sheet)?.is_empty(row, col))
    }

    /// Sets a cell in memory; the source file is never modified.
    pub fn set_cell<'s>(
        &mut self,
        row: usize,
        col: usize,
        value: impl Into<CellValue>,
        sheet: impl Into<SheetRef<'s>>,
    ) -> Result<()> {
        self.sheet_mut(sheet)?.set(row, col, value)
    }

    /// Removes a cell in memory, returning its previous value.
    pub fn clear_cell<'s>(&mut self, row: usize, col: usize, sheet: impl Into<SheetRef<'s>>) -> Result<Option<CellValue>> {
        Ok(self.sheet_mut(sheet)?.clear(row, col))
    }

    /// Reads a cell by an "A1"-style reference.
    pub fn cell_at<'s>(&self, reference: &str, sheet: impl Into<SheetRef<'s>>) -> Result<Option<&CellValue>> {
        let (row, col) = split_coordinate(reference)?;
        self.cell(row, col, sheet)
    }

    /// Reads a cell by row number and column letters, as in `cell_by_letter(1, "A", ..)`.
    pub fn cell_by_letter<'s>(&self, row: usize, column: &str, sheet: impl Into<SheetRef<'s>>) -> Result<Option<&CellValue>> {
        self.cell(row, letter_to_number(column)?, sheet)
    }

    /// Dispatches a symbolic address such as `"aa42"` to [`Workbook::cell`].
    ///
    /// # Errors
    ///
    /// Returns `UnknownOperationError` if the token is not `<letters><digits>`.
    pub fn address<'s>(&self, token: &str, sheet: impl Into<SheetRef<'s>>) -> Result<Option<&CellValue>> {
        if !is_coordinate(token) {
            Err(WorkbookError::UnknownOperationError(token.to_owned()))?
        }
        self.cell_at(token, sheet)
    }

    /// Discards all in-memory state, reloads the source and restores the current sheet by name.
    ///
    /// A failed reload leaves the workbook without sheets.
    pub fn reload(&mut self) -> Result<()> {
        let current = self.sheets.get(self.current).map(|sheet| sheet.name.to_owned());
        self.sheets.clear();
        self.cleaned.clear();
        self.headers = None;
        self.current = 0;
        self.header_line = self.options.header_line.max(1);
        self.sheets = load_sheets(&mut self.loader, &self.source)?;
        log::debug!("Reloaded '{}'", self.source.name());
        if let Some(name) = current {
            self.set_current_sheet(name.as_str())?;
        }
        Ok(())
    }
}

fn load_sheets<L: Loader>(loader: &mut L, source: &Source) -> Result<Vec<Sheet>> {
    let loaded = loader
        .load(source)
        .with_context(|| format!("Failed to load '{}'", source.name()))?;
    if loaded.is_empty() {
        Err(WorkbookError::EmptyWorkbookError(source.name()))?
    }
    log::debug!("Loaded {} sheet(s) from '{}'", loaded.len(), source.name());
    Ok(loaded
        .into_iter()
        .map(|loaded| Sheet::new(&loaded.name, loaded.store))
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spreadsheet::loader::LoadedSheet;
    use crate::spreadsheet::loader::MemoryLoader;
    use crate::spreadsheet::store::CellStore;

    pub(crate) fn store(cells: &[(usize, usize, CellValue)]) -> CellStore {
        cells.iter().map(|(row, col, value)| ((*row, *col), value.clone())).collect()
    }

    pub(crate) fn workbook(sheets: Vec<(&str, CellStore)>) -> Workbook<MemoryLoader> {
        let sheets = sheets
            .into_iter()
            .map(|(name, store)| LoadedSheet::new(name, store))
            .collect();
        Workbook::open_with(MemoryLoader::new(sheets), "memory", OpenOptions::default()).unwrap()
    }

    fn sample() -> Workbook<MemoryLoader> {
        workbook(vec![
            ("Names", store(&[(1, 1, "Name".into()), (1, 2, "Age".into()), (2, 1, "Al".into()), (2, 2, 30.0.into())])),
            ("Empty", CellStore::new()),
            ("Sparse", store(&[(3, 2, "x".into()), (7, 5, "y".into())])),
        ])
    }

    #[test]
    fn resolve_sheets() {
        let workbook = sample();
        assert_eq!(workbook.sheet_names(), vec!["Names", "Empty", "Sparse"]);
        assert_eq!(workbook.sheet(SheetRef::Current).unwrap().name(), "Names");
        assert_eq!(workbook.sheet(SheetRef::Index(3)).unwrap().name(), "Sparse");
        assert_eq!(workbook.sheet("Empty").unwrap().name(), "Empty");
        assert!(matches!(workbook.sheet(SheetRef::Index(0)), Err(WorkbookError::RangeError(0))));
        assert!(matches!(workbook.sheet(SheetRef::Index(4)), Err(WorkbookError::RangeError(4))));
        assert!(matches!(workbook.sheet("Missing"), Err(WorkbookError::NotFoundError(_))));
    }

    #[test]
    fn handles_belong_to_their_workbook() {
        let first = sample();
        let second = sample();
        let handle = first.handle("Sparse").unwrap();
        assert_eq!(handle.name(), "Sparse");
        assert_eq!(first.sheet(&handle).unwrap().name(), "Sparse");
        assert!(matches!(second.sheet(&handle), Err(WorkbookError::InvalidSheetError(_))));
    }

    #[test]
    fn current_sheet_selection() {
        let mut workbook = sample();
        workbook.set_current_sheet("Sparse").unwrap();
        assert_eq!(workbook.current_sheet().unwrap().name(), "Sparse");
        assert_eq!(workbook.first_row(SheetRef::Current).unwrap(), Some(3));
        assert_eq!(workbook.first_column_as_letter(SheetRef::Current).unwrap(), "B");
        assert_eq!(workbook.last_column_as_letter(SheetRef::Current).unwrap(), "E");
        workbook.set_current_sheet(SheetRef::Index(2)).unwrap();
        assert_eq!(workbook.last_row(SheetRef::Current).unwrap(), None);
        assert_eq!(workbook.first_column_as_letter(SheetRef::Current).unwrap(), "");
        assert!(workbook.set_current_sheet(SheetRef::Index(9)).is_err());
        assert_eq!(workbook.current_sheet().unwrap().name(), "Empty");
    }

    #[test]
    fn selecting_resets_bounds_cache() {
        let mut workbook = sample();
        assert_eq!(workbook.last_row("Sparse").unwrap(), Some(7));
        assert_eq!(workbook.last_row("Sparse").unwrap(), Some(7));
        assert_eq!(workbook.sheet("Sparse").unwrap().scan_count(), 1);
        workbook.set_current_sheet("Sparse").unwrap();
        assert_eq!(workbook.last_row("Sparse").unwrap(), Some(7));
        assert_eq!(workbook.sheet("Sparse").unwrap().scan_count(), 2);
    }

    #[test]
    fn addressing() {
        let mut workbook = sample();
        assert_eq!(workbook.cell(2, 1, SheetRef::Current).unwrap(), Some(&CellValue::from("Al")));
        assert_eq!(workbook.cell_type(2, 2, "Names").unwrap(), Some(CellType::Float));
        assert_eq!(workbook.cell_at("B2", SheetRef::Current).unwrap(), Some(&CellValue::Float(30.0)));
        assert!(workbook.is_empty(5, 5, SheetRef::Current).unwrap());
        workbook.set_cell(5, 5, true, SheetRef::Current).unwrap();
        assert!(!workbook.is_empty(5, 5, SheetRef::Current).unwrap());
        assert_eq!(workbook.last_row(SheetRef::Current).unwrap(), Some(5));
        assert_eq!(workbook.clear_cell(5, 5, SheetRef::Current).unwrap(), Some(CellValue::Boolean(true)));
        assert_eq!(workbook.last_row(SheetRef::Current).unwrap(), Some(2));
        assert!(workbook.set_cell(0, 1, "x", SheetRef::Current).is_err());
    }

    #[test]
    fn rows_and_columns() {
        let workbook = sample();
        assert_eq!(
            workbook.row(3, "Sparse").unwrap(),
            vec![Some(CellValue::from("x")), None, None, None]
        );
        assert_eq!(workbook.column(5, "Sparse").unwrap().len(), 5);
        assert!(workbook.row(1, "Empty").unwrap().is_empty());
    }

    #[test]
    fn dynamic_address_dispatch() {
        let workbook = sample();
        assert_eq!(workbook.address("a2", SheetRef::Current).unwrap(), Some(&CellValue::from("Al")));
        assert_eq!(workbook.address("E7", "Sparse").unwrap(), Some(&CellValue::from("y")));
        assert_eq!(workbook.address("zz999", SheetRef::Current).unwrap(), None);
        for token in ["first_row", "2a", "a", "a2b"] {
            assert!(matches!(
                workbook.address(token, SheetRef::Current),
                Err(WorkbookError::UnknownOperationError(_))
            ));
        }
    }

    #[test]
    fn overlong_address_is_malformed() {
        let workbook = sample();
        assert!(matches!(
            workbook.address("zzzzzzzzzzzzzzz1", SheetRef::Current),
            Err(WorkbookError::MalformedReferenceError(_))
        ));
        assert!(workbook.cell_at("ZZZZZZZZZZZZZZZ1", SheetRef::Current).is_err());
    }

    #[test]
    fn letter_columns() {
        let workbook = sample();
        assert_eq!(workbook.cell_by_letter(2, "b", SheetRef::Current).unwrap(), Some(&CellValue::Float(30.0)));
        assert_eq!(workbook.cell_by_letter(7, "E", "Sparse").unwrap(), Some(&CellValue::from("y")));
        assert!(matches!(
            workbook.cell_by_letter(1, "A1", SheetRef::Current),
            Err(WorkbookError::InvalidColumnError(_))
        ));
    }

    #[test]
    fn header_line_never_drops_below_one() {
        let sheets = vec![LoadedSheet::new("Names", store(&[(1, 1, "Name".into())]))];
        let options = OpenOptions { header_line: 0, ..OpenOptions::default() };
        let mut workbook = Workbook::open_with(MemoryLoader::new(sheets), "memory", options).unwrap();
        assert_eq!(workbook.header_line(), 1);
        workbook.set_header_line(4);
        workbook.reload().unwrap();
        assert_eq!(workbook.header_line(), 1);
    }

    #[test]
    fn reload_discards_edits_and_keeps_current_sheet() {
        let mut workbook = sample();
        workbook.set_current_sheet("Sparse").unwrap();
        workbook.set_cell(1, 1, "edit", SheetRef::Current).unwrap();
        workbook.reload().unwrap();
        assert_eq!(workbook.loader().loads(), 2);
        assert_eq!(workbook.current_sheet().unwrap().name(), "Sparse");
        assert_eq!(workbook.cell(1, 1, SheetRef::Current).unwrap(), None);
    }

    #[test]
    fn reload_fails_when_current_sheet_vanishes() {
        let mut workbook = sample();
        workbook.set_current_sheet("Sparse").unwrap();
        workbook
            .loader_mut()
            .replace(vec![LoadedSheet::new("Names", CellStore::new())]);
        assert!(matches!(workbook.reload(), Err(WorkbookError::NotFoundError(name)) if name == "Sparse"));
    }

    #[test]
    fn empty_workbook_is_rejected() {
        let result = Workbook::open_with(MemoryLoader::default(), "memory", OpenOptions::default());
        assert!(matches!(result, Err(WorkbookError::EmptyWorkbookError(_))));
    }
}
