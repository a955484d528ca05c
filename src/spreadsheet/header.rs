//! # Header Resolution
//!
//! Locates the header line of the current sheet by wildcard search and turns rows
//! into label → value records.
//!
//! A search query such as `"UPC*SKU"` is one term with two alternatives; each
//! alternative is a case-insensitive regular expression matched against the text
//! cells of a row. A row qualifies when every term matches, and within a term the
//! first alternative that matches wins even if a later one would match too.
use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::loader::Loader;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::workbook::SheetRef;
use crate::spreadsheet::workbook::Workbook;
use either::Either;
use regex::Regex;
use regex::RegexBuilder;

/// Rows scanned before a header search gives up.
const MAX_HEADER_SCAN: usize = 100;

/// How a label finds its column.
#[derive(Clone, Debug, PartialEq)]
pub enum HeaderQuery {
    /// Wildcard search query matched against the header row
    Pattern(String),
    /// Literal 1-based column, used as is
    Column(usize),
}

impl From<&str> for HeaderQuery {
    fn from(query: &str) -> Self {
        Self::Pattern(query.to_owned())
    }
}

impl From<usize> for HeaderQuery {
    fn from(col: usize) -> Self {
        Self::Column(col)
    }
}

/// Header handling for [`Workbook::each`].
#[derive(Clone, Debug, Default)]
pub enum HeaderMode {
    /// Yield plain rows
    #[default]
    None,
    /// Labels are the contents of the first non-empty row
    FirstRow,
    /// Search for the header line; labels are the header line's contents
    Search(Vec<String>),
    /// Explicit label → query assignments
    Map(Vec<(String, HeaderQuery)>),
}

/// Options for structured iteration.
#[derive(Clone, Debug, Default)]
pub struct EachOptions {
    pub headers: HeaderMode,
    /// Strip odd characters and surrounding whitespace from string cells first (once per sheet)
    pub clean: bool,
}

impl EachOptions {
    pub fn first_row() -> Self {
        Self { headers: HeaderMode::FirstRow, clean: false }
    }

    pub fn search<S: AsRef<str>>(terms: &[S]) -> Self {
        let terms = terms.iter().map(|term| term.as_ref().to_owned()).collect();
        Self { headers: HeaderMode::Search(terms), clean: false }
    }

    pub fn map<S: AsRef<str>, Q: Into<HeaderQuery> + Clone>(assignments: &[(S, Q)]) -> Self {
        let assignments = assignments
            .iter()
            .map(|(label, query)| (label.as_ref().to_owned(), query.clone().into()))
            .collect();
        Self { headers: HeaderMode::Map(assignments), clean: false }
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }
}

/// Ordered label → column mapping. Re-inserting a label keeps its position and
/// replaces the column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderMap {
    entries: Vec<(String, usize)>,
}

impl HeaderMap {
    pub fn insert(&mut self, label: &str, col: usize) {
        match self.entries.iter_mut().find(|(existing, _)| existing == label) {
            Some(entry) => entry.1 = col,
            None => self.entries.push((label.to_owned(), col)),
        }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, col)| *col)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.entries.iter().map(|(label, col)| (label.as_str(), *col))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels from the non-empty cells of a row over the sheet's columns.
    fn from_row(sheet: &Sheet, row: usize) -> Self {
        let mut headers = HeaderMap::default();
        if let Some(first_col) = sheet.first_column() {
            for (offset, value) in sheet.row(row).iter().enumerate() {
                if let Some(value) = value.as_ref().filter(|value| !value.is_blank()) {
                    headers.insert(&value.to_string(), first_col + offset);
                }
            }
        }
        headers
    }

    fn record(&self, sheet: &Sheet, row: usize) -> Record {
        let fields = self
            .entries
            .iter()
            .map(|(label, col)| (label.to_owned(), sheet.cell(row, *col).cloned()))
            .collect();
        Record { fields }
    }
}

/// One row as label → value pairs, in header order.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<(String, Option<CellValue>)>,
}

impl Record {
    pub fn get(&self, label: &str) -> Option<&CellValue> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == label)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&CellValue>)> + '_ {
        self.fields.iter().map(|(label, value)| (label.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_fields(self) -> Vec<(String, Option<CellValue>)> {
        self.fields
    }
}

/// An item yielded by [`Workbook::each`].
#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// Plain row values across the sheet's columns
    Row(Vec<Option<CellValue>>),
    /// Label → value record
    Record(Record),
}

impl Entry {
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Row(_) => None,
        }
    }

    pub fn as_row(&self) -> Option<&[Option<CellValue>]> {
        match self {
            Self::Row(values) => Some(values),
            Self::Record(_) => None,
        }
    }
}

/// Row lookups for [`Workbook::find`].
#[derive(Clone, Debug, PartialEq)]
pub enum FindQuery {
    /// Data row counted from the header line (1 = the header line itself)
    Row(usize),
    /// Rows whose cells under the given labels equal the given values
    Conditions {
        conditions: Vec<(String, CellValue)>,
        /// Yield plain rows instead of records
        as_array: bool,
    },
}

/// Splits each query on `*` into case-insensitive alternatives.
fn compile_terms<S: AsRef<str>>(queries: &[S]) -> Result<Vec<Vec<Regex>>> {
    queries
        .iter()
        .map(|query| {
            query
                .as_ref()
                .split('*')
                .filter(|alternative| !alternative.is_empty())
                .map(|alternative| Ok(RegexBuilder::new(alternative).case_insensitive(true).build()?))
                .collect::<Result<Vec<Regex>>>()
        })
        .collect()
}

/// Text of cells that header terms can match.
fn text_of(value: &CellValue) -> Option<&str> {
    match value {
        CellValue::Formula { value, .. } => text_of(value),
        _ => value.as_str(),
    }
}

/// Matched label per term, or `None` if some term has no match in the row.
fn match_row(terms: &[Vec<Regex>], row: &[Option<CellValue>]) -> Option<Vec<String>> {
    terms
        .iter()
        .map(|alternatives| {
            alternatives.iter().find_map(|pattern| {
                row.iter()
                    .flatten()
                    .filter_map(text_of)
                    .find(|text| pattern.is_match(text))
                    .map(str::to_owned)
            })
        })
        .collect()
}

impl<L: Loader> Workbook<L> {
    /// Scans the current sheet for the first row matching every query term and
    /// records it as the header line. Returns the row number and matched labels.
    fn row_with<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<(usize, Vec<String>)> {
        let terms = compile_terms(queries)?;
        let sheet = self.sheet(SheetRef::Current)?;
        let last_row = sheet.last_row().unwrap_or(0);
        let mut found = None;
        for line in 1..=last_row {
            if let Some(labels) = match_row(&terms, &sheet.row(line)) {
                found = Some((line, labels));
                break;
            } else if line > MAX_HEADER_SCAN {
                break;
            }
        }
        let (line, labels) = found.ok_or(WorkbookError::HeaderNotFoundError)?;
        self.header_line = line;
        Ok((line, labels))
    }

    /// Finds the header line of the current sheet and makes it the workbook's header line.
    ///
    /// # Errors
    ///
    /// Returns `HeaderNotFoundError` if no row up to row 101 matches every term.
    pub fn find_header_row<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<usize> {
        Ok(self.row_with(queries)?.0)
    }

    /// Like [`Workbook::find_header_row`] but returns the matched header labels.
    pub fn find_header_labels<S: AsRef<str>>(&mut self, queries: &[S]) -> Result<Vec<String>> {
        Ok(self.row_with(queries)?.1)
    }

    /// Resolves label → query assignments to label → column.
    /// Pattern queries are searched together; literal columns pass through.
    pub fn build_header_map(&mut self, assignments: &[(String, HeaderQuery)]) -> Result<HeaderMap> {
        let patterns: Vec<&str> = assignments
            .iter()
            .filter_map(|(_, query)| match query {
                HeaderQuery::Pattern(pattern) => Some(pattern.as_str()),
                HeaderQuery::Column(_) => None,
            })
            .collect();
        let mut labels = if patterns.is_empty() {
            Vec::new()
        } else {
            self.row_with(&patterns)?.1
        }
        .into_iter();

        let sheet = self.sheet(SheetRef::Current)?;
        let header_row = sheet.row(self.header_line);
        let first_col = sheet.first_column().unwrap_or(1);
        let mut headers = HeaderMap::default();
        for (label, query) in assignments {
            let col = match query {
                HeaderQuery::Column(col) => *col,
                HeaderQuery::Pattern(_) => {
                    let matched = labels.next().ok_or(WorkbookError::HeaderNotFoundError)?;
                    header_row
                        .iter()
                        .position(|value| value.as_ref().and_then(text_of) == Some(matched.as_str()))
                        .map(|offset| first_col + offset)
                        .ok_or(WorkbookError::HeaderNotFoundError)?
                }
            };
            headers.insert(label, col);
        }
        Ok(headers)
    }

    /// Runs the clean pass on a sheet unless it already ran.
    fn clean_sheet(&mut self, index: usize) {
        let sheet = &mut self.sheets[index];
        if self.cleaned.insert(sheet.name.to_owned()) {
            sheet.clean();
        }
    }

    /// Iterates the current sheet.
    ///
    /// Without a header mode every row `1..=last_row` is yielded as [`Entry::Row`].
    /// With a header mode the header map is resolved first and rows from the header
    /// line (inclusive) to the last row are yielded as [`Entry::Record`].
    pub fn each(&mut self, options: &EachOptions) -> Result<impl Iterator<Item = Entry> + '_> {
        let index = self.resolve_index(SheetRef::Current)?;
        if options.clean {
            self.clean_sheet(index);
        }

        let headers = match &options.headers {
            HeaderMode::None => None,
            HeaderMode::FirstRow => {
                let sheet = &self.sheets[index];
                Some(sheet.first_row().map(|row| HeaderMap::from_row(sheet, row)).unwrap_or_default())
            }
            HeaderMode::Search(terms) => {
                self.row_with(terms)?;
                Some(HeaderMap::from_row(&self.sheets[index], self.header_line))
            }
            HeaderMode::Map(assignments) => Some(self.build_header_map(assignments)?),
        };
        self.headers = headers.clone();

        let header_line = self.header_line;
        let sheet = &self.sheets[index];
        let last_row = sheet.last_row().unwrap_or(0);
        Ok(match headers {
            None => Either::Left((1..=last_row).map(move |line| Entry::Row(sheet.row(line)))),
            Some(headers) => Either::Right(
                (header_line..=last_row).map(move |line| Entry::Record(headers.record(sheet, line))),
            ),
        })
    }

    /// Collects [`Workbook::each`].
    pub fn parse(&mut self, options: &EachOptions) -> Result<Vec<Entry>> {
        Ok(self.each(options)?.collect())
    }

    /// Collects [`Workbook::each`] through a mapper.
    pub fn parse_with<T, F>(&mut self, options: &EachOptions, mapper: F) -> Result<Vec<T>>
    where
        F: FnMut(Entry) -> T,
    {
        Ok(self.each(options)?.map(mapper).collect())
    }

    /// Finds rows of the current sheet by position or by header-labelled conditions.
    pub fn find(&self, query: &FindQuery) -> Result<Vec<Entry>> {
        let sheet = self.sheet(SheetRef::Current)?;
        match query {
            FindQuery::Row(number) => {
                let row = (number + self.header_line).saturating_sub(1);
                Ok(vec![Entry::Row(sheet.row(row))])
            }
            FindQuery::Conditions { conditions, as_array } => {
                let bounds = sheet.bounds();
                let Some((first_row, last_row)) = bounds.first_row.zip(bounds.last_row) else {
                    return Ok(Vec::new());
                };
                let last_col = bounds.last_col.unwrap_or(0);
                let mut headers = HeaderMap::default();
                for col in 1..=last_col {
                    if let Some(value) = sheet.cell(self.header_line, col).filter(|value| !value.is_blank()) {
                        headers.insert(&value.to_string(), col);
                    }
                }
                let matches = |row: usize| {
                    conditions.iter().all(|(label, expected)| {
                        headers
                            .get(label)
                            .and_then(|col| sheet.cell(row, col))
                            .map(|value| value == expected)
                            .unwrap_or(false)
                    })
                };
                Ok((first_row..=last_row)
                    .filter(|row| matches(*row))
                    .map(|row| {
                        if *as_array {
                            Entry::Row(sheet.row(row))
                        } else {
                            Entry::Record(headers.record(sheet, row))
                        }
                    })
                    .collect())
            }
        }
    }
}
