//! # Rusty Workbook
//!
//! An in-memory spreadsheet model with read access to Excel 2007+ workbooks.
//!
//! ## Features
//!
//! - **Sparse storage**: only populated cells are stored, keyed by 1-based `(row, column)`
//! - **Typed cells**: strings, floats, percentages, booleans, dates, date-times, times,
//!   formulas with their results, and hyperlinks
//! - **Memoized bounds**: first/last row and column are computed once per sheet state
//! - **Header search**: wildcard queries locate the header line and map labels to columns
//! - **Exports**: CSV, YAML, XML, matrices and a plain-text summary
//! - **Pluggable loaders**: the [`Loader`] trait decodes a source; [`XlsxLoader`] reads
//!   `.xlsx` and `.xlsm` packages
//!
//! ## Example
//!
//! ```no_run
//! use rusty_workbook::{EachOptions, OpenOptions, SheetRef, Workbook};
//!
//! let mut workbook = Workbook::open("prices.xlsx", OpenOptions::default())?;
//! workbook.set_current_sheet("Prices")?;
//! for entry in workbook.each(&EachOptions::search(&["UPC*SKU", "price"]))? {
//!     println!("{:?}", entry.as_record());
//! }
//! println!("{}", workbook.to_csv(SheetRef::Current, ",")?);
//! # Ok::<(), rusty_workbook::WorkbookError>(())
//! ```
pub mod error;
mod helpers;
pub mod spreadsheet;

pub use crate::error::Result;
pub use crate::error::WorkbookError;
pub use crate::spreadsheet::bounds::Bounds;
pub use crate::spreadsheet::bounds::Region;
pub use crate::spreadsheet::cell::to_date_string;
pub use crate::spreadsheet::cell::to_datetime_string;
pub use crate::spreadsheet::cell::to_time_string;
pub use crate::spreadsheet::cell::CellType;
pub use crate::spreadsheet::cell::CellValue;
pub use crate::spreadsheet::export::Matrix;
pub use crate::spreadsheet::header::EachOptions;
pub use crate::spreadsheet::header::Entry;
pub use crate::spreadsheet::header::FindQuery;
pub use crate::spreadsheet::header::HeaderMap;
pub use crate::spreadsheet::header::HeaderMode;
pub use crate::spreadsheet::header::HeaderQuery;
pub use crate::spreadsheet::header::Record;
pub use crate::spreadsheet::loader::LoadedSheet;
pub use crate::spreadsheet::loader::Loader;
pub use crate::spreadsheet::loader::MemoryLoader;
pub use crate::spreadsheet::loader::Source;
pub use crate::spreadsheet::options::FileWarning;
pub use crate::spreadsheet::options::OpenOptions;
pub use crate::spreadsheet::reference::letter_to_number;
pub use crate::spreadsheet::reference::number_to_letter;
pub use crate::spreadsheet::reference::split_coordinate;
pub use crate::spreadsheet::reference::to_reference;
pub use crate::spreadsheet::sheet::Sheet;
pub use crate::spreadsheet::store::CellStore;
pub use crate::spreadsheet::workbook::SheetHandle;
pub use crate::spreadsheet::workbook::SheetRef;
pub use crate::spreadsheet::workbook::Workbook;
pub use crate::spreadsheet::xlsx::XlsxLoader;
