//! # Spreadsheet Module
//!
//! The in-memory workbook model: sparse cell stores, memoized sheet bounds,
//! coordinate codecs, header resolution, exports and the loaders that populate
//! sheets from a source.
pub mod bounds;
pub mod cell;
pub(crate) mod excel;
pub mod export;
pub mod header;
pub mod loader;
pub mod options;
pub mod reference;
pub mod sheet;
pub mod store;
pub mod workbook;
pub mod xlsx;
