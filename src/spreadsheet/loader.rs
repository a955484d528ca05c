use crate::spreadsheet::store::CellStore;
use std::path::Path;
use std::path::PathBuf;

/// Where a workbook's bytes come from.
#[derive(Clone, Debug)]
pub enum Source {
    /// A local file
    Path(PathBuf),
    /// An in-memory stream; `name` is used for file type checks and reports
    Stream { name: String, bytes: Vec<u8> },
}

impl Source {
    /// The name used for file type checks and reports.
    pub fn name(&self) -> String {
        match self {
            Self::Path(path) => path.to_string_lossy().to_string(),
            Self::Stream { name, .. } => name.to_owned(),
        }
    }

    /// Final component of the name.
    pub fn file_name(&self) -> String {
        let name = self.name();
        Path::new(&name)
            .file_name()
            .map(|file_name| file_name.to_string_lossy().to_string())
            .unwrap_or(name)
    }
}

impl From<&str> for Source {
    fn from(value: &str) -> Self {
        Self::Path(PathBuf::from(value))
    }
}

impl From<&Path> for Source {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<PathBuf> for Source {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

/// One decoded sheet in source order.
#[derive(Clone, Debug)]
pub struct LoadedSheet {
    pub name: String,
    pub store: CellStore,
}

impl LoadedSheet {
    pub fn new(name: &str, store: CellStore) -> Self {
        Self { name: name.to_owned(), store }
    }
}

/// Decodes a source into populated cell stores.
///
/// A loader is invoked once when a workbook is opened and again on every reload.
pub trait Loader {
    /// Lower-case file extensions (with the leading dot) this loader expects.
    /// An empty slice accepts any source.
    fn extensions(&self) -> &[&str];

    /// Human-readable format name used in file type messages.
    fn format_name(&self) -> &str;

    /// Decodes every sheet of the source in source order.
    fn load(&mut self, source: &Source) -> anyhow::Result<Vec<LoadedSheet>>;
}

/// Loader serving sheets that were built in memory.
/// Every load hands out a fresh copy, so reloads discard in-memory edits.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    sheets: Vec<LoadedSheet>,
    loads: usize,
}

impl MemoryLoader {
    pub fn new(sheets: Vec<LoadedSheet>) -> Self {
        Self { sheets, loads: 0 }
    }

    /// Replaces the sheets served by later loads.
    pub fn replace(&mut self, sheets: Vec<LoadedSheet>) {
        self.sheets = sheets;
    }

    /// Number of times the loader has been invoked.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

impl Loader for MemoryLoader {
    fn extensions(&self) -> &[&str] {
        &[]
    }

    fn format_name(&self) -> &str {
        "an in-memory"
    }

    fn load(&mut self, _source: &Source) -> anyhow::Result<Vec<LoadedSheet>> {
        self.loads += 1;
        Ok(self.sheets.clone())
    }
}
