use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::loader::Source;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// How a file extension that does not match the loader is reported.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FileWarning {
    /// Abort opening the workbook
    #[default]
    Error,
    /// Log a warning and continue
    Warning,
    /// Continue silently
    Ignore,
}

impl FromStr for FileWarning {
    type Err = WorkbookError;

    /// Parses "error", "warning" or "ignore" (case-insensitive).
    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warning" | "warn" => Ok(Self::Warning),
            "ignore" => Ok(Self::Ignore),
            _ => Err(WorkbookError::InvalidOptionError(name.to_owned())),
        }
    }
}

/// Options for opening a workbook.
#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// Severity of a file type mismatch.
    pub file_warning: FileWarning,

    /// Row holding the column labels (1-based).
    pub header_line: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            file_warning: FileWarning::default(),
            header_line: 1,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_warning(mut self, file_warning: FileWarning) -> Self {
        self.file_warning = file_warning;
        self
    }

    pub fn header_line(mut self, header_line: usize) -> Self {
        self.header_line = header_line.max(1);
        self
    }

    /// Checks the source extension against the loader's expected extensions
    /// and reports a mismatch with the configured severity.
    pub(crate) fn check_file_type(&self, source: &Source, extensions: &[&str], format_name: &str) -> Result<()> {
        if extensions.is_empty() {
            return Ok(());
        }
        let name = source.name();
        let extension = extension_of(&name);
        let accepted = extensions.iter().any(|expected| expected.eq_ignore_ascii_case(&extension))
            || (extension == ".xlsm" && extensions.contains(&".xlsx"));
        if accepted {
            return Ok(());
        }
        match self.file_warning {
            FileWarning::Error => Err(WorkbookError::FileTypeMismatchError {
                file_name: name,
                expected: format_name.to_owned(),
            }),
            FileWarning::Warning => {
                log::warn!("Are you sure '{}' is {} spreadsheet file? Expected extension {}", name, format_name, extensions.join(" or "));
                Ok(())
            }
            FileWarning::Ignore => Ok(()),
        }
    }
}

/// Lower-case extension with the leading dot; query strings of http(s) URLs are ignored.
fn extension_of(name: &str) -> String {
    let path = match Url::parse(name) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.path().to_owned(),
        _ => name.to_owned(),
    };
    Path::new(&path)
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}
