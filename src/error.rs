use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WorkbookError>;

/// Main error type for workbook operations.
/// Covers sheet resolution, addressing, header search and export failures,
/// plus the dependency errors raised while a loader decodes a file.
#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("{0}")]
    WithContextError(String),

    // Sheet resolution
    #[error("Sheet index {0} not found")]
    RangeError(usize),

    #[error("Sheet '{0}' not found")]
    NotFoundError(String),

    #[error("Sheet '{0}' is not a valid worksheet for this workbook")]
    InvalidSheetError(String),

    #[error("Workbook '{0}' contains no sheets")]
    EmptyWorkbookError(String),

    // Addressing
    #[error("Invalid column character '{0}'")]
    InvalidColumnError(String),

    #[error("Malformed cell reference '{0}'")]
    MalformedReferenceError(String),

    #[error("Invalid cell coordinate ({row}, {col}): rows and columns start at 1")]
    InvalidCoordinateError { row: usize, col: usize },

    #[error("Unknown operation '{0}'")]
    UnknownOperationError(String),

    // Header search
    #[error("Couldn't find header row")]
    HeaderNotFoundError,

    #[error("{0}")]
    InvalidPatternError(#[from] regex::Error),

    // Export
    #[error("Unsupported cell type '{kind}' at {reference}")]
    UnsupportedCellTypeError { kind: String, reference: String },

    // Loading
    #[error("'{file_name}' is not {expected} file")]
    FileTypeMismatchError { file_name: String, expected: String },

    #[error("Invalid option value '{0}'")]
    InvalidOptionError(String),

    #[error("{0:#}")]
    LoaderError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| WorkbookError::WithContextError(format!("{}: {}", message, e)))
    }
}
