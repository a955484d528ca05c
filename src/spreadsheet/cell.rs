use chrono::NaiveDate;
use chrono::NaiveDateTime;
use std::fmt::Display;

/// Type tag of a stored cell, derived from the value variant when it is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CellType {
    /// Text values
    String,
    /// Numeric values
    Float,
    /// Numeric values displayed with a percent format (0.25 = 25%)
    Percentage,
    /// Boolean values (true/false)
    Boolean,
    /// Date values without a time component
    Date,
    /// Date values with a time component
    DateTime,
    /// Time-of-day values in seconds since midnight
    Time,
    /// Formula results
    Formula,
    /// Hyperlinks
    Link,
}

impl CellType {
    /// Returns the type name used by the YAML and XML exports.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Float => "float",
            Self::Percentage => "percentage",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Time => "time",
            Self::Formula => "formula",
            Self::Link => "link",
        }
    }
}

impl Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a non-absent cell.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    String(String),
    Float(f64),
    Percentage(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    /// Seconds since midnight
    Time(i64),
    /// Formula text with its evaluated result
    Formula { formula: String, value: Box<CellValue> },
    /// Display text with its target URL
    Link { text: String, url: String },
}

impl CellValue {
    /// Returns the type tag of this value.
    pub fn cell_type(&self) -> CellType {
        match self {
            Self::String(_) => CellType::String,
            Self::Float(_) => CellType::Float,
            Self::Percentage(_) => CellType::Percentage,
            Self::Boolean(_) => CellType::Boolean,
            Self::Date(_) => CellType::Date,
            Self::DateTime(_) => CellType::DateTime,
            Self::Time(_) => CellType::Time,
            Self::Formula { .. } => CellType::Formula,
            Self::Link { .. } => CellType::Link,
        }
    }

    /// A blank string counts as empty; every other value is content.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::String(value) if value.is_empty())
    }

    /// Returns the text of string-like values (strings and link display text).
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            Self::Link { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Returns the number of float and percentage values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(value) | Self::Percentage(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl Display for CellValue {
    /// Renders the value the way the YAML and XML exports print it.
    /// Time values stay raw seconds; exports format them with [`to_time_string`].
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(value) => f.write_str(value),
            Self::Float(value) | Self::Percentage(value) => write!(f, "{:?}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Date(value) => f.write_str(&to_date_string(value)),
            Self::DateTime(value) => f.write_str(&to_datetime_string(value)),
            Self::Time(value) => write!(f, "{}", value),
            Self::Formula { value, .. } => value.fmt(f),
            Self::Link { text, .. } => f.write_str(text),
        }
    }
}

/// Formats seconds since midnight as `HH:MM:SS`.
pub fn to_time_string(seconds: i64) -> String {
    let hours = seconds.div_euclid(3600);
    let rest = seconds - hours * 3600;
    let minutes = rest / 60;
    let seconds = rest % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Formats a date as `YYYY-MM-DD`.
pub fn to_date_string(date: &NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a date-time as an ISO 8601 timestamp with a UTC offset.
pub fn to_datetime_string(datetime: &NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

/// Renders a number as an integer literal when it is integral, else in decimal form.
pub(crate) fn to_number_string(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_string() {
        assert_eq!(to_time_string(0), "00:00:00");
        assert_eq!(to_time_string(7506), "02:05:06");
        assert_eq!(to_time_string(86399), "23:59:59");
        assert_eq!(to_time_string(90000), "25:00:00");
    }

    #[test]
    fn number_string() {
        assert_eq!(to_number_string(30.0), "30");
        assert_eq!(to_number_string(-2.0), "-2");
        assert_eq!(to_number_string(35.42), "35.42");
        assert_eq!(to_number_string(0.25), "0.25");
    }

    #[test]
    fn display_values() {
        assert_eq!(CellValue::Float(30.0).to_string(), "30.0");
        assert_eq!(CellValue::Boolean(true).to_string(), "true");
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(CellValue::Date(date).to_string(), "2024-01-05");
        let datetime = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(CellValue::DateTime(datetime).to_string(), "2024-01-05T10:30:00+00:00");
        let link = CellValue::Link { text: "home".to_owned(), url: "https://example.com".to_owned() };
        assert_eq!(link.to_string(), "home");
    }

    #[test]
    fn blank_detection() {
        assert!(CellValue::from("").is_blank());
        assert!(!CellValue::from(" ").is_blank());
        assert!(!CellValue::Float(0.0).is_blank());
        assert_eq!(CellValue::Percentage(0.5).cell_type(), CellType::Percentage);
    }
}
