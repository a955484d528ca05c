//! Office Open XML helpers shared by the workbook parts: number formats,
//! relationships and serial date conversion.
use crate::error::Result;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeDelta;
use quick_xml::events::Event;
use std::collections::HashMap;
use zip::ZipArchive;

const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// How a numeric cell is displayed according to its style.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) enum NumberFormat {
    #[default]
    Number,
    Percentage,
    Date,
    DateTime,
    Time,
}

impl NumberFormat {
    /// Built-in format ids with a non-plain meaning.
    pub(crate) fn parse_builtin_id(id: &str) -> Option<Self> {
        match id {
            "9" | "10" => Some(Self::Percentage),
            "14" | "15" | "16" | "17" => Some(Self::Date),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::Time),
            "22" => Some(Self::DateTime),
            _ => None,
        }
    }

    /// Classifies a custom format code by the placeholders outside literals,
    /// escapes and bracketed sections.
    pub(crate) fn parse_custom(format: &str) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_percentage = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                '%' => is_percentage = true,
                _ => (),
            }
        }

        match (is_date, is_time) {
            (true, true) => Self::DateTime,
            (true, false) => Self::Date,
            (false, true) => Self::Time,
            _ if is_percentage => Self::Percentage,
            _ => Self::Number,
        }
    }
}

/// Maps each cell style (by position in `cellXfs`) to its number format.
pub(crate) fn resolve_number_formats(format_ids: &[String], custom_formats: &HashMap<String, NumberFormat>) -> Vec<NumberFormat> {
    format_ids
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| NumberFormat::parse_builtin_id(id))
                .unwrap_or_default()
        })
        .collect()
}

/// Normalizes a relationship target to a path inside the package.
pub(crate) fn to_zip_path(base: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_owned();
    }
    let mut parts: Vec<&str> = base.split('/').filter(|part| !part.is_empty()).collect();
    for part in target.split('/') {
        match part {
            "." | "" => (),
            ".." => {
                parts.pop();
            }
            part => parts.push(part),
        }
    }
    parts.join("/")
}

/// Relationship part of a package part, e.g. `xl/_rels/workbook.xml.rels` for `xl/workbook.xml`.
pub(crate) fn relationships_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((directory, file_name)) => format!("{directory}/_rels/{file_name}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Reads the relationships whose type ends with `kind_suffix` as id → raw target.
/// A missing relationship part yields an empty map.
pub(crate) fn load_relationships(
    zip: &mut ZipArchive<UnifiedReader>,
    path: &str,
    kind_suffix: &str,
) -> Result<HashMap<String, String>> {
    let mut relationships = HashMap::new();
    let Some(mut reader) = zip.xml_reader(path)? else {
        return Ok(relationships);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            if kind.map(|kind| kind.ends_with(kind_suffix)).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), target.to_string());
                }
            }
        }
    });
    Ok(relationships)
}

/// Converts a serial day number to a date.
/// The 1900 system reproduces the Lotus 1-2-3 leap year bug (serial 60 is 1900-02-29).
pub(crate) fn serial_to_date(serial: f64, is_1904: bool) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.trunc() as i64;
    let offset = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(TimeDelta::try_days(days + offset)?)
}

/// Seconds since midnight of the fractional part of a serial number.
pub(crate) fn serial_to_seconds(serial: f64) -> i64 {
    (serial.fract() * 86400.0).round() as i64
}

pub(crate) fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    let midnight = serial_to_date(serial, is_1904)?.and_hms_opt(0, 0, 0)?;
    midnight.checked_add_signed(TimeDelta::try_seconds(serial_to_seconds(serial))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn builtin_formats() {
        assert_eq!(NumberFormat::parse_builtin_id("9"), Some(NumberFormat::Percentage));
        assert_eq!(NumberFormat::parse_builtin_id("14"), Some(NumberFormat::Date));
        assert_eq!(NumberFormat::parse_builtin_id("22"), Some(NumberFormat::DateTime));
        assert_eq!(NumberFormat::parse_builtin_id("46"), Some(NumberFormat::Time));
        assert_eq!(NumberFormat::parse_builtin_id("0"), None);
    }

    #[test]
    fn custom_formats() {
        assert_eq!(NumberFormat::parse_custom("yyyy-mm-dd"), NumberFormat::Date);
        assert_eq!(NumberFormat::parse_custom("yyyy-mm-dd hh:mm:ss"), NumberFormat::DateTime);
        assert_eq!(NumberFormat::parse_custom("[h]:mm:ss"), NumberFormat::Time);
        assert_eq!(NumberFormat::parse_custom("0.00%"), NumberFormat::Percentage);
        assert_eq!(NumberFormat::parse_custom("[Red]#,##0.00"), NumberFormat::Number);
        assert_eq!(NumberFormat::parse_custom("0.0\" days\""), NumberFormat::Number);
        assert_eq!(NumberFormat::parse_custom("0\\%"), NumberFormat::Number);
    }

    #[test]
    fn style_positions_resolve_to_formats() {
        let custom = HashMap::from([("164".to_owned(), NumberFormat::Date)]);
        let ids = ["0", "164", "10", "999"].map(str::to_owned);
        assert_eq!(
            resolve_number_formats(&ids, &custom),
            vec![NumberFormat::Number, NumberFormat::Date, NumberFormat::Percentage, NumberFormat::Number]
        );
    }

    #[test]
    fn zip_paths() {
        assert_eq!(to_zip_path("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path("xl", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(to_zip_path("xl/worksheets", "../media/image1.png"), "xl/media/image1.png");
        assert_eq!(relationships_path("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(relationships_path("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
    }

    #[test]
    fn serial_dates() {
        assert_eq!(serial_to_date(1.0, false), Some(date(1900, 1, 1)));
        assert_eq!(serial_to_date(59.0, false), Some(date(1900, 2, 28)));
        assert_eq!(serial_to_date(61.0, false), Some(date(1900, 3, 1)));
        assert_eq!(serial_to_date(45292.0, false), Some(date(2024, 1, 1)));
        assert_eq!(serial_to_date(0.0, true), Some(date(1904, 1, 1)));
        assert_eq!(serial_to_date(f64::NAN, false), None);
    }

    #[test]
    fn serial_times() {
        assert_eq!(serial_to_seconds(0.5), 43200);
        assert_eq!(serial_to_seconds(45292.75), 64800);
        assert_eq!(
            serial_to_datetime(45292.5, false),
            date(2024, 1, 1).and_hms_opt(12, 0, 0)
        );
    }
}
