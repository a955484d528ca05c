use crate::error::Result;
use crate::error::ResultMessage;
use crate::error::WorkbookError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::match_xml_events;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::excel::relationships_path;
use crate::spreadsheet::excel::resolve_number_formats;
use crate::spreadsheet::excel::serial_to_date;
use crate::spreadsheet::excel::serial_to_datetime;
use crate::spreadsheet::excel::serial_to_seconds;
use crate::spreadsheet::excel::to_zip_path;
use crate::spreadsheet::excel::NumberFormat;
use crate::spreadsheet::loader::LoadedSheet;
use crate::spreadsheet::loader::Loader;
use crate::spreadsheet::loader::Source;
use crate::spreadsheet::reference::split_coordinate;
use crate::spreadsheet::store::CellStore;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use zip::ZipArchive;

const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_SHEET: QName = QName(b"sheet");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_FORMULA: QName = QName(b"f");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");
const TAG_HYPERLINK: QName = QName(b"hyperlink");

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const KIND_WORKSHEET: &str = "/worksheet";
const KIND_HYPERLINK: &str = "/hyperlink";

/// Raw cell kinds given by the `t` attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum RawKind {
    SharedString,
    InlineString,
    Boolean,
    IsoDate,
    Error,
    Number,
}

impl RawKind {
    fn parse(kind: Option<&str>) -> Self {
        match kind {
            Some("s") => Self::SharedString,
            Some("str") | Some("inlineStr") => Self::InlineString,
            Some("b") => Self::Boolean,
            Some("d") => Self::IsoDate,
            Some("e") => Self::Error,
            _ => Self::Number,
        }
    }
}

/// Values decoded from workbook-level parts and shared by every worksheet.
struct WorkbookParts {
    is_1904: bool,
    number_formats: Vec<NumberFormat>,
    shared_strings: Vec<String>,
}

/// Loader for Excel 2007+ packages (.xlsx, .xlsm).
#[derive(Clone, Debug, Default)]
pub struct XlsxLoader;

impl XlsxLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Loader for XlsxLoader {
    fn extensions(&self) -> &[&str] {
        &[".xlsx", ".xlsm"]
    }

    fn format_name(&self) -> &str {
        "an Excel 2007"
    }

    fn load(&mut self, source: &Source) -> anyhow::Result<Vec<LoadedSheet>> {
        let mut zip = ZipArchive::new(UnifiedReader::new(source)?)?;
        let (sheets, is_1904) = load_workbook(&mut zip).with_prefix(WORKBOOK_PATH)?;
        let parts = WorkbookParts {
            is_1904,
            number_formats: load_number_formats(&mut zip).with_prefix("xl/styles.xml")?,
            shared_strings: load_shared_strings(&mut zip).with_prefix("xl/sharedStrings.xml")?,
        };
        let mut loaded = Vec::with_capacity(sheets.len());
        for (name, path) in sheets {
            let store = read_sheet(&mut zip, &path, &parts).with_prefix(&format!("Sheet '{name}'"))?;
            log::debug!("Read {} cell(s) from sheet '{}'", store.len(), name);
            loaded.push(LoadedSheet::new(&name, store));
        }
        Ok(loaded)
    }
}

/// Sheet names with their part paths in workbook order, and the 1904 date system flag.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool)> {
    let relationships = load_relationships(zip, &relationships_path(WORKBOOK_PATH), KIND_WORKSHEET)?;
    let mut reader = zip
        .xml_reader(WORKBOOK_PATH)?
        .ok_or_else(|| WorkbookError::WithContextError("missing part".to_owned()))?;
    let mut sheets = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let name = event.get_attribute_value("name")?;
            let id = event.get_attribute_value("r:id")?;
            if let Some((name, id)) = name.zip(id) {
                if let Some(target) = relationships.get(id.as_ref()) {
                    sheets.push((name.to_string(), to_zip_path("xl", target)));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Number format of every cell style, indexed by the cell's `s` attribute.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<NumberFormat>> {
    let Some(mut reader) = zip.xml_reader("xl/styles.xml")? else {
        return Ok(Vec::new());
    };
    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::new();
    let mut format_indexes_context = false;
    let mut format_ids = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), NumberFormat::parse_custom(&format));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?;
            format_ids.push(id.map(|id| id.to_string()).unwrap_or_default());
        }
    });
    Ok(resolve_number_formats(&format_ids, &custom_formats))
}

fn load_shared_strings(zip: &mut ZipArchive<UnifiedReader>) -> Result<Vec<String>> {
    let mut shared_strings = Vec::new();
    let Some(mut reader) = zip.xml_reader("xl/sharedStrings.xml")? else {
        return Ok(shared_strings);
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(reader.read_text(TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Decodes one worksheet part, then wraps hyperlinked cells as links.
fn read_sheet(zip: &mut ZipArchive<UnifiedReader>, path: &str, parts: &WorkbookParts) -> Result<CellStore> {
    let targets = load_relationships(zip, &relationships_path(path), KIND_HYPERLINK)?;
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| WorkbookError::WithContextError(format!("missing part '{path}'")))?;

    let mut store = CellStore::new();
    let mut hyperlinks = Vec::<(String, String)>::new();
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let (mut row, mut col) = (0usize, 0usize);
    let mut kind = RawKind::Number;
    let mut style = 0usize;
    let mut formula = String::new();
    let mut value = None::<String>;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            row_count = event.parse_attribute_value::<usize>("r")?.unwrap_or(row_count + 1);
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            col_count += 1;
            (row, col) = match event.get_attribute_value("r")? {
                Some(reference) => split_coordinate(&reference)?,
                None => (row_count, col_count),
            };
            col_count = col;
            kind = RawKind::parse(event.get_attribute_value("t")?.as_deref());
            style = event.parse_attribute_value::<usize>("s")?.unwrap_or(0);
            formula.clear();
            value = None;
        }
        Event::Start(event) if event.name() == TAG_FORMULA => {
            formula = reader.read_text(TAG_FORMULA, true)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = Some(reader.read_text(TAG_VALUE, true)?);
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = Some(reader.read_text(TAG_INLINE_STRING, false)?);
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if let Some(raw) = value.take() {
                let number_format = parts.number_formats.get(style).copied().unwrap_or_default();
                let cell = to_cell_value(kind, &raw, number_format, parts)?;
                let cell = if formula.is_empty() {
                    cell
                } else {
                    CellValue::Formula { formula: format!("={formula}"), value: Box::new(cell) }
                };
                store.set(row, col, cell)?;
            }
        }
        Event::Start(event) if event.name() == TAG_HYPERLINK => {
            let reference = event.get_attribute_value("ref")?;
            let url = match event.get_attribute_value("r:id")? {
                Some(id) => targets.get(id.as_ref()).cloned(),
                None => event.get_attribute_value("location")?.map(|location| format!("#{location}")),
            };
            if let Some((reference, url)) = reference.zip(url) {
                hyperlinks.push((reference.to_string(), url));
            }
        }
    });

    for (reference, url) in hyperlinks {
        let first = reference.split(':').next().unwrap_or_default();
        let (row, col) = split_coordinate(first)?;
        if let Some(cell) = store.get(row, col) {
            let text = cell.to_string();
            store.set(row, col, CellValue::Link { text, url })?;
        }
    }
    Ok(store)
}

fn to_cell_value(kind: RawKind, raw: &str, number_format: NumberFormat, parts: &WorkbookParts) -> Result<CellValue> {
    let value = match kind {
        RawKind::SharedString => {
            let index = raw.trim().parse::<usize>()?;
            let text = parts
                .shared_strings
                .get(index)
                .ok_or_else(|| WorkbookError::WithContextError(format!("shared string {index} out of range")))?;
            CellValue::String(text.to_owned())
        }
        RawKind::InlineString | RawKind::Error => CellValue::String(raw.to_owned()),
        RawKind::Boolean => CellValue::Boolean(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
        RawKind::IsoDate => parse_iso_date(raw).unwrap_or_else(|| CellValue::String(raw.to_owned())),
        RawKind::Number if raw.trim().is_empty() => CellValue::String(String::new()),
        RawKind::Number => {
            let number = raw.trim().parse::<f64>()?;
            let is_1904 = parts.is_1904;
            match number_format {
                NumberFormat::Number => CellValue::Float(number),
                NumberFormat::Percentage => CellValue::Percentage(number),
                NumberFormat::Date => serial_to_date(number, is_1904).map(CellValue::Date).unwrap_or(CellValue::Float(number)),
                NumberFormat::DateTime => serial_to_datetime(number, is_1904)
                    .map(CellValue::DateTime)
                    .unwrap_or(CellValue::Float(number)),
                NumberFormat::Time => CellValue::Time(serial_to_seconds(number)),
            }
        }
    };
    Ok(value)
}

/// ISO 8601 cell values (`t="d"`); a midnight timestamp is a plain date.
fn parse_iso_date(raw: &str) -> Option<CellValue> {
    let raw = raw.trim().trim_end_matches('Z');
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(if datetime.time() == chrono::NaiveTime::MIN {
            CellValue::Date(datetime.date())
        } else {
            CellValue::DateTime(datetime)
        });
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(CellValue::Date)
}
