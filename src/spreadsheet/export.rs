//! # Export
//!
//! Renders sheets as CSV, YAML, XML, a rectangular matrix or a plain-text summary.
//! Every renderer walks cells in row-major order over explicit coordinate ranges.
use crate::error::Result;
use crate::error::WorkbookError;
use crate::spreadsheet::bounds::Region;
use crate::spreadsheet::cell::to_date_string;
use crate::spreadsheet::cell::to_datetime_string;
use crate::spreadsheet::cell::to_number_string;
use crate::spreadsheet::cell::to_time_string;
use crate::spreadsheet::cell::CellValue;
use crate::spreadsheet::loader::Loader;
use crate::spreadsheet::reference::number_to_letter;
use crate::spreadsheet::reference::to_reference;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::workbook::SheetRef;
use crate::spreadsheet::workbook::Workbook;
use quick_xml::events::BytesDecl;
use quick_xml::events::BytesEnd;
use quick_xml::events::BytesStart;
use quick_xml::events::BytesText;
use quick_xml::events::Event;
use quick_xml::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;

/// Rectangular grid of cell values.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Matrix {
    rows: Vec<Vec<Option<CellValue>>>,
}

impl Matrix {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Value at a 0-based position within the matrix.
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)?.as_ref()
    }

    pub fn rows(&self) -> &[Vec<Option<CellValue>>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Renders one cell for CSV output.
pub(crate) fn cell_to_csv(sheet: &Sheet, row: usize, col: usize) -> Result<String> {
    let Some(value) = sheet.cell(row, col).filter(|value| !value.is_blank()) else {
        return Ok(String::new());
    };
    let rendered = match value {
        CellValue::String(text) => quote(text),
        CellValue::Boolean(flag) => quote(&flag.to_string()),
        CellValue::Float(number) | CellValue::Percentage(number) => to_number_string(*number),
        CellValue::Date(date) => to_date_string(date),
        CellValue::DateTime(datetime) => to_datetime_string(datetime),
        CellValue::Time(seconds) => to_time_string(*seconds),
        CellValue::Link { url, .. } => quote(url),
        CellValue::Formula { value: result, .. } => match result.as_ref() {
            CellValue::String(text) if text.is_empty() => String::new(),
            CellValue::String(text) => quote(text),
            CellValue::Float(number) | CellValue::Percentage(number) => to_number_string(*number),
            CellValue::Date(date) => to_date_string(date),
            CellValue::DateTime(datetime) => to_datetime_string(datetime),
            other => Err(WorkbookError::UnsupportedCellTypeError {
                kind: format!("formula({})", other.cell_type()),
                reference: to_reference(row, col),
            })?,
        },
    };
    Ok(rendered)
}

fn write_csv_content<W: Write>(writer: &mut W, sheet: &Sheet, separator: &str) -> Result<()> {
    let bounds = sheet.bounds();
    let Some((last_row, last_col)) = bounds.last_row.zip(bounds.last_col) else {
        return Ok(());
    };
    for row in 1..=last_row {
        for col in 1..=last_col {
            if col > 1 {
                writer.write_all(separator.as_bytes())?;
            }
            writer.write_all(cell_to_csv(sheet, row, col)?.as_bytes())?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

impl<L: Loader> Workbook<L> {
    /// Renders a sheet as CSV, rows `1..=last_row` by columns `1..=last_col`.
    /// An empty sheet renders as an empty string.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedCellTypeError` for formulas whose result has no CSV form.
    pub fn to_csv<'s>(&self, sheet: impl Into<SheetRef<'s>>, separator: &str) -> Result<String> {
        let mut buffer = Vec::new();
        write_csv_content(&mut buffer, self.sheet(sheet)?, separator)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Writes a sheet as CSV into a file.
    pub fn write_csv<'s, P: AsRef<Path>>(&self, path: P, sheet: impl Into<SheetRef<'s>>, separator: &str) -> Result<()> {
        let sheet = self.sheet(sheet)?;
        let mut writer = BufWriter::new(File::create(path)?);
        write_csv_content(&mut writer, sheet, separator)?;
        writer.flush()?;
        Ok(())
    }

    /// Copies a region of a sheet into a matrix. An empty sheet yields an empty matrix.
    pub fn to_matrix<'s>(&self, region: Region, sheet: impl Into<SheetRef<'s>>) -> Result<Matrix> {
        let sheet = self.sheet(sheet)?;
        let Some((from_row, from_col, to_row, to_col)) = region.resolve(&sheet.bounds()) else {
            return Ok(Matrix::default());
        };
        let rows = (from_row..=to_row)
            .map(|row| (from_col..=to_col).map(|col| sheet.cell(row, col).cloned()).collect())
            .collect();
        Ok(Matrix { rows })
    }

    /// Renders the non-empty cells of a region as a YAML document.
    /// Each cell block carries the `prefix` fields before its position, type and value.
    pub fn to_yaml<'s>(&self, prefix: &[(&str, &str)], region: Region, sheet: impl Into<SheetRef<'s>>) -> Result<String> {
        let sheet = self.sheet(sheet)?;
        let Some((from_row, from_col, to_row, to_col)) = region.resolve(&sheet.bounds()) else {
            return Ok(String::new());
        };
        let mut result = String::from("--- \n");
        for row in from_row..=to_row {
            for col in from_col..=to_col {
                if sheet.is_empty(row, col) {
                    continue;
                }
                let Some(value) = sheet.cell(row, col) else {
                    continue;
                };
                result.push_str(&format!("cell_{row}_{col}: \n"));
                for (key, field) in prefix {
                    result.push_str(&format!("  {key}: {field} \n"));
                }
                result.push_str(&format!("  row: {row} \n"));
                result.push_str(&format!("  col: {col} \n"));
                result.push_str(&format!("  celltype: {} \n", value.cell_type()));
                let rendered = match value {
                    CellValue::Time(seconds) => to_time_string(*seconds),
                    other => other.to_string(),
                };
                result.push_str(&format!("  value: {rendered} \n"));
            }
        }
        Ok(result)
    }

    /// Renders every sheet as XML. The current sheet is left untouched.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        writer.write_event(Event::Start(BytesStart::new("spreadsheet")))?;
        for sheet in &self.sheets {
            let element = BytesStart::new("sheet").with_attributes([("name", sheet.name())]);
            let bounds = sheet.bounds();
            let (Some(first_row), Some(last_row), Some(first_col), Some(last_col)) =
                (bounds.first_row, bounds.last_row, bounds.first_col, bounds.last_col)
            else {
                writer.write_event(Event::Empty(element))?;
                continue;
            };
            writer.write_event(Event::Start(element))?;
            for row in first_row..=last_row {
                for col in first_col..=last_col {
                    let Some(value) = sheet.cell(row, col).filter(|value| !value.is_blank()) else {
                        continue;
                    };
                    let (row_text, col_text) = (row.to_string(), col.to_string());
                    let cell = BytesStart::new("cell").with_attributes([
                        ("row", row_text.as_str()),
                        ("column", col_text.as_str()),
                        ("type", value.cell_type().as_str()),
                    ]);
                    writer.write_event(Event::Start(cell))?;
                    writer.write_event(Event::Text(BytesText::new(&value.to_string())))?;
                    writer.write_event(Event::End(BytesEnd::new("cell")))?;
                }
            }
            writer.write_event(Event::End(BytesEnd::new("sheet")))?;
        }
        writer.write_event(Event::End(BytesEnd::new("spreadsheet")))?;
        let mut xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();
        xml.push('\n');
        Ok(xml)
    }

    /// Summarizes the file name, sheet list and per-sheet bounds.
    pub fn summary_info(&self) -> String {
        let names = self.sheet_names();
        let mut result = format!(
            "File: {}\nNumber of sheets: {}\nSheets: {}\n",
            self.source().file_name(),
            names.len(),
            names.join(", ")
        );
        for (index, sheet) in self.sheets.iter().enumerate() {
            result.push_str(&format!("Sheet {}:\n", index + 1));
            let bounds = sheet.bounds();
            match (bounds.first_row, bounds.last_row, bounds.first_col, bounds.last_col) {
                (Some(first_row), Some(last_row), Some(first_col), Some(last_col)) => {
                    result.push_str(&format!("  First row: {first_row}\n"));
                    result.push_str(&format!("  Last row: {last_row}\n"));
                    result.push_str(&format!("  First column: {}\n", number_to_letter(first_col)));
                    result.push_str(&format!("  Last column: {}", number_to_letter(last_col)));
                }
                _ => result.push_str("  - empty -"),
            }
            if index + 1 < self.sheets.len() {
                result.push('\n');
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::loader::MemoryLoader;
    use crate::spreadsheet::store::CellStore;
    use crate::spreadsheet::workbook::tests::store;
    use crate::spreadsheet::workbook::tests::workbook;
    use chrono::NaiveDate;

    fn sample() -> Workbook<MemoryLoader> {
        workbook(vec![
            ("Names", store(&[(1, 1, "Name".into()), (1, 2, "Age".into()), (2, 1, "Al".into()), (2, 2, 30.0.into())])),
            ("Blank", CellStore::new()),
        ])
    }

    #[test]
    fn csv_quotes_strings_and_integral_floats() {
        let workbook = sample();
        assert_eq!(workbook.to_csv(SheetRef::Current, ",").unwrap(), "\"Name\",\"Age\"\n\"Al\",30\n");
        assert_eq!(workbook.to_csv("Blank", ",").unwrap(), "");
    }

    #[test]
    fn csv_escapes_quotes() {
        let workbook = workbook(vec![("Quotes", store(&[(1, 1, "He said \"hi\"".into())]))]);
        assert_eq!(workbook.to_csv(SheetRef::Current, ",").unwrap(), "\"He said \"\"hi\"\"\"\n");
    }

    #[test]
    fn csv_starts_at_row_and_column_one() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let workbook = workbook(vec![(
            "Typed",
            store(&[
                (2, 2, 35.42.into()),
                (2, 3, true.into()),
                (2, 4, CellValue::Time(3723)),
                (3, 2, date.into()),
                (3, 3, date.and_hms_opt(8, 0, 5).unwrap().into()),
                (3, 4, CellValue::Link { text: "home".to_owned(), url: "https://example.com".to_owned() }),
            ]),
        )]);
        assert_eq!(
            workbook.to_csv(SheetRef::Current, ";").unwrap(),
            ";;;\n;35.42;\"true\";01:02:03\n;2024-03-09;2024-03-09T08:00:05+00:00;\"https://example.com\"\n"
        );
    }

    #[test]
    fn csv_formula_results() {
        let formula = |value: CellValue| CellValue::Formula { formula: "=A1".to_owned(), value: Box::new(value) };
        let workbook = workbook(vec![(
            "Formulas",
            store(&[(1, 1, formula(2.0.into())), (1, 2, formula("ok".into())), (1, 3, formula("".into()))]),
        )]);
        assert_eq!(workbook.to_csv(SheetRef::Current, ",").unwrap(), "2,\"ok\",\n");

        let workbook = workbook_with_boolean_formula();
        match workbook.to_csv(SheetRef::Current, ",") {
            Err(WorkbookError::UnsupportedCellTypeError { kind, reference }) => {
                assert_eq!(kind, "formula(boolean)");
                assert_eq!(reference, "B1");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    fn workbook_with_boolean_formula() -> Workbook<MemoryLoader> {
        let value = CellValue::Formula { formula: "=TRUE()".to_owned(), value: Box::new(true.into()) };
        workbook(vec![("Formulas", store(&[(1, 1, "x".into()), (1, 2, value)]))])
    }

    #[test]
    fn csv_to_file() {
        let workbook = sample();
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("names.csv");
        workbook.write_csv(&path, "Names", ",").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\"Name\",\"Age\"\n\"Al\",30\n");
    }

    #[test]
    fn matrix_of_region() {
        let workbook = sample();
        let matrix = workbook.to_matrix(Region::default(), SheetRef::Current).unwrap();
        assert_eq!(matrix.row_count(), 2);
        assert_eq!(matrix.column_count(), 2);
        assert_eq!(matrix.get(1, 1), Some(&CellValue::Float(30.0)));
        let matrix = workbook.to_matrix(Region::try_from("B1:B2").unwrap(), SheetRef::Current).unwrap();
        assert_eq!(matrix.rows(), &[vec![Some(CellValue::from("Age"))], vec![Some(CellValue::Float(30.0))]]);
        assert!(workbook.to_matrix(Region::default(), "Blank").unwrap().is_empty());
    }

    #[test]
    fn yaml_blocks() {
        let workbook = sample();
        let yaml = workbook
            .to_yaml(&[("file", "people")], Region::try_from("A2:B2").unwrap(), SheetRef::Current)
            .unwrap();
        assert_eq!(
            yaml,
            "--- \n\
             cell_2_1: \n  file: people \n  row: 2 \n  col: 1 \n  celltype: string \n  value: Al \n\
             cell_2_2: \n  file: people \n  row: 2 \n  col: 2 \n  celltype: float \n  value: 30.0 \n"
        );
        assert_eq!(workbook.to_yaml(&[], Region::default(), "Blank").unwrap(), "");
    }

    #[test]
    fn yaml_formats_time() {
        let workbook = workbook(vec![("Clock", store(&[(1, 1, CellValue::Time(45296))]))]);
        let yaml = workbook.to_yaml(&[], Region::default(), SheetRef::Current).unwrap();
        assert!(yaml.ends_with("  celltype: time \n  value: 12:34:56 \n"));
    }

    #[test]
    fn xml_covers_every_sheet() {
        let mut workbook = sample();
        workbook.set_current_sheet("Blank").unwrap();
        let xml = workbook.to_xml().unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains("<sheet name=\"Names\">"));
        assert!(xml.contains("<cell row=\"2\" column=\"2\" type=\"float\">30.0</cell>"));
        assert!(xml.contains("<cell row=\"1\" column=\"1\" type=\"string\">Name</cell>"));
        assert!(xml.contains("<sheet name=\"Blank\"/>"));
        assert!(xml.ends_with("</spreadsheet>\n"));
        assert_eq!(workbook.current_sheet().unwrap().name(), "Blank");
    }

    #[test]
    fn xml_escapes_text() {
        let workbook = workbook(vec![("A&B", store(&[(1, 1, "<tag>".into())]))]);
        let xml = workbook.to_xml().unwrap();
        assert!(xml.contains("<sheet name=\"A&amp;B\">"));
        assert!(xml.contains("&lt;tag&gt;"));
    }

    #[test]
    fn summary_lists_sheets() {
        let workbook = sample();
        assert_eq!(
            workbook.summary_info(),
            "File: memory\nNumber of sheets: 2\nSheets: Names, Blank\n\
             Sheet 1:\n  First row: 1\n  Last row: 2\n  First column: A\n  Last column: B\n\
             Sheet 2:\n  - empty -"
        );
    }
}
