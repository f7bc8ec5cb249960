// 📝 Report Writer - Tables → one xlsx artifact, one sheet per table
//
// Sheet names are used verbatim. Names Excel rejects (too long, reserved
// characters, duplicates) fail the whole write; nothing partial is returned.

use crate::error::SchemaError;
use crate::table::{Cell, Table};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::debug;

/// Serialize `sheets` in order into an in-memory xlsx file
pub fn write_workbook(sheets: &[Table]) -> Result<Vec<u8>, SchemaError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in sheets {
        let worksheet = workbook
            .add_worksheet()
            .set_name(&table.name)
            .map_err(|e| write_error(&table.name, e))?;

        write_table(worksheet, table, &header_format).map_err(|e| write_error(&table.name, e))?;

        debug!(sheet = %table.name, rows = table.len(), "Wrote sheet");
    }

    workbook.save_to_buffer().map_err(|e| SchemaError::WriteFailed {
        message: format!("Failed to save workbook: {}", e),
    })
}

fn write_table(worksheet: &mut Worksheet, table: &Table, header_format: &Format) -> Result<(), XlsxError> {
    for (col, name) in table.columns().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, name, header_format)?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        // rust_xlsxwriter uses 0-based row/col as u32/u16; row 0 is the header
        let row_num = row_idx as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(s) => {
                    worksheet.write_string(row_num, col, s)?;
                }
                Cell::Number(n) => {
                    if n.is_finite() {
                        worksheet.write_number(row_num, col, *n)?;
                    }
                }
                Cell::Int(i) => {
                    worksheet.write_number(row_num, col, *i as f64)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
            }
        }
    }

    Ok(())
}

fn write_error(sheet: &str, e: XlsxError) -> SchemaError {
    SchemaError::WriteFailed {
        message: format!("Sheet '{}': {}", sheet, e),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use std::io::Cursor;

    fn sample(name: &str) -> Table {
        let mut table = Table::with_columns(name, &["ZRFUT1", "Amount", "New State"]);
        table.push_row(vec!["agent123".into(), Cell::Number(1000.0), "Lagos".into()]);
        table.push_row(vec!["agent9".into(), Cell::Int(250), Cell::Empty]);
        table
    }

    #[test]
    fn test_sheets_written_in_order() {
        let bytes = write_workbook(&[sample("Summary"), sample("Lagos"), sample("Kano-Branch")]).unwrap();

        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["Summary", "Lagos", "Kano-Branch"]);
    }

    #[test]
    fn test_cells_round_trip() {
        let bytes = write_workbook(&[sample("Lagos")]).unwrap();

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range("Lagos").unwrap();

        assert_eq!(range.get((0, 0)), Some(&Data::String("ZRFUT1".to_string())));
        assert_eq!(range.get((1, 1)), Some(&Data::Float(1000.0)));
        assert_eq!(range.get((2, 1)), Some(&Data::Float(250.0)));
        assert_eq!(range.get((1, 2)), Some(&Data::String("Lagos".to_string())));
        assert_eq!(range.get((2, 2)), Some(&Data::Empty));
    }

    #[test]
    fn test_illegal_sheet_name_fails() {
        let err = write_workbook(&[sample("Bad/Name")]).unwrap_err();
        assert!(matches!(err, SchemaError::WriteFailed { .. }));
    }

    #[test]
    fn test_overlong_sheet_name_fails() {
        let err = write_workbook(&[sample("A state name well past the Excel limit")]).unwrap_err();
        assert!(matches!(err, SchemaError::WriteFailed { .. }));
    }
}
