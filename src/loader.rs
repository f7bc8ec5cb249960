// 📂 Table Loader - Uploaded workbook bytes → Table
// Reads one sheet (xlsx, xls, xlsb, ods) with calamine

use crate::config::SheetLayout;
use crate::error::SchemaError;
use crate::table::{Cell, Table};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::debug;

/// Read the sheet described by `layout` out of an in-memory workbook
///
/// Layout handling:
/// - `skip_rows` sheet rows are skipped, the next row is the header
/// - fully blank data rows are dropped
/// - `drop_footer` removes the last remaining data row
pub fn read_sheet(bytes: &[u8], layout: &SheetLayout) -> Result<Table, SchemaError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(|e| {
        SchemaError::UnreadableWorkbook {
            message: e.to_string(),
        }
    })?;

    let sheet_names = workbook.sheet_names();
    let sheet_name = match &layout.sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(SchemaError::MissingSheet {
                    sheet: name.clone(),
                    available: sheet_names.join(", "),
                });
            }
            name.clone()
        }
        None => sheet_names.first().cloned().ok_or(SchemaError::NoSheets)?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| SchemaError::UnreadableWorkbook {
            message: format!("Failed to read sheet '{}': {}", sheet_name, e),
        })?;

    // Range may not begin at A1; skip_rows counts from the top of the sheet
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let header_offset = layout.skip_rows.saturating_sub(start_row as usize);

    let mut rows = range.rows().skip(header_offset);

    let header = rows.next().ok_or_else(|| SchemaError::MissingHeader {
        sheet: sheet_name.clone(),
        skip_rows: layout.skip_rows,
    })?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(idx, data)| {
            let name = convert_cell(data).key_text().trim().to_string();
            if name.is_empty() {
                format!("Unnamed: {}", start_col as usize + idx)
            } else {
                name
            }
        })
        .collect();

    let mut table = Table::new(sheet_name.clone(), columns);
    let mut blank_rows = 0usize;

    for row in rows {
        let cells: Vec<Cell> = row.iter().map(convert_cell).collect();
        if cells.iter().all(Cell::is_empty) {
            blank_rows += 1;
            continue;
        }
        table.push_row(cells);
    }

    if layout.drop_footer {
        table.pop_row();
    }

    debug!(
        sheet = %sheet_name,
        rows = table.len(),
        columns = table.columns().len(),
        blank_rows,
        "Loaded sheet"
    );

    Ok(table)
}

/// calamine value → Cell
fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Int(*n),
        Data::Bool(b) => Cell::Bool(*b),
        // Excel serial; date formatting is not needed downstream
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Cell::text(s.as_str()),
        Data::DurationIso(s) => Cell::text(s.as_str()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

// ============================================================================
// TESTS
// ============================================================================
