// 🚫 Structural Errors
// The only failures that abort a run. Unmatched joins are data, not errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Workbook could not be read: {message}")]
    UnreadableWorkbook { message: String },

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("Sheet '{sheet}' not found (available: {available})")]
    MissingSheet { sheet: String, available: String },

    #[error("Sheet '{sheet}' has no header row after skipping {skip_rows} rows")]
    MissingHeader { sheet: String, skip_rows: usize },

    #[error("Column '{column}' not found in '{table}'")]
    MissingColumn { table: String, column: String },

    #[error("Two partitions share the sheet name '{name}'")]
    DuplicatePartition { name: String },

    #[error("Report could not be written: {message}")]
    WriteFailed { message: String },
}
