// 🧹 Branch Normalizer
// Makes the branch map's identifier column comparable with ZRFUT6 codes
//
// missing → "0", integral → "45", anything that won't coerce stays as-is

use crate::config::ColumnNames;
use crate::error::SchemaError;
use crate::table::{Cell, Table};
use serde::Serialize;
use tracing::{debug, warn};

/// Outcome counts from one normalization pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizeStats {
    pub rows: usize,
    /// Missing identifiers replaced by the "0" sentinel
    pub defaulted: usize,
    /// Identifiers left in their original text because integer coercion failed
    pub uncoerced: usize,
}

/// Canonical string form of one branch identifier
///
/// Returns the key and whether integer coercion failed.
pub fn normalize_branch_id(cell: &Cell) -> (String, bool) {
    match cell {
        c if c.is_empty() => ("0".to_string(), false),
        Cell::Int(i) => (i.to_string(), false),
        Cell::Number(n) if n.is_finite() => ((n.trunc() as i64).to_string(), false),
        Cell::Bool(b) => ((*b as i64).to_string(), false),
        Cell::Text(s) => match s.trim().parse::<i64>() {
            Ok(i) => (i.to_string(), false),
            Err(_) => (s.clone(), true),
        },
        other => (other.key_text(), true),
    }
}

/// Rewrite the branch-id column in place as canonical text keys
pub fn normalize_branch_ids(
    table: &mut Table,
    columns: &ColumnNames,
) -> Result<NormalizeStats, SchemaError> {
    let col = table.require_column(&columns.branch_id)?;

    let mut stats = NormalizeStats {
        rows: table.len(),
        ..Default::default()
    };
    let mut rejected: Vec<String> = Vec::new();

    table.map_column(col, |cell| {
        if cell.is_empty() {
            stats.defaulted += 1;
        }
        let (key, failed) = normalize_branch_id(cell);
        if failed {
            stats.uncoerced += 1;
            rejected.push(key.clone());
        }
        Cell::Text(key)
    });

    if !rejected.is_empty() {
        // Not fatal: these ids simply never match a branch code
        warn!(
            count = rejected.len(),
            sample = ?rejected.iter().take(5).collect::<Vec<_>>(),
            "Branch ids could not be coerced to integers"
        );
    }

    debug!(
        rows = stats.rows,
        defaulted = stats.defaulted,
        uncoerced = stats.uncoerced,
        "Normalized branch ids"
    );

    Ok(stats)
}

// ============================================================================
// TESTS
// ============================================================================
