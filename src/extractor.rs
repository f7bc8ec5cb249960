// 🔢 Agent-ID Extractor
// "jdoe_7781" → "7781": first run of digits in the raw agent login

use crate::config::ColumnNames;
use crate::error::SchemaError;
use crate::table::{Cell, Table};
use regex::Regex;
use tracing::debug;

/// Pulls the numeric login out of free-text agent fields
pub struct LoginExtractor {
    digits: Regex,
}

impl LoginExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(LoginExtractor {
            digits: Regex::new(r"[0-9]+")?,
        })
    }

    /// First contiguous run of ASCII digits, or None when the field has none
    pub fn extract(&self, raw: &str) -> Option<String> {
        self.digits.find(raw).map(|m| m.as_str().to_string())
    }

    /// Add the derived login column right after the raw agent column
    ///
    /// Placement after the source column is cosmetic; joins look the column
    /// up by name. Returns how many rows produced no login.
    pub fn add_derived_login(
        &self,
        table: &mut Table,
        columns: &ColumnNames,
    ) -> Result<usize, SchemaError> {
        let source = table.require_column(&columns.agent_login)?;

        let logins: Vec<Cell> = table
            .column_values(source)
            .map(|cell| match cell {
                Cell::Empty => Cell::Empty,
                other => self.extract(&other.key_text()).into(),
            })
            .collect();

        let missing = logins.iter().filter(|c| c.is_empty()).count();

        table.insert_column(source + 1, &columns.derived_login, logins);

        debug!(rows = table.len(), missing, "Derived agent logins");
        Ok(missing)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extract_login(raw: &str) -> Option<String> {
        LoginExtractor::new().unwrap().extract(raw)
    }

    #[test]
    fn test_extract_login_embedded_digits() {
        assert_eq!(extract_login("jdoe_7781"), Some("7781".to_string()));
        assert_eq!(extract_login("agent123"), Some("123".to_string()));
        assert_eq!(extract_login("00412"), Some("00412".to_string()));
    }

    #[test]
    fn test_extract_login_takes_first_run_only() {
        assert_eq!(extract_login("br12-agent3456"), Some("12".to_string()));
    }

    #[test]
    fn test_extract_login_no_digits() {
        assert_eq!(extract_login("supervisor"), None);
        assert_eq!(extract_login(""), None);
    }

    #[test]
    fn test_add_derived_login_inserts_after_source() {
        let mut table = Table::with_columns("transactions", &["ZRFUT1", "ZRFUT6", "Amount"]);
        table.push_row(vec!["jdoe_7781".into(), "45".into(), Cell::Number(10.0)]);
        table.push_row(vec!["nobody".into(), "46".into(), Cell::Number(20.0)]);
        table.push_row(vec![Cell::Number(5521.0), "47".into(), Cell::Number(30.0)]);
        table.push_row(vec![Cell::Empty, "48".into(), Cell::Number(40.0)]);

        let missing = LoginExtractor::new()
            .unwrap()
            .add_derived_login(&mut table, &ColumnNames::default())
            .unwrap();

        assert_eq!(missing, 2);
        assert_eq!(table.columns(), &["ZRFUT1", "agent_id_login", "ZRFUT6", "Amount"]);
        assert_eq!(table.cell(0, 1), &Cell::Text("7781".to_string()));
        assert_eq!(table.cell(1, 1), &Cell::Empty);
        assert_eq!(table.cell(2, 1), &Cell::Text("5521".to_string()));
        assert_eq!(table.cell(3, 1), &Cell::Empty);
    }

    #[test]
    fn test_add_derived_login_replaces_existing_column_left_of_source() {
        let mut table = Table::with_columns("transactions", &["agent_id_login", "ZRFUT1", "ZRFUT6"]);
        table.push_row(vec!["old".into(), "jdoe_7781".into(), "45".into()]);

        LoginExtractor::new()
            .unwrap()
            .add_derived_login(&mut table, &ColumnNames::default())
            .unwrap();

        assert_eq!(table.columns(), &["ZRFUT1", "agent_id_login", "ZRFUT6"]);
        assert_eq!(table.cell(0, 1), &Cell::Text("7781".to_string()));
    }

    #[test]
    fn test_add_derived_login_requires_source_column() {
        let mut table = Table::with_columns("transactions", &["ZRFUT6"]);
        let err = LoginExtractor::new()
            .unwrap()
            .add_derived_login(&mut table, &ColumnNames::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn { .. }));
    }
}
