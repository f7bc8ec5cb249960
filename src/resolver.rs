// 🗺️ State Resolver - Two-stage fallback join
//
// 1. branch code (ZRFUT6) → branch map state
// 2. otherwise derived login → employee map state
// 3. otherwise null; the row is kept
//
// Both mapping tables become hash lookups once; transactions are then
// resolved in a single pass. Duplicate keys: last row wins, even when that
// row's state is blank.

use crate::config::ColumnNames;
use crate::error::SchemaError;
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

// ============================================================================
// RESOLUTION
// ============================================================================

/// Which join stage placed a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionSource {
    Branch,
    Employee,
    Unresolved,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStats {
    pub by_branch: usize,
    pub by_employee: usize,
    pub unresolved: usize,
    pub duplicate_branch_keys: usize,
    pub duplicate_employee_keys: usize,
}

impl ResolutionStats {
    pub fn total(&self) -> usize {
        self.by_branch + self.by_employee + self.unresolved
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows: {} by branch, {} by employee, {} unresolved",
            self.total(),
            self.by_branch,
            self.by_employee,
            self.unresolved
        )
    }
}

// ============================================================================
// LOOKUP TABLE
// ============================================================================

/// key text → state, built from one mapping table
///
/// A key whose last row has a blank state maps to None and never matches.
#[derive(Debug, Clone, Default)]
pub struct StateLookup {
    states: HashMap<String, Option<String>>,
    duplicates: usize,
}

impl StateLookup {
    /// Build from `key_column` → `state_column`
    ///
    /// A repeated key overwrites the earlier entry, including with a blank
    /// state; mapping tables are expected to be key-unique.
    pub fn build(table: &Table, key_column: &str, state_column: &str) -> Result<Self, SchemaError> {
        let key_col = table.require_column(key_column)?;
        let state_col = table.require_column(state_column)?;

        let mut lookup = StateLookup::default();

        for row in table.rows() {
            let state = &row[state_col];
            let state = (!state.is_empty()).then(|| state.key_text());
            let key = row[key_col].key_text();
            if lookup.states.insert(key, state).is_some() {
                lookup.duplicates += 1;
            }
        }

        Ok(lookup)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        if key.is_empty() {
            return None;
        }
        self.states.get(key).and_then(|state| state.as_deref())
    }

    /// Keys that resolve to a state
    pub fn len(&self) -> usize {
        self.states.values().filter(|state| state.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

// ============================================================================
// STATE RESOLVER
// ============================================================================

pub struct StateResolver {
    branches: StateLookup,
    employees: StateLookup,
}

impl StateResolver {
    /// `branch_map` must already have normalized branch ids
    pub fn new(branch_map: &Table, employee_map: &Table, columns: &ColumnNames) -> Result<Self, SchemaError> {
        let branches = StateLookup::build(branch_map, &columns.branch_id, &columns.branch_state)?;
        let employees =
            StateLookup::build(employee_map, &columns.employee_code, &columns.employee_state)?;

        if branches.duplicates() > 0 || employees.duplicates() > 0 {
            warn!(
                branch_duplicates = branches.duplicates(),
                employee_duplicates = employees.duplicates(),
                "Mapping tables contain repeated keys; last entry wins"
            );
        }

        Ok(StateResolver {
            branches,
            employees,
        })
    }

    /// Resolve one row from its branch code and derived login
    pub fn resolve(&self, branch_code: &Cell, login: &Cell) -> (Option<String>, ResolutionSource) {
        if let Some(state) = self.branches.get(&branch_code.key_text()) {
            return (Some(state.to_string()), ResolutionSource::Branch);
        }
        if let Some(state) = self.employees.get(&login.key_text()) {
            return (Some(state.to_string()), ResolutionSource::Employee);
        }
        (None, ResolutionSource::Unresolved)
    }

    /// Add or overwrite the resolved-state column on the transactions table
    ///
    /// Expects the derived login column to be present already.
    pub fn apply(&self, transactions: &mut Table, columns: &ColumnNames) -> Result<ResolutionStats, SchemaError> {
        let code_col = transactions.require_column(&columns.branch_code)?;
        let login_col = transactions.require_column(&columns.derived_login)?;

        let mut stats = ResolutionStats {
            duplicate_branch_keys: self.branches.duplicates(),
            duplicate_employee_keys: self.employees.duplicates(),
            ..Default::default()
        };

        let resolved: Vec<Cell> = transactions
            .rows()
            .iter()
            .map(|row| {
                let (state, source) = self.resolve(&row[code_col], &row[login_col]);
                match source {
                    ResolutionSource::Branch => stats.by_branch += 1,
                    ResolutionSource::Employee => stats.by_employee += 1,
                    ResolutionSource::Unresolved => stats.unresolved += 1,
                }
                state.into()
            })
            .collect();

        transactions.set_column(&columns.resolved_state, resolved);

        info!(
            by_branch = stats.by_branch,
            by_employee = stats.by_employee,
            unresolved = stats.unresolved,
            "Resolved transaction states"
        );

        Ok(stats)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::normalize_branch_ids;

    fn branch_map(rows: Vec<(Cell, &str)>) -> Table {
        let mut table = Table::with_columns("branches", &["Branch ID", "State"]);
        for (id, state) in rows {
            table.push_row(vec![id, state.into()]);
        }
        normalize_branch_ids(&mut table, &ColumnNames::default()).unwrap();
        table
    }

    fn employee_map(rows: Vec<(Cell, &str)>) -> Table {
        let mut table = Table::with_columns("employees", &["Employee_Code", "State"]);
        for (code, state) in rows {
            table.push_row(vec![code, state.into()]);
        }
        table
    }

    fn transactions(rows: Vec<(&str, &str)>) -> Table {
        let mut table = Table::with_columns("transactions", &["ZRFUT6", "agent_id_login"]);
        for (code, login) in rows {
            table.push_row(vec![code.into(), login.into()]);
        }
        table
    }

    fn resolved(table: &Table) -> Vec<String> {
        let col = table.column_index("New State").unwrap();
        table.column_values(col).map(|c| c.key_text()).collect()
    }

    #[test]
    fn test_branch_match_wins_over_employee() {
        let resolver = StateResolver::new(
            &branch_map(vec![(Cell::Number(45.0), "Lagos")]),
            &employee_map(vec![(Cell::Number(7781.0), "Kano")]),
            &ColumnNames::default(),
        )
        .unwrap();

        let mut txs = transactions(vec![("45", "7781")]);
        let stats = resolver.apply(&mut txs, &ColumnNames::default()).unwrap();

        assert_eq!(resolved(&txs), vec!["Lagos"]);
        assert_eq!(stats.by_branch, 1);
        assert_eq!(stats.by_employee, 0);
    }

    #[test]
    fn test_fallback_to_employee_then_unresolved() {
        let resolver = StateResolver::new(
            &branch_map(vec![(Cell::Number(45.0), "Lagos")]),
            &employee_map(vec![("7781".into(), "Kano")]),
            &ColumnNames::default(),
        )
        .unwrap();

        let mut txs = transactions(vec![("99", "7781"), ("98", "1234"), ("45", "")]);
        let stats = resolver.apply(&mut txs, &ColumnNames::default()).unwrap();

        assert_eq!(resolved(&txs), vec!["Kano", "", "Lagos"]);
        assert_eq!(
            stats,
            ResolutionStats {
                by_branch: 1,
                by_employee: 1,
                unresolved: 1,
                duplicate_branch_keys: 0,
                duplicate_employee_keys: 0,
            }
        );
        assert_eq!(stats.summary(), "3 rows: 1 by branch, 1 by employee, 1 unresolved");
        // Unresolved rows are kept, with an empty state cell
        assert_eq!(txs.len(), 3);
        assert_eq!(txs.cell(1, 2), &Cell::Empty);
    }

    #[test]
    fn test_missing_branch_id_sentinel_matches_code_zero() {
        let resolver = StateResolver::new(
            &branch_map(vec![(Cell::Empty, "Abuja")]),
            &employee_map(vec![]),
            &ColumnNames::default(),
        )
        .unwrap();

        let mut txs = transactions(vec![("0", ""), ("", "")]);
        resolver.apply(&mut txs, &ColumnNames::default()).unwrap();

        // "0" hits the sentinel row; an empty code does not
        assert_eq!(resolved(&txs), vec!["Abuja", ""]);
    }

    #[test]
    fn test_uncoerced_branch_id_silently_fails_to_match() {
        let resolver = StateResolver::new(
            &branch_map(vec![("45.0".into(), "Lagos")]),
            &employee_map(vec![]),
            &ColumnNames::default(),
        )
        .unwrap();

        let mut txs = transactions(vec![("45", "")]);
        let stats = resolver.apply(&mut txs, &ColumnNames::default()).unwrap();

        assert_eq!(stats.unresolved, 1);
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let lookup = StateLookup::build(
            &employee_map(vec![("1".into(), "Oyo"), ("1".into(), "Ogun"), ("2".into(), "")]),
            "Employee_Code",
            "State",
        )
        .unwrap();

        assert_eq!(lookup.get("1"), Some("Ogun"));
        assert_eq!(lookup.get("2"), None, "Empty state never matches");
        assert_eq!(lookup.duplicates(), 1);
        assert_eq!(lookup.len(), 1);
    }

    #[test]
    fn test_later_blank_state_overrides_earlier_match() {
        let lookup = StateLookup::build(
            &employee_map(vec![("1".into(), "Oyo"), ("1".into(), "")]),
            "Employee_Code",
            "State",
        )
        .unwrap();

        assert_eq!(lookup.get("1"), None);
        assert_eq!(lookup.duplicates(), 1);
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_blank_branch_state_falls_back_to_employee() {
        let resolver = StateResolver::new(
            &branch_map(vec![(Cell::Int(7), "Edo"), (Cell::Int(7), "")]),
            &employee_map(vec![("55".into(), "Oyo")]),
            &ColumnNames::default(),
        )
        .unwrap();

        assert_eq!(
            resolver.resolve(&"7".into(), &"55".into()),
            (Some("Oyo".to_string()), ResolutionSource::Employee)
        );
        assert_eq!(
            resolver.resolve(&"7".into(), &Cell::Empty),
            (None, ResolutionSource::Unresolved)
        );
    }

    #[test]
    fn test_existing_state_column_is_overwritten() {
        let resolver = StateResolver::new(
            &branch_map(vec![(Cell::Int(7), "Edo")]),
            &employee_map(vec![]),
            &ColumnNames::default(),
        )
        .unwrap();

        let mut txs = transactions(vec![("7", "")]);
        txs.set_column("New State", vec!["stale".into()]);
        resolver.apply(&mut txs, &ColumnNames::default()).unwrap();

        assert_eq!(txs.columns().len(), 3);
        assert_eq!(resolved(&txs), vec!["Edo"]);
    }

    #[test]
    fn test_missing_mapping_column_is_structural() {
        let bad = Table::with_columns("employees", &["Code", "State"]);
        let result = StateResolver::new(&branch_map(vec![]), &bad, &ColumnNames::default());
        assert!(matches!(result, Err(SchemaError::MissingColumn { .. })));
    }
}
