// ⚙️ Pipeline Configuration
// Everything the pipeline reads by name lives here, with the export defaults.
// Overrides load from JSON the same way classification rules do.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// SHEET LAYOUT
// ============================================================================

/// Where the data sits inside an uploaded workbook
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetLayout {
    /// Sheet to read; None = first sheet in the workbook
    pub sheet: Option<String>,

    /// Non-data rows above the header
    pub skip_rows: usize,

    /// Drop the last data row (report footer)
    pub drop_footer: bool,
}

impl SheetLayout {
    pub fn named(sheet: &str) -> Self {
        SheetLayout {
            sheet: Some(sheet.to_string()),
            ..Default::default()
        }
    }

    /// Label used in logs and errors
    pub fn describe(&self) -> &str {
        self.sheet.as_deref().unwrap_or("<first sheet>")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLayouts {
    pub transactions: SheetLayout,
    pub branch_map: SheetLayout,
    pub employee_map: SheetLayout,
}

impl Default for InputLayouts {
    fn default() -> Self {
        InputLayouts {
            transactions: SheetLayout::named("transactions"),
            branch_map: SheetLayout::default(),
            // Employee export carries a 3-row banner and a totals footer
            employee_map: SheetLayout {
                sheet: None,
                skip_rows: 3,
                drop_footer: true,
            },
        }
    }
}

// ============================================================================
// COLUMN NAMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Raw agent login (transactions)
    pub agent_login: String,
    /// Branch code (transactions)
    pub branch_code: String,
    pub channel: String,
    pub amount: String,

    /// Derived columns written into the transactions table
    pub derived_login: String,
    pub resolved_state: String,

    /// Branch map
    pub branch_id: String,
    pub branch_state: String,

    /// Employee map
    pub employee_code: String,
    pub employee_state: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            agent_login: "ZRFUT1".to_string(),
            branch_code: "ZRFUT6".to_string(),
            channel: "channel".to_string(),
            amount: "Amount".to_string(),
            derived_login: "agent_id_login".to_string(),
            resolved_state: "New State".to_string(),
            branch_id: "Branch ID".to_string(),
            branch_state: "State".to_string(),
            employee_code: "Employee_Code".to_string(),
            employee_state: "State".to_string(),
        }
    }
}

// ============================================================================
// FEE SCHEDULE
// ============================================================================

/// Commission rates per channel, with tax charged on top of the commission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub branch_rate: f64,
    pub merchant_rate: f64,
    pub tax_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            branch_rate: 0.0015,
            merchant_rate: 0.0025,
            tax_rate: 0.18,
        }
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub layouts: InputLayouts,
    pub columns: ColumnNames,
    pub fees: FeeSchedule,

    /// Label for the partition holding rows neither join could place
    pub unresolved_label: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            layouts: InputLayouts::default(),
            columns: ColumnNames::default(),
            fees: FeeSchedule::default(),
            unresolved_label: "Unresolved".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load overrides from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_json_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).context("Invalid pipeline config JSON")?;
        Ok(config)
    }
}

// ============================================================================
// TESTS
// ============================================================================
