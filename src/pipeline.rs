// 🔄 Pipeline - One request in, one report out
//
// Load → derive login / normalize ids → resolve state → partition →
// revenue → summary → write. Each run owns all of its state; nothing is
// kept between requests.

use crate::config::PipelineConfig;
use crate::extractor::LoginExtractor;
use crate::loader::read_sheet;
use crate::normalizer::{normalize_branch_ids, NormalizeStats};
use crate::partitioner::{partition, PartitionSet};
use crate::resolver::{ResolutionStats, StateResolver};
use crate::revenue::{PartitionTotals, RevenueCalculator};
use crate::summary::Summary;
use crate::table::Table;
use crate::writer::write_workbook;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

pub const REPORT_FILENAME: &str = "fino_split.xlsx";

// ============================================================================
// REQUEST / ARTIFACT
// ============================================================================

/// The three uploaded workbooks, as raw bytes
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub transactions: Vec<u8>,
    pub branch_map: Vec<u8>,
    pub employee_map: Vec<u8>,
}

/// Counts reported alongside the artifact
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub transactions: usize,
    pub logins_missing: usize,
    pub branch_ids: NormalizeStats,
    pub resolution: ResolutionStats,
    pub partitions: usize,
}

/// Finished xlsx report
#[derive(Debug, Clone)]
pub struct ReportArtifact {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub generated_at: DateTime<Utc>,
    pub stats: RunStats,
}

impl ReportRequest {
    /// Run the whole pipeline. Either a complete workbook or an error.
    pub fn process(&self, config: &PipelineConfig) -> Result<ReportArtifact> {
        let layouts = &config.layouts;

        let transactions = read_sheet(&self.transactions, &layouts.transactions)
            .context("Failed to load transactions workbook")?;
        let branch_map = read_sheet(&self.branch_map, &layouts.branch_map)
            .context("Failed to load branch map workbook")?;
        let employee_map = read_sheet(&self.employee_map, &layouts.employee_map)
            .context("Failed to load employee map workbook")?;

        let report = build_report(transactions, branch_map, employee_map, config)?;
        let bytes = report.to_workbook()?;

        info!(
            bytes = bytes.len(),
            summary = %report.summary.describe(),
            "Report generated"
        );

        Ok(ReportArtifact {
            bytes,
            filename: REPORT_FILENAME.to_string(),
            generated_at: Utc::now(),
            stats: report.stats,
        })
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Everything the pipeline computed, before serialization
#[derive(Debug, Clone)]
pub struct Report {
    /// Transactions with `agent_id_login` and `New State` added
    pub enriched: Table,
    pub partitions: PartitionSet,
    pub totals: Vec<PartitionTotals>,
    pub summary: Summary,
    pub stats: RunStats,
}

impl Report {
    /// Summary sheet first, then one sheet per partition in creation order
    pub fn sheets(&self) -> Vec<Table> {
        let mut sheets = Vec::with_capacity(self.partitions.len() + 1);
        sheets.push(self.summary.to_table());
        sheets.extend(self.partitions.iter().map(|p| p.to_table(&self.enriched)));
        sheets
    }

    pub fn to_workbook(&self) -> Result<Vec<u8>> {
        let bytes = write_workbook(&self.sheets()).context("Failed to write report workbook")?;
        Ok(bytes)
    }
}

/// Tabular core: enrich, partition, and summarise already-loaded tables
pub fn build_report(
    mut transactions: Table,
    mut branch_map: Table,
    employee_map: Table,
    config: &PipelineConfig,
) -> Result<Report> {
    let columns = &config.columns;

    // Fail fast on the columns every later stage needs
    for column in [&columns.agent_login, &columns.branch_code, &columns.channel, &columns.amount] {
        transactions
            .require_column(column)
            .context("Transactions sheet is missing a required column")?;
    }

    let extractor = LoginExtractor::new().context("Failed to build login pattern")?;
    let logins_missing = extractor
        .add_derived_login(&mut transactions, columns)
        .context("Failed to derive agent logins")?;

    let branch_ids =
        normalize_branch_ids(&mut branch_map, columns).context("Failed to normalize branch map")?;

    let resolver = StateResolver::new(&branch_map, &employee_map, columns)
        .context("Failed to build state lookups")?;
    let resolution = resolver
        .apply(&mut transactions, columns)
        .context("Failed to resolve transaction states")?;

    let partitions = partition(&transactions, columns, &config.unresolved_label)
        .context("Failed to partition transactions")?;

    let totals = RevenueCalculator::with_fees(config.fees.clone())
        .calculate(&partitions, &transactions, columns)
        .context("Failed to calculate revenue")?;

    let summary = Summary::build(&totals);

    let stats = RunStats {
        transactions: transactions.len(),
        logins_missing,
        branch_ids,
        resolution,
        partitions: partitions.len(),
    };

    info!(
        transactions = stats.transactions,
        partitions = stats.partitions,
        unresolved = stats.resolution.unresolved,
        "Pipeline complete"
    );

    Ok(Report {
        enriched: transactions,
        partitions,
        totals,
        summary,
        stats,
    })
}

// ============================================================================
// TESTS
// ============================================================================
