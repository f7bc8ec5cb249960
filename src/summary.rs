// 📊 Summary Builder
// One row per partition in creation order, then a "Total" row. No sorting:
// the order here is the sheet order of the report.

use crate::revenue::PartitionTotals;
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};

pub const SUMMARY_SHEET: &str = "Summary";
pub const TOTAL_LABEL: &str = "Total";

pub const SUMMARY_COLUMNS: [&str; 5] = [
    "New State",
    "Channel",
    "Count of Amount",
    "Sum of Amount",
    "Sum of calculated_revenue",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub state: String,
    /// Empty on the total row
    pub channel: String,
    pub count: usize,
    pub sum_amount: f64,
    pub sum_revenue: f64,
}

impl SummaryRow {
    fn to_cells(&self) -> Vec<Cell> {
        vec![
            Cell::text(self.state.as_str()),
            Cell::text(self.channel.as_str()),
            Cell::Int(self.count as i64),
            Cell::Number(self.sum_amount),
            Cell::Number(self.sum_revenue),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    pub total: SummaryRow,
}

impl Summary {
    /// Partition rows followed by the grand total
    pub fn build(totals: &[PartitionTotals]) -> Self {
        let rows: Vec<SummaryRow> = totals
            .iter()
            .map(|t| SummaryRow {
                state: t.state_label.clone(),
                channel: t.channel.label().to_string(),
                count: t.count,
                sum_amount: t.sum_amount,
                sum_revenue: t.sum_revenue,
            })
            .collect();

        // Column-wise sums over the partition rows
        let total = SummaryRow {
            state: TOTAL_LABEL.to_string(),
            channel: String::new(),
            count: rows.iter().map(|r| r.count).sum(),
            sum_amount: rows.iter().map(|r| r.sum_amount).sum(),
            sum_revenue: rows.iter().map(|r| r.sum_revenue).sum(),
        };

        Summary { rows, total }
    }

    /// "Summary" sheet contents, total row last
    pub fn to_table(&self) -> Table {
        let mut table = Table::with_columns(SUMMARY_SHEET, &SUMMARY_COLUMNS);
        for row in self.rows.iter().chain(std::iter::once(&self.total)) {
            table.push_row(row.to_cells());
        }
        table
    }

    pub fn describe(&self) -> String {
        format!(
            "{} partitions, {} transactions, amount {:.2}, revenue {:.2}",
            self.rows.len(),
            self.total.count,
            self.total.sum_amount,
            self.total.sum_revenue
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::Channel;

    fn totals(name: &str, state: &str, channel: Channel, count: usize, amount: f64, revenue: f64) -> PartitionTotals {
        PartitionTotals {
            partition: name.to_string(),
            state_label: state.to_string(),
            channel,
            count,
            sum_amount: amount,
            sum_revenue: revenue,
            skipped_amounts: 0,
        }
    }

    fn sample() -> Vec<PartitionTotals> {
        vec![
            totals("Kano-Branch", "Kano", Channel::Branch, 2, 300.0, 0.531),
            totals("Kano-Merchant", "Kano", Channel::Merchant, 1, 100.0, 0.295),
            totals("Lagos", "Lagos", Channel::Branch, 3, 1000.0, 1.77),
        ]
    }

    #[test]
    fn test_rows_keep_partition_order() {
        let summary = Summary::build(&sample());

        let states: Vec<_> = summary.rows.iter().map(|r| (r.state.as_str(), r.channel.as_str())).collect();
        assert_eq!(
            states,
            vec![("Kano", "Branch"), ("Kano", "Merchant"), ("Lagos", "Branch")]
        );
    }

    #[test]
    fn test_total_row_sums_columns() {
        let summary = Summary::build(&sample());

        assert_eq!(summary.total.state, "Total");
        assert_eq!(summary.total.channel, "");
        assert_eq!(summary.total.count, 6);
        assert!((summary.total.sum_amount - 1400.0).abs() < 1e-9);
        assert!((summary.total.sum_revenue - (0.531 + 0.295 + 1.77)).abs() < 1e-9);
    }

    #[test]
    fn test_to_table_appends_total_last() {
        let table = Summary::build(&sample()).to_table();

        assert_eq!(table.name, "Summary");
        assert_eq!(table.columns(), &SUMMARY_COLUMNS);
        assert_eq!(table.len(), 4);
        assert_eq!(table.cell(3, 0), &Cell::Text("Total".to_string()));
        assert_eq!(table.cell(3, 1), &Cell::Empty);
        assert_eq!(table.cell(3, 2), &Cell::Int(6));
        assert_eq!(table.cell(2, 3), &Cell::Number(1000.0));
    }

    #[test]
    fn test_empty_summary_has_zero_total() {
        let summary = Summary::build(&[]);
        assert!(summary.rows.is_empty());
        assert_eq!(summary.total.count, 0);
        assert_eq!(summary.total.sum_amount, 0.0);
        assert_eq!(summary.to_table().len(), 1);
    }
}
