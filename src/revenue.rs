// 💰 Revenue Calculator - Channel fee + tax per transaction
//
//   revenue = a*rate + tax*(a*rate)
//   Branch:   rate 0.0015  → a * 0.00177
//   Merchant: rate 0.0025  → a * 0.00295
//
// No rounding anywhere; sums stay in full f64 precision.

use crate::config::{ColumnNames, FeeSchedule};
use crate::error::SchemaError;
use crate::partitioner::{Channel, Partition, PartitionSet};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// PARTITION TOTALS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionTotals {
    pub partition: String,
    pub state_label: String,
    pub channel: Channel,

    /// Rows with a usable numeric amount
    pub count: usize,
    pub sum_amount: f64,
    pub sum_revenue: f64,

    /// Rows whose amount was empty or not numeric
    pub skipped_amounts: usize,
}

// ============================================================================
// REVENUE CALCULATOR
// ============================================================================

pub struct RevenueCalculator {
    pub fees: FeeSchedule,
}

impl RevenueCalculator {
    pub fn new() -> Self {
        RevenueCalculator {
            fees: FeeSchedule::default(),
        }
    }

    pub fn with_fees(fees: FeeSchedule) -> Self {
        RevenueCalculator { fees }
    }

    /// Commission rate for a channel; None when no schedule exists for it
    pub fn rate_for(&self, channel: &Channel) -> Option<f64> {
        match channel {
            Channel::Branch => Some(self.fees.branch_rate),
            Channel::Merchant => Some(self.fees.merchant_rate),
            Channel::Other(_) => None,
        }
    }

    /// Commission plus tax on the commission for one amount
    pub fn revenue(&self, channel: &Channel, amount: f64) -> f64 {
        match self.rate_for(channel) {
            Some(rate) => {
                let commission = amount * rate;
                commission + self.fees.tax_rate * commission
            }
            None => 0.0,
        }
    }

    /// Count, amount sum, and revenue sum for one partition
    pub fn totals(&self, partition: &Partition, enriched: &Table, amount_col: usize) -> PartitionTotals {
        let mut totals = PartitionTotals {
            partition: partition.name.clone(),
            state_label: partition.state_label.clone(),
            channel: partition.channel.clone(),
            count: 0,
            sum_amount: 0.0,
            sum_revenue: 0.0,
            skipped_amounts: 0,
        };

        for &row in &partition.rows {
            match enriched.cell(row, amount_col).as_f64() {
                Some(amount) => {
                    totals.count += 1;
                    totals.sum_amount += amount;
                    totals.sum_revenue += self.revenue(&partition.channel, amount);
                }
                None => totals.skipped_amounts += 1,
            }
        }

        totals
    }

    /// Totals for every partition, in partition order
    pub fn calculate(
        &self,
        partitions: &PartitionSet,
        enriched: &Table,
        columns: &ColumnNames,
    ) -> Result<Vec<PartitionTotals>, SchemaError> {
        let amount_col = enriched.require_column(&columns.amount)?;

        let totals: Vec<PartitionTotals> = partitions
            .iter()
            .map(|p| self.totals(p, enriched, amount_col))
            .collect();

        for t in &totals {
            if let Channel::Other(label) = &t.channel {
                warn!(partition = %t.partition, channel = %label, rows = t.count, "No fee schedule for channel; revenue is 0");
            }
            if t.skipped_amounts > 0 {
                warn!(partition = %t.partition, skipped = t.skipped_amounts, "Non-numeric amounts left out of totals");
            }
        }

        debug!(partitions = totals.len(), "Calculated partition revenue");
        Ok(totals)
    }
}

impl Default for RevenueCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partitioner::partition;
    use crate::table::Cell;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_branch_revenue_formula() {
        let calc = RevenueCalculator::new();
        assert!(close(calc.revenue(&Channel::Branch, 1000.0), 1.77));
        assert!(close(calc.revenue(&Channel::Branch, 1.0), 0.00177));
    }

    #[test]
    fn test_merchant_revenue_formula() {
        let calc = RevenueCalculator::new();
        assert!(close(calc.revenue(&Channel::Merchant, 1000.0), 2.95));
        assert!(close(calc.revenue(&Channel::Merchant, 250.5), 250.5 * 0.00295));
    }

    #[test]
    fn test_other_channel_earns_nothing() {
        let calc = RevenueCalculator::new();
        let online = Channel::Other("Online".to_string());
        assert_eq!(calc.rate_for(&online), None);
        assert_eq!(calc.revenue(&online, 1000.0), 0.0);
    }

    #[test]
    fn test_custom_fee_schedule() {
        let calc = RevenueCalculator::with_fees(FeeSchedule {
            branch_rate: 0.01,
            merchant_rate: 0.02,
            tax_rate: 0.0,
        });
        assert!(close(calc.revenue(&Channel::Branch, 100.0), 1.0));
        assert!(close(calc.revenue(&Channel::Merchant, 100.0), 2.0));
    }

    #[test]
    fn test_partition_totals() {
        let mut table = Table::with_columns("transactions", &["channel", "Amount", "New State"]);
        table.push_row(vec!["Branch".into(), Cell::Number(1000.0), "Lagos".into()]);
        table.push_row(vec!["Branch".into(), Cell::Number(500.0), "Lagos".into()]);
        table.push_row(vec!["Branch".into(), "n/a".into(), "Lagos".into()]);
        table.push_row(vec!["Merchant".into(), "2,000".into(), "Kano".into()]);

        let columns = ColumnNames::default();
        let set = partition(&table, &columns, "Unresolved").unwrap();
        let totals = RevenueCalculator::new().calculate(&set, &table, &columns).unwrap();

        assert_eq!(totals.len(), 2);

        let lagos = &totals[0];
        assert_eq!(lagos.partition, "Lagos");
        assert_eq!(lagos.channel, Channel::Branch);
        assert_eq!(lagos.count, 2);
        assert_eq!(lagos.skipped_amounts, 1);
        assert!(close(lagos.sum_amount, 1500.0));
        assert!(close(lagos.sum_revenue, 1500.0 * 0.00177));

        let kano = &totals[1];
        assert_eq!(kano.channel, Channel::Merchant);
        assert!(close(kano.sum_amount, 2000.0));
        assert!(close(kano.sum_revenue, 5.9));
    }

    #[test]
    fn test_missing_amount_column() {
        let table = Table::with_columns("transactions", &["channel", "New State"]);
        let columns = ColumnNames::default();
        let set = partition(&table, &columns, "Unresolved").unwrap();
        let result = RevenueCalculator::new().calculate(&set, &table, &columns);
        assert!(matches!(result, Err(SchemaError::MissingColumn { .. })));
    }
}
