// 🧩 Partitioner - State × Channel grouping
//
// One partition per state, named "{state}". When a state has both Branch and
// Merchant rows it is split into "{state}-Branch" and "{state}-Merchant".
// Rows in any other channel always get their own "{state}-{channel}" part,
// so they never change how Branch/Merchant rows are named.
// Partitions come out in the order their state first appears.

use crate::config::ColumnNames;
use crate::error::SchemaError;
use crate::table::{Cell, Table};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

// ============================================================================
// CHANNEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Branch,
    Merchant,
    /// Any other channel text, kept as its own bucket
    Other(String),
}

impl Channel {
    /// Exact, case-sensitive match on the export's channel labels
    pub fn parse(label: &str) -> Self {
        match label {
            "Branch" => Channel::Branch,
            "Merchant" => Channel::Merchant,
            other => Channel::Other(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Channel::Branch => "Branch",
            Channel::Merchant => "Merchant",
            Channel::Other(label) => label,
        }
    }

    /// Branch before Merchant before everything else
    fn rank(&self) -> u8 {
        match self {
            Channel::Branch => 0,
            Channel::Merchant => 1,
            Channel::Other(_) => 2,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// PARTITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Sheet name: "{state}" or "{state}-{channel}"
    pub name: String,

    /// Resolved state; None for rows neither join could place
    pub state: Option<String>,

    /// Display label for the state (unresolved label when `state` is None)
    pub state_label: String,

    pub channel: Channel,

    /// Row indices into the enriched transactions table
    pub rows: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Materialize this partition's rows under the full enriched header
    pub fn to_table(&self, enriched: &Table) -> Table {
        enriched.select_rows(self.name.clone(), &self.rows)
    }
}

/// Ordered partitions plus the states that had to be split by channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionSet {
    pub partitions: Vec<Partition>,
    pub dual_channel_states: Vec<String>,
}

impl PartitionSet {
    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.partitions.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn covered_rows(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }
}

// ============================================================================
// PARTITIONER
// ============================================================================

/// Group the enriched table by resolved state, then by channel
///
/// Every row lands in exactly one partition.
pub fn partition(
    enriched: &Table,
    columns: &ColumnNames,
    unresolved_label: &str,
) -> Result<PartitionSet, SchemaError> {
    let state_col = enriched.require_column(&columns.resolved_state)?;
    let channel_col = enriched.require_column(&columns.channel)?;

    let mut groups: Vec<StateGroup> = Vec::new();
    let mut group_index: HashMap<Option<String>, usize> = HashMap::new();

    for (idx, row) in enriched.rows().iter().enumerate() {
        let state = state_key(&row[state_col]);
        let channel = Channel::parse(row[channel_col].key_text().as_str());

        let pos = *group_index.entry(state.clone()).or_insert_with(|| {
            groups.push(StateGroup {
                state,
                channels: Vec::new(),
            });
            groups.len() - 1
        });
        groups[pos].add(channel, idx);
    }

    let mut set = PartitionSet::default();
    let mut seen_names: HashSet<String> = HashSet::new();

    for mut group in groups {
        let state_label = group
            .state
            .clone()
            .unwrap_or_else(|| unresolved_label.to_string());

        // stable: Other channels keep first-seen order among themselves
        group.channels.sort_by_key(|(channel, _)| channel.rank());

        let has_branch = group.channels.iter().any(|(c, _)| *c == Channel::Branch);
        let has_merchant = group.channels.iter().any(|(c, _)| *c == Channel::Merchant);
        let dual = has_branch && has_merchant;
        if dual {
            set.dual_channel_states.push(state_label.clone());
        }

        for (channel, rows) in group.channels {
            let name = match channel {
                Channel::Branch | Channel::Merchant if !dual => state_label.clone(),
                _ => format!("{}-{}", state_label, channel.label()),
            };

            // e.g. a real state spelled like the unresolved label
            if !seen_names.insert(name.clone()) {
                return Err(SchemaError::DuplicatePartition { name });
            }

            set.partitions.push(Partition {
                name,
                state: group.state.clone(),
                state_label: state_label.clone(),
                channel,
                rows,
            });
        }
    }

    debug!(
        partitions = set.len(),
        dual_channel = set.dual_channel_states.len(),
        rows = set.covered_rows(),
        "Partitioned transactions"
    );

    Ok(set)
}

/// Rows of one resolved state, bucketed by channel in first-seen order
struct StateGroup {
    state: Option<String>,
    channels: Vec<(Channel, Vec<usize>)>,
}

impl StateGroup {
    fn add(&mut self, channel: Channel, row: usize) {
        match self.channels.iter().position(|(c, _)| *c == channel) {
            Some(pos) => self.channels[pos].1.push(row),
            None => self.channels.push((channel, vec![row])),
        }
    }
}

fn state_key(cell: &Cell) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.key_text())
    }
}

// ============================================================================
// TESTS
// ============================================================================
