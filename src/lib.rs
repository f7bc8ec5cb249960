// Fino Split - Core Library
// State/channel revenue split of transaction exports.
// Exposes the pipeline for the web server and tests.

pub mod config;
pub mod error;
pub mod table;
pub mod loader;       // Workbook bytes → Table
pub mod extractor;    // Agent login digits
pub mod normalizer;   // Branch id keys
pub mod resolver;     // Two-stage state join
pub mod partitioner;  // State × channel partitions
pub mod revenue;      // Fee + tax per partition
pub mod summary;      // Summary sheet + total row
pub mod writer;       // Tables → xlsx
pub mod pipeline;     // Request → artifact

// Re-export commonly used types
pub use config::{ColumnNames, FeeSchedule, InputLayouts, PipelineConfig, SheetLayout};
pub use error::SchemaError;
pub use table::{Cell, Table};
pub use loader::read_sheet;
pub use extractor::LoginExtractor;
pub use normalizer::{normalize_branch_id, normalize_branch_ids, NormalizeStats};
pub use resolver::{ResolutionSource, ResolutionStats, StateLookup, StateResolver};
pub use partitioner::{partition, Channel, Partition, PartitionSet};
pub use revenue::{PartitionTotals, RevenueCalculator};
pub use summary::{Summary, SummaryRow, SUMMARY_COLUMNS, SUMMARY_SHEET, TOTAL_LABEL};
pub use writer::write_workbook;
pub use pipeline::{build_report, Report, ReportArtifact, ReportRequest, RunStats, REPORT_FILENAME};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
