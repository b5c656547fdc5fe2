pub mod enums;
pub mod error;
pub mod filter;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{AnalysisType, ConcentrationLevel, EntryKind, OperationCategory, Severity};
pub use error::CoreError;
pub use filter::{FilterParams, PeriodPreset};
pub use structs::{
    BalanceEvolutionRow, ConcentrationRow, DailyMetricRow, ExtractEntry, LiquidityRow,
    OperationSummaryRow,
};
