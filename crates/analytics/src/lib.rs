//! # Painel Analytics Engine
//!
//! This crate turns aggregated ledger rows into the indicators the dashboard
//! shows: liquidity ratios, concentration shares, the evolution of each fund's
//! cash position, the headline KPIs and their alerts.
//!
//! ## Architectural Principles
//!
//! - **Pure Logic:** Formulas and classifications have no knowledge of the
//!   database. The analyses read their rows through the `LedgerSource` trait,
//!   which the database crate implements.
//! - **Degrade, Don't Fail:** An analysis always produces an `AnalysisResult`.
//!   Empty data sets and source errors become a failed result carrying a
//!   message, and the cause is logged.
//!
//! ## Public API
//!
//! - `AnalyticsEngine`: the liquidity, concentration and balance-evolution analyses.
//! - `KpiCalculator` / `KpiSnapshot`: the headline KPIs computed from extract rows.
//! - `ExtractSummary`: credit/debit totals and breakdowns of an extract listing.
//! - `Metric`, `Alert`, `AnalysisResult`: the records produced by the analyses.
//! - `AnalyticsError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod error;
pub mod extract;
pub mod formulas;
pub mod kpis;
pub mod report;
pub mod source;

// Re-export the key components to create a clean, public-facing API.
pub use engine::AnalyticsEngine;
pub use error::AnalyticsError;
pub use extract::ExtractSummary;
pub use kpis::{KpiAlert, KpiCalculator, KpiSnapshot, OperationalHealth, RiskLevel};
pub use report::{Alert, AnalysisResult, Metric};
pub use source::LedgerSource;
