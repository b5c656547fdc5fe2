use crate::error::AnalyticsError;
use async_trait::async_trait;
use core_types::{ConcentrationRow, DailyMetricRow, FilterParams, LiquidityRow};

/// Where the analyses read their aggregated ledger rows from.
///
/// The database crate implements this for its repository. Tests use in-memory
/// fakes.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    async fn liquidity_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<LiquidityRow>, AnalyticsError>;

    /// Daily aggregates in ascending date order.
    async fn daily_metric_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<DailyMetricRow>, AnalyticsError>;

    async fn concentration_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<ConcentrationRow>, AnalyticsError>;
}
