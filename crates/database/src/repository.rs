use crate::DbError;
use crate::queries::{BuiltQuery, QueryBuilder, QueryParam};
use analytics::{AnalyticsError, LedgerSource};
use async_trait::async_trait;
use core_types::{
    BalanceEvolutionRow, ConcentrationRow, DailyMetricRow, ExtractEntry, FilterParams,
    LiquidityRow, OperationSummaryRow,
};
use sqlx::mysql::{MySqlPool, MySqlRow};
use sqlx::FromRow;

/// The `DbRepository` provides a high-level, application-specific interface
/// to the ledger view. It encapsulates all SQL queries and data access logic.
///
/// A repository built with [`DbRepository::offline`] has no pool; every read
/// returns [`DbError::Offline`] so callers can degrade to demo behaviour.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: Option<MySqlPool>,
    queries: QueryBuilder,
}

impl DbRepository {
    pub fn new(pool: MySqlPool, schema: &str) -> Result<Self, DbError> {
        Ok(Self {
            pool: Some(pool),
            queries: QueryBuilder::new(schema)?,
        })
    }

    pub fn offline(schema: &str) -> Result<Self, DbError> {
        Ok(Self {
            pool: None,
            queries: QueryBuilder::new(schema)?,
        })
    }

    pub fn is_connected(&self) -> bool {
        self.pool.as_ref().is_some_and(|pool| !pool.is_closed())
    }

    pub fn queries(&self) -> &QueryBuilder {
        &self.queries
    }

    /// Closes every pooled connection. Later reads fail with a query error.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
            tracing::info!("Database connection pool closed.");
        }
    }

    fn pool(&self) -> Result<&MySqlPool, DbError> {
        self.pool.as_ref().ok_or(DbError::Offline)
    }

    /// Runs a built query, binding each parameter in placeholder order.
    async fn fetch<T>(&self, query: BuiltQuery) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, MySqlRow> + Send + Unpin,
    {
        let pool = self.pool()?;
        let BuiltQuery { sql, params } = query;

        let mut statement = sqlx::query_as::<_, T>(&sql);
        for param in params {
            statement = match param {
                QueryParam::Date(date) => statement.bind(date),
                QueryParam::Text(text) => statement.bind(text),
            };
        }

        statement.fetch_all(pool).await.map_err(|e| {
            tracing::error!(error = ?e, "Ledger query failed.");
            DbError::QueryError(e)
        })
    }

    async fn fetch_names(&self, query: BuiltQuery) -> Result<Vec<String>, DbError> {
        let pool = self.pool()?;
        let names = sqlx::query_scalar::<_, String>(&query.sql)
            .fetch_all(pool)
            .await?;
        Ok(names)
    }

    /// Row-level postings, newest first, truncated at `filters.limit`.
    pub async fn get_extract_data(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<ExtractEntry>, DbError> {
        let rows = self.fetch(self.queries.build_extract_query(filters)).await?;
        tracing::info!(rows = rows.len(), "Extract data loaded.");
        Ok(rows)
    }

    pub async fn get_available_funds(&self) -> Result<Vec<String>, DbError> {
        self.fetch_names(self.queries.build_distinct_funds_query())
            .await
    }

    pub async fn get_available_custodians(&self) -> Result<Vec<String>, DbError> {
        self.fetch_names(self.queries.build_distinct_custodians_query())
            .await
    }

    pub async fn get_liquidity_metrics(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<LiquidityRow>, DbError> {
        self.fetch(self.queries.build_liquidity_query(filters)).await
    }

    /// Daily aggregates in chronological order (the SQL returns newest first).
    pub async fn get_daily_metrics(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<DailyMetricRow>, DbError> {
        let mut rows: Vec<DailyMetricRow> =
            self.fetch(self.queries.build_daily_metrics_query(filters)).await?;
        rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.nmfundo.cmp(&b.nmfundo)));
        Ok(rows)
    }

    pub async fn get_concentration_analysis(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<ConcentrationRow>, DbError> {
        self.fetch(self.queries.build_concentration_query(filters))
            .await
    }

    pub async fn get_balance_evolution(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<BalanceEvolutionRow>, DbError> {
        self.fetch(self.queries.build_balance_evolution_query(filters))
            .await
    }

    pub async fn get_operation_summary(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<OperationSummaryRow>, DbError> {
        self.fetch(self.queries.build_operation_summary_query(filters))
            .await
    }
}

impl From<DbError> for AnalyticsError {
    fn from(e: DbError) -> Self {
        AnalyticsError::Source(e.to_string())
    }
}

#[async_trait]
impl LedgerSource for DbRepository {
    async fn liquidity_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<LiquidityRow>, AnalyticsError> {
        Ok(self.get_liquidity_metrics(filters).await?)
    }

    async fn daily_metric_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<DailyMetricRow>, AnalyticsError> {
        Ok(self.get_daily_metrics(filters).await?)
    }

    async fn concentration_rows(
        &self,
        filters: &FilterParams,
    ) -> Result<Vec<ConcentrationRow>, AnalyticsError> {
        Ok(self.get_concentration_analysis(filters).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn filters() -> FilterParams {
        FilterParams::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn offline_reads_report_offline() {
        let repo = DbRepository::offline("DW_STAGING").unwrap();
        assert!(!repo.is_connected());

        assert!(matches!(
            repo.get_extract_data(&filters()).await,
            Err(DbError::Offline)
        ));
        assert!(matches!(
            repo.get_available_funds().await,
            Err(DbError::Offline)
        ));
        assert!(matches!(
            repo.get_daily_metrics(&filters()).await,
            Err(DbError::Offline)
        ));
    }

    #[tokio::test]
    async fn offline_source_maps_to_analytics_error() {
        let repo = DbRepository::offline("DW_STAGING").unwrap();
        let err = repo.liquidity_rows(&filters()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Source(_)));
    }

    #[test]
    fn rejects_unsafe_schema() {
        let err = DbRepository::offline("x; DROP TABLE y").unwrap_err();
        assert!(matches!(err, DbError::InvalidIdentifier(_)));
    }
}
