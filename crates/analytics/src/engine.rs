use crate::error::AnalyticsError;
use crate::formulas::{self, EvolutionPoint};
use crate::report::{Alert, AnalysisResult, Metric};
use crate::source::LedgerSource;
use configuration::AnalyticsSettings;
use core_types::{AnalysisType, ConcentrationRow, FilterParams, LiquidityRow, Severity};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};

/// Ratio below which low liquidity is critical rather than a warning.
const CRITICAL_LIQUIDITY_RATIO: Decimal = dec!(0.5);
/// Share (%) above which a fund gets its own concentration metric.
const FUND_CONCENTRATION_WARNING: Decimal = dec!(20);
/// Share (%) above which that metric is critical.
const FUND_CONCENTRATION_CRITICAL: Decimal = dec!(30);
/// Total variation (%) of a fund's cash position that raises an alert.
const EVOLUTION_ALERT_PCT: Decimal = dec!(20);

/// A stateless calculator for the dashboard's three analyses.
///
/// Every analysis reads its rows from a [`LedgerSource`] and never fails:
/// source errors and empty data sets come back as
/// [`AnalysisResult::failure`] after being logged.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    settings: AnalyticsSettings,
}

impl AnalyticsEngine {
    pub fn new(settings: AnalyticsSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AnalyticsSettings {
        &self.settings
    }

    /// Runs the analysis named by `kind`.
    pub async fn analyze<S>(
        &self,
        kind: AnalysisType,
        source: &S,
        filters: &FilterParams,
    ) -> AnalysisResult
    where
        S: LedgerSource + ?Sized,
    {
        match kind {
            AnalysisType::Liquidity => self.analyze_liquidity(source, filters).await,
            AnalysisType::Concentration => self.analyze_concentration(source, filters).await,
            AnalysisType::BalanceEvolution => {
                self.analyze_balance_evolution(source, filters).await
            }
        }
    }

    pub async fn analyze_liquidity<S>(&self, source: &S, filters: &FilterParams) -> AnalysisResult
    where
        S: LedgerSource + ?Sized,
    {
        settle(
            AnalysisType::Liquidity,
            self.liquidity(source, filters).await,
        )
    }

    pub async fn analyze_concentration<S>(
        &self,
        source: &S,
        filters: &FilterParams,
    ) -> AnalysisResult
    where
        S: LedgerSource + ?Sized,
    {
        settle(
            AnalysisType::Concentration,
            self.concentration(source, filters).await,
        )
    }

    pub async fn analyze_balance_evolution<S>(
        &self,
        source: &S,
        filters: &FilterParams,
    ) -> AnalysisResult
    where
        S: LedgerSource + ?Sized,
    {
        settle(
            AnalysisType::BalanceEvolution,
            self.balance_evolution(source, filters).await,
        )
    }

    // --- Liquidity ---

    async fn liquidity<S>(
        &self,
        source: &S,
        filters: &FilterParams,
    ) -> Result<AnalysisResult, AnalyticsError>
    where
        S: LedgerSource + ?Sized,
    {
        let rows = source.liquidity_rows(filters).await?;
        if rows.is_empty() {
            return Err(AnalyticsError::NoData);
        }
        let daily = source.daily_metric_rows(filters).await?;

        let metrics = self.liquidity_metrics(&rows);
        let alerts: Vec<Alert> = metrics
            .iter()
            .filter(|(_, metric)| metric.severity.is_alerting())
            .map(|(fund, metric)| {
                let message = format!(
                    "Fundo {fund} com liquidez {}: {}",
                    metric.status.to_lowercase(),
                    metric.formatted_value(2)
                );
                Alert::from_metric(AnalysisType::Liquidity, fund.clone(), message, metric)
            })
            .collect();

        let total_entries: Decimal = rows.iter().map(|r| r.total_entries).sum();
        let total_exits: Decimal = rows.iter().map(|r| r.total_exits).sum();
        let data = json!({
            "liquidity_metrics": rows,
            "daily_trends": daily,
            "summary_stats": {
                "total_funds": rows.len(),
                "avg_liquidity_ratio": formulas::liquidity_ratio(total_entries, total_exits)
                    .unwrap_or(Decimal::ZERO),
            },
        });

        let critical = count_severity(&metrics, Severity::Critical);
        let warning = count_severity(&metrics, Severity::Warning);
        let summary = format!(
            "Análise de {} fundos: {critical} críticos, {warning} com alertas",
            metrics.len()
        );

        tracing::info!(funds = metrics.len(), critical, warning, "Liquidity analysis complete.");
        Ok(AnalysisResult::success(
            AnalysisType::Liquidity,
            metrics,
            alerts,
            data,
            summary,
        ))
    }

    fn liquidity_metrics(&self, rows: &[LiquidityRow]) -> BTreeMap<String, Metric> {
        let mut metrics = BTreeMap::new();
        for row in rows {
            let ratio = formulas::liquidity_ratio(row.total_entries, row.total_exits);
            let (status, severity) = self.classify_liquidity(ratio);
            let metric = Metric::new(format!("Liquidez - {}", row.nmfundo), ratio, status, severity)
                .with_metadata(json!({
                    "total_entries": row.total_entries,
                    "total_exits": row.total_exits,
                    "net_flow": row.net_flow,
                    "operation_count": row.operation_count,
                    "volatility": row.flow_volatility.unwrap_or(Decimal::ZERO),
                }));
            metrics.insert(metric_key(&metrics, &row.nmfundo, &row.fonte), metric);
        }
        metrics
    }

    fn classify_liquidity(&self, ratio: Option<Decimal>) -> (&'static str, Severity) {
        match ratio {
            Some(r) if r < self.settings.liquidity_ratio_min => {
                let severity = if r < CRITICAL_LIQUIDITY_RATIO {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                ("Baixa", severity)
            }
            Some(r) if r <= self.settings.liquidity_ratio_max => ("Normal", Severity::Info),
            // Above the band, or no exits at all.
            _ => ("Alta", Severity::Warning),
        }
    }

    // --- Concentration ---

    async fn concentration<S>(
        &self,
        source: &S,
        filters: &FilterParams,
    ) -> Result<AnalysisResult, AnalyticsError>
    where
        S: LedgerSource + ?Sized,
    {
        let rows = source.concentration_rows(filters).await?;
        if rows.is_empty() {
            return Err(AnalyticsError::NoData);
        }

        let threshold = self.settings.concentration_threshold;
        let metrics = self.concentration_metrics(&rows);
        let alerts: Vec<Alert> = metrics
            .iter()
            .filter(|(key, metric)| key.as_str() != "overall" && metric.severity.is_alerting())
            .map(|(fund, metric)| {
                let message = format!(
                    "Alta concentração no fundo {fund}: {}%",
                    metric.formatted_value(1)
                );
                Alert::from_metric(AnalysisType::Concentration, fund.clone(), message, metric)
            })
            .collect();

        let max_pct = max_concentration(&rows);
        let data = json!({
            "concentration_data": rows,
            "summary_stats": {
                "max_concentration": max_pct,
                "funds_above_threshold": rows.iter().filter(|r| r.concentration_pct > threshold).count(),
            },
        });
        let summary = format!(
            "Concentração máxima: {:.1}% - {} alertas gerados",
            max_pct.round_dp(1),
            alerts.len()
        );

        tracing::info!(funds = rows.len(), alerts = alerts.len(), "Concentration analysis complete.");
        Ok(AnalysisResult::success(
            AnalysisType::Concentration,
            metrics,
            alerts,
            data,
            summary,
        ))
    }

    fn concentration_metrics(&self, rows: &[ConcentrationRow]) -> BTreeMap<String, Metric> {
        let threshold = self.settings.concentration_threshold;
        let max_pct = max_concentration(rows);
        let above = rows.iter().filter(|r| r.concentration_pct > threshold).count();
        let volumes: Vec<Decimal> = rows.iter().map(|r| r.total_volume).collect();

        let (status, severity) = if max_pct > threshold {
            ("Alto", Severity::Warning)
        } else {
            ("Normal", Severity::Info)
        };

        let mut metrics = BTreeMap::new();
        metrics.insert(
            "overall".to_string(),
            Metric::new("Concentração Geral", Some(max_pct), status, severity).with_metadata(
                json!({
                    "high_concentration_funds": above,
                    "total_funds": rows.len(),
                    "herfindahl_index": formulas::herfindahl_index(&volumes).round_dp(2),
                }),
            ),
        );

        for row in rows
            .iter()
            .filter(|r| r.concentration_pct > FUND_CONCENTRATION_WARNING)
        {
            let severity = if row.concentration_pct > FUND_CONCENTRATION_CRITICAL {
                Severity::Critical
            } else {
                Severity::Warning
            };
            let metric = Metric::new(
                format!("Concentração - {}", row.nmfundo),
                Some(row.concentration_pct),
                row.level().label(),
                severity,
            )
            .with_metadata(json!({
                "total_volume": row.total_volume,
                "operation_count": row.operation_count,
            }));
            metrics.insert(metric_key(&metrics, &row.nmfundo, &row.fonte), metric);
        }
        metrics
    }

    // --- Balance evolution ---

    async fn balance_evolution<S>(
        &self,
        source: &S,
        filters: &FilterParams,
    ) -> Result<AnalysisResult, AnalyticsError>
    where
        S: LedgerSource + ?Sized,
    {
        let daily = source.daily_metric_rows(filters).await?;
        if daily.is_empty() {
            return Err(AnalyticsError::NoData);
        }

        let points = formulas::cumulative_evolution(&daily)?;
        let metrics = evolution_metrics(&points)?;
        let alerts: Vec<Alert> = metrics
            .iter()
            .filter(|(_, metric)| metric.value.is_some_and(|v| v.abs() > EVOLUTION_ALERT_PCT))
            .map(|(fund, metric)| {
                let message = format!(
                    "Grande variação no saldo do fundo {fund}: {}%",
                    metric.formatted_value(1)
                );
                let mut alert =
                    Alert::from_metric(AnalysisType::BalanceEvolution, fund.clone(), message, metric);
                alert.severity = Severity::Warning;
                alert
            })
            .collect();

        let periods: BTreeSet<_> = points.iter().map(|p| p.date).collect();
        let funds: BTreeSet<_> = points.iter().map(|p| p.nmfundo.as_str()).collect();
        let data = json!({
            "evolution_data": points,
            "summary_stats": {
                "total_periods": periods.len(),
                "funds_analyzed": funds.len(),
            },
        });
        let summary = format!(
            "Evolução de {} fundos analisada - {} alertas de variação",
            metrics.len(),
            alerts.len()
        );

        tracing::info!(funds = funds.len(), alerts = alerts.len(), "Balance evolution analysis complete.");
        Ok(AnalysisResult::success(
            AnalysisType::BalanceEvolution,
            metrics,
            alerts,
            data,
            summary,
        ))
    }
}

/// Per-fund variation of the running cash position. Funds with a single point are skipped.
fn evolution_metrics(points: &[EvolutionPoint]) -> Result<BTreeMap<String, Metric>, AnalyticsError> {
    let mut by_fund: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();
    for point in points {
        by_fund
            .entry(point.nmfundo.as_str())
            .or_default()
            .push(point.pct_change);
    }

    by_fund
        .into_iter()
        .filter(|(_, changes)| changes.len() > 1)
        .map(|(fund, changes)| {
            let total = formulas::checked_sum(&changes).ok_or_else(|| {
                AnalyticsError::InternalError(format!(
                    "Variação acumulada do fundo {fund} excede a precisão decimal"
                ))
            })?;
            let trend = if total > Decimal::ZERO { "Positiva" } else { "Negativa" };
            let severity = if total.abs() > EVOLUTION_ALERT_PCT {
                Severity::Warning
            } else {
                Severity::Info
            };
            let metric = Metric::new(format!("Evolução - {fund}"), Some(total), trend, severity)
                .with_metadata(json!({
                    "volatility": formulas::sample_std_dev(&changes),
                    "periods": changes.len(),
                }));
            Ok((fund.to_string(), metric))
        })
        .collect()
}

/// Collapses an analysis outcome into a result, logging failures.
fn settle(kind: AnalysisType, outcome: Result<AnalysisResult, AnalyticsError>) -> AnalysisResult {
    match outcome {
        Ok(result) => result,
        Err(AnalyticsError::NoData) => {
            tracing::warn!(analysis = %kind, "No data for analysis.");
            AnalysisResult::failure(kind, AnalyticsError::NoData.to_string())
        }
        Err(e) => {
            tracing::error!(analysis = %kind, error = %e, "Analysis failed.");
            AnalysisResult::failure(kind, e.to_string())
        }
    }
}

/// Key for a fund's metric. A fund already seen under another custodian is
/// keyed `"<fund> / <custodian>"`.
fn metric_key(metrics: &BTreeMap<String, Metric>, fund: &str, fonte: &str) -> String {
    if metrics.contains_key(fund) {
        format!("{fund} / {fonte}")
    } else {
        fund.to_string()
    }
}

fn max_concentration(rows: &[ConcentrationRow]) -> Decimal {
    rows.iter()
        .map(|r| r.concentration_pct)
        .max()
        .unwrap_or(Decimal::ZERO)
}

fn count_severity(metrics: &BTreeMap<String, Metric>, severity: Severity) -> usize {
    metrics.values().filter(|m| m.severity == severity).count()
}
