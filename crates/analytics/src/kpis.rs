use crate::formulas;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use core_types::{ExtractEntry, FilterParams, Severity};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// Columns of an extract row, used as the denominator of the null percentage.
const EXTRACT_COLUMNS: usize = 10;

/// Qualitative risk bucket shown next to a KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Alto,
    #[serde(rename = "Médio")]
    Medio,
    Baixo,
    Desconhecido,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Alto => "Alto",
            RiskLevel::Medio => "Médio",
            RiskLevel::Baixo => "Baixo",
            RiskLevel::Desconhecido => "Desconhecido",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OperationalHealth {
    Boa,
    Regular,
    Baixa,
    Desconhecida,
}

impl OperationalHealth {
    pub fn label(&self) -> &'static str {
        match self {
            OperationalHealth::Boa => "Boa",
            OperationalHealth::Regular => "Regular",
            OperationalHealth::Baixa => "Baixa",
            OperationalHealth::Desconhecida => "Desconhecida",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidityKpis {
    /// Sum of per-fund minimum balances over the sum of per-fund mean balances.
    pub ratio: Decimal,
    pub min_balance: Decimal,
    pub avg_balance: Decimal,
    /// Funds whose minimum balance fell below 10% of their mean balance.
    pub critical_funds_count: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcentrationKpis {
    pub herfindahl_index: Decimal,
    pub top_fund_pct: Decimal,
    pub top_3_funds_pct: Decimal,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceKpis {
    pub daily_avg_operations: Decimal,
    pub operational_efficiency: Decimal,
    pub flow_volatility: Decimal,
    pub health: OperationalHealth,
}

/// The headline figures of the dashboard for one filter selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_volume: Decimal,
    pub net_flow: Decimal,
    pub total_entries: Decimal,
    pub total_exits: Decimal,
    pub operation_count: usize,
    pub active_funds: usize,
    pub liquidity: LiquidityKpis,
    pub concentration: ConcentrationKpis,
    pub performance: PerformanceKpis,
    pub period_days: i64,
    pub data_quality_score: Decimal,
    pub last_update: DateTime<Utc>,
}

impl KpiSnapshot {
    /// The zeroed snapshot shown when there is nothing to measure.
    pub fn empty(period_days: i64) -> Self {
        Self {
            total_volume: Decimal::ZERO,
            net_flow: Decimal::ZERO,
            total_entries: Decimal::ZERO,
            total_exits: Decimal::ZERO,
            operation_count: 0,
            active_funds: 0,
            liquidity: LiquidityKpis {
                ratio: Decimal::ZERO,
                min_balance: Decimal::ZERO,
                avg_balance: Decimal::ZERO,
                critical_funds_count: 0,
                risk_level: RiskLevel::Desconhecido,
            },
            concentration: ConcentrationKpis {
                herfindahl_index: Decimal::ZERO,
                top_fund_pct: Decimal::ZERO,
                top_3_funds_pct: Decimal::ZERO,
                risk_level: RiskLevel::Desconhecido,
            },
            performance: PerformanceKpis {
                daily_avg_operations: Decimal::ZERO,
                operational_efficiency: Decimal::ZERO,
                flow_volatility: Decimal::ZERO,
                health: OperationalHealth::Desconhecida,
            },
            period_days,
            data_quality_score: Decimal::ZERO,
            last_update: Utc::now(),
        }
    }
}

/// A dashboard-level alert derived from the KPI snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KpiAlert {
    pub severity: Severity,
    pub title: &'static str,
    pub detail: &'static str,
}

/// Computes the KPI snapshot from raw extract rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct KpiCalculator;

impl KpiCalculator {
    pub fn new() -> Self {
        Self
    }

    /// `now` is the reference instant for the future-date quality check.
    pub fn calculate(
        &self,
        entries: &[ExtractEntry],
        filters: &FilterParams,
        now: NaiveDateTime,
    ) -> KpiSnapshot {
        let period_days = filters.period_days();
        if entries.is_empty() {
            return KpiSnapshot::empty(period_days);
        }

        let total_entries: Decimal = entries.iter().map(|e| e.entrada).sum();
        let total_exits: Decimal = entries.iter().map(|e| e.saida).sum();
        let active_funds = entries
            .iter()
            .map(|e| e.nmfundo.as_str())
            .collect::<HashSet<_>>()
            .len();

        let snapshot = KpiSnapshot {
            total_volume: total_entries.abs() + total_exits.abs(),
            net_flow: total_entries - total_exits,
            total_entries,
            total_exits,
            operation_count: entries.len(),
            active_funds,
            liquidity: liquidity_kpis(entries),
            concentration: concentration_kpis(entries),
            performance: performance_kpis(entries, period_days),
            period_days,
            data_quality_score: data_quality_score(entries, now),
            last_update: Utc::now(),
        };

        tracing::info!(
            records = entries.len(),
            funds = active_funds,
            "KPIs calculated."
        );
        snapshot
    }

    /// Alerts worth surfacing above the KPI cards.
    pub fn alerts(&self, snapshot: &KpiSnapshot) -> Vec<KpiAlert> {
        let mut alerts = Vec::new();
        if snapshot.liquidity.risk_level == RiskLevel::Alto {
            alerts.push(KpiAlert {
                severity: Severity::Critical,
                title: "Risco de Liquidez Alto",
                detail: "Saldos críticos detectados",
            });
        }
        if snapshot.concentration.risk_level == RiskLevel::Alto {
            alerts.push(KpiAlert {
                severity: Severity::Warning,
                title: "Alta Concentração",
                detail: "Risco concentrado em poucos fundos",
            });
        }
        if snapshot.data_quality_score < dec!(70) {
            alerts.push(KpiAlert {
                severity: Severity::Warning,
                title: "Qualidade de Dados Baixa",
                detail: "Verificar inconsistências",
            });
        }
        if snapshot.performance.health == OperationalHealth::Baixa {
            alerts.push(KpiAlert {
                severity: Severity::Warning,
                title: "Baixa Atividade Operacional",
                detail: "Poucas operações no período",
            });
        }
        alerts
    }
}

fn liquidity_kpis(entries: &[ExtractEntry]) -> LiquidityKpis {
    // (min, sum, count) of the balance per fund.
    let mut per_fund: BTreeMap<&str, (Decimal, Decimal, usize)> = BTreeMap::new();
    for entry in entries {
        per_fund
            .entry(entry.nmfundo.as_str())
            .and_modify(|(min, sum, count)| {
                *min = (*min).min(entry.saldo);
                *sum += entry.saldo;
                *count += 1;
            })
            .or_insert((entry.saldo, entry.saldo, 1));
    }

    let stats: Vec<(Decimal, Decimal)> = per_fund
        .values()
        .map(|(min, sum, count)| (*min, sum / Decimal::from(*count)))
        .collect();

    let min_sum: Decimal = stats.iter().map(|(min, _)| min).sum();
    let mean_sum: Decimal = stats.iter().map(|(_, mean)| mean).sum();
    let ratio = if mean_sum > Decimal::ZERO {
        (min_sum / mean_sum).round_dp(4)
    } else {
        Decimal::ZERO
    };

    let risk_level = if ratio < dec!(0.5) {
        RiskLevel::Alto
    } else if ratio < dec!(0.8) {
        RiskLevel::Medio
    } else {
        RiskLevel::Baixo
    };

    LiquidityKpis {
        ratio,
        min_balance: stats
            .iter()
            .map(|(min, _)| *min)
            .min()
            .unwrap_or(Decimal::ZERO),
        avg_balance: mean_sum / Decimal::from(stats.len().max(1)),
        critical_funds_count: stats
            .iter()
            .filter(|(min, mean)| *min < mean * dec!(0.1))
            .count(),
        risk_level,
    }
}

fn concentration_kpis(entries: &[ExtractEntry]) -> ConcentrationKpis {
    let mut per_fund: BTreeMap<&str, (Decimal, Decimal)> = BTreeMap::new();
    for entry in entries {
        let totals = per_fund.entry(entry.nmfundo.as_str()).or_default();
        totals.0 += entry.entrada;
        totals.1 += entry.saida;
    }
    let volumes: Vec<Decimal> = per_fund
        .values()
        .map(|(entrada, saida)| entrada.abs() + saida.abs())
        .collect();

    let mut shares = formulas::concentration_shares(&volumes);
    if shares.iter().all(|s| s.is_zero()) {
        return ConcentrationKpis {
            herfindahl_index: Decimal::ZERO,
            top_fund_pct: Decimal::ZERO,
            top_3_funds_pct: Decimal::ZERO,
            risk_level: RiskLevel::Desconhecido,
        };
    }
    shares.sort_unstable_by(|a, b| b.cmp(a));

    let top_fund_pct = shares[0];
    let risk_level = if top_fund_pct > dec!(50) {
        RiskLevel::Alto
    } else if top_fund_pct > dec!(30) {
        RiskLevel::Medio
    } else {
        RiskLevel::Baixo
    };

    ConcentrationKpis {
        herfindahl_index: formulas::herfindahl_index(&volumes).round_dp(2),
        top_fund_pct: top_fund_pct.round_dp(2),
        top_3_funds_pct: shares.iter().take(3).sum::<Decimal>().round_dp(2),
        risk_level,
    }
}

fn performance_kpis(entries: &[ExtractEntry], period_days: i64) -> PerformanceKpis {
    let days = Decimal::from(period_days.max(1));
    let daily_avg_operations = (Decimal::from(entries.len()) / days).round_dp(2);

    let total_entries: Decimal = entries.iter().map(|e| e.entrada).sum();
    let total_exits: Decimal = entries.iter().map(|e| e.saida).sum();
    let operational_efficiency = if total_exits.is_zero() {
        Decimal::ZERO
    } else {
        (total_entries / total_exits).abs().round_dp(4)
    };

    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for entry in entries {
        *daily.entry(entry.date()).or_default() += entry.net_amount();
    }
    let flows: Vec<Decimal> = daily.into_values().collect();
    let flow_volatility = formulas::sample_std_dev(&flows)
        .unwrap_or(Decimal::ZERO)
        .round_dp(2);

    let health = if daily_avg_operations > dec!(10) && operational_efficiency > dec!(0.8) {
        OperationalHealth::Boa
    } else if daily_avg_operations > dec!(5) {
        OperationalHealth::Regular
    } else {
        OperationalHealth::Baixa
    };

    PerformanceKpis {
        daily_avg_operations,
        operational_efficiency,
        flow_volatility,
        health,
    }
}

/// 100 minus penalties for missing values, widespread negative balances and
/// postings dated after `now`. Clamped to 0..=100.
pub fn data_quality_score(entries: &[ExtractEntry], now: NaiveDateTime) -> Decimal {
    if entries.is_empty() {
        return Decimal::ZERO;
    }

    let mut score = dec!(100);

    let nulls = entries
        .iter()
        .map(|e| usize::from(e.cnpj.is_none()) + usize::from(e.lancamento.is_none()))
        .sum::<usize>();
    if nulls > 0 {
        let cells = Decimal::from(entries.len() * EXTRACT_COLUMNS);
        score -= Decimal::from(nulls) / cells * dec!(100) * dec!(2);
    }

    let negatives = entries.iter().filter(|e| e.saldo < Decimal::ZERO).count();
    if Decimal::from(negatives) > Decimal::from(entries.len()) * dec!(0.1) {
        score -= dec!(10);
    }

    if entries.iter().any(|e| e.dt_lancamento > now) {
        score -= dec!(20);
    }

    score.clamp(Decimal::ZERO, dec!(100))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn entry(fund: &str, day: u32, entrada: Decimal, saida: Decimal, saldo: Decimal) -> ExtractEntry {
        ExtractEntry {
            id_origem: format!("{fund}-{day}"),
            fonte: "BTG".to_string(),
            id_carteira: "1".to_string(),
            nmfundo: fund.to_string(),
            cnpj: Some("00.000.000/0001-00".to_string()),
            dt_lancamento: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            entrada,
            saida,
            saldo,
            lancamento: Some("Aplicação".to_string()),
        }
    }

    fn january() -> FilterParams {
        FilterParams::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 11).unwrap(),
        )
    }

    #[test]
    fn empty_input_yields_unknown_levels() {
        let calculator = KpiCalculator::new();
        let snapshot = calculator.calculate(&[], &january(), now());

        assert_eq!(snapshot.operation_count, 0);
        assert_eq!(snapshot.period_days, 10);
        assert_eq!(snapshot.liquidity.risk_level, RiskLevel::Desconhecido);
        assert_eq!(snapshot.concentration.risk_level, RiskLevel::Desconhecido);
        assert_eq!(snapshot.performance.health, OperationalHealth::Desconhecida);
        // A zero quality score is itself worth flagging.
        let alerts = calculator.alerts(&snapshot);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Qualidade de Dados Baixa");
    }

    #[test]
    fn headline_totals_and_concentration() {
        let entries = vec![
            entry("Alpha", 2, dec!(600), dec!(0), dec!(1000)),
            entry("Alpha", 3, dec!(0), dec!(200), dec!(800)),
            entry("Beta", 2, dec!(100), dec!(0), dec!(500)),
            entry("Beta", 4, dec!(0), dec!(100), dec!(400)),
        ];

        let snapshot = KpiCalculator::new().calculate(&entries, &january(), now());

        assert_eq!(snapshot.total_entries, dec!(700));
        assert_eq!(snapshot.total_exits, dec!(300));
        assert_eq!(snapshot.total_volume, dec!(1000));
        assert_eq!(snapshot.net_flow, dec!(400));
        assert_eq!(snapshot.active_funds, 2);

        // Alpha holds 800 of 1000, Beta 200.
        assert_eq!(snapshot.concentration.top_fund_pct, dec!(80));
        assert_eq!(snapshot.concentration.top_3_funds_pct, dec!(100));
        assert_eq!(snapshot.concentration.herfindahl_index, dec!(68));
        assert_eq!(snapshot.concentration.risk_level, RiskLevel::Alto);

        // (800 + 400) / (900 + 450)
        assert_eq!(snapshot.liquidity.ratio, dec!(0.8889));
        assert_eq!(snapshot.liquidity.risk_level, RiskLevel::Baixo);
        assert_eq!(snapshot.liquidity.critical_funds_count, 0);

        assert_eq!(snapshot.performance.daily_avg_operations, dec!(0.4));
        assert_eq!(snapshot.performance.operational_efficiency, dec!(2.3333));
        assert_eq!(snapshot.performance.health, OperationalHealth::Baixa);
        assert_eq!(snapshot.data_quality_score, dec!(100));
    }

    #[test]
    fn quality_score_penalties() {
        let mut entries: Vec<ExtractEntry> = (1..=10)
            .map(|d| entry("Alpha", d, dec!(10), dec!(0), dec!(100)))
            .collect();
        assert_eq!(data_quality_score(&entries, now()), dec!(100));

        // One missing description out of 100 cells costs 2 points.
        entries[0].lancamento = None;
        assert_eq!(data_quality_score(&entries, now()), dec!(98));

        // Two negative balances out of ten exceed the 10% tolerance.
        entries[1].saldo = dec!(-5);
        entries[2].saldo = dec!(-5);
        assert_eq!(data_quality_score(&entries, now()), dec!(88));

        entries[3].dt_lancamento = now() + chrono::Duration::days(1);
        assert_eq!(data_quality_score(&entries, now()), dec!(68));
    }

    #[test]
    fn low_liquidity_raises_alert() {
        // Balance dips to zero against a mean of 500.
        let entries = vec![
            entry("Alpha", 2, dec!(0), dec!(1000), dec!(1000)),
            entry("Alpha", 3, dec!(1000), dec!(0), dec!(0)),
        ];

        let calculator = KpiCalculator::new();
        let snapshot = calculator.calculate(&entries, &january(), now());

        assert_eq!(snapshot.liquidity.ratio, Decimal::ZERO);
        assert_eq!(snapshot.liquidity.risk_level, RiskLevel::Alto);
        assert_eq!(snapshot.liquidity.critical_funds_count, 1);
        assert!(
            calculator
                .alerts(&snapshot)
                .iter()
                .any(|a| a.severity == Severity::Critical)
        );
    }
}
