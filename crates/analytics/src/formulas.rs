//! Pure ledger formulas shared by the analyses and the KPI calculator.

use crate::error::AnalyticsError;
use chrono::NaiveDate;
use core_types::DailyMetricRow;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;

/// Entries over absolute exits. `None` when there were no exits.
pub fn liquidity_ratio(entries: Decimal, exits: Decimal) -> Option<Decimal> {
    if exits.is_zero() {
        None
    } else {
        Some(entries / exits.abs())
    }
}

/// Each volume as a percentage of the total. All zero when the total is zero.
pub fn concentration_shares(volumes: &[Decimal]) -> Vec<Decimal> {
    let total: Decimal = volumes.iter().sum();
    if total.is_zero() {
        return vec![Decimal::ZERO; volumes.len()];
    }
    volumes.iter().map(|v| v / total * dec!(100)).collect()
}

/// Herfindahl index on percentage shares, scaled to 0..=100.
///
/// One fund gives 100; `n` equal funds give `100 / n`.
pub fn herfindahl_index(volumes: &[Decimal]) -> Decimal {
    concentration_shares(volumes)
        .iter()
        .map(|share| share * share)
        .sum::<Decimal>()
        / dec!(100)
}

/// Sum that reports overflow instead of panicking.
pub fn checked_sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

/// Sample standard deviation (n - 1 denominator).
///
/// `None` below two values, or when the squared deviations leave the
/// `Decimal` range.
pub fn sample_std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let n = Decimal::from(values.len());
    let mean = checked_sum(values)? / n;
    let squared = values
        .iter()
        .map(|v| v.checked_sub(mean).and_then(|d| d.checked_mul(d)))
        .collect::<Option<Vec<_>>>()?;
    let variance = checked_sum(&squared)?.checked_div(n - Decimal::ONE)?;

    if variance.is_zero() {
        return Some(Decimal::ZERO);
    }
    variance.sqrt()
}

/// One day of a fund's running cash position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvolutionPoint {
    pub date: NaiveDate,
    pub nmfundo: String,
    pub fonte: String,
    pub daily_net_flow: Decimal,
    pub cumulative_flow: Decimal,
    /// Change of `cumulative_flow` against the fund's previous point, in percent.
    pub pct_change: Decimal,
}

/// Running sum of the daily net flow per fund, with its percentage change.
///
/// The output is ordered by fund, then date. The first point of each fund and
/// any point whose predecessor is zero get a `pct_change` of zero. Fails when a
/// running sum or a percentage leaves the `Decimal` range.
pub fn cumulative_evolution(rows: &[DailyMetricRow]) -> Result<Vec<EvolutionPoint>, AnalyticsError> {
    let mut sorted: Vec<&DailyMetricRow> = rows.iter().collect();
    sorted.sort_by(|a, b| a.nmfundo.cmp(&b.nmfundo).then(a.date.cmp(&b.date)));

    let mut points: Vec<EvolutionPoint> = Vec::with_capacity(sorted.len());
    let mut previous: Option<(&str, Decimal)> = None;

    for row in sorted {
        let prior = previous.filter(|(fund, _)| *fund == row.nmfundo.as_str());
        let overflow = || {
            AnalyticsError::InternalError(format!(
                "Evolução do fundo {} excede a precisão decimal em {}",
                row.nmfundo, row.date
            ))
        };
        let cumulative = prior
            .map_or(Decimal::ZERO, |(_, c)| c)
            .checked_add(row.daily_net_flow)
            .ok_or_else(overflow)?;
        let pct_change = match prior {
            Some((_, last)) if !last.is_zero() => cumulative
                .checked_sub(last)
                .and_then(|delta| delta.checked_div(last))
                .and_then(|ratio| ratio.checked_mul(dec!(100)))
                .ok_or_else(overflow)?,
            _ => Decimal::ZERO,
        };

        points.push(EvolutionPoint {
            date: row.date,
            nmfundo: row.nmfundo.clone(),
            fonte: row.fonte.clone(),
            daily_net_flow: row.daily_net_flow,
            cumulative_flow: cumulative,
            pct_change,
        });
        previous = Some((row.nmfundo.as_str(), cumulative));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(fund: &str, d: u32, flow: Decimal) -> DailyMetricRow {
        DailyMetricRow {
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            nmfundo: fund.to_string(),
            fonte: "BTG".to_string(),
            daily_entries: flow.max(Decimal::ZERO),
            daily_exits: (-flow).max(Decimal::ZERO),
            daily_net_flow: flow,
            daily_operations: 1,
            avg_balance: Decimal::ZERO,
            max_balance: Decimal::ZERO,
            min_balance: Decimal::ZERO,
        }
    }

    #[test]
    fn liquidity_ratio_uses_absolute_exits() {
        assert_eq!(liquidity_ratio(dec!(100), dec!(50)), Some(dec!(2)));
        assert_eq!(liquidity_ratio(dec!(100), dec!(-50)), Some(dec!(2)));
        assert_eq!(liquidity_ratio(dec!(100), Decimal::ZERO), None);
    }

    #[test]
    fn herfindahl_bounds() {
        assert_eq!(herfindahl_index(&[dec!(500)]), dec!(100));
        assert_eq!(herfindahl_index(&[dec!(10); 4]), dec!(25));
        assert_eq!(herfindahl_index(&[]), Decimal::ZERO);
        assert_eq!(herfindahl_index(&[Decimal::ZERO, Decimal::ZERO]), Decimal::ZERO);
    }

    #[test]
    fn single_fund_holds_full_share() {
        assert_eq!(concentration_shares(&[dec!(42)]), vec![dec!(100)]);
        assert_eq!(concentration_shares(&[dec!(30), dec!(10)]), vec![dec!(75), dec!(25)]);
    }

    #[test]
    fn std_dev_needs_two_values() {
        assert_eq!(sample_std_dev(&[dec!(1)]), None);
        assert_eq!(sample_std_dev(&[dec!(5), dec!(5)]), Some(Decimal::ZERO));
        // Values 2, 4, 4, 4, 5, 5, 7, 9: sample variance 32 / 7.
        let sd = sample_std_dev(&[
            dec!(2), dec!(4), dec!(4), dec!(4), dec!(5), dec!(5), dec!(7), dec!(9),
        ])
        .unwrap();
        assert_eq!(sd.round_dp(4), dec!(2.1381));
    }

    #[test]
    fn std_dev_out_of_range_is_none() {
        let huge = dec!(500000000000000);
        assert_eq!(sample_std_dev(&[Decimal::ZERO, dec!(-99.999), huge]), None);
        assert_eq!(checked_sum(&[Decimal::MAX, Decimal::ONE]), None);
    }

    #[test]
    fn evolution_overflow_is_an_error() {
        let rows = vec![day("A", 1, Decimal::MAX), day("A", 2, Decimal::MAX)];
        let err = cumulative_evolution(&rows).unwrap_err();
        assert!(matches!(err, AnalyticsError::InternalError(_)));
    }

    #[test]
    fn evolution_accumulates_per_fund() {
        let rows = vec![
            day("B", 1, dec!(10)),
            day("A", 2, dec!(50)),
            day("A", 1, dec!(100)),
            day("B", 2, dec!(-10)),
            day("B", 3, dec!(5)),
        ];

        let points = cumulative_evolution(&rows).unwrap();
        let summary: Vec<(&str, Decimal, Decimal)> = points
            .iter()
            .map(|p| (p.nmfundo.as_str(), p.cumulative_flow, p.pct_change))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("A", dec!(100), dec!(0)),
                ("A", dec!(150), dec!(50)),
                ("B", dec!(10), dec!(0)),
                ("B", dec!(0), dec!(-100)),
                // Previous cumulative is zero.
                ("B", dec!(5), dec!(0)),
            ]
        );
    }
}
