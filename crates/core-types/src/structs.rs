use crate::enums::{ConcentrationLevel, EntryKind, OperationCategory};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A single posting from the `vw_extrato` ledger view.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ExtractEntry {
    pub id_origem: String,
    /// The custodian that reported the posting.
    pub fonte: String,
    pub id_carteira: String,
    pub nmfundo: String,
    pub cnpj: Option<String>,
    pub dt_lancamento: NaiveDateTime,
    pub entrada: Decimal,
    pub saida: Decimal,
    pub saldo: Decimal,
    pub lancamento: Option<String>,
}

impl ExtractEntry {
    pub fn net_amount(&self) -> Decimal {
        self.entrada - self.saida
    }

    pub fn entry_kind(&self) -> EntryKind {
        EntryKind::classify(self.entrada, self.saida)
    }

    pub fn category(&self) -> OperationCategory {
        OperationCategory::categorize(self.lancamento.as_deref())
    }

    pub fn date(&self) -> NaiveDate {
        self.dt_lancamento.date()
    }

    /// `YYYY-MM` bucket used for monthly grouping.
    pub fn month_key(&self) -> String {
        self.dt_lancamento.format("%Y-%m").to_string()
    }
}

/// Per fund and custodian cash-flow aggregates over the filtered period.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct LiquidityRow {
    pub nmfundo: String,
    pub fonte: String,
    pub total_entries: Decimal,
    pub total_exits: Decimal,
    pub net_flow: Decimal,
    pub operation_count: i64,
    pub active_days: i64,
    pub avg_daily_flow: Decimal,
    /// `None` when the group has a single posting.
    pub flow_volatility: Option<Decimal>,
    pub max_daily_flow: Decimal,
    pub min_balance: Decimal,
    pub max_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DailyMetricRow {
    pub date: NaiveDate,
    pub nmfundo: String,
    pub fonte: String,
    pub daily_entries: Decimal,
    pub daily_exits: Decimal,
    pub daily_net_flow: Decimal,
    pub daily_operations: i64,
    pub avg_balance: Decimal,
    pub max_balance: Decimal,
    pub min_balance: Decimal,
}

/// A fund's share of the total absolute volume in the period.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ConcentrationRow {
    pub nmfundo: String,
    pub fonte: String,
    pub total_volume: Decimal,
    pub operation_count: i64,
    pub concentration_pct: Decimal,
    pub concentration_level: String,
}

impl ConcentrationRow {
    /// The level recomputed from the percentage, independent of the SQL label.
    pub fn level(&self) -> ConcentrationLevel {
        ConcentrationLevel::from_pct(self.concentration_pct)
    }
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BalanceEvolutionRow {
    pub date: NaiveDate,
    pub nmfundo: String,
    pub fonte: String,
    pub daily_change: Decimal,
    pub balance: Decimal,
    pub previous_balance: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct OperationSummaryRow {
    pub categoria: String,
    pub total_operations: i64,
    pub total_entries: Decimal,
    pub total_exits: Decimal,
    pub net_amount: Decimal,
    pub affected_funds: i64,
    pub avg_operation_size: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn extract_entry_derived_fields() {
        let entry = ExtractEntry {
            id_origem: "1".to_string(),
            fonte: "BTG".to_string(),
            id_carteira: "77".to_string(),
            nmfundo: "FIDC Alpha".to_string(),
            cnpj: None,
            dt_lancamento: NaiveDate::from_ymd_opt(2024, 7, 9)
                .unwrap()
                .and_hms_opt(10, 30, 0)
                .unwrap(),
            entrada: dec!(0),
            saida: dec!(1500.50),
            saldo: dec!(98000),
            lancamento: Some("Resgate de cotas".to_string()),
        };

        assert_eq!(entry.net_amount(), dec!(-1500.50));
        assert_eq!(entry.entry_kind(), EntryKind::Debit);
        assert_eq!(entry.category(), OperationCategory::Resgate);
        assert_eq!(entry.month_key(), "2024-07");
    }
}
