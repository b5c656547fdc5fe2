use core_types::{EntryKind, ExtractEntry, OperationCategory};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Totals of one operation category.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub net_amount: Decimal,
    pub count: usize,
}

/// Totals of one custodian.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustodianTotal {
    pub net_amount: Decimal,
    pub funds: usize,
}

/// The cards and breakdowns shown above the extract listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractSummary {
    /// Sum of the net amount of credit postings.
    pub credits: Decimal,
    /// Absolute sum of the net amount of debit postings.
    pub debits: Decimal,
    pub final_balance: Decimal,
    pub credit_count: usize,
    pub debit_count: usize,
    pub neutral_count: usize,
    pub by_category: BTreeMap<OperationCategory, CategoryTotal>,
    pub by_custodian: BTreeMap<String, CustodianTotal>,
}

impl ExtractSummary {
    pub fn from_entries(entries: &[ExtractEntry]) -> Self {
        let mut summary = Self::default();
        let mut debit_total = Decimal::ZERO;
        let mut custodian_funds: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

        for entry in entries {
            let net = entry.net_amount();
            match entry.entry_kind() {
                EntryKind::Credit => {
                    summary.credits += net;
                    summary.credit_count += 1;
                }
                EntryKind::Debit => {
                    debit_total += net;
                    summary.debit_count += 1;
                }
                EntryKind::Neutral => summary.neutral_count += 1,
            }
            summary.final_balance += net;

            let category = summary.by_category.entry(entry.category()).or_default();
            category.net_amount += net;
            category.count += 1;

            summary
                .by_custodian
                .entry(entry.fonte.clone())
                .or_default()
                .net_amount += net;
            custodian_funds
                .entry(entry.fonte.as_str())
                .or_default()
                .insert(entry.nmfundo.as_str());
        }

        summary.debits = debit_total.abs();
        for (fonte, funds) in custodian_funds {
            if let Some(total) = summary.by_custodian.get_mut(fonte) {
                total.funds = funds.len();
            }
        }
        summary
    }
}
