use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How loudly a metric or alert should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Warnings and criticals are the ones that raise alerts.
    pub fn is_alerting(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Critical)
    }
}

/// The three report analyses the dashboard offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Liquidity,
    Concentration,
    BalanceEvolution,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisType::Liquidity => "liquidity",
            AnalysisType::Concentration => "concentration",
            AnalysisType::BalanceEvolution => "balance_evolution",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a single ledger posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "Crédito")]
    Credit,
    #[serde(rename = "Débito")]
    Debit,
    #[serde(rename = "Neutro")]
    Neutral,
}

impl EntryKind {
    /// A posting with any entry is a credit; otherwise any exit makes it a debit.
    pub fn classify(entrada: Decimal, saida: Decimal) -> Self {
        if entrada > Decimal::ZERO {
            EntryKind::Credit
        } else if saida > Decimal::ZERO {
            EntryKind::Debit
        } else {
            EntryKind::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Credit => "Crédito",
            EntryKind::Debit => "Débito",
            EntryKind::Neutral => "Neutro",
        }
    }
}

/// Category derived from the free-text `lancamento` description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OperationCategory {
    Taxa,
    #[serde(rename = "Aplicação")]
    Aplicacao,
    Resgate,
    Rendimento,
    #[serde(rename = "Transferência")]
    Transferencia,
    Compra,
    Venda,
    Outros,
}

impl OperationCategory {
    /// Keyword groups, checked in order. The first group with a match wins.
    const KEYWORDS: [(OperationCategory, &'static [&'static str]); 7] = [
        (OperationCategory::Taxa, &["taxa", "fee", "tarifa"]),
        (OperationCategory::Aplicacao, &["aplic", "aplicação", "aporte"]),
        (OperationCategory::Resgate, &["resgate", "saque", "redenção"]),
        (OperationCategory::Rendimento, &["rendimento", "juros", "yield"]),
        (OperationCategory::Transferencia, &["transfer", "moviment"]),
        (OperationCategory::Compra, &["compra", "purchase"]),
        (OperationCategory::Venda, &["venda", "sale"]),
    ];

    pub fn categorize(description: Option<&str>) -> Self {
        let Some(description) = description else {
            return OperationCategory::Outros;
        };
        let lowered = description.to_lowercase();

        Self::KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
            .map(|(category, _)| *category)
            .unwrap_or(OperationCategory::Outros)
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationCategory::Taxa => "Taxa",
            OperationCategory::Aplicacao => "Aplicação",
            OperationCategory::Resgate => "Resgate",
            OperationCategory::Rendimento => "Rendimento",
            OperationCategory::Transferencia => "Transferência",
            OperationCategory::Compra => "Compra",
            OperationCategory::Venda => "Venda",
            OperationCategory::Outros => "Outros",
        }
    }
}

/// Bucket of a fund's share of the total traded volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcentrationLevel {
    Alto,
    #[serde(rename = "Médio")]
    Medio,
    Baixo,
}

impl ConcentrationLevel {
    pub fn from_pct(pct: Decimal) -> Self {
        if pct > dec!(30) {
            ConcentrationLevel::Alto
        } else if pct > dec!(20) {
            ConcentrationLevel::Medio
        } else {
            ConcentrationLevel::Baixo
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConcentrationLevel::Alto => "Alto",
            ConcentrationLevel::Medio => "Médio",
            ConcentrationLevel::Baixo => "Baixo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categorize_uses_first_matching_group() {
        assert_eq!(
            OperationCategory::categorize(Some("TAXA DE ADMINISTRACAO")),
            OperationCategory::Taxa
        );
        assert_eq!(
            OperationCategory::categorize(Some("Resgate parcial")),
            OperationCategory::Resgate
        );
        // "fee" beats "sale" because the fee group is checked first.
        assert_eq!(
            OperationCategory::categorize(Some("sale fee")),
            OperationCategory::Taxa
        );
        assert_eq!(
            OperationCategory::categorize(Some("Movimentação interna")),
            OperationCategory::Transferencia
        );
        assert_eq!(OperationCategory::categorize(Some("ajuste")), OperationCategory::Outros);
        assert_eq!(OperationCategory::categorize(None), OperationCategory::Outros);
    }

    #[test]
    fn entry_kind_prefers_credit() {
        assert_eq!(EntryKind::classify(dec!(10), dec!(5)), EntryKind::Credit);
        assert_eq!(EntryKind::classify(dec!(0), dec!(5)), EntryKind::Debit);
        assert_eq!(EntryKind::classify(dec!(0), dec!(0)), EntryKind::Neutral);
    }

    #[test]
    fn concentration_level_thresholds_are_exclusive() {
        assert_eq!(ConcentrationLevel::from_pct(dec!(30)), ConcentrationLevel::Medio);
        assert_eq!(ConcentrationLevel::from_pct(dec!(30.01)), ConcentrationLevel::Alto);
        assert_eq!(ConcentrationLevel::from_pct(dec!(20)), ConcentrationLevel::Baixo);
    }
}
