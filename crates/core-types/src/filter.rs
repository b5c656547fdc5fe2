use crate::error::CoreError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// The filter applied to every ledger query.
///
/// `funds` and `custodians` are `None` when there is no restriction. When they
/// are present they are never empty, since each member becomes one `IN (...)`
/// placeholder in the generated SQL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterParams {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub funds: Option<Vec<String>>,
    pub custodians: Option<Vec<String>>,
    pub limit: Option<u32>,
}

impl FilterParams {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            funds: None,
            custodians: None,
            limit: None,
        }
    }

    /// The period of `days` days ending on `today` (inclusive).
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        Self::new(today - Duration::days(i64::from(days)), today)
    }

    /// Restricts the query to the given funds. An empty selection means "all funds".
    pub fn with_funds(mut self, funds: Vec<String>) -> Self {
        self.funds = non_empty(funds);
        self
    }

    /// Restricts the query to the given custodians. An empty selection means "all".
    pub fn with_custodians(mut self, custodians: Vec<String>) -> Self {
        self.custodians = non_empty(custodians);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.start_date > self.end_date {
            return Err(CoreError::InvalidPeriod {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if matches!(&self.funds, Some(f) if f.is_empty()) {
            return Err(CoreError::InvalidInput(
                "funds".to_string(),
                "fund list must not be empty when present".to_string(),
            ));
        }
        if matches!(&self.custodians, Some(c) if c.is_empty()) {
            return Err(CoreError::InvalidInput(
                "custodians".to_string(),
                "custodian list must not be empty when present".to_string(),
            ));
        }
        if self.limit == Some(0) {
            return Err(CoreError::InvalidInput(
                "limit".to_string(),
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of days between start and end. A single-day period is 0.
    pub fn period_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    let values: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then_some(values)
}

/// The period shortcuts offered next to the custom date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodPreset {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7d")]
    Last7,
    #[serde(rename = "30d")]
    Last30,
    #[serde(rename = "45d")]
    Last45,
    #[serde(rename = "custom")]
    Custom,
}

impl PeriodPreset {
    pub fn days(&self) -> Option<u32> {
        match self {
            PeriodPreset::Today => Some(0),
            PeriodPreset::Last7 => Some(7),
            PeriodPreset::Last30 => Some(30),
            PeriodPreset::Last45 => Some(45),
            PeriodPreset::Custom => None,
        }
    }

    /// The `(start, end)` range for this preset, or `None` for a custom period.
    pub fn range(&self, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        self.days()
            .map(|days| (today - Duration::days(i64::from(days)), today))
    }
}
