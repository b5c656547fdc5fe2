use chrono::NaiveDate;
use core_types::{CoreError, FilterParams, PeriodPreset};
use serde::Deserialize;

/// Query-string form of the dashboard filters.
///
/// A preset other than `custom` wins over explicit dates. Missing dates fall
/// back to the default period ending today. `funds` and `custodians` are
/// comma-separated lists.
#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub preset: Option<PeriodPreset>,
    pub funds: Option<String>,
    pub custodians: Option<String>,
    pub limit: Option<u32>,
}

impl FilterQuery {
    pub fn into_params(self, today: NaiveDate, default_days: u32) -> Result<FilterParams, CoreError> {
        let (start, end) = match self.preset.and_then(|p| p.range(today)) {
            Some(range) => range,
            None => {
                let end = self.end_date.unwrap_or(today);
                let start = self
                    .start_date
                    .unwrap_or_else(|| FilterParams::last_days(end, default_days).start_date);
                (start, end)
            }
        };

        let mut params = FilterParams::new(start, end)
            .with_funds(split_list(self.funds.as_deref()))
            .with_custodians(split_list(self.custodians.as_deref()));
        params.limit = self.limit;

        params.validate()?;
        Ok(params)
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn defaults_to_period_ending_today() {
        let params = FilterQuery::default()
            .into_params(date(2024, 6, 30), 45)
            .unwrap();
        assert_eq!(params.start_date, date(2024, 5, 16));
        assert_eq!(params.end_date, date(2024, 6, 30));
        assert_eq!(params.funds, None);
    }

    #[test]
    fn preset_overrides_dates() {
        let query = FilterQuery {
            start_date: Some(date(2020, 1, 1)),
            preset: Some(PeriodPreset::Last7),
            ..Default::default()
        };
        let params = query.into_params(date(2024, 6, 30), 45).unwrap();
        assert_eq!(params.start_date, date(2024, 6, 23));
    }

    #[test]
    fn lists_are_split_and_trimmed() {
        let query = FilterQuery {
            funds: Some("Alpha, Beta ,,".to_string()),
            custodians: Some(" ".to_string()),
            ..Default::default()
        };
        let params = query.into_params(date(2024, 6, 30), 45).unwrap();
        assert_eq!(params.funds, Some(vec!["Alpha".to_string(), "Beta".to_string()]));
        assert_eq!(params.custodians, None);
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let query = FilterQuery {
            start_date: Some(date(2024, 7, 1)),
            end_date: Some(date(2024, 6, 1)),
            ..Default::default()
        };
        assert!(matches!(
            query.into_params(date(2024, 6, 30), 45),
            Err(CoreError::InvalidPeriod { .. })
        ));
    }
}
