use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Invalid period: start date {start} is after end date {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },
}
