use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Sem dados para análise")]
    NoData,

    #[error("Failed to read ledger data: {0}")]
    Source(String),

    #[error("An unexpected error occurred during analytics calculation: {0}")]
    InternalError(String),
}
