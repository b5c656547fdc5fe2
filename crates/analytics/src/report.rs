use chrono::{DateTime, Utc};
use core_types::{AnalysisType, Severity};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single computed indicator, e.g. the liquidity ratio of one fund.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub name: String,
    /// `None` when the indicator is unbounded (a liquidity ratio with no exits).
    pub value: Option<Decimal>,
    pub status: String,
    pub severity: Severity,
    pub metadata: Map<String, Value>,
}

impl Metric {
    pub fn new(
        name: impl Into<String>,
        value: Option<Decimal>,
        status: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            status: status.into(),
            severity,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.metadata = map;
        }
        self
    }

    /// The value with `precision` decimals, or `∞` when unbounded.
    pub fn formatted_value(&self, precision: usize) -> String {
        match self.value {
            Some(value) => format!("{:.*}", precision, value.round_dp(precision as u32)),
            None => "∞".to_string(),
        }
    }
}

/// A warning or critical finding raised by an analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AnalysisType,
    pub severity: Severity,
    pub fund: String,
    pub message: String,
    pub value: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Map<String, Value>,
}

impl Alert {
    /// Builds an alert carrying the metric's severity, value and metadata.
    pub fn from_metric(
        kind: AnalysisType,
        fund: impl Into<String>,
        message: String,
        metric: &Metric,
    ) -> Self {
        Self {
            kind,
            severity: metric.severity,
            fund: fund.into(),
            message,
            value: metric.value,
            timestamp: Utc::now(),
            metadata: metric.metadata.clone(),
        }
    }
}

/// The outcome of one analysis, ready to be rendered.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub analysis_type: AnalysisType,
    pub success: bool,
    pub metrics: BTreeMap<String, Metric>,
    pub alerts: Vec<Alert>,
    pub data: Value,
    pub summary: Option<String>,
    pub message: Option<String>,
}

impl AnalysisResult {
    pub fn success(
        analysis_type: AnalysisType,
        metrics: BTreeMap<String, Metric>,
        alerts: Vec<Alert>,
        data: Value,
        summary: String,
    ) -> Self {
        Self {
            analysis_type,
            success: true,
            metrics,
            alerts,
            data,
            summary: Some(summary),
            message: None,
        }
    }

    /// An empty result explaining why the analysis could not run.
    pub fn failure(analysis_type: AnalysisType, message: impl Into<String>) -> Self {
        Self {
            analysis_type,
            success: false,
            metrics: BTreeMap::new(),
            alerts: Vec::new(),
            data: Value::Null,
            summary: None,
            message: Some(message.into()),
        }
    }

    pub fn critical_alerts(&self) -> Vec<&Alert> {
        self.alerts_with(Severity::Critical)
    }

    pub fn warning_alerts(&self) -> Vec<&Alert> {
        self.alerts_with(Severity::Warning)
    }

    pub fn has_issues(&self) -> bool {
        self.alerts.iter().any(|a| a.severity.is_alerting())
    }

    /// The display dictionary served to the dashboard.
    pub fn to_display(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    fn alerts_with(&self, severity: Severity) -> Vec<&Alert> {
        self.alerts.iter().filter(|a| a.severity == severity).collect()
    }
}
