use crate::error::DbError;
use chrono::NaiveDate;
use core_types::FilterParams;

/// A value bound to one `?` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Date(NaiveDate),
    Text(String),
}

/// A rendered SQL statement and its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<QueryParam>,
}

impl BuiltQuery {
    fn new(sql: String, params: Vec<QueryParam>) -> Self {
        Self { sql, params }
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Builds the parameterized SQL for every report the dashboard shows.
///
/// Every report shares the same filter shape: the posting date range, then an
/// optional fund `IN` list, then an optional custodian `IN` list. Parameters
/// are emitted in exactly that order.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    view: String,
}

impl QueryBuilder {
    /// `schema` is interpolated into the SQL, so it must be a plain identifier.
    pub fn new(schema: &str) -> Result<Self, DbError> {
        let valid = !schema.is_empty()
            && schema
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(DbError::InvalidIdentifier(schema.to_string()));
        }
        Ok(Self {
            view: format!("{schema}.vw_extrato"),
        })
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Row-level ledger listing, newest first.
    pub fn build_extract_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = filter_conditions(filters);
        let mut sql = format!(
            r#"
        SELECT
            COALESCE(CAST(id_origem AS CHAR), '') AS id_origem,
            COALESCE(fonte, '') AS fonte,
            COALESCE(CAST(id_carteira AS CHAR), '') AS id_carteira,
            COALESCE(nmfundo, '') AS nmfundo,
            cnpj,
            dt_lancamento,
            CAST(COALESCE(entrada, 0) AS DECIMAL(20, 2)) AS entrada,
            CAST(COALESCE(saida, 0) AS DECIMAL(20, 2)) AS saida,
            CAST(COALESCE(saldo, 0) AS DECIMAL(20, 2)) AS saldo,
            lancamento
        FROM {view}
        WHERE {conditions}
        ORDER BY dt_lancamento DESC, nmfundo"#,
            view = self.view,
        );
        if let Some(limit) = filters.limit {
            sql.push_str(&format!("\n        LIMIT {limit}"));
        }
        BuiltQuery::new(sql, params)
    }

    /// Cash-flow aggregates per fund and custodian.
    pub fn build_liquidity_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = grouped_conditions(filters);
        let sql = format!(
            r#"
        SELECT
            nmfundo,
            fonte,
            CAST(SUM(COALESCE(entrada, 0)) AS DECIMAL(20, 2)) AS total_entries,
            CAST(SUM(COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS total_exits,
            CAST(SUM(COALESCE(entrada, 0) - COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS net_flow,
            COUNT(*) AS operation_count,
            COUNT(DISTINCT DATE(dt_lancamento)) AS active_days,
            CAST(AVG(COALESCE(entrada, 0) - COALESCE(saida, 0)) AS DECIMAL(20, 4)) AS avg_daily_flow,
            CAST(STDDEV(COALESCE(entrada, 0) - COALESCE(saida, 0)) AS DECIMAL(20, 4)) AS flow_volatility,
            CAST(MAX(ABS(COALESCE(entrada, 0) - COALESCE(saida, 0))) AS DECIMAL(20, 2)) AS max_daily_flow,
            CAST(MIN(COALESCE(saldo, 0)) AS DECIMAL(20, 2)) AS min_balance,
            CAST(MAX(COALESCE(saldo, 0)) AS DECIMAL(20, 2)) AS max_balance
        FROM {view}
        WHERE {conditions}
        GROUP BY nmfundo, fonte
        HAVING SUM(ABS(COALESCE(entrada, 0)) + ABS(COALESCE(saida, 0))) > 0
        ORDER BY total_entries + total_exits DESC"#,
            view = self.view,
        );
        BuiltQuery::new(sql, params)
    }

    /// Daily aggregates per fund and custodian.
    pub fn build_daily_metrics_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = grouped_conditions(filters);
        let sql = format!(
            r#"
        SELECT
            DATE(dt_lancamento) AS date,
            nmfundo,
            fonte,
            CAST(SUM(COALESCE(entrada, 0)) AS DECIMAL(20, 2)) AS daily_entries,
            CAST(SUM(COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS daily_exits,
            CAST(SUM(COALESCE(entrada, 0) - COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS daily_net_flow,
            COUNT(*) AS daily_operations,
            CAST(AVG(COALESCE(saldo, 0)) AS DECIMAL(20, 4)) AS avg_balance,
            CAST(MAX(COALESCE(saldo, 0)) AS DECIMAL(20, 2)) AS max_balance,
            CAST(MIN(COALESCE(saldo, 0)) AS DECIMAL(20, 2)) AS min_balance
        FROM {view}
        WHERE {conditions}
        GROUP BY DATE(dt_lancamento), nmfundo, fonte
        ORDER BY date DESC, nmfundo"#,
            view = self.view,
        );
        BuiltQuery::new(sql, params)
    }

    /// Each fund's share of the total absolute volume. The filters apply inside
    /// the `fund_totals` CTE so the grand total covers the filtered set only.
    pub fn build_concentration_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = grouped_conditions(filters);
        let sql = format!(
            r#"
        WITH fund_totals AS (
            SELECT
                nmfundo,
                fonte,
                SUM(ABS(COALESCE(entrada, 0)) + ABS(COALESCE(saida, 0))) AS total_volume,
                COUNT(*) AS operation_count
            FROM {view}
            WHERE {conditions}
            GROUP BY nmfundo, fonte
        ),
        overall_total AS (
            SELECT SUM(total_volume) AS grand_total
            FROM fund_totals
        )
        SELECT
            f.nmfundo,
            f.fonte,
            CAST(f.total_volume AS DECIMAL(20, 2)) AS total_volume,
            f.operation_count,
            CAST(ROUND((f.total_volume / o.grand_total) * 100, 2) AS DECIMAL(7, 2)) AS concentration_pct,
            CASE
                WHEN (f.total_volume / o.grand_total) * 100 > 30 THEN 'Alto'
                WHEN (f.total_volume / o.grand_total) * 100 > 20 THEN 'Médio'
                ELSE 'Baixo'
            END AS concentration_level
        FROM fund_totals f
        CROSS JOIN overall_total o
        WHERE f.total_volume > 0
        ORDER BY concentration_pct DESC"#,
            view = self.view,
        );
        BuiltQuery::new(sql, params)
    }

    /// Posting-level balance changes with the previous balance of the same fund.
    pub fn build_balance_evolution_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = grouped_conditions(filters);
        let sql = format!(
            r#"
        SELECT
            DATE(dt_lancamento) AS date,
            nmfundo,
            fonte,
            CAST(COALESCE(entrada, 0) - COALESCE(saida, 0) AS DECIMAL(20, 2)) AS daily_change,
            CAST(COALESCE(saldo, 0) AS DECIMAL(20, 2)) AS balance,
            CAST(LAG(COALESCE(saldo, 0)) OVER (
                PARTITION BY nmfundo ORDER BY dt_lancamento
            ) AS DECIMAL(20, 2)) AS previous_balance
        FROM {view}
        WHERE {conditions}
        ORDER BY dt_lancamento, nmfundo"#,
            view = self.view,
        );
        BuiltQuery::new(sql, params)
    }

    /// Totals per operation category, derived from the posting description.
    pub fn build_operation_summary_query(&self, filters: &FilterParams) -> BuiltQuery {
        let (conditions, params) = filter_conditions(filters);
        // `%` inside the LIKE patterns is literal SQL, not a placeholder.
        let sql = format!(
            r#"
        SELECT
            CASE
                WHEN LOWER(lancamento) LIKE '%taxa%' OR LOWER(lancamento) LIKE '%fee%' THEN 'Taxa'
                WHEN LOWER(lancamento) LIKE '%aplic%' OR LOWER(lancamento) LIKE '%aporte%' THEN 'Aplicação'
                WHEN LOWER(lancamento) LIKE '%resgate%' OR LOWER(lancamento) LIKE '%saque%' THEN 'Resgate'
                WHEN LOWER(lancamento) LIKE '%rendimento%' OR LOWER(lancamento) LIKE '%juros%' THEN 'Rendimento'
                WHEN LOWER(lancamento) LIKE '%compra%' THEN 'Compra'
                WHEN LOWER(lancamento) LIKE '%venda%' THEN 'Venda'
                ELSE 'Outros'
            END AS categoria,
            COUNT(*) AS total_operations,
            CAST(SUM(COALESCE(entrada, 0)) AS DECIMAL(20, 2)) AS total_entries,
            CAST(SUM(COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS total_exits,
            CAST(SUM(COALESCE(entrada, 0) - COALESCE(saida, 0)) AS DECIMAL(20, 2)) AS net_amount,
            COUNT(DISTINCT nmfundo) AS affected_funds,
            CAST(AVG(ABS(COALESCE(entrada, 0) - COALESCE(saida, 0))) AS DECIMAL(20, 4)) AS avg_operation_size
        FROM {view}
        WHERE {conditions}
        GROUP BY categoria
        HAVING total_operations > 0
        ORDER BY ABS(net_amount) DESC"#,
            view = self.view,
        );
        BuiltQuery::new(sql, params)
    }

    pub fn build_distinct_funds_query(&self) -> BuiltQuery {
        let sql = format!(
            r#"
        SELECT DISTINCT nmfundo
        FROM {view}
        WHERE nmfundo IS NOT NULL
        AND nmfundo != ''
        ORDER BY nmfundo
        LIMIT 1000"#,
            view = self.view,
        );
        BuiltQuery::new(sql, Vec::new())
    }

    pub fn build_distinct_custodians_query(&self) -> BuiltQuery {
        let sql = format!(
            r#"
        SELECT DISTINCT fonte
        FROM {view}
        WHERE fonte IS NOT NULL
        AND fonte != ''
        ORDER BY fonte"#,
            view = self.view,
        );
        BuiltQuery::new(sql, Vec::new())
    }
}

/// The shared WHERE body and its parameters.
fn filter_conditions(filters: &FilterParams) -> (String, Vec<QueryParam>) {
    let mut conditions = vec!["DATE(dt_lancamento) BETWEEN ? AND ?".to_string()];
    let mut params = vec![
        QueryParam::Date(filters.start_date),
        QueryParam::Date(filters.end_date),
    ];

    if let Some(funds) = &filters.funds {
        conditions.push(format!("nmfundo IN ({})", placeholders(funds.len())));
        params.extend(funds.iter().cloned().map(QueryParam::Text));
    }
    if let Some(custodians) = &filters.custodians {
        conditions.push(format!("fonte IN ({})", placeholders(custodians.len())));
        params.extend(custodians.iter().cloned().map(QueryParam::Text));
    }

    (conditions.join("\n        AND "), params)
}

/// Filter conditions for reports keyed by fund and custodian. Postings
/// without either name cannot be attributed and are left out.
fn grouped_conditions(filters: &FilterParams) -> (String, Vec<QueryParam>) {
    let (conditions, params) = filter_conditions(filters);
    (
        format!("{conditions}\n        AND nmfundo IS NOT NULL\n        AND fonte IS NOT NULL"),
        params,
    )
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
