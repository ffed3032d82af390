//! Source record readers
//!
//! Read-only access to the operational tables owned by other modules
//! (field reports, loans, materials, payroll). Those tables may be absent,
//! so every pass starts with a [`SchemaCapabilities`] probe and readers only
//! touch tables the probe found.
//!
//! Amount columns are read as TEXT and dates as raw strings; the adapters
//! parse them per record so one bad row never fails a whole domain.

use crate::error::PersistenceResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashSet;

// ============================================================================
// Schema capability probe
// ============================================================================

/// Which optional source tables exist in this database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCapabilities {
    pub field_reports: bool,
    /// `clients` table available for the report client name
    pub clients: bool,
    /// `worker_loans`, or legacy `loans`
    pub loans_table: Option<&'static str>,
    /// `loan_repayments`, or `worker_loan_repayments`
    pub repayments_table: Option<&'static str>,
    pub materials: bool,
    /// `materials_transactions.payment_method` column present
    pub materials_payment_method: bool,
    /// both `payroll_runs` and `payroll_entries`
    pub payroll: bool,
}

impl SchemaCapabilities {
    /// Probe sqlite_master once
    pub async fn probe(pool: &SqlitePool) -> PersistenceResult<Self> {
        let names: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table'")
                .fetch_all(pool)
                .await?;
        let tables: HashSet<String> = names.into_iter().map(|(n,)| n).collect();
        let has = |name: &str| tables.contains(name);

        let loans_table = if has("worker_loans") {
            Some("worker_loans")
        } else if has("loans") {
            Some("loans")
        } else {
            None
        };

        let repayments_table = match loans_table {
            Some(_) if has("loan_repayments") => Some("loan_repayments"),
            Some("worker_loans") if has("worker_loan_repayments") => Some("worker_loan_repayments"),
            _ => None,
        };

        let materials = has("materials_transactions");
        let materials_payment_method = if materials {
            let cols: Vec<(String,)> =
                sqlx::query_as("SELECT name FROM pragma_table_info('materials_transactions')")
                    .fetch_all(pool)
                    .await?;
            cols.iter().any(|(c,)| c == "payment_method")
        } else {
            false
        };

        Ok(Self {
            field_reports: has("field_reports"),
            clients: has("clients"),
            loans_table,
            repayments_table,
            materials,
            materials_payment_method,
            payroll: has("payroll_runs") && has("payroll_entries"),
        })
    }
}

// ============================================================================
// Source rows
// ============================================================================

/// Row from `field_reports`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct FieldReportRow {
    pub id: i64,
    pub report_id: Option<String>,
    pub report_date: Option<String>,
    pub site_name: Option<String>,
    pub client_name: Option<String>,
    pub contract_sum: String,
    pub rig_fee_charged: String,
    pub rig_fee_collected: String,
    pub cash_received: String,
    pub materials_income: String,
    pub materials_cost: String,
    pub momo_transfer: String,
    pub cash_given: String,
    pub bank_deposit: String,
    pub total_wages: String,
    pub total_expenses: String,
    pub total_income: String,
    pub net_profit: Option<String>,
}

/// Row from `worker_loans` / `loans`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoanRow {
    pub id: i64,
    pub worker_name: Option<String>,
    pub loan_amount: String,
    pub issue_date: Option<String>,
}

/// Row from `loan_repayments` / `worker_loan_repayments`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct RepaymentRow {
    pub id: i64,
    pub loan_id: i64,
    pub worker_name: Option<String>,
    pub repayment_amount: String,
    pub repayment_date: Option<String>,
}

/// Purchase row from `materials_transactions`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct MaterialsPurchaseRow {
    pub id: i64,
    pub material_type: Option<String>,
    pub quantity_received: String,
    pub unit_cost: String,
    pub transaction_date: Option<String>,
    pub payment_method: Option<String>,
}

/// Row from `payroll_runs`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PayrollRunRow {
    pub id: i64,
    pub run_date: Option<String>,
    pub period_label: Option<String>,
}

/// Row from `payroll_entries`
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PayrollEntryRow {
    pub id: i64,
    pub payroll_run_id: i64,
    pub worker_name: Option<String>,
    pub amount: String,
    pub benefits: String,
    pub loan_reclaim: String,
}

// ============================================================================
// Source Repository
// ============================================================================

/// Read-only queries over the operational tables.
///
/// Table names come from [`SchemaCapabilities`] and are never user input.
pub struct SourceRepo;

impl SourceRepo {
    pub async fn field_reports(
        pool: &SqlitePool,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<FieldReportRow>> {
        let (client_select, client_join) = if caps.clients {
            ("c.client_name", "LEFT JOIN clients c ON fr.client_id = c.id")
        } else {
            ("NULL", "")
        };
        let sql = format!(
            r#"
            SELECT fr.id, fr.report_id, fr.report_date, fr.site_name, {client_select} AS client_name,
                {contract_sum}, {rig_fee_charged}, {rig_fee_collected}, {cash_received},
                {materials_income}, {materials_cost}, {momo_transfer}, {cash_given},
                {bank_deposit}, {total_wages}, {total_expenses}, {total_income},
                CAST(fr.net_profit AS TEXT) AS net_profit
            FROM field_reports fr
            {client_join}
            WHERE (? IS NULL OR fr.report_date >= ?)
            ORDER BY fr.report_date ASC, fr.id ASC
            "#,
            contract_sum = amount("fr.contract_sum", "contract_sum"),
            rig_fee_charged = amount("fr.rig_fee_charged", "rig_fee_charged"),
            rig_fee_collected = amount("fr.rig_fee_collected", "rig_fee_collected"),
            cash_received = amount("fr.cash_received", "cash_received"),
            materials_income = amount("fr.materials_income", "materials_income"),
            materials_cost = amount("fr.materials_cost", "materials_cost"),
            momo_transfer = amount("fr.momo_transfer", "momo_transfer"),
            cash_given = amount("fr.cash_given", "cash_given"),
            bank_deposit = amount("fr.bank_deposit", "bank_deposit"),
            total_wages = amount("fr.total_wages", "total_wages"),
            total_expenses = amount("fr.total_expenses", "total_expenses"),
            total_income = amount("fr.total_income", "total_income"),
        );

        let rows = sqlx::query_as::<_, FieldReportRow>(&sql)
            .bind(since)
            .bind(since)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn loans(
        pool: &SqlitePool,
        loans_table: &str,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<LoanRow>> {
        let sql = format!(
            r#"
            SELECT id, worker_name, {loan_amount}, issue_date
            FROM {loans_table}
            WHERE (? IS NULL OR issue_date >= ?)
            ORDER BY issue_date ASC, id ASC
            "#,
            loan_amount = amount("loan_amount", "loan_amount"),
        );
        let rows = sqlx::query_as::<_, LoanRow>(&sql)
            .bind(since)
            .bind(since)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn repayments(
        pool: &SqlitePool,
        repayments_table: &str,
        loans_table: &str,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<RepaymentRow>> {
        let sql = format!(
            r#"
            SELECT lr.id, lr.loan_id, wl.worker_name, {repayment_amount}, lr.repayment_date
            FROM {repayments_table} lr
            JOIN {loans_table} wl ON lr.loan_id = wl.id
            WHERE (? IS NULL OR lr.repayment_date >= ?)
            ORDER BY lr.repayment_date ASC, lr.id ASC
            "#,
            repayment_amount = amount("lr.repayment_amount", "repayment_amount"),
        );
        let rows = sqlx::query_as::<_, RepaymentRow>(&sql)
            .bind(since)
            .bind(since)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Purchases with a received quantity
    pub async fn materials_purchases(
        pool: &SqlitePool,
        caps: &SchemaCapabilities,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<MaterialsPurchaseRow>> {
        let payment_method = if caps.materials_payment_method {
            "payment_method"
        } else {
            "NULL"
        };
        let sql = format!(
            r#"
            SELECT id, material_type, {quantity}, {unit_cost}, transaction_date,
                {payment_method} AS payment_method
            FROM materials_transactions
            WHERE transaction_type = 'purchase' AND quantity_received > 0
              AND (? IS NULL OR transaction_date >= ?)
            ORDER BY transaction_date ASC, id ASC
            "#,
            quantity = amount("quantity_received", "quantity_received"),
            unit_cost = amount("unit_cost", "unit_cost"),
        );
        let rows = sqlx::query_as::<_, MaterialsPurchaseRow>(&sql)
            .bind(since)
            .bind(since)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    pub async fn payroll_runs(
        pool: &SqlitePool,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<PayrollRunRow>> {
        let rows = sqlx::query_as::<_, PayrollRunRow>(
            r#"
            SELECT id, run_date, period_label
            FROM payroll_runs
            WHERE (? IS NULL OR run_date >= ?)
            ORDER BY run_date ASC, id ASC
            "#,
        )
        .bind(since)
        .bind(since)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Entries of every run dated on or after `since`
    pub async fn payroll_entries(
        pool: &SqlitePool,
        since: Option<NaiveDate>,
    ) -> PersistenceResult<Vec<PayrollEntryRow>> {
        let sql = format!(
            r#"
            SELECT pe.id, pe.payroll_run_id, pe.worker_name, {amount}, {benefits}, {loan_reclaim}
            FROM payroll_entries pe
            JOIN payroll_runs pr ON pr.id = pe.payroll_run_id
            WHERE (? IS NULL OR pr.run_date >= ?)
            ORDER BY pe.payroll_run_id ASC, pe.id ASC
            "#,
            amount = amount("pe.amount", "amount"),
            benefits = amount("pe.benefits", "benefits"),
            loan_reclaim = amount("pe.loan_reclaim", "loan_reclaim"),
        );
        let rows = sqlx::query_as::<_, PayrollEntryRow>(&sql)
            .bind(since)
            .bind(since)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }
}

/// `CAST(COALESCE(col, 0) AS TEXT) AS alias`
fn amount(column: &str, alias: &str) -> String {
    format!("CAST(COALESCE({column}, 0) AS TEXT) AS {alias}")
}

// ============================================================================
// Source table DDL
// ============================================================================

/// Operational tables as the owning modules lay them out.
///
/// Used by `drillbooks init --with-sources` and by tests; production
/// databases already carry them.
pub const SOURCE_TABLES_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS field_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    report_id TEXT NOT NULL,
    report_date TEXT NOT NULL,
    site_name TEXT,
    client_id INTEGER REFERENCES clients(id),
    contract_sum NUMERIC DEFAULT 0,
    rig_fee_charged NUMERIC DEFAULT 0,
    rig_fee_collected NUMERIC DEFAULT 0,
    cash_received NUMERIC DEFAULT 0,
    materials_income NUMERIC DEFAULT 0,
    materials_cost NUMERIC DEFAULT 0,
    momo_transfer NUMERIC DEFAULT 0,
    cash_given NUMERIC DEFAULT 0,
    bank_deposit NUMERIC DEFAULT 0,
    total_wages NUMERIC DEFAULT 0,
    total_expenses NUMERIC DEFAULT 0,
    total_income NUMERIC DEFAULT 0,
    net_profit NUMERIC
);

CREATE TABLE IF NOT EXISTS worker_loans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    worker_name TEXT,
    loan_amount NUMERIC NOT NULL,
    issue_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS loan_repayments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    loan_id INTEGER NOT NULL REFERENCES worker_loans(id),
    repayment_amount NUMERIC NOT NULL,
    repayment_date TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS materials_transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_type TEXT NOT NULL,
    material_type TEXT,
    quantity_received NUMERIC DEFAULT 0,
    unit_cost NUMERIC DEFAULT 0,
    transaction_date TEXT NOT NULL,
    payment_method TEXT
);

CREATE TABLE IF NOT EXISTS payroll_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_date TEXT NOT NULL,
    period_label TEXT
);

CREATE TABLE IF NOT EXISTS payroll_entries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    payroll_run_id INTEGER NOT NULL REFERENCES payroll_runs(id),
    worker_name TEXT,
    amount NUMERIC DEFAULT 0,
    benefits NUMERIC DEFAULT 0,
    loan_reclaim NUMERIC DEFAULT 0,
    paid INTEGER DEFAULT 0
);
"#;

/// Create every operational source table (idempotent)
pub async fn create_source_tables(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::raw_sql(SOURCE_TABLES_DDL).execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::repos::memory_pool;

    #[tokio::test]
    async fn test_probe_empty_database() {
        let pool = memory_pool().await.unwrap();
        let caps = SchemaCapabilities::probe(&pool).await.unwrap();
        assert_eq!(caps, SchemaCapabilities::default());
    }

    #[tokio::test]
    async fn test_probe_full_schema() {
        let pool = memory_pool().await.unwrap();
        create_source_tables(&pool).await.unwrap();

        let caps = SchemaCapabilities::probe(&pool).await.unwrap();
        assert!(caps.field_reports);
        assert!(caps.clients);
        assert_eq!(caps.loans_table, Some("worker_loans"));
        assert_eq!(caps.repayments_table, Some("loan_repayments"));
        assert!(caps.materials);
        assert!(caps.materials_payment_method);
        assert!(caps.payroll);
    }

    #[tokio::test]
    async fn test_probe_legacy_loan_tables() {
        let pool = memory_pool().await.unwrap();
        sqlx::raw_sql(
            r#"
            CREATE TABLE loans (id INTEGER PRIMARY KEY, worker_name TEXT, loan_amount NUMERIC, issue_date TEXT);
            CREATE TABLE worker_loan_repayments (id INTEGER PRIMARY KEY, loan_id INTEGER, repayment_amount NUMERIC, repayment_date TEXT);
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let caps = SchemaCapabilities::probe(&pool).await.unwrap();
        assert_eq!(caps.loans_table, Some("loans"));
        // worker_loan_repayments only pairs with worker_loans
        assert_eq!(caps.repayments_table, None);
        assert!(!caps.payroll);
    }

    #[tokio::test]
    async fn test_read_sources_with_cursor() {
        let pool = memory_pool().await.unwrap();
        create_source_tables(&pool).await.unwrap();
        sqlx::raw_sql(
            r#"
            INSERT INTO clients (id, client_name) VALUES (1, 'Aqua Ltd');
            INSERT INTO field_reports (report_id, report_date, site_name, client_id, contract_sum, cash_received)
                VALUES ('FR-1', '2026-01-10', 'Site A', 1, 1000, 1000.5);
            INSERT INTO field_reports (report_id, report_date, site_name, contract_sum)
                VALUES ('FR-2', '2026-03-01', 'Site B', 250);
            INSERT INTO worker_loans (worker_name, loan_amount, issue_date) VALUES ('Kofi', 300, '2026-02-01');
            INSERT INTO loan_repayments (loan_id, repayment_amount, repayment_date) VALUES (1, 100, '2026-02-15');
            INSERT INTO materials_transactions (transaction_type, material_type, quantity_received, unit_cost, transaction_date)
                VALUES ('purchase', 'Casing', 4, 12.5, '2026-02-02'),
                       ('usage', 'Casing', 0, 12.5, '2026-02-03');
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        let caps = SchemaCapabilities::probe(&pool).await.unwrap();

        let reports = SourceRepo::field_reports(&pool, &caps, None).await.unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].client_name.as_deref(), Some("Aqua Ltd"));
        assert_eq!(reports[0].cash_received, "1000.5");
        assert_eq!(reports[1].materials_cost, "0");

        let since = NaiveDate::from_ymd_opt(2026, 2, 1);
        let recent = SourceRepo::field_reports(&pool, &caps, since).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].report_id.as_deref(), Some("FR-2"));

        let repayments = SourceRepo::repayments(&pool, "loan_repayments", "worker_loans", None)
            .await
            .unwrap();
        assert_eq!(repayments.len(), 1);
        assert_eq!(repayments[0].worker_name.as_deref(), Some("Kofi"));

        let purchases = SourceRepo::materials_purchases(&pool, &caps, None).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].material_type.as_deref(), Some("Casing"));
    }
}
