//! Repository implementations for SQLite
//!
//! Ledger reads and writes: accounts, journal entries and lines.

use crate::error::{is_unique_violation, PersistenceError, PersistenceResult};
use crate::sqlite::schema::*;
use chrono::{NaiveDate, Utc};
use drillbooks_core::{AccountSpec, AccountType, Fingerprint, JournalEntry, PostingIntent, SourceDomain, Tolerance};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Account Repository
// ============================================================================

/// Repository for the accounts table
pub struct AccountRepo;

impl AccountRepo {
    /// All accounts ordered by code
    pub async fn list(pool: &SqlitePool) -> PersistenceResult<Vec<AccountRow>> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, code, name, account_type, is_active FROM accounts ORDER BY code",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Account by code
    pub async fn get_by_code(pool: &SqlitePool, code: &str) -> PersistenceResult<AccountRow> {
        sqlx::query_as::<_, AccountRow>(
            "SELECT id, code, name, account_type, is_active FROM accounts WHERE code = ?",
        )
        .bind(code)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Account", code))
    }

    /// Insert a new account, returning its id.
    ///
    /// A duplicate code yields `AlreadyExists`.
    pub async fn insert(pool: &SqlitePool, spec: &AccountSpec) -> PersistenceResult<i64> {
        let result = sqlx::query(
            "INSERT INTO accounts (code, name, account_type, is_active, created_at) VALUES (?, ?, ?, 1, ?)",
        )
        .bind(&spec.code)
        .bind(&spec.name)
        .bind(spec.account_type.as_str())
        .bind(Utc::now())
        .execute(pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(e) if is_unique_violation(&e) => {
                Err(PersistenceError::already_exists("Account", &spec.code))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Active accounts, code → id
    pub async fn active_code_map(pool: &SqlitePool) -> PersistenceResult<HashMap<String, i64>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT code, id FROM accounts WHERE is_active = 1")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().collect())
    }

    pub async fn set_active(pool: &SqlitePool, code: &str, active: bool) -> PersistenceResult<()> {
        let result = sqlx::query("UPDATE accounts SET is_active = ? WHERE code = ?")
            .bind(active)
            .bind(code)
            .execute(pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Account", code));
        }
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accounts")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Journal Repository
// ============================================================================

/// Outcome of an atomic entry insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// Another writer already holds the fingerprint
    Duplicate,
}

/// Filter for journal listings
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub domain: Option<SourceDomain>,
    pub since: Option<NaiveDate>,
    pub limit: Option<i64>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: SourceDomain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

const ENTRY_COLUMNS: &str =
    "id, entry_date, description, reference, source_domain, source_fingerprint, created_at";

const LINE_SELECT: &str = r#"
    SELECT l.id, l.entry_id, l.account_id, a.code AS account_code, l.debit, l.credit, l.memo
    FROM journal_entry_lines l
    JOIN accounts a ON a.id = l.account_id
"#;

/// Repository for journal_entries and journal_entry_lines
pub struct JournalRepo;

impl JournalRepo {
    pub async fn fingerprint_exists(
        pool: &SqlitePool,
        fingerprint: &Fingerprint,
    ) -> PersistenceResult<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM journal_entries WHERE source_fingerprint = ? LIMIT 1")
                .bind(fingerprint.to_string())
                .fetch_optional(pool)
                .await?;
        Ok(row.is_some())
    }

    /// Entry (with lines) by fingerprint
    pub async fn find_by_fingerprint(
        pool: &SqlitePool,
        fingerprint: &Fingerprint,
    ) -> PersistenceResult<Option<JournalEntry>> {
        let sql = format!(
            "SELECT {} FROM journal_entries WHERE source_fingerprint = ?",
            ENTRY_COLUMNS
        );
        let row = sqlx::query_as::<_, JournalEntryRow>(&sql)
            .bind(fingerprint.to_string())
            .fetch_optional(pool)
            .await?;

        match row {
            Some(row) => {
                let lines = Self::line_rows_for_entry(pool, row.id).await?;
                Ok(Some(row.into_entry(lines)?))
            }
            None => Ok(None),
        }
    }

    /// Write the entry header and all lines in one transaction.
    ///
    /// `account_ids` maps each line's account code to its id; the caller
    /// resolves codes beforehand. A UNIQUE violation on the fingerprint rolls
    /// back and yields [`InsertOutcome::Duplicate`].
    pub async fn insert_entry(
        pool: &SqlitePool,
        intent: &PostingIntent,
        account_ids: &HashMap<String, i64>,
    ) -> PersistenceResult<InsertOutcome> {
        let mut tx = pool.begin().await?;

        let header = sqlx::query(
            r#"
            INSERT INTO journal_entries (entry_date, description, reference, source_domain, source_fingerprint, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(intent.entry_date)
        .bind(&intent.description)
        .bind(&intent.reference)
        .bind(intent.fingerprint.domain().as_str())
        .bind(intent.fingerprint.to_string())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        let entry_id = match header {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                tx.rollback().await?;
                debug!(fingerprint = %intent.fingerprint, "Fingerprint already posted");
                return Ok(InsertOutcome::Duplicate);
            }
            Err(e) => return Err(e.into()),
        };

        for line in &intent.lines {
            let account_id = account_ids
                .get(&line.account_code)
                .copied()
                .ok_or_else(|| PersistenceError::not_found("Account", &line.account_code))?;

            sqlx::query(
                "INSERT INTO journal_entry_lines (entry_id, account_id, debit, credit, memo) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(entry_id)
            .bind(account_id)
            .bind(line.debit.to_string())
            .bind(line.credit.to_string())
            .bind(&line.memo)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(InsertOutcome::Inserted(entry_id))
    }

    /// Entries with their lines, newest first
    pub async fn list_entries(
        pool: &SqlitePool,
        filter: &EntryFilter,
    ) -> PersistenceResult<Vec<JournalEntry>> {
        let mut sql = format!("SELECT {} FROM journal_entries WHERE 1 = 1", ENTRY_COLUMNS);
        if filter.domain.is_some() {
            sql.push_str(" AND source_domain = ?");
        }
        if filter.since.is_some() {
            sql.push_str(" AND entry_date >= ?");
        }
        sql.push_str(" ORDER BY entry_date DESC, id DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query_as::<_, JournalEntryRow>(&sql);
        if let Some(domain) = filter.domain {
            query = query.bind(domain.as_str());
        }
        if let Some(since) = filter.since {
            query = query.bind(since);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }
        let rows = query.fetch_all(pool).await?;

        Self::attach_lines(pool, rows).await
    }

    /// Every entry of one domain, by fingerprint
    pub async fn entries_for_domain(
        pool: &SqlitePool,
        domain: SourceDomain,
    ) -> PersistenceResult<BTreeMap<String, JournalEntry>> {
        let sql = format!(
            "SELECT {} FROM journal_entries WHERE source_domain = ? ORDER BY id",
            ENTRY_COLUMNS
        );
        let rows = sqlx::query_as::<_, JournalEntryRow>(&sql)
            .bind(domain.as_str())
            .fetch_all(pool)
            .await?;

        let entries = Self::attach_lines(pool, rows).await?;
        Ok(entries
            .into_iter()
            .map(|e| (e.fingerprint.to_string(), e))
            .collect())
    }

    pub async fn lines_for_entry(
        pool: &SqlitePool,
        entry_id: i64,
    ) -> PersistenceResult<Vec<drillbooks_core::JournalLine>> {
        Self::line_rows_for_entry(pool, entry_id)
            .await?
            .into_iter()
            .map(drillbooks_core::JournalLine::try_from)
            .collect()
    }

    /// Global Σdebit, Σcredit and entry count over all posted lines
    pub async fn ledger_totals(pool: &SqlitePool) -> PersistenceResult<(Decimal, Decimal, i64)> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT debit, credit FROM journal_entry_lines")
                .fetch_all(pool)
                .await?;

        let mut debits = Decimal::ZERO;
        let mut credits = Decimal::ZERO;
        for (debit, credit) in rows {
            debits += parse_decimal(&debit)?;
            credits += parse_decimal(&credit)?;
        }

        let (entries,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT entry_id) FROM journal_entry_lines")
                .fetch_one(pool)
                .await?;

        Ok((debits, credits, entries))
    }

    /// Entries whose own lines do not balance within tolerance
    pub async fn unbalanced_entries(
        pool: &SqlitePool,
        tolerance: Tolerance,
    ) -> PersistenceResult<Vec<EntryTotals>> {
        let rows: Vec<(i64, String, String, String)> = sqlx::query_as(
            r#"
            SELECT e.id, e.source_fingerprint, l.debit, l.credit
            FROM journal_entries e
            JOIN journal_entry_lines l ON l.entry_id = e.id
            ORDER BY e.id
            "#,
        )
        .fetch_all(pool)
        .await?;

        let mut totals: BTreeMap<i64, EntryTotals> = BTreeMap::new();
        for (entry_id, fingerprint, debit, credit) in rows {
            let t = totals.entry(entry_id).or_insert_with(|| EntryTotals {
                entry_id,
                fingerprint,
                total_debit: Decimal::ZERO,
                total_credit: Decimal::ZERO,
            });
            t.total_debit += parse_decimal(&debit)?;
            t.total_credit += parse_decimal(&credit)?;
        }

        Ok(totals
            .into_values()
            .filter(|t| !tolerance.approx_eq(t.total_debit, t.total_credit))
            .collect())
    }

    /// Debit/credit totals per account, including accounts without lines
    pub async fn account_balances(pool: &SqlitePool) -> PersistenceResult<Vec<AccountBalance>> {
        let accounts = AccountRepo::list(pool).await?;
        let lines: Vec<(i64, String, String)> =
            sqlx::query_as("SELECT account_id, debit, credit FROM journal_entry_lines")
                .fetch_all(pool)
                .await?;

        let mut sums: HashMap<i64, (Decimal, Decimal)> = HashMap::new();
        for (account_id, debit, credit) in lines {
            let sum = sums.entry(account_id).or_default();
            sum.0 += parse_decimal(&debit)?;
            sum.1 += parse_decimal(&credit)?;
        }

        accounts
            .into_iter()
            .map(|row| {
                let (total_debit, total_credit) = sums.get(&row.id).copied().unwrap_or_default();
                Ok(AccountBalance {
                    account_id: row.id,
                    account_type: AccountType::parse(&row.account_type)?,
                    code: row.code,
                    name: row.name,
                    total_debit,
                    total_credit,
                })
            })
            .collect()
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM journal_entries")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }

    /// Entry count per source domain
    pub async fn count_by_domain(pool: &SqlitePool) -> PersistenceResult<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT source_domain, COUNT(*) FROM journal_entries GROUP BY source_domain",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn line_rows_for_entry(
        pool: &SqlitePool,
        entry_id: i64,
    ) -> PersistenceResult<Vec<JournalLineRow>> {
        let sql = format!("{} WHERE l.entry_id = ? ORDER BY l.id", LINE_SELECT);
        let rows = sqlx::query_as::<_, JournalLineRow>(&sql)
            .bind(entry_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    async fn attach_lines(
        pool: &SqlitePool,
        rows: Vec<JournalEntryRow>,
    ) -> PersistenceResult<Vec<JournalEntry>> {
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let lines = Self::line_rows_for_entry(pool, row.id).await?;
            entries.push(row.into_entry(lines)?);
        }
        Ok(entries)
    }
}

// ============================================================================
// Database initialization
// ============================================================================

/// Open a connection pool on a file database.
///
/// WAL mode and a busy timeout let concurrent passes queue instead of failing.
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// In-memory database on a single persistent connection
pub async fn memory_pool() -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run ledger migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Open (creating if needed) a database and apply the ledger schema
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillbooks_core::{AccountRole, ChartOfAccounts};
    use rust_decimal_macros::dec;

    async fn setup() -> SqlitePool {
        let pool = memory_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        for spec in ChartOfAccounts::default().specs() {
            AccountRepo::insert(&pool, spec).await.unwrap();
        }
        pool
    }

    fn intent(id: i64, amount: Decimal) -> PostingIntent {
        PostingIntent::builder(
            Fingerprint::field_report(id),
            NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            "Field Report: Site A - Client",
        )
        .reference(format!("FR-{id}"))
        .transfer("1300", "4000", amount, "Contract sum")
        .build()
    }

    #[tokio::test]
    async fn test_account_insert_and_duplicate() {
        let pool = setup().await;
        assert_eq!(AccountRepo::count(&pool).await.unwrap(), 19);

        let cash = ChartOfAccounts::default().get(AccountRole::Cash).cloned().unwrap();
        let err = AccountRepo::insert(&pool, &cash).await.unwrap_err();
        assert!(err.is_already_exists());

        let row = AccountRepo::get_by_code(&pool, "1000").await.unwrap();
        assert_eq!(row.name, "Cash on Hand");
        assert!(row.is_active);
        assert!(AccountRepo::get_by_code(&pool, "9999").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_insert_entry_and_duplicate_fingerprint() {
        let pool = setup().await;
        let ids = AccountRepo::active_code_map(&pool).await.unwrap();

        let first = JournalRepo::insert_entry(&pool, &intent(1, dec!(1000)), &ids).await.unwrap();
        assert!(matches!(first, InsertOutcome::Inserted(_)));

        let second = JournalRepo::insert_entry(&pool, &intent(1, dec!(1000)), &ids).await.unwrap();
        assert_eq!(second, InsertOutcome::Duplicate);
        assert_eq!(JournalRepo::count(&pool).await.unwrap(), 1);

        let entry = JournalRepo::find_by_fingerprint(&pool, &Fingerprint::field_report(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.lines.len(), 2);
        assert_eq!(entry.total_debits(), dec!(1000));
        assert_eq!(entry.reference.as_deref(), Some("FR-1"));
        assert_eq!(entry.source_domain, SourceDomain::FieldReports);
    }

    #[tokio::test]
    async fn test_failed_line_insert_commits_nothing() {
        let pool = setup().await;
        let mut ids = AccountRepo::active_code_map(&pool).await.unwrap();
        ids.remove("4000");

        let result = JournalRepo::insert_entry(&pool, &intent(2, dec!(50)), &ids).await;
        assert!(result.unwrap_err().is_not_found());
        assert_eq!(JournalRepo::count(&pool).await.unwrap(), 0);
        assert!(!JournalRepo::fingerprint_exists(&pool, &Fingerprint::field_report(2))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_totals_and_balances() {
        let pool = setup().await;
        let ids = AccountRepo::active_code_map(&pool).await.unwrap();
        JournalRepo::insert_entry(&pool, &intent(1, dec!(1000)), &ids).await.unwrap();
        JournalRepo::insert_entry(&pool, &intent(2, dec!(250.50)), &ids).await.unwrap();

        let (debits, credits, entries) = JournalRepo::ledger_totals(&pool).await.unwrap();
        assert_eq!(debits, dec!(1250.50));
        assert_eq!(credits, dec!(1250.50));
        assert_eq!(entries, 2);

        let balances = JournalRepo::account_balances(&pool).await.unwrap();
        let revenue = balances.iter().find(|b| b.code == "4000").unwrap();
        assert_eq!(revenue.balance(), dec!(1250.50));
        let cash = balances.iter().find(|b| b.code == "1000").unwrap();
        assert_eq!(cash.total_debit, dec!(0));

        assert!(JournalRepo::unbalanced_entries(&pool, Tolerance::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_unbalanced_entry_detected() {
        let pool = setup().await;
        let ids = AccountRepo::active_code_map(&pool).await.unwrap();
        let outcome = JournalRepo::insert_entry(&pool, &intent(3, dec!(100)), &ids).await.unwrap();
        let InsertOutcome::Inserted(entry_id) = outcome else {
            panic!("expected insert");
        };

        // Out-of-band write
        sqlx::query("UPDATE journal_entry_lines SET credit = '90' WHERE entry_id = ? AND credit <> '0'")
            .bind(entry_id)
            .execute(&pool)
            .await
            .unwrap();

        let unbalanced = JournalRepo::unbalanced_entries(&pool, Tolerance::default()).await.unwrap();
        assert_eq!(unbalanced.len(), 1);
        assert_eq!(unbalanced[0].fingerprint, "field_report:3");
        assert_eq!(unbalanced[0].total_credit, dec!(90));
    }

    #[tokio::test]
    async fn test_list_entries_filters() {
        let pool = setup().await;
        let ids = AccountRepo::active_code_map(&pool).await.unwrap();
        for id in 1..=3 {
            JournalRepo::insert_entry(&pool, &intent(id, dec!(10)), &ids).await.unwrap();
        }

        let all = JournalRepo::list_entries(&pool, &EntryFilter::new()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].fingerprint, Fingerprint::field_report(3));

        let limited = JournalRepo::list_entries(&pool, &EntryFilter::new().limit(2)).await.unwrap();
        assert_eq!(limited.len(), 2);

        let loans = JournalRepo::list_entries(&pool, &EntryFilter::new().domain(SourceDomain::Loans))
            .await
            .unwrap();
        assert!(loans.is_empty());

        let by_fp = JournalRepo::entries_for_domain(&pool, SourceDomain::FieldReports).await.unwrap();
        assert!(by_fp.contains_key("field_report:2"));

        let counts = JournalRepo::count_by_domain(&pool).await.unwrap();
        assert_eq!(counts["field_reports"], 3);
    }

    #[tokio::test]
    async fn test_lines_for_entry_keep_insert_order() {
        let pool = setup().await;
        let ids = AccountRepo::active_code_map(&pool).await.unwrap();

        let InsertOutcome::Inserted(entry_id) =
            JournalRepo::insert_entry(&pool, &intent(7, dec!(250.50)), &ids).await.unwrap()
        else {
            panic!("expected insert");
        };

        let lines = JournalRepo::lines_for_entry(&pool, entry_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].account_code, "1300");
        assert_eq!(lines[0].debit, dec!(250.50));
        assert_eq!(lines[1].account_code, "4000");
        assert_eq!(lines[1].credit, dec!(250.50));
        assert_eq!(lines[1].memo.as_deref(), Some("Contract sum"));
        assert!(JournalRepo::lines_for_entry(&pool, entry_id + 100).await.unwrap().is_empty());
    }
}
