//! End-to-end reconciliation passes over a seeded database

use drillbooks_core::{DiscrepancyKind, Fingerprint, Severity, SourceDomain};
use drillbooks_engine::{EngineConfig, EngineContext, Orchestrator};
use drillbooks_persistence::{
    create_source_tables, memory_pool, AccountRepo, Database, JournalRepo, RunKind,
};
use rust_decimal_macros::dec;

async fn seeded_db() -> Database {
    let db = Database::in_memory().await.unwrap();
    create_source_tables(db.pool()).await.unwrap();
    db
}

async fn insert_scenario_report(db: &Database) {
    sqlx::raw_sql(
        r#"
        INSERT INTO clients (id, client_name) VALUES (1, 'Aqua Ltd');
        INSERT INTO field_reports (id, report_id, report_date, site_name, client_id,
            contract_sum, cash_received, materials_cost, total_wages,
            total_expenses, total_income, net_profit)
        VALUES (1, 'FR-0001', '2026-03-02', 'Tamale North', 1, 1000, 1000, 200, 300, 500, 1000, 500);
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();
}

fn orchestrator(db: &Database) -> Orchestrator {
    Orchestrator::new(EngineContext::new(db, EngineConfig::default()))
}

#[tokio::test]
async fn test_field_report_scenario_and_idempotence() {
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    let engine = orchestrator(&db);

    let first = engine.reconcile(None).await;
    assert!(first.success, "{}", first.message);
    assert_eq!(first.summary.total_scanned, 1);
    assert_eq!(first.summary.total_processed, 1);
    assert!(first.summary.is_balanced);
    assert_eq!(first.summary.total_discrepancies, 0);
    assert_eq!(
        first.message,
        "Reconciliation complete! Scanned 1 record(s), processed 1 new entry(ies), found 0 discrepancy(ies)."
    );

    let entry = JournalRepo::find_by_fingerprint(db.pool(), &Fingerprint::field_report(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.reference.as_deref(), Some("FR-0001"));
    assert_eq!(entry.description, "Field Report: Tamale North - Aqua Ltd");
    let net = entry.net_by_account();
    assert_eq!(net["4000"], dec!(-1000));
    assert_eq!(net["5000"], dec!(200));
    assert_eq!(net["5100"], dec!(300));
    assert_eq!(net["1000"], dec!(500));

    let second = engine.reconcile(None).await;
    assert_eq!(second.summary.total_processed, 0);
    assert_eq!(second.summary.total_skipped, 1);
    assert!(second.summary.is_balanced);
    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 1);
    assert_eq!(second.balance_check, first.balance_check);
}

#[tokio::test]
async fn test_edited_record_needs_review() {
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    let engine = orchestrator(&db);
    engine.reconcile(None).await;

    sqlx::query("UPDATE field_reports SET cash_received = 800 WHERE id = 1")
        .execute(db.pool())
        .await
        .unwrap();

    let report = engine.reconcile(None).await;
    assert!(report.summary.total_discrepancies >= 1);
    assert_eq!(report.summary.total_processed, 0);

    let mismatch = report
        .needs_review
        .iter()
        .find(|d| d.kind == DiscrepancyKind::AmountMismatch)
        .unwrap();
    assert_eq!(mismatch.severity, Severity::Critical);
    assert_eq!(mismatch.reference.as_deref(), Some("field_report:1"));
    assert!(report.has_critical());

    // The posted entry keeps its original amounts
    let entry = JournalRepo::find_by_fingerprint(db.pool(), &Fingerprint::field_report(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.net_by_account()["1100"], dec!(-1000));
    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_loan_and_repayment_with_same_id_are_distinct() {
    let db = seeded_db().await;
    sqlx::raw_sql(
        r#"
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (1, 'Kofi', 300, '2026-02-01');
        INSERT INTO loan_repayments (id, loan_id, repayment_amount, repayment_date) VALUES (1, 1, 100, '2026-02-15');
        INSERT INTO loan_repayments (id, loan_id, repayment_amount, repayment_date) VALUES (2, 1, 100, '2026-03-15');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = orchestrator(&db).reconcile(None).await;
    assert_eq!(report.summary.total_processed, 3);
    assert_eq!(report.domains[&SourceDomain::Loans].processed, 3);

    let by_domain = JournalRepo::count_by_domain(db.pool()).await.unwrap();
    assert_eq!(by_domain["loans"], 3);

    let balances = JournalRepo::account_balances(db.pool()).await.unwrap();
    let loans = balances.iter().find(|b| b.code == "1500").unwrap();
    assert_eq!(loans.balance(), dec!(100));
}

#[tokio::test]
async fn test_concurrent_passes_post_each_record_once() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("books.db").display());
    let db = Database::open(&url, None::<&str>).await.unwrap();
    create_source_tables(db.pool()).await.unwrap();
    insert_scenario_report(&db).await;
    sqlx::raw_sql(
        r#"
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (1, 'Kofi', 300, '2026-02-01');
        INSERT INTO materials_transactions (transaction_type, material_type, quantity_received, unit_cost, transaction_date)
            VALUES ('purchase', 'Casing', 4, 12.5, '2026-02-02');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let a = orchestrator(&db);
    let b = orchestrator(&db);
    let (ra, rb) = tokio::join!(a.reconcile(None), b.reconcile(None));

    assert!(ra.success && rb.success);
    assert_eq!(ra.summary.total_processed + rb.summary.total_processed, 3);
    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 3);
    assert_eq!(AccountRepo::count(db.pool()).await.unwrap(), 19);

    let (debits, credits, _) = JournalRepo::ledger_totals(db.pool()).await.unwrap();
    assert_eq!(debits, credits);
}

#[tokio::test]
async fn test_deleted_source_record_is_orphaned() {
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    let engine = orchestrator(&db);
    engine.reconcile(None).await;

    sqlx::query("DELETE FROM field_reports WHERE id = 1")
        .execute(db.pool())
        .await
        .unwrap();

    // Partial scan: orphans are not reported
    let partial = engine.reconcile(chrono::NaiveDate::from_ymd_opt(2026, 1, 1)).await;
    assert!(partial
        .discrepancies
        .iter()
        .all(|d| d.kind != DiscrepancyKind::OrphanedFingerprint));

    let full = engine.reconcile(None).await;
    let orphan = full
        .needs_review
        .iter()
        .find(|d| d.kind == DiscrepancyKind::OrphanedFingerprint)
        .unwrap();
    assert_eq!(orphan.severity, Severity::Medium);
    assert_eq!(orphan.reference.as_deref(), Some("field_report:1"));
}

#[tokio::test]
async fn test_failed_posting_is_retried_as_missing_posting() {
    let db = seeded_db().await;
    sqlx::raw_sql(
        r#"
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (4, 'Ama', 250, '2026-02-01');
        CREATE TRIGGER fail_loan_lines BEFORE INSERT ON journal_entry_lines
        WHEN NEW.memo = 'Loan disbursement'
        BEGIN SELECT RAISE(ABORT, 'disk full'); END;
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();
    let engine = orchestrator(&db);

    let report = engine.reconcile(None).await;
    assert!(report.success);
    assert_eq!(report.summary.total_processed, 0);
    assert_eq!(report.summary.total_auto_fixed, 0);
    let missing = report
        .discrepancies
        .iter()
        .find(|d| d.kind == DiscrepancyKind::MissingPosting)
        .unwrap();
    assert!(missing.auto_fixable);
    assert!(report.needs_review.iter().all(|d| d.kind != DiscrepancyKind::MissingPosting));
    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 0);

    sqlx::query("DROP TRIGGER fail_loan_lines")
        .execute(db.pool())
        .await
        .unwrap();
    let retry = engine.reconcile(None).await;
    assert_eq!(retry.summary.total_processed, 1);
    assert_eq!(retry.summary.total_discrepancies, 0);
}

#[tokio::test]
async fn test_failed_posting_is_auto_fixed_in_the_same_pass() {
    let db = seeded_db().await;
    // Loans post before materials; the loan's lines fail until a purchase is on the books
    sqlx::raw_sql(
        r#"
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (4, 'Ama', 250, '2026-02-01');
        INSERT INTO materials_transactions (id, transaction_type, material_type, quantity_received, unit_cost, transaction_date)
            VALUES (1, 'purchase', 'Casing pipe', 2, 50, '2026-02-03');
        CREATE TRIGGER fail_loan_before_purchase BEFORE INSERT ON journal_entry_lines
        WHEN NEW.memo = 'Loan disbursement'
            AND NOT EXISTS (SELECT 1 FROM journal_entries WHERE source_fingerprint LIKE 'materials_purchase:%')
        BEGIN SELECT RAISE(ABORT, 'disk full'); END;
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = orchestrator(&db).reconcile(None).await;
    assert!(report.success, "{}", report.message);
    assert_eq!(report.summary.total_processed, 1);
    assert_eq!(report.summary.total_auto_fixed, 1);
    assert_eq!(report.summary.total_discrepancies, 0);
    assert_eq!(report.auto_fixed.len(), 1);
    assert_eq!(report.auto_fixed[0].kind, DiscrepancyKind::MissingPosting);
    assert_eq!(report.auto_fixed[0].reference.as_deref(), Some("loan_disbursement:4"));
    assert!(report.discrepancies.iter().all(|d| d.kind != DiscrepancyKind::MissingPosting));
    assert!(report.needs_review.is_empty());

    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 2);
    assert!(JournalRepo::fingerprint_exists(db.pool(), &Fingerprint::loan_disbursement(4))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_sub_cent_payroll_keeps_books_balanced() {
    let db = seeded_db().await;
    sqlx::raw_sql(
        r#"
        INSERT INTO payroll_runs (id, run_date, period_label) VALUES (1, '2026-06-30', 'June'), (2, '2026-07-31', 'July');
        INSERT INTO payroll_entries (payroll_run_id, worker_name, amount, benefits, loan_reclaim)
            VALUES (1, 'Kofi', 0.005, 0.005, 0), (2, 'Ama', 0.005, 0.005, 0);
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = orchestrator(&db).reconcile(None).await;
    assert_eq!(report.summary.total_processed, 2);
    assert!(report.summary.is_balanced);
    let balance = report.balance_check.as_ref().unwrap();
    assert_eq!(balance.total_debits, dec!(0.04));
    assert_eq!(balance.total_credits, dec!(0.04));
    assert!(report.discrepancies.iter().all(|d| d.kind != DiscrepancyKind::BooksUnbalanced));
}

#[tokio::test]
async fn test_overflowing_purchase_is_malformed_not_fatal() {
    let db = seeded_db().await;
    sqlx::raw_sql(
        r#"
        INSERT INTO materials_transactions (id, transaction_type, material_type, quantity_received, unit_cost, transaction_date)
            VALUES (1, 'purchase', 'Cement', 1e20, 1e20, '2026-02-03'),
                   (2, 'purchase', 'Gravel', 4, 25, '2026-02-04');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = orchestrator(&db).reconcile(None).await;
    assert!(report.success, "{}", report.message);
    assert_eq!(report.summary.total_processed, 1);
    assert_eq!(report.domains[&SourceDomain::Materials].rejected, 1);
    let malformed = report
        .needs_review
        .iter()
        .find(|d| d.kind == DiscrepancyKind::RecordMalformed)
        .unwrap();
    assert_eq!(malformed.reference.as_deref(), Some("materials_purchase:1"));
    assert!(malformed.message.contains("overflows"));
}

#[tokio::test]
async fn test_malformed_record_does_not_stop_the_pass() {
    let db = seeded_db().await;
    sqlx::raw_sql(
        r#"
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (1, 'Kofi', -300, '2026-02-01');
        INSERT INTO worker_loans (id, worker_name, loan_amount, issue_date) VALUES (2, 'Ama', 200, '2026-02-01');
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();

    let report = orchestrator(&db).reconcile(None).await;
    assert_eq!(report.summary.total_processed, 1);
    assert_eq!(report.domains[&SourceDomain::Loans].rejected, 1);
    let malformed = report
        .needs_review
        .iter()
        .find(|d| d.kind == DiscrepancyKind::RecordMalformed)
        .unwrap();
    assert_eq!(malformed.reference.as_deref(), Some("loan_disbursement:1"));
}

#[tokio::test]
async fn test_missing_source_tables_are_scan_warnings() {
    let db = Database::in_memory().await.unwrap();
    let report = orchestrator(&db).reconcile(None).await;

    assert!(report.success);
    assert!(report.summary.is_balanced);
    assert_eq!(report.summary.total_scanned, 0);
    assert_eq!(report.summary.total_discrepancies, 0);
    assert_eq!(report.needs_review.len(), 4);
    assert!(report
        .needs_review
        .iter()
        .all(|d| d.kind == DiscrepancyKind::ScanWarning && d.severity == Severity::Low));
}

#[tokio::test]
async fn test_disabled_domain_is_not_scanned() {
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    let config = EngineConfig::default().with_domain(SourceDomain::FieldReports, false);
    let report = Orchestrator::new(EngineContext::new(&db, config)).reconcile(None).await;

    assert_eq!(report.summary.total_scanned, 0);
    assert!(!report.domains.contains_key(&SourceDomain::FieldReports));
    assert_eq!(JournalRepo::count(db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_provisioning_is_idempotent_across_passes() {
    let db = seeded_db().await;
    let engine = orchestrator(&db);
    engine.reconcile(None).await;
    engine.reconcile(None).await;
    assert_eq!(AccountRepo::count(db.pool()).await.unwrap(), 19);
}

#[tokio::test]
async fn test_setup_failure_reports_failure() {
    let pool = memory_pool().await.unwrap();
    let engine = Orchestrator::new(EngineContext::from_parts(pool, EngineConfig::default()));

    let report = engine.reconcile(None).await;
    assert!(!report.success);
    assert!(report.message.starts_with("Reconciliation failed:"));
    assert!(report.error.is_some());

    let init = engine.initialize().await;
    assert!(!init.success);
    assert!(init.message.starts_with("Initialization failed:"));
}

#[tokio::test]
async fn test_initialize_then_reconcile() {
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    sqlx::raw_sql(
        r#"
        INSERT INTO payroll_runs (id, run_date, period_label) VALUES (1, '2026-06-30', 'June 2026');
        INSERT INTO payroll_entries (payroll_run_id, worker_name, amount, benefits, loan_reclaim)
            VALUES (1, 'Kofi', 500, 50, 0);
        "#,
    )
    .execute(db.pool())
    .await
    .unwrap();
    let engine = orchestrator(&db);

    let init = engine.initialize().await;
    assert!(init.success);
    assert_eq!(init.total_processed(), 2);
    assert_eq!(init.domains[&SourceDomain::Payroll].processed, 1);
    assert_eq!(
        init.message,
        "Initialization complete! Processed 2 transaction(s), skipped 0 duplicate(s)."
    );

    let again = engine.initialize().await;
    assert_eq!(again.total_processed(), 0);
    assert_eq!(again.total_skipped(), 2);

    let report = engine.reconcile(None).await;
    assert_eq!(report.summary.total_processed, 0);
    assert_eq!(report.summary.total_skipped, 2);
}

#[tokio::test]
async fn test_runs_are_written_to_the_audit_log() {
    let dir = tempfile::tempdir().unwrap();
    let db = seeded_db().await;
    insert_scenario_report(&db).await;
    let config = EngineConfig::default().with_audit_dir(dir.path());
    let engine = Orchestrator::new(EngineContext::new(&db, config));

    let report = engine.reconcile(None).await;
    engine.context().run_log().unwrap().flush().unwrap();

    let reader = drillbooks_persistence::RunLogReader::new(dir.path());
    let latest = reader.latest().unwrap().unwrap();
    assert_eq!(latest.kind, RunKind::Reconcile);
    assert_eq!(latest.run_id, report.run_id.to_string());
    assert_eq!(latest.summary, report.summary);
}
