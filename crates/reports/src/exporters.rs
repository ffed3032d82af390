//! Report exporters - CSV, JSON, Markdown
//!
//! Read-only ledger views (trial balance, journal listing, run history)
//! and the three formats they render to.

use chrono::{DateTime, Utc};
use drillbooks_core::{AccountType, JournalEntry, Tolerance};
use drillbooks_persistence::{AccountBalance, RunRecord};
use rust_decimal::Decimal;

/// Trait for exporting reports to different formats
pub trait ReportExporter {
    /// Export to the target format
    fn export(&self, report: &dyn ReportData) -> String;

    /// Get the file extension for this format
    fn extension(&self) -> &'static str;

    /// Get the MIME type for this format
    fn mime_type(&self) -> &'static str;
}

/// Trait for data that can be exported
pub trait ReportData {
    fn title(&self) -> &str;

    fn headers(&self) -> Vec<String>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// Summary statistics as key-value pairs
    fn summary(&self) -> Vec<(String, String)>;
}

/// Exporter for a format name (`csv`, `json`, `md`/`markdown`)
pub fn exporter_for(format: &str) -> Option<Box<dyn ReportExporter>> {
    match format.to_ascii_lowercase().as_str() {
        "csv" => Some(Box::new(CsvExporter::new())),
        "json" => Some(Box::new(JsonExporter::new())),
        "md" | "markdown" => Some(Box::new(MarkdownExporter::new())),
        _ => None,
    }
}

// ============================================================================
// CSV Exporter
// ============================================================================

/// CSV format exporter
pub struct CsvExporter {
    delimiter: char,
    include_header: bool,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self {
            delimiter: ',',
            include_header: true,
        }
    }
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn without_header(mut self) -> Self {
        self.include_header = false;
        self
    }

    fn escape_field(&self, field: &str) -> String {
        if field.contains(self.delimiter) || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn line(&self, fields: &[String]) -> String {
        let escaped: Vec<String> = fields.iter().map(|f| self.escape_field(f)).collect();
        escaped.join(&self.delimiter.to_string())
    }
}

impl ReportExporter for CsvExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = String::new();

        if self.include_header {
            output.push_str(&self.line(&report.headers()));
            output.push('\n');
        }

        for row in report.rows() {
            output.push_str(&self.line(&row));
            output.push('\n');
        }

        output
    }

    fn extension(&self) -> &'static str {
        "csv"
    }

    fn mime_type(&self) -> &'static str {
        "text/csv"
    }
}

// ============================================================================
// JSON Exporter
// ============================================================================

/// JSON format exporter
pub struct JsonExporter {
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl JsonExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self) -> Self {
        self.pretty = false;
        self
    }
}

impl ReportExporter for JsonExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let headers = report.headers();

        let data: Vec<serde_json::Value> = report
            .rows()
            .into_iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| {
                        let value = row.get(i).cloned().unwrap_or_default();
                        (h.clone(), serde_json::Value::String(value))
                    })
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();

        let summary: serde_json::Map<String, serde_json::Value> = report
            .summary()
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        let output = serde_json::json!({
            "title": report.title(),
            "summary": summary,
            "data": data,
        });

        if self.pretty {
            serde_json::to_string_pretty(&output).unwrap_or_default()
        } else {
            serde_json::to_string(&output).unwrap_or_default()
        }
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn mime_type(&self) -> &'static str {
        "application/json"
    }
}

// ============================================================================
// Markdown Exporter
// ============================================================================

/// Markdown format exporter
pub struct MarkdownExporter {
    include_summary: bool,
}

impl Default for MarkdownExporter {
    fn default() -> Self {
        Self {
            include_summary: true,
        }
    }
}

impl MarkdownExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_summary(mut self) -> Self {
        self.include_summary = false;
        self
    }
}

impl ReportExporter for MarkdownExporter {
    fn export(&self, report: &dyn ReportData) -> String {
        let mut output = format!("# {}\n\n", report.title());

        if self.include_summary {
            output.push_str("## Summary\n\n");
            for (key, value) in report.summary() {
                output.push_str(&format!("- **{}**: {}\n", key, value));
            }
            output.push('\n');
        }

        let headers = report.headers();
        if !headers.is_empty() {
            output.push_str(&format!("| {} |\n", headers.join(" | ")));
            output.push_str(&format!(
                "| {} |\n",
                headers.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
            ));
            for row in report.rows() {
                // Pipes would split the cell
                let cells: Vec<String> = row.iter().map(|c| c.replace('|', "\\|")).collect();
                output.push_str(&format!("| {} |\n", cells.join(" | ")));
            }
        }

        output
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn mime_type(&self) -> &'static str {
        "text/markdown"
    }
}

// ============================================================================
// Trial Balance
// ============================================================================

/// Debit/credit totals and normal-side balance per account
#[derive(Debug, Clone)]
pub struct TrialBalanceReport {
    pub title: String,
    pub accounts: Vec<AccountBalance>,
    pub tolerance: Tolerance,
    pub generated_at: DateTime<Utc>,
}

impl TrialBalanceReport {
    pub fn new(accounts: Vec<AccountBalance>, tolerance: Tolerance) -> Self {
        Self {
            title: "Trial Balance".to_string(),
            accounts,
            tolerance,
            generated_at: Utc::now(),
        }
    }

    pub fn total_debits(&self) -> Decimal {
        self.accounts.iter().map(|a| a.total_debit).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.accounts.iter().map(|a| a.total_credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.tolerance.approx_eq(self.total_debits(), self.total_credits())
    }

    /// Sum of normal-side balances for one account type
    pub fn total_for(&self, account_type: AccountType) -> Decimal {
        self.accounts
            .iter()
            .filter(|a| a.account_type == account_type)
            .map(AccountBalance::balance)
            .sum()
    }
}

impl ReportData for TrialBalanceReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        ["Code", "Account", "Type", "Debit", "Credit", "Balance"]
            .iter()
            .map(|h| h.to_string())
            .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.accounts
            .iter()
            .map(|a| {
                vec![
                    a.code.clone(),
                    a.name.clone(),
                    a.account_type.to_string(),
                    a.total_debit.to_string(),
                    a.total_credit.to_string(),
                    a.balance().to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let difference = (self.total_debits() - self.total_credits()).abs();
        vec![
            ("Total Debits".to_string(), self.total_debits().to_string()),
            ("Total Credits".to_string(), self.total_credits().to_string()),
            ("Difference".to_string(), difference.to_string()),
            ("Balanced".to_string(), self.is_balanced().to_string()),
            ("Revenue".to_string(), self.total_for(AccountType::Revenue).to_string()),
            ("Expenses".to_string(), self.total_for(AccountType::Expense).to_string()),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Journal Listing
// ============================================================================

/// Posted entries, one row per line
#[derive(Debug, Clone)]
pub struct JournalListing {
    pub title: String,
    pub entries: Vec<JournalEntry>,
    pub generated_at: DateTime<Utc>,
}

impl JournalListing {
    pub fn new(title: &str, entries: Vec<JournalEntry>) -> Self {
        Self {
            title: title.to_string(),
            entries,
            generated_at: Utc::now(),
        }
    }

    pub fn line_count(&self) -> usize {
        self.entries.iter().map(|e| e.lines.len()).sum()
    }
}

impl ReportData for JournalListing {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        [
            "Entry",
            "Date",
            "Fingerprint",
            "Reference",
            "Description",
            "Account",
            "Debit",
            "Credit",
            "Memo",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .flat_map(|entry| {
                entry.lines.iter().map(move |line| {
                    vec![
                        entry.id.to_string(),
                        entry.entry_date.to_string(),
                        entry.fingerprint.to_string(),
                        entry.reference.clone().unwrap_or_default(),
                        entry.description.clone(),
                        line.account_code.clone(),
                        line.debit.to_string(),
                        line.credit.to_string(),
                        line.memo.clone().unwrap_or_default(),
                    ]
                })
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let debits: Decimal = self.entries.iter().map(JournalEntry::total_debits).sum();
        vec![
            ("Entries".to_string(), self.entries.len().to_string()),
            ("Lines".to_string(), self.line_count().to_string()),
            ("Total Debits".to_string(), debits.to_string()),
            ("Generated At".to_string(), self.generated_at.to_rfc3339()),
        ]
    }
}

// ============================================================================
// Run History
// ============================================================================

/// Logged reconciliation and initialization runs
#[derive(Debug, Clone)]
pub struct RunHistoryReport {
    pub title: String,
    pub runs: Vec<RunRecord>,
}

impl RunHistoryReport {
    pub fn new(runs: Vec<RunRecord>) -> Self {
        Self {
            title: "Run History".to_string(),
            runs,
        }
    }
}

impl ReportData for RunHistoryReport {
    fn title(&self) -> &str {
        &self.title
    }

    fn headers(&self) -> Vec<String> {
        [
            "Run",
            "Kind",
            "Started",
            "Success",
            "Scanned",
            "Processed",
            "Skipped",
            "Discrepancies",
            "Needs Review",
        ]
        .iter()
        .map(|h| h.to_string())
        .collect()
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.runs
            .iter()
            .map(|r| {
                vec![
                    r.run_id.clone(),
                    r.kind.to_string(),
                    r.started_at.to_rfc3339(),
                    r.success.to_string(),
                    r.summary.total_scanned.to_string(),
                    r.summary.total_processed.to_string(),
                    r.summary.total_skipped.to_string(),
                    r.summary.total_discrepancies.to_string(),
                    r.summary.total_needs_review.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<(String, String)> {
        let failed = self.runs.iter().filter(|r| !r.success).count();
        vec![
            ("Runs".to_string(), self.runs.len().to_string()),
            ("Failed".to_string(), failed.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use drillbooks_core::{Fingerprint, JournalLine, RunSummary, SourceDomain};
    use drillbooks_persistence::RunKind;
    use rust_decimal_macros::dec;

    fn balance(code: &str, name: &str, account_type: AccountType, debit: Decimal, credit: Decimal) -> AccountBalance {
        AccountBalance {
            account_id: 0,
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            total_debit: debit,
            total_credit: credit,
        }
    }

    fn sample_trial_balance() -> TrialBalanceReport {
        TrialBalanceReport::new(
            vec![
                balance("1000", "Cash on Hand", AccountType::Asset, dec!(1000), dec!(500)),
                balance("1100", "Bank Account", AccountType::Asset, dec!(0), dec!(1000)),
                balance("1300", "Accounts Receivable", AccountType::Asset, dec!(1000), dec!(0)),
                balance("4000", "Contract Revenue", AccountType::Revenue, dec!(0), dec!(1000)),
                balance("5000", "Materials Cost", AccountType::Expense, dec!(200), dec!(0)),
                balance("5100", "Wages & Salaries", AccountType::Expense, dec!(300), dec!(0)),
            ],
            Tolerance::default(),
        )
    }

    fn sample_listing() -> JournalListing {
        let entry = JournalEntry {
            id: 1,
            entry_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            description: "Field Report: Tamale North, Aqua Ltd".to_string(),
            reference: Some("FR-0001".to_string()),
            source_domain: SourceDomain::FieldReports,
            fingerprint: Fingerprint::field_report(1),
            created_at: Utc::now(),
            lines: vec![
                JournalLine {
                    id: 1,
                    entry_id: 1,
                    account_id: 4,
                    account_code: "1300".to_string(),
                    debit: dec!(1000),
                    credit: dec!(0),
                    memo: Some("Contract sum".to_string()),
                },
                JournalLine {
                    id: 2,
                    entry_id: 1,
                    account_id: 12,
                    account_code: "4000".to_string(),
                    debit: dec!(0),
                    credit: dec!(1000),
                    memo: Some("Contract sum".to_string()),
                },
            ],
        };
        JournalListing::new("Journal", vec![entry])
    }

    #[test]
    fn test_trial_balance_totals() {
        let report = sample_trial_balance();
        assert_eq!(report.total_debits(), dec!(2500));
        assert_eq!(report.total_credits(), dec!(2500));
        assert!(report.is_balanced());
        assert_eq!(report.total_for(AccountType::Expense), dec!(500));
        assert_eq!(report.total_for(AccountType::Revenue), dec!(1000));
    }

    #[test]
    fn test_csv_exporter() {
        let exporter = CsvExporter::new();
        let output = exporter.export(&sample_trial_balance());

        assert!(output.starts_with("Code,Account,Type,Debit,Credit,Balance\n"));
        assert!(output.contains("1000,Cash on Hand,asset,1000,500,500"));
        assert_eq!(exporter.extension(), "csv");
    }

    #[test]
    fn test_csv_escapes_delimiter() {
        let output = CsvExporter::new().export(&sample_listing());
        assert!(output.contains("\"Field Report: Tamale North, Aqua Ltd\""));
    }

    #[test]
    fn test_json_exporter() {
        let output = JsonExporter::new().export(&sample_listing());
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["title"], "Journal");
        assert_eq!(value["summary"]["Lines"], "2");
        assert_eq!(value["data"][0]["Fingerprint"], "field_report:1");
        assert_eq!(value["data"][1]["Credit"], "1000");
    }

    #[test]
    fn test_markdown_exporter() {
        let exporter = MarkdownExporter::new();
        let output = exporter.export(&sample_trial_balance());

        assert!(output.contains("# Trial Balance"));
        assert!(output.contains("- **Balanced**: true"));
        assert!(output.contains("| Code | Account | Type |"));
        assert!(output.contains("| --- | --- | --- |"));
        assert!(output.contains("| 5100 | Wages & Salaries | expense | 300 | 0 | 300 |"));
    }

    #[test]
    fn test_exporter_for_format() {
        assert_eq!(exporter_for("CSV").unwrap().extension(), "csv");
        assert_eq!(exporter_for("markdown").unwrap().mime_type(), "text/markdown");
        assert!(exporter_for("xlsx").is_none());
    }

    #[test]
    fn test_run_history_rows() {
        let record = RunRecord {
            run_id: "run-1".to_string(),
            kind: RunKind::Reconcile,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            success: true,
            message: "ok".to_string(),
            summary: RunSummary {
                total_scanned: 4,
                total_needs_review: 1,
                ..Default::default()
            },
            balance_check: None,
            discrepancies: Vec::new(),
        };
        let report = RunHistoryReport::new(vec![record]);
        let rows = report.rows();
        assert_eq!(rows[0][1], "reconcile");
        assert_eq!(rows[0][4], "4");
        assert_eq!(rows[0][8], "1");
    }
}
