use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use finanzblick_core::{DateRange, ImportBatch, ImportBatchId, Money, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use thiserror::Error;
use tracing::{debug, info};

pub type DbPool = Pool<Sqlite>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Refusing to save an import without transactions")]
    EmptyBatch,
    #[error("Corrupt row: {0}")]
    Corrupt(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const MONTHS_DE: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober",
    "November", "Dezember",
];

pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;
    debug!(path = %path.display(), "database ready");

    Ok(pool)
}

async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS imported_files (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            original_name TEXT NOT NULL,
            import_date TEXT NOT NULL,
            transaction_count INTEGER NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            file_id INTEGER NOT NULL,
            booking_date TEXT NOT NULL,
            amount TEXT NOT NULL,
            purpose TEXT NOT NULL,
            counterparty_name TEXT,
            counterparty_id TEXT,
            raw_text TEXT,
            extra_json TEXT NOT NULL DEFAULT '{}',
            FOREIGN KEY (file_id) REFERENCES imported_files(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_file ON transactions(file_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(booking_date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// "Umsatzübersicht 2024 März", or a "… bis …" span when the range crosses months.
pub fn batch_display_name(period: DateRange) -> String {
    let start = month_label(period.start);
    let end = month_label(period.end);
    if start == end {
        format!("Umsatzübersicht {start}")
    } else {
        format!("Umsatzübersicht {start} bis {end}")
    }
}

fn month_label(date: NaiveDate) -> String {
    format!("{} {}", date.year(), MONTHS_DE[date.month0() as usize])
}

/// Persists one import as a batch plus its rows, atomically.
pub async fn save_transactions(
    pool: &DbPool,
    transactions: &[Transaction],
    original_name: &str,
) -> Result<ImportBatchId, StorageError> {
    let period = DateRange::covering(transactions.iter().map(|t| t.booking_date))
        .ok_or(StorageError::EmptyBatch)?;
    let name = batch_display_name(period);
    let count = i64::try_from(transactions.len())
        .map_err(|_| StorageError::Corrupt("transaction count overflow".into()))?;

    let mut db_tx = pool.begin().await?;

    let file_id = sqlx::query(
        "INSERT INTO imported_files (name, original_name, import_date, transaction_count, start_date, end_date) VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(&name)
    .bind(original_name)
    .bind(Utc::now())
    .bind(count)
    .bind(period.start)
    .bind(period.end)
    .execute(&mut *db_tx)
    .await?
    .last_insert_rowid();

    for tx in transactions {
        let extra_json = serde_json::to_string(&tx.extra)?;
        sqlx::query(
            "INSERT INTO transactions (file_id, booking_date, amount, purpose, counterparty_name, counterparty_id, raw_text, extra_json) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(file_id)
        .bind(tx.booking_date)
        .bind(tx.amount.as_decimal().to_string())
        .bind(&tx.purpose)
        .bind(&tx.counterparty_name)
        .bind(&tx.counterparty_id)
        .bind(&tx.raw_text)
        .bind(extra_json)
        .execute(&mut *db_tx)
        .await?;
    }

    db_tx.commit().await?;
    info!(file_id, %name, count, "saved import");

    Ok(ImportBatchId(file_id))
}

type FileRow = (i64, String, String, DateTime<Utc>, i64, NaiveDate, NaiveDate);

/// Newest import first.
pub async fn get_imported_files(pool: &DbPool) -> Result<Vec<ImportBatch>, StorageError> {
    let rows = sqlx::query_as::<_, FileRow>(
        "SELECT id, name, original_name, import_date, transaction_count, start_date, end_date FROM imported_files ORDER BY import_date DESC, id DESC"
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|r| -> Result<ImportBatch, StorageError> {
            let transaction_count = usize::try_from(r.4)
                .map_err(|_| StorageError::Corrupt(format!("negative transaction count in file {}", r.0)))?;
            Ok(ImportBatch {
                id: ImportBatchId(r.0),
                name: r.1,
                original_name: r.2,
                import_date: r.3,
                transaction_count,
                period: DateRange::new(r.5, r.6),
            })
        })
        .collect()
}

type TransactionRow = (
    i64,
    NaiveDate,
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
);

const TRANSACTION_COLUMNS: &str =
    "file_id, booking_date, amount, purpose, counterparty_name, counterparty_id, raw_text, extra_json";

pub async fn get_transactions_by_file_id(
    pool: &DbPool,
    file_id: ImportBatchId,
) -> Result<Vec<Transaction>, StorageError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE file_id = ? ORDER BY booking_date, id"
    ))
    .bind(file_id.0)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(transaction_from_row).collect()
}

/// Every stored transaction across imports, oldest booking first.
pub async fn get_all_transactions(pool: &DbPool) -> Result<Vec<Transaction>, StorageError> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY booking_date, id"
    ))
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(transaction_from_row).collect()
}

fn transaction_from_row(r: TransactionRow) -> Result<Transaction, StorageError> {
    let amount = Money::from_str(&r.2)
        .map_err(|e| StorageError::Corrupt(format!("amount {:?}: {e}", r.2)))?;
    let extra: BTreeMap<String, String> = serde_json::from_str(&r.7)?;
    Ok(Transaction {
        booking_date: r.1,
        amount,
        purpose: r.3,
        counterparty_name: r.4,
        counterparty_id: r.5,
        raw_text: r.6,
        source_file_id: Some(ImportBatchId(r.0)),
        extra,
    })
}

/// Removes an import and all of its transactions. Returns `false` if no such
/// import existed.
pub async fn delete_file(pool: &DbPool, file_id: ImportBatchId) -> Result<bool, StorageError> {
    let mut db_tx = pool.begin().await?;

    sqlx::query("DELETE FROM transactions WHERE file_id = ?")
        .bind(file_id.0)
        .execute(&mut *db_tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM imported_files WHERE id = ?")
        .bind(file_id.0)
        .execute(&mut *db_tx)
        .await?
        .rows_affected();

    db_tx.commit().await?;
    info!(file_id = file_id.0, deleted = deleted > 0, "deleted import");

    Ok(deleted > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn test_db() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_db(&dir.path().join("test.db")).await.unwrap();
        (dir, pool)
    }

    fn sample() -> Vec<Transaction> {
        let mut rent = Transaction::new(date(2024, 3, 1), Money::from_cents(-80_000), "Miete März");
        rent.counterparty_name = Some("Hausverwaltung Müller".into());
        rent.counterparty_id = Some("DE02120300000000202051".into());
        rent.extra.insert("Valutadatum".into(), "01.03.2024".into());

        let mut salary = Transaction::new(date(2024, 2, 28), Money::from_cents(250_000), "Gehalt");
        salary.raw_text = Some("GUTSCHRIFT".into());

        vec![rent, salary]
    }

    // ── naming ────────────────────────────────────────────────────────────────

    #[test]
    fn display_name_single_month() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31));
        assert_eq!(batch_display_name(range), "Umsatzübersicht 2024 März");
    }

    #[test]
    fn display_name_spanning_months() {
        let range = DateRange::new(date(2023, 12, 15), date(2024, 1, 10));
        assert_eq!(
            batch_display_name(range),
            "Umsatzübersicht 2023 Dezember bis 2024 Januar"
        );
    }

    // ── persistence ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn save_and_reload_batch() {
        let (_dir, pool) = test_db().await;
        let id = save_transactions(&pool, &sample(), "umsatz.csv").await.unwrap();

        let files = get_imported_files(&pool).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, id);
        assert_eq!(files[0].name, "Umsatzübersicht 2024 Februar bis 2024 März");
        assert_eq!(files[0].original_name, "umsatz.csv");
        assert_eq!(files[0].transaction_count, 2);
        assert_eq!(files[0].period, DateRange::new(date(2024, 2, 28), date(2024, 3, 1)));

        let txs = get_transactions_by_file_id(&pool, id).await.unwrap();
        assert_eq!(txs.len(), 2);
        // Sorted by booking date.
        assert_eq!(txs[0].purpose, "Gehalt");
        assert_eq!(txs[0].raw_text.as_deref(), Some("GUTSCHRIFT"));
        let rent = &txs[1];
        assert_eq!(rent.amount, Money::from_cents(-80_000));
        assert_eq!(rent.counterparty_name.as_deref(), Some("Hausverwaltung Müller"));
        assert_eq!(rent.extra["Valutadatum"], "01.03.2024");
        assert_eq!(rent.source_file_id, Some(id));
    }

    #[tokio::test]
    async fn empty_import_is_rejected() {
        let (_dir, pool) = test_db().await;
        let result = save_transactions(&pool, &[], "leer.csv").await;
        assert!(matches!(result, Err(StorageError::EmptyBatch)));
        assert!(get_imported_files(&pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn all_transactions_span_batches() {
        let (_dir, pool) = test_db().await;
        save_transactions(&pool, &sample(), "a.csv").await.unwrap();
        let early = vec![Transaction::new(date(2024, 1, 5), Money::from_cents(-999), "Kino")];
        save_transactions(&pool, &early, "b.csv").await.unwrap();

        let all = get_all_transactions(&pool).await.unwrap();
        let dates: Vec<NaiveDate> = all.iter().map(|t| t.booking_date).collect();
        assert_eq!(dates, vec![date(2024, 1, 5), date(2024, 2, 28), date(2024, 3, 1)]);
    }

    #[tokio::test]
    async fn delete_removes_batch_and_rows() {
        let (_dir, pool) = test_db().await;
        let keep = save_transactions(&pool, &sample(), "a.csv").await.unwrap();
        let gone = save_transactions(&pool, &sample(), "b.csv").await.unwrap();

        assert!(delete_file(&pool, gone).await.unwrap());
        assert!(!delete_file(&pool, gone).await.unwrap());

        let files = get_imported_files(&pool).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, keep);
        assert!(get_transactions_by_file_id(&pool, gone).await.unwrap().is_empty());
        assert_eq!(get_all_transactions(&pool).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn fractional_amounts_survive_storage() {
        let (_dir, pool) = test_db().await;
        let txs = vec![Transaction::new(date(2024, 5, 1), Money::from_cents(-1), "Cent")];
        let id = save_transactions(&pool, &txs, "c.csv").await.unwrap();
        let stored = get_transactions_by_file_id(&pool, id).await.unwrap();
        assert_eq!(stored[0].amount, Money::from_cents(-1));
    }
}
