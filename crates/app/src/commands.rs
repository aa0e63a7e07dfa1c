use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use finanzblick_analysis::{
    filter_transactions, group_by_month, pareto, truncate_label, CategoryRuleEngine, Summary,
};
use finanzblick_core::{resolve_counterparty, DateRange, ImportBatchId, PartyRole, Settings};
use finanzblick_storage as storage;
use tracing::{error, info, warn};

use crate::AppContext;

const LABEL_WIDTH: usize = 15;

// ── import ────────────────────────────────────────────────────────────────────

pub async fn import(ctx: &AppContext, files: &[PathBuf]) -> Result<()> {
    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current file");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let mut failed = 0usize;
    for path in files {
        if cancelled.load(Ordering::SeqCst) {
            warn!("import cancelled, remaining files skipped");
            break;
        }

        let parsed = match finanzblick_import::import_file(path).await {
            Ok(parsed) => parsed,
            Err(e) => {
                error!(path = %path.display(), error = %e, "import failed");
                eprintln!("{}: {e}", path.display());
                failed += 1;
                continue;
            }
        };

        let original_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let id = storage::save_transactions(&ctx.db, &parsed.transactions, &original_name)
            .await
            .with_context(|| format!("Failed to save {}", path.display()))?;

        println!(
            "{}: {} Transaktionen ({}) als Import #{id} gespeichert",
            path.display(),
            parsed.transactions.len(),
            parsed.format,
        );
    }

    if failed > 0 {
        bail!("{failed} of {} files could not be imported", files.len());
    }
    Ok(())
}

// ── files ─────────────────────────────────────────────────────────────────────

pub async fn list_files(ctx: &AppContext) -> Result<()> {
    let files = storage::get_imported_files(&ctx.db).await?;
    if files.is_empty() {
        println!("Keine Importe vorhanden.");
        return Ok(());
    }
    for file in files {
        println!(
            "#{:<4} {:<45} {:>5} Buchungen  {}  ({}, importiert {})",
            file.id.0,
            file.name,
            file.transaction_count,
            file.period,
            file.original_name,
            file.import_date.with_timezone(&Local).format("%d.%m.%Y %H:%M"),
        );
    }
    Ok(())
}

pub async fn show(ctx: &AppContext, id: i64) -> Result<()> {
    let txs = storage::get_transactions_by_file_id(&ctx.db, ImportBatchId(id)).await?;
    if txs.is_empty() {
        bail!("No import #{id}");
    }
    for tx in &txs {
        let party = resolve_counterparty(tx, PartyRole::for_amount(tx.amount));
        println!(
            "{}  {:>12}  {:<25}  {}",
            tx.booking_date.format("%d.%m.%Y"),
            tx.amount.to_string(),
            truncate_label(&party, 24),
            tx.purpose
        );
    }
    Ok(())
}

pub async fn delete(ctx: &AppContext, id: i64) -> Result<()> {
    if !storage::delete_file(&ctx.db, ImportBatchId(id)).await? {
        bail!("No import #{id}");
    }
    println!("Import #{id} gelöscht.");
    Ok(())
}

// ── analysis ──────────────────────────────────────────────────────────────────

fn load_rules(ctx: &AppContext) -> Result<CategoryRuleEngine> {
    let path = ctx.rules_path();
    match std::fs::read_to_string(&path) {
        Ok(content) => CategoryRuleEngine::from_toml(&content)
            .with_context(|| format!("Invalid rules file {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CategoryRuleEngine::with_defaults()),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub async fn summary(ctx: &AppContext, months: u32, top: usize) -> Result<()> {
    let settings = Settings::load(&ctx.settings_path())?;
    let rules = load_rules(ctx)?;
    let all = storage::get_all_transactions(&ctx.db).await?;

    let range = DateRange::last_months(Local::now().date_naive(), months);
    let txs = filter_transactions(&all, range, &settings);
    let summary = Summary::from_transactions(txs.iter().copied());

    println!("Zeitraum {range}: {} Buchungen", summary.count);
    println!("  Einnahmen  {:>14}", summary.income.to_string());
    println!("  Ausgaben   {:>14}", summary.expenses.to_string());
    println!("  Saldo      {:>14}", summary.balance.to_string());

    println!("\nMonate");
    for (month, bucket) in group_by_month(txs.iter().copied()) {
        println!(
            "  {month}  +{:>12}  -{:>12}  = {:>12}",
            bucket.income.to_string(),
            bucket.expenses.to_string(),
            bucket.balance().to_string()
        );
    }

    for (title, role) in [("Größte Empfänger", PartyRole::Recipient), ("Größte Einnahmequellen", PartyRole::Sender)] {
        println!("\n{title}");
        for entry in pareto(txs.iter().copied(), role, Some(top)) {
            println!(
                "  {:<16} {:>12}  {:>6}%",
                truncate_label(&entry.name, LABEL_WIDTH),
                entry.total.to_string(),
                entry.cumulative_percent.to_string()
            );
        }
    }

    println!("\nKategorien");
    for (category, total) in rules.totals(txs.iter().copied()) {
        println!("  {category:<20} {:>12}  ({})", total.total.to_string(), total.count);
    }
    Ok(())
}

// ── settings ──────────────────────────────────────────────────────────────────

pub fn exclude(ctx: &AppContext, term: &str, income: bool, remove: bool) -> Result<()> {
    let path = ctx.settings_path();
    let mut settings = Settings::load(&path)?;
    let changed = match (income, remove) {
        (true, false) => settings.add_income_exclusion(term),
        (false, false) => settings.add_expense_exclusion(term),
        (true, true) => settings.remove_income_exclusion(term),
        (false, true) => settings.remove_expense_exclusion(term),
    };
    if !changed {
        println!("Keine Änderung.");
        return Ok(());
    }
    settings.save(&path)?;
    println!("Einstellungen gespeichert: {}", path.display());
    Ok(())
}
