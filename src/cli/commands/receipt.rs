//! Receipt command implementations.

use super::{brl, database_path, open_database, print_json, require_session, runtime};
use crate::ai::HttpAnalyzer;
use crate::cli::ReceiptCommands;
use crate::config::{resolve_identity, resolve_objects_root};
use crate::db::Database;
use crate::error::Result;
use crate::finance::receipt_tree;
use crate::model::{Receipt, Record, RECEIPTS};
use crate::query::{Direction, Query};
use crate::receipts::scan_receipt;
use crate::storage::ObjectStore;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// Execute receipt commands.
pub fn execute(command: &ReceiptCommands, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    match command {
        ReceiptCommands::Tree { folder } => tree(folder.as_deref(), db_path, json),
        ReceiptCommands::Scan { file, mime } => scan(file, mime.as_deref(), db_path, json),
    }
}

fn tree(folder: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let db = open_database(db_path)?;
    let session = require_session(&db)?;
    let query = Query::select(RECEIPTS)
        .order("date", Direction::Descending)
        .build();
    let receipts: Vec<Record<Receipt>> = db.fetch(&session, &query)?;
    let tree = receipt_tree(&receipts);

    if let Some(folder) = folder {
        let items = tree.items(folder);
        if json {
            return print_json(items);
        }
        println!("{} ({})", folder.bold(), items.len());
        for r in items {
            print_receipt(r);
        }
        return Ok(());
    }

    if json {
        return print_json(&tree);
    }

    if tree.is_empty() {
        println!("No receipts.");
        return Ok(());
    }
    for year in &tree.years {
        println!("{}", year.year.bold());
        for month in &year.months {
            println!("  {}/{} ({})", year.year, month.month.cyan(), month.receipts.len());
            for r in &month.receipts {
                print_receipt(r);
            }
        }
    }
    Ok(())
}

fn scan(file: &Path, mime: Option<&str>, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let mime = mime.unwrap_or_else(|| guess_mime(file));
    let file_name = file.to_string_lossy();

    let db_file = database_path(db_path)?;
    let objects = ObjectStore::new(resolve_objects_root(&db_file));
    let mut db = Database::open(&db_file, resolve_identity())?;
    let session = require_session(&db)?;
    let analyzer = HttpAnalyzer::from_env()?;

    let rt = runtime()?;
    let scanned = rt.block_on(scan_receipt(
        &mut db, &session, &objects, &analyzer, &file_name, &bytes, mime,
    ))?;

    if json {
        return print_json(&scanned);
    }

    let r = &scanned.record;
    println!(
        "Stored {} in {} ({})",
        r.data.name.cyan(),
        r.data.folder.bold(),
        brl(r.data.amount)
    );
    if !scanned.extracted {
        println!("{}", "Could not read the receipt; stored with defaults.".yellow());
    }
    Ok(())
}

fn guess_mime(file: &Path) -> &'static str {
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn print_receipt(r: &Record<Receipt>) {
    println!(
        "    {}  {}  {:<24} {}",
        r.id().dimmed(),
        r.data.date,
        r.data.name,
        brl(r.data.amount)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_mime() {
        assert_eq!(guess_mime(Path::new("a/nota.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("scan.pdf")), "application/pdf");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }
}
