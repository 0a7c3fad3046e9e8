//! Receipt ingestion.
//!
//! A scanned file is read by the analyzer, uploaded to the `receipts`
//! bucket under `<user>/<YYYY>/<MM>/<millis>_<file>`, and recorded with
//! its `YYYY/MM` folder. When the analyzer cannot read the file the
//! receipt is still stored, named after the file, with a zero amount,
//! today's date and the default category.

use crate::ai::{Analyzer, ReceiptExtraction, DEFAULT_RECEIPT_CATEGORY};
use crate::auth::Session;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::finance::{parse_date, YearMonth};
use crate::model::{Receipt, Record};
use crate::storage::{ObjectStore, RecordStore, StoredObject};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// Bucket holding receipt files.
pub const RECEIPTS_BUCKET: &str = "receipts";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScannedReceipt {
    pub record: Record<Receipt>,
    pub object: StoredObject,
    /// Whether the analyzer could read the file.
    pub extracted: bool,
}

/// Scan, upload and record a receipt file.
///
/// # Errors
///
/// Returns `Unauthorized` without a session, `InvalidArgument` for an empty
/// file name, or a storage error. Analyzer failures are not errors.
pub async fn scan_receipt<S: RecordStore, A: Analyzer>(
    db: &mut Database<S>,
    session: &Session,
    objects: &ObjectStore,
    analyzer: &A,
    file_name: &str,
    bytes: &[u8],
    mime: &str,
) -> Result<ScannedReceipt> {
    let uid = session.user_id().ok_or(Error::Unauthorized)?.to_string();
    let file_name = Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("invalid file name '{file_name}'")))?
        .to_string();

    let extraction = match analyzer.extract_receipt(bytes, mime).await {
        Ok(x) => Some(x),
        Err(e) => {
            warn!(file = %file_name, error = %e, "Receipt analysis failed, storing with defaults");
            None
        }
    };

    let today = chrono::Local::now().date_naive();
    let receipt = build_receipt(extraction.as_ref(), &file_name, today);

    let month = parse_date(&receipt.date).map_or_else(|| YearMonth::of(today), YearMonth::of);
    let millis = chrono::Utc::now().timestamp_millis();
    let object_path = format!("{uid}/{}/{millis}_{file_name}", month.folder());

    let object = objects.upload(RECEIPTS_BUCKET, &object_path, bytes)?;
    let receipt = Receipt {
        file_url: objects.public_url(RECEIPTS_BUCKET, &object_path)?,
        folder: month.folder(),
        sha256: Some(object.sha256.clone()),
        ..receipt
    };

    let record = db.create(session, &receipt)?;
    info!(id = %record.id(), folder = %record.data.folder, "Stored receipt");

    Ok(ScannedReceipt {
        record,
        object,
        extracted: extraction.is_some(),
    })
}

fn build_receipt(
    extraction: Option<&ReceiptExtraction>,
    file_name: &str,
    today: chrono::NaiveDate,
) -> Receipt {
    let name = extraction
        .map(|x| x.description.clone())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| file_name.to_string());

    Receipt {
        name,
        amount: extraction.map_or(0.0, |x| x.amount),
        date: extraction.map_or_else(|| today.format("%Y-%m-%d").to_string(), |x| x.date.clone()),
        category: extraction.map_or_else(
            || DEFAULT_RECEIPT_CATEGORY.to_string(),
            |x| x.category.clone(),
        ),
        file_url: String::new(),
        folder: String::new(),
        sha256: None,
    }
}
