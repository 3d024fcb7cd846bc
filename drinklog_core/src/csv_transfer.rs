//! CSV export and import of the drink log.
//!
//! Format: `id,type,timestamp,datetime,created_at` with `timestamp` and
//! `created_at` in Unix milliseconds and `datetime` as a readable UTC
//! string (ignored on import).

use crate::log::{DrinkSink, JsonlLog};
use crate::{DrinkEntry, DrinkType, Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row in the CSV file
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CsvRow {
    id: String,
    #[serde(rename = "type")]
    drink_type: String,
    timestamp: i64,
    #[serde(default)]
    datetime: String,
    created_at: i64,
}

impl From<&DrinkEntry> for CsvRow {
    fn from(entry: &DrinkEntry) -> Self {
        CsvRow {
            id: entry.id.to_string(),
            drink_type: entry.drink_type.id().to_string(),
            timestamp: entry.occurred_at.timestamp_millis(),
            datetime: entry.occurred_at.format(DATETIME_FORMAT).to_string(),
            created_at: entry.created_at.timestamp_millis(),
        }
    }
}

/// A parsed row; `id` is `None` when the file carried a foreign identifier
struct ImportedRow {
    id: Option<Uuid>,
    drink_type: DrinkType,
    occurred_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CsvRow> for ImportedRow {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let drink_type: DrinkType = row.drink_type.parse()?;
        let occurred_at = millis_to_datetime(row.timestamp)?;
        let created_at = millis_to_datetime(row.created_at)?;

        Ok(ImportedRow {
            id: Uuid::parse_str(row.id.trim()).ok(),
            drink_type,
            occurred_at,
            created_at,
        })
    }
}

fn millis_to_datetime(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Import(format!("Timestamp out of range: {}", millis)))
}

/// Write `entries` to `csv_path` oldest first, replacing the file
pub fn export_csv(entries: &[DrinkEntry], csv_path: &Path) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut sorted: Vec<&DrinkEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.occurred_at);

    let mut writer = csv::Writer::from_path(csv_path)?;
    for entry in &sorted {
        writer.serialize(CsvRow::from(*entry))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} drinks to {:?}", sorted.len(), csv_path);
    Ok(sorted.len())
}

/// Append drinks from `csv_path` to the log at `log_path`
///
/// Rows whose id is already in the log are ignored. Rows with a non-UUID
/// id get a fresh one and are matched on type and timestamp instead.
/// Malformed rows are skipped with a warning. Returns the number of
/// drinks added.
pub fn import_csv(csv_path: &Path, log_path: &Path) -> Result<usize> {
    let existing = crate::log::read_entries(log_path)?;
    let mut seen_ids: HashSet<Uuid> = existing.iter().map(|e| e.id).collect();
    let mut seen_drinks: HashSet<(DrinkType, i64)> = existing
        .iter()
        .map(|e| (e.drink_type, e.occurred_at.timestamp_millis()))
        .collect();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let mut log = JsonlLog::new(log_path);
    let mut rows = 0;
    let mut imported = 0;

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        rows += 1;
        let row = match result.map_err(Error::from).and_then(ImportedRow::try_from) {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("Skipping CSV row {}: {}", index + 2, e);
                continue;
            }
        };

        let key = (row.drink_type, row.occurred_at.timestamp_millis());
        let id = match row.id {
            Some(id) if seen_ids.contains(&id) => continue,
            Some(id) => id,
            None if seen_drinks.contains(&key) => continue,
            None => Uuid::new_v4(),
        };

        let entry = DrinkEntry {
            id,
            drink_type: row.drink_type,
            occurred_at: row.occurred_at,
            created_at: row.created_at,
        };
        log.append(&entry)?;

        seen_ids.insert(id);
        seen_drinks.insert(key);
        imported += 1;
    }

    if rows == 0 {
        return Err(Error::Import(format!("{:?} contains no drinks", csv_path)));
    }

    tracing::info!("Imported {} of {} drinks from {:?}", imported, rows, csv_path);
    Ok(imported)
}
