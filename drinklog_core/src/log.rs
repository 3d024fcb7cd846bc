//! Append-only drink log.
//!
//! Entries are appended to a JSONL (JSON Lines) file. Removals rewrite the
//! file through a temp file that is renamed over the original.
//!
//! Every access locks a sidecar `<log>.lock` file rather than the log
//! itself: a rename swaps the log's inode, and a writer blocked on the old
//! inode would otherwise append into a file nobody reads again.

use crate::{DrinkEntry, Error, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// Destination for newly logged drinks
pub trait DrinkSink {
    fn append(&mut self, entry: &DrinkEntry) -> Result<()>;
}

/// JSONL-based drink log with file locking
pub struct JsonlLog {
    path: PathBuf,
}

impl JsonlLog {
    /// Create a new JSONL log for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ensure the parent directory exists
    fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}

impl DrinkSink for JsonlLog {
    fn append(&mut self, entry: &DrinkEntry) -> Result<()> {
        self.ensure_parent_dir()?;

        let lock = open_lock(&self.path)?;
        lock.lock_exclusive()?;

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // A crash mid-write can leave a partial last line
        let needs_newline = ends_without_newline(&mut file)?;

        let mut writer = std::io::BufWriter::new(&file);
        if needs_newline {
            writer.write_all(b"\n")?;
        }
        let line = serde_json::to_string(entry)?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        drop(writer);

        lock.unlock()?;

        tracing::debug!("Appended {} ({}) to drink log", entry.id, entry.drink_type);
        Ok(())
    }
}

/// Read all entries from a log file, oldest line first
///
/// Corrupt lines are skipped with a warning.
pub fn read_entries(path: &Path) -> Result<Vec<DrinkEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let lock = open_lock(path)?;
    lock.lock_shared()?;

    let file = File::open(path)?;
    let entries = parse_lines(&file)?;

    lock.unlock()?;
    tracing::debug!("Read {} entries from drink log", entries.len());
    Ok(entries)
}

/// Sidecar lock file guarding the log at `path`
fn open_lock(path: &Path) -> Result<File> {
    let mut name = OsString::from(path.as_os_str());
    name.push(".lock");
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(PathBuf::from(name))?;
    Ok(lock)
}

fn ends_without_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn parse_lines(file: &File) -> Result<Vec<DrinkEntry>> {
    let reader = BufReader::new(file);
    let mut entries = Vec::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<DrinkEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!("Failed to parse drink at line {}: {}", line_num + 1, e);
            }
        }
    }

    Ok(entries)
}

/// Remove the entry with `id`; returns whether it was present
pub fn remove_entry(path: &Path, id: Uuid) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let mut removed = false;
    rewrite(path, |entries| {
        let before = entries.len();
        entries.retain(|e| e.id != id);
        removed = entries.len() != before;
    })?;

    if removed {
        tracing::info!("Removed drink {} from log", id);
    } else {
        tracing::debug!("Drink {} not found in log", id);
    }
    Ok(removed)
}

/// Remove every entry; returns how many were dropped
pub fn clear(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Ok(0);
    }

    let mut count = 0;
    rewrite(path, |entries| {
        count = entries.len();
        entries.clear();
    })?;

    tracing::info!("Cleared {} drinks from log", count);
    Ok(count)
}

/// Load, modify and atomically replace the log while holding its lock
fn rewrite<F>(path: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut Vec<DrinkEntry>),
{
    let parent = path
        .parent()
        .ok_or_else(|| Error::Log(format!("log path {:?} has no parent", path)))?;

    let lock = open_lock(path)?;
    lock.lock_exclusive()?;

    let file = File::open(path)?;
    let mut entries = parse_lines(&file)?;
    drop(file);
    f(&mut entries);

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        for entry in &entries {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    lock.unlock()?;
    Ok(())
}

/// Entries with `start <= occurred_at < end`, newest first
pub fn entries_in_range(
    entries: &[DrinkEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<DrinkEntry> {
    let mut selected: Vec<DrinkEntry> = entries
        .iter()
        .filter(|e| e.occurred_at >= start && e.occurred_at < end)
        .cloned()
        .collect();
    sort_newest_first(&mut selected);
    selected
}

/// The most recent drink by attributed time
pub fn last_entry(entries: &[DrinkEntry]) -> Option<&DrinkEntry> {
    entries.iter().max_by_key(|e| e.occurred_at)
}

pub fn sort_newest_first(entries: &mut [DrinkEntry]) {
    entries.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
}
