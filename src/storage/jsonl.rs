//! JSONL (JSON Lines) files.
//!
//! Each line is one serialized row. Unparseable lines are skipped with a
//! warning so one bad write never hides the rest of a season.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::{StorageConfig, StorageError};
use crate::models::Season;

const ENTRIES_FILE: &str = "entries.jsonl";

/// Path of a season's entries file.
pub fn season_path(config: &StorageConfig, season: Season) -> PathBuf {
    config
        .leaderboard_dir()
        .join(season.as_str())
        .join(ENTRIES_FILE)
}

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_season(config: &StorageConfig, season: Season) -> Self {
        Self::new(season_path(config, season))
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append rows to the end of the file.
    pub fn append_batch(&self, rows: &[T]) -> Result<usize, StorageError> {
        if rows.is_empty() {
            return Ok(0);
        }

        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        for row in rows {
            let json = serde_json::to_string(row)?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;

        info!("Appended {} rows to {:?}", rows.len(), self.path);
        Ok(rows.len())
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    pub fn for_season(config: &StorageConfig, season: Season) -> Self {
        Self::new(season_path(config, season))
    }

    /// Read every row; a missing file reads as empty.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (idx, chunk) in reader.split(b'\n').enumerate() {
            let chunk = chunk?;
            let line = match std::str::from_utf8(&chunk) {
                Ok(line) => line,
                Err(e) => {
                    warn!("Skipping non-UTF-8 line {} in {:?}: {}", idx + 1, self.path, e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}
