/*!
# Chain Writer

Appends sampling iterations to one CSV file per chain. Files live in a
shared directory and are named `chain-<id>.csv`; the first line is the
header of flat column names (see [`crate::flatnames`]), every later
line is one draw.

A writer moves through three states: unopened, open, closed. `setup`
opens (or creates) the chain file, `record` appends one row per call,
`close` flushes and releases the handle. Reopening an existing file is
only allowed when its header matches the current variable
configuration exactly; anything else is a schema mismatch and the file
is left untouched.
*/

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write as _};
use std::path::{Path, PathBuf};

use csv::Writer;

use crate::config::{ChainConfig, Point};
use crate::error::{Result, StoreError};
use crate::store::{chain_path, ensure_directory};

enum WriterState {
    Unopened,
    Open { path: PathBuf, wtr: Writer<File> },
    Closed,
}

/// Append-only writer for a single chain's CSV file.
pub struct ChainWriter {
    dir: PathBuf,
    config: ChainConfig,
    state: WriterState,
}

impl ChainWriter {
    /// Creates a writer rooted at `dir`, creating the directory if
    /// needed. No chain file is touched until [`ChainWriter::setup`].
    pub fn new(dir: impl AsRef<Path>, config: ChainConfig) -> Result<Self> {
        ensure_directory(&dir)?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
            config,
            state: WriterState::Unopened,
        })
    }

    /// Opens the chain file for `chain_id`, creating it with a header
    /// line if absent, or appending if it already exists with a
    /// matching header. `expected_draws` is advisory only.
    ///
    /// # Errors
    ///
    /// [`StoreError::SchemaMismatch`] if an existing file's header does
    /// not equal the flat names derived from this writer's variable
    /// configuration; the file is not opened for writing in that case.
    pub fn setup(&mut self, expected_draws: usize, chain_id: usize) -> Result<()> {
        let _ = expected_draws;
        if !matches!(self.state, WriterState::Unopened) {
            return Err(StoreError::InvalidArgument(
                "setup called on a writer that is already open or closed".to_string(),
            ));
        }

        let path = chain_path(&self.dir, chain_id);
        let header = self.config.flat_header();

        let file = if path.exists() {
            // The read handle used for the header check is dropped
            // before any append handle is opened.
            let mut first_line = String::new();
            BufReader::new(File::open(&path)?).read_line(&mut first_line)?;
            let prev: Vec<String> = first_line
                .trim_end_matches(['\n', '\r'])
                .split(',')
                .map(str::to_string)
                .collect();
            if prev != header {
                return Err(StoreError::SchemaMismatch { path });
            }
            OpenOptions::new().append(true).open(&path)?
        } else {
            let mut file = File::create(&path)?;
            writeln!(file, "{}", header.join(","))?;
            file
        };

        self.state = WriterState::Open {
            path,
            wtr: Writer::from_writer(file),
        };
        Ok(())
    }

    /// Records one sampling iteration.
    ///
    /// Values are flattened in row-major order, variable by variable
    /// in configuration order, and appended as a single CSV row.
    pub fn record(&mut self, point: &Point) -> Result<()> {
        let wtr = match &mut self.state {
            WriterState::Open { wtr, .. } => wtr,
            _ => return Err(StoreError::NotOpen),
        };

        let mut row: Vec<String> = Vec::with_capacity(self.config.total_columns());
        for var in self.config.vars() {
            let value = point
                .get(&var.name)
                .ok_or_else(|| StoreError::UnknownVariable(var.name.clone()))?;
            let expected = var.size();
            if value.len() != expected {
                return Err(StoreError::ShapeMismatch {
                    name: var.name.clone(),
                    expected,
                    got: value.len(),
                });
            }
            row.extend(value.iter().map(|v| v.to_string()));
        }
        wtr.write_record(&row)?;
        Ok(())
    }

    /// Flushes and releases the chain file. Safe to call more than
    /// once; later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, WriterState::Closed) {
            WriterState::Open { mut wtr, .. } => {
                wtr.flush()?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Path of the open chain file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.state {
            WriterState::Open { path, .. } => Some(path),
            _ => None,
        }
    }
}
