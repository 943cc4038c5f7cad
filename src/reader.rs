/*!
# Chain Reader

Read side of a chain CSV file. The whole file is parsed into an
in-memory column table on the first read access and kept for the
lifetime of the reader; the cache is never refreshed, so appends made
by another handle after that point are invisible. That staleness is
intentional: readers are meant for files that are no longer being
written.
*/

use std::cell::OnceCell;
use std::collections::HashMap;
use std::ops::RangeBounds;
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};

use crate::config::{ChainConfig, Point, Variable};
use crate::error::{Result, StoreError};
use crate::store::chain_path;

/// Parsed file contents: one `f64` column per flat name. Columns are
/// looked up by name, so file column order need not match the
/// configuration.
struct Table {
    nrows: usize,
    columns: HashMap<String, Vec<f64>>,
}

impl Table {
    fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut cols: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            for (i, field) in record.iter().enumerate() {
                let value = field.parse::<f64>().map_err(|_| StoreError::ParseValue {
                    value: field.to_string(),
                    row,
                    column: headers.get(i).cloned().unwrap_or_default(),
                })?;
                cols[i].push(value);
            }
        }
        let nrows = cols.first().map(Vec::len).unwrap_or(0);
        let columns = headers.into_iter().zip(cols).collect();
        Ok(Self { nrows, columns })
    }

    fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
    }
}

/// Lazily loaded reader for a single chain's CSV file.
pub struct ChainReader {
    path: PathBuf,
    chain_id: usize,
    config: ChainConfig,
    cache: OnceCell<Table>,
}

impl ChainReader {
    /// Binds a reader to `chain-<chain_id>.csv` under `dir`. The file
    /// is not opened until the first read access.
    pub fn new(dir: impl AsRef<Path>, chain_id: usize, config: ChainConfig) -> Self {
        Self {
            path: chain_path(dir, chain_id),
            chain_id,
            config,
            cache: OnceCell::new(),
        }
    }

    pub fn chain_id(&self) -> usize {
        self.chain_id
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// One-way transition from unloaded to loaded.
    fn table(&self) -> Result<&Table> {
        if let Some(table) = self.cache.get() {
            return Ok(table);
        }
        let table = Table::load(&self.path)?;
        Ok(self.cache.get_or_init(|| table))
    }

    /// Number of draws in the chain. Zero when the file does not exist
    /// yet; otherwise the data-row count after lazy load.
    pub fn len(&self) -> Result<usize> {
        if self.cache.get().is_none() && !self.path.exists() {
            return Ok(0);
        }
        Ok(self.table()?.nrows)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the draws for `varname` as an array of shape
    /// `(n_selected,) + var_shape`, keeping rows `burn, burn + thin,
    /// ...` to the end.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidArgument`] when `thin` is zero,
    /// [`StoreError::UnknownVariable`] for names outside the
    /// configuration.
    pub fn get_values(&self, varname: &str, burn: usize, thin: usize) -> Result<ArrayD<f64>> {
        if thin == 0 {
            return Err(StoreError::InvalidArgument(
                "thin must be at least 1".to_string(),
            ));
        }
        let var = self.lookup(varname)?;
        let flat = self
            .config
            .flat_names(varname)
            .ok_or_else(|| StoreError::UnknownVariable(varname.to_string()))?;
        let table = self.table()?;
        let cols: Vec<&[f64]> = flat
            .iter()
            .map(|name| table.column(name))
            .collect::<Result<_>>()?;

        let rows: Vec<usize> = (burn..table.nrows).step_by(thin).collect();
        let mut values = Vec::with_capacity(rows.len() * cols.len());
        for &row in &rows {
            for col in &cols {
                values.push(col[row]);
            }
        }

        let mut shape = Vec::with_capacity(var.shape.len() + 1);
        shape.push(rows.len());
        shape.extend_from_slice(&var.shape);
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
    }

    /// Returns the draw at `idx` as shaped values keyed by variable
    /// name. Negative indices count from the end.
    pub fn point(&self, idx: isize) -> Result<Point> {
        let nrows = self.table()?.nrows;
        let resolved = if idx < 0 { idx + nrows as isize } else { idx };
        if resolved < 0 || resolved as usize >= nrows {
            return Err(StoreError::IndexOutOfRange { idx, len: nrows });
        }
        let row = resolved as usize;

        let table = self.table()?;
        let mut point = Point::new();
        for var in self.config.vars() {
            let flat = self
                .config
                .flat_names(&var.name)
                .ok_or_else(|| StoreError::UnknownVariable(var.name.clone()))?;
            let values: Vec<f64> = flat
                .iter()
                .map(|name| table.column(name).map(|col| col[row]))
                .collect::<Result<_>>()?;
            let array = ArrayD::from_shape_vec(IxDyn(&var.shape), values)?;
            point.insert(var.name.clone(), array);
        }
        Ok(point)
    }

    /// Slicing a CSV-backed chain is a no-op kept for interface parity
    /// with in-memory backends.
    pub fn slice<R: RangeBounds<usize>>(&self, _range: R) {
        tracing::warn!("slicing a CSV-backed chain has no effect");
    }

    fn lookup(&self, varname: &str) -> Result<&Variable> {
        self.config
            .var(varname)
            .ok_or_else(|| StoreError::UnknownVariable(varname.to_string()))
    }
}
