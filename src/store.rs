/*!
# Directory Store

Maps a directory of `chain-<id>.csv` files to reader/writer objects.
Discovery scans filenames; anything not matching the pattern is
ignored. `dump` is the bulk-export path: it overwrites chain files
unconditionally and performs no schema check.
*/

use std::fs;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use ndarray::Axis;

use crate::config::ChainConfig;
use crate::error::{Result, StoreError};
use crate::reader::ChainReader;
use crate::trace::{Chain, MultiTrace};

/// Creates `path` (and parents) if absent; idempotent.
pub fn ensure_directory(path: impl AsRef<Path>) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

/// Path of the chain file for `chain_id` under `dir`.
pub fn chain_path(dir: impl AsRef<Path>, chain_id: usize) -> PathBuf {
    dir.as_ref().join(format!("chain-{}.csv", chain_id))
}

/// Parses a chain id out of a `chain-<integer>.csv` filename.
/// Returns `None` for anything else, so discovery can skip unrelated
/// files instead of failing on them.
pub fn parse_chain_filename(name: &str) -> Option<usize> {
    name.strip_prefix("chain-")?
        .strip_suffix(".csv")?
        .parse()
        .ok()
}

fn discover_ids(dir: &Path) -> Result<Vec<usize>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if let Some(id) = parse_chain_filename(name) {
                ids.push(id);
            }
        }
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Scans `dir` for chain files and returns one unloaded reader per
/// discovered id, in ascending id order.
pub fn discover_chains(dir: impl AsRef<Path>, config: &ChainConfig) -> Result<Vec<ChainReader>> {
    let dir = dir.as_ref();
    Ok(discover_ids(dir)?
        .into_iter()
        .map(|id| ChainReader::new(dir, id, config.clone()))
        .collect())
}

/// Loads every chain file in `dir` into one [`MultiTrace`].
pub fn load(dir: impl AsRef<Path>, config: &ChainConfig) -> Result<MultiTrace<ChainReader>> {
    Ok(MultiTrace::new(discover_chains(dir, config)?))
}

/// Like [`load`], but reconstructs the variable configuration from the
/// header of the lowest-numbered chain file. Fallback for directories
/// whose shape metadata is gone; see
/// [`crate::flatnames::infer_shape`] for its trust model.
pub fn load_inferred(dir: impl AsRef<Path>) -> Result<MultiTrace<ChainReader>> {
    let dir = dir.as_ref();
    let ids = discover_ids(dir)?;
    let first = ids.first().ok_or_else(|| {
        StoreError::InvalidArgument(format!("no chain files in '{}'", dir.display()))
    })?;

    let mut header = String::new();
    BufReader::new(File::open(chain_path(dir, *first))?).read_line(&mut header)?;
    let flat: Vec<&str> = header.trim_end_matches(['\n', '\r']).split(',').collect();
    let config = ChainConfig::from_flat_names(&flat)?;

    Ok(MultiTrace::new(
        ids.into_iter()
            .map(|id| ChainReader::new(dir, id, config.clone()))
            .collect(),
    ))
}

/// Writes `trace` out as one CSV file per chain under `dir`,
/// overwriting existing chain files. `chain_ids` defaults to every
/// chain in the trace.
pub fn dump<C: Chain>(
    dir: impl AsRef<Path>,
    trace: &MultiTrace<C>,
    chain_ids: Option<&[usize]>,
) -> Result<()> {
    let dir = dir.as_ref();
    ensure_directory(dir)?;
    let ids: Vec<usize> = match chain_ids {
        Some(ids) => ids.to_vec(),
        None => trace.chain_ids(),
    };

    for id in ids {
        let chain = trace.chain(id).ok_or_else(|| {
            StoreError::InvalidArgument(format!("trace has no chain with id {}", id))
        })?;
        let config = chain.config();

        let mut wtr = csv::Writer::from_path(chain_path(dir, id))?;
        wtr.write_record(config.flat_header())?;

        let per_var: Vec<_> = config
            .vars()
            .iter()
            .map(|v| chain.get_values(&v.name, 0, 1))
            .collect::<Result<_>>()?;
        for row in 0..chain.len()? {
            let mut record: Vec<String> = Vec::with_capacity(config.total_columns());
            for values in &per_var {
                record.extend(values.index_axis(Axis(0), row).iter().map(f64::to_string));
            }
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Point, Variable};
    use crate::writer::ChainWriter;
    use ndarray::ArrayD;
    use std::fs;
    use tempfile::tempdir;

    fn config() -> ChainConfig {
        ChainConfig::new(vec![Variable::scalar("mu"), Variable::new("tau", &[2])])
    }

    fn write_chain(dir: &Path, chain_id: usize, n: usize, offset: f64) {
        let mut wtr = ChainWriter::new(dir, config()).unwrap();
        wtr.setup(n, chain_id).unwrap();
        for i in 0..n {
            let v = offset + i as f64;
            let mut point = Point::new();
            point.insert("mu".to_string(), ArrayD::from_elem(vec![], v));
            point.insert(
                "tau".to_string(),
                ArrayD::from_shape_vec(vec![2], vec![v, v + 0.5]).unwrap(),
            );
            wtr.record(&point).unwrap();
        }
        wtr.close().unwrap();
    }

    #[test]
    fn test_ensure_directory_idempotent() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_directory(&nested).unwrap();
        ensure_directory(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_parse_chain_filename() {
        assert_eq!(parse_chain_filename("chain-0.csv"), Some(0));
        assert_eq!(parse_chain_filename("chain-17.csv"), Some(17));
        assert_eq!(parse_chain_filename("chain-x.csv"), None);
        assert_eq!(parse_chain_filename("chain-1.txt"), None);
        assert_eq!(parse_chain_filename("notes.csv"), None);
        assert_eq!(parse_chain_filename("chain-.csv"), None);
    }

    #[test]
    fn test_discover_skips_unrelated_files() {
        let dir = tempdir().unwrap();
        write_chain(dir.path(), 0, 2, 0.0);
        write_chain(dir.path(), 2, 2, 0.0);
        fs::write(dir.path().join("notes.txt"), "not a chain").unwrap();
        fs::write(dir.path().join("chain-x.csv"), "junk").unwrap();

        let readers = discover_chains(dir.path(), &config()).unwrap();
        let ids: Vec<usize> = readers.iter().map(|r| r.chain_id()).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[test]
    fn test_load_reads_back_values() {
        let dir = tempdir().unwrap();
        write_chain(dir.path(), 0, 4, 0.0);
        write_chain(dir.path(), 1, 4, 100.0);

        let trace = load(dir.path(), &config()).unwrap();
        assert_eq!(trace.nchains(), 2);
        let values = trace.get_values("mu", 0, 1).unwrap();
        assert_eq!(values[0].shape(), &[4]);
        assert_eq!(values[1][[0]], 100.0);
    }

    #[test]
    fn test_dump_round_trip() {
        let src = tempdir().unwrap();
        write_chain(src.path(), 0, 5, 0.25);
        write_chain(src.path(), 1, 5, 50.25);
        let trace = load(src.path(), &config()).unwrap();

        let dst = tempdir().unwrap();
        dump(dst.path(), &trace, None).unwrap();
        let reloaded = load(dst.path(), &config()).unwrap();

        assert_eq!(reloaded.chain_ids(), vec![0, 1]);
        for id in [0, 1] {
            let want = trace.chain(id).unwrap().get_values("tau", 0, 1).unwrap();
            let got = reloaded.chain(id).unwrap().get_values("tau", 0, 1).unwrap();
            assert_eq!(want, got);
        }
    }

    #[test]
    fn test_dump_overwrites_and_selects_chains() {
        let src = tempdir().unwrap();
        write_chain(src.path(), 0, 3, 0.0);
        write_chain(src.path(), 1, 3, 10.0);
        let trace = load(src.path(), &config()).unwrap();

        let dst = tempdir().unwrap();
        // A stale file with an incompatible layout gets clobbered.
        fs::write(chain_path(dst.path(), 1), "old,stuff\n1,2\n").unwrap();
        dump(dst.path(), &trace, Some(&[1])).unwrap();

        let readers = discover_chains(dst.path(), &config()).unwrap();
        assert_eq!(readers.len(), 1);
        assert_eq!(readers[0].len().unwrap(), 3);

        assert!(matches!(
            dump(dst.path(), &trace, Some(&[7])),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_inferred_recovers_config() {
        let dir = tempdir().unwrap();
        write_chain(dir.path(), 0, 3, 1.0);

        let trace = load_inferred(dir.path()).unwrap();
        let chain = trace.chain(0).unwrap();
        assert_eq!(chain.config(), &config());
        assert_eq!(chain.get_values("tau", 0, 1).unwrap().shape(), &[3, 2]);
    }

    #[test]
    fn test_load_inferred_empty_dir_fails() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_inferred(dir.path()),
            Err(StoreError::InvalidArgument(_))
        ));
    }
}
