//! Multi-chain composition. [`Chain`] is the per-chain read contract
//! shared by [`crate::reader::ChainReader`] and any in-memory trace a
//! sampler keeps; [`MultiTrace`] composes several of them into one
//! logical trace.

use ndarray::ArrayD;

use crate::config::{ChainConfig, Point};
use crate::error::Result;
use crate::reader::ChainReader;

/// Read interface of a single chain.
pub trait Chain {
    fn chain_id(&self) -> usize;

    fn config(&self) -> &ChainConfig;

    /// Number of recorded draws.
    fn len(&self) -> Result<usize>;

    /// Draws for one variable, shaped `(n_selected,) + var_shape`,
    /// after burn/thin selection.
    fn get_values(&self, varname: &str, burn: usize, thin: usize) -> Result<ArrayD<f64>>;

    /// Shaped values of the draw at `idx`; negative indices count
    /// from the end.
    fn point(&self, idx: isize) -> Result<Point>;
}

impl Chain for ChainReader {
    fn chain_id(&self) -> usize {
        ChainReader::chain_id(self)
    }

    fn config(&self) -> &ChainConfig {
        ChainReader::config(self)
    }

    fn len(&self) -> Result<usize> {
        ChainReader::len(self)
    }

    fn get_values(&self, varname: &str, burn: usize, thin: usize) -> Result<ArrayD<f64>> {
        ChainReader::get_values(self, varname, burn, thin)
    }

    fn point(&self, idx: isize) -> Result<Point> {
        ChainReader::point(self, idx)
    }
}

/// An ordered collection of chains presented as one trace.
pub struct MultiTrace<C> {
    chains: Vec<C>,
}

impl<C: Chain> MultiTrace<C> {
    /// Composes `chains`, ordered by chain id.
    pub fn new(mut chains: Vec<C>) -> Self {
        chains.sort_by_key(Chain::chain_id);
        Self { chains }
    }

    pub fn nchains(&self) -> usize {
        self.chains.len()
    }

    pub fn chains(&self) -> &[C] {
        &self.chains
    }

    pub fn chain_ids(&self) -> Vec<usize> {
        self.chains.iter().map(Chain::chain_id).collect()
    }

    pub fn chain(&self, chain_id: usize) -> Option<&C> {
        self.chains.iter().find(|c| c.chain_id() == chain_id)
    }

    /// Per-chain draws for `varname`, in chain-id order.
    pub fn get_values(&self, varname: &str, burn: usize, thin: usize) -> Result<Vec<ArrayD<f64>>> {
        self.chains
            .iter()
            .map(|c| c.get_values(varname, burn, thin))
            .collect()
    }
}
