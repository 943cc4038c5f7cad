//! Explicit variable metadata for a chain: names, shapes, and the flat
//! column names derived from them. Built once by the caller and passed
//! into writers and readers (no ambient model context).

use std::collections::HashMap;

use ndarray::ArrayD;

use crate::error::Result;
use crate::flatnames::{flatten_names, infer_shape};

/// One draw: values keyed by variable name.
pub type Point = HashMap<String, ArrayD<f64>>;

/// A sampled variable with a fixed shape. An empty shape is a scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub shape: Vec<usize>,
}

impl Variable {
    pub fn new(name: impl Into<String>, shape: &[usize]) -> Self {
        Self {
            name: name.into(),
            shape: shape.to_vec(),
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, &[])
    }

    /// Number of flat columns this variable occupies.
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Ordered variable set for one chain file. Variable order is the
/// declaration order and determines the column order of the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainConfig {
    vars: Vec<Variable>,
    flat: Vec<Vec<String>>,
}

impl ChainConfig {
    pub fn new(vars: Vec<Variable>) -> Self {
        let flat = vars
            .iter()
            .map(|v| flatten_names(&v.name, &v.shape))
            .collect();
        Self { vars, flat }
    }

    /// Reconstructs a configuration from a flat header, for legacy
    /// files without shape metadata. Consecutive columns sharing a
    /// base name (the part before the last `__` index suffix) are
    /// grouped into one variable and its shape inferred from the
    /// group's last column.
    pub fn from_flat_names<S: AsRef<str>>(flat_names: &[S]) -> Result<Self> {
        let mut vars = Vec::new();
        let mut group: Vec<&str> = Vec::new();
        let mut group_base: Option<String> = None;

        for name in flat_names {
            let name = name.as_ref();
            let base = base_name(name);
            if group_base.as_deref() != Some(base) {
                if let Some(prev) = group_base.take() {
                    vars.push(close_group(prev, &group)?);
                }
                group_base = Some(base.to_string());
                group.clear();
            }
            group.push(name);
        }
        if let Some(prev) = group_base {
            vars.push(close_group(prev, &group)?);
        }
        Ok(Self::new(vars))
    }

    pub fn vars(&self) -> &[Variable] {
        &self.vars
    }

    pub fn var_names(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(|v| v.name.as_str())
    }

    pub fn var(&self, name: &str) -> Option<&Variable> {
        self.vars.iter().find(|v| v.name == name)
    }

    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.vars
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.shape.as_slice())
    }

    /// Flat column names for one variable, in row-major order.
    pub fn flat_names(&self, name: &str) -> Option<&[String]> {
        self.vars
            .iter()
            .position(|v| v.name == name)
            .map(|i| self.flat[i].as_slice())
    }

    /// The full header: every variable's flat names, concatenated in
    /// declaration order.
    pub fn flat_header(&self) -> Vec<String> {
        self.flat.iter().flatten().cloned().collect()
    }

    pub fn total_columns(&self) -> usize {
        self.flat.iter().map(|f| f.len()).sum()
    }
}

/// Turns one run of same-base columns into a variable. A lone column
/// equal to its own base never carried an index suffix, so it is a
/// scalar even when the name contains `__`.
fn close_group(base: String, group: &[&str]) -> Result<Variable> {
    let shape = if group.len() == 1 && group[0] == base {
        Vec::new()
    } else {
        infer_shape(group)?
    };
    Ok(Variable::new(base, &shape))
}

/// Strips a trailing `__<digits>[_<digits>...]` index suffix, if any.
fn base_name(flat: &str) -> &str {
    match flat.rsplit_once("__") {
        Some((base, suffix))
            if !suffix.is_empty()
                && suffix.split('_').all(|p| p.bytes().all(|b| b.is_ascii_digit())) =>
        {
            base
        }
        _ => flat,
    }
}
