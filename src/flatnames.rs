/*!
# Flat Column Names

Maps a variable name plus array shape to the flat column names used in
chain CSV headers, and back. A scalar variable keeps its bare name; an
array variable gets one column per element, suffixed with its
(row-major) multi-index:

```text
x, y__0_0, y__0_1, y__1_0, y__1_1, y__2_0, y__2_1
```

is a scalar `x` next to a `y` of shape `(3, 2)`.
*/

use crate::error::{Result, StoreError};

/// Returns the flat column names for `name` with `shape`.
///
/// Names are enumerated in row-major order, so the column sequence
/// matches the iteration order of a standard-layout array. An empty
/// shape yields just `[name]`; a shape containing a zero dimension
/// yields no names.
///
/// # Examples
///
/// ```rust
/// use csv_trace::flatnames::flatten_names;
///
/// assert_eq!(flatten_names("x", &[]), vec!["x"]);
/// assert_eq!(
///     flatten_names("x", &[2, 2]),
///     vec!["x__0_0", "x__0_1", "x__1_0", "x__1_1"]
/// );
/// ```
pub fn flatten_names(name: &str, shape: &[usize]) -> Vec<String> {
    if shape.is_empty() {
        return vec![name.to_string()];
    }
    let total: usize = shape.iter().product();
    let mut names = Vec::with_capacity(total);
    for flat in 0..total {
        let mut rem = flat;
        let mut idx = vec![0usize; shape.len()];
        for d in (0..shape.len()).rev() {
            idx[d] = rem % shape[d];
            rem /= shape[d];
        }
        let suffix = idx
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join("_");
        names.push(format!("{}__{}", name, suffix));
    }
    names
}

/// Recovers a shape from `flatten_names` output.
///
/// Only the last entry is inspected: its suffix after the final `__`
/// is read as a zero-based maximum multi-index, so each dimension is
/// `max index + 1`. No suffix means a scalar. Intermediate entries are
/// not validated (inherited behavior; callers feeding reordered or
/// corrupted headers get an undefined shape). This is the fallback for
/// legacy files whose shape metadata is gone.
pub fn infer_shape<S: AsRef<str>>(flat_names: &[S]) -> Result<Vec<usize>> {
    let last = match flat_names.last() {
        Some(name) => name.as_ref(),
        None => return Ok(Vec::new()),
    };
    let suffix = match last.rsplit_once("__") {
        Some((_, suffix)) => suffix,
        None => return Ok(Vec::new()),
    };
    suffix
        .split('_')
        .map(|part| {
            part.parse::<usize>()
                .map(|max| max + 1)
                .map_err(|_| StoreError::MalformedColumnName(last.to_string()))
        })
        .collect()
}
