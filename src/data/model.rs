use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;

use num_complex::Complex64;
use serde::Serialize;

use super::error::{Result, SpectrumError};

// ---------------------------------------------------------------------------
// ColumnTable – one parsed output file
// ---------------------------------------------------------------------------

/// Named, equally long, homogeneously typed columns in header order.
/// Immutable once built; lookups go by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTable<T> {
    names: Vec<String>,
    columns: Vec<Vec<T>>,
    index: BTreeMap<String, usize>,
    rows: usize,
}

impl<T> ColumnTable<T> {
    /// Build a table from `(name, values)` pairs.
    ///
    /// Fails when two columns share a name or the columns differ in length.
    pub fn from_columns(columns: Vec<(String, Vec<T>)>) -> Result<Self> {
        let rows = columns.first().map_or(0, |(_, values)| values.len());
        let mut names = Vec::with_capacity(columns.len());
        let mut data = Vec::with_capacity(columns.len());
        let mut index = BTreeMap::new();

        for (position, (name, values)) in columns.into_iter().enumerate() {
            if values.len() != rows {
                return Err(SpectrumError::InvalidTable(format!(
                    "column '{name}' has {} rows, expected {rows}",
                    values.len()
                )));
            }
            if index.insert(name.clone(), position).is_some() {
                return Err(SpectrumError::InvalidTable(format!(
                    "duplicate column name '{name}'"
                )));
            }
            names.push(name);
            data.push(values);
        }

        Ok(ColumnTable {
            names,
            columns: data,
            index,
            rows,
        })
    }

    /// Column names in header order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[T]> {
        self.index.get(name).map(|&i| self.columns[i].as_slice())
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// `(name, values)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[T])> {
        self.names
            .iter()
            .zip(self.columns.iter())
            .map(|(n, c)| (n.as_str(), c.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// Spin axes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        };
        write!(f, "{label}")
    }
}

/// An ordered pair of spin axes `(a, b)` labelling one correlator component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxisPair {
    pub a: Axis,
    pub b: Axis,
}

impl AxisPair {
    pub const fn new(a: Axis, b: Axis) -> Self {
        AxisPair { a, b }
    }

    /// Row-major position of this pair in [`AXIS_PAIRS`].
    pub fn index(self) -> usize {
        3 * self.a.index() + self.b.index()
    }
}

impl fmt::Display for AxisPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.a, self.b)
    }
}

/// Column order of every correlation file: `XX, XY, XZ, YX, ..., ZZ`.
pub const AXIS_PAIRS: [AxisPair; 9] = [
    AxisPair::new(Axis::X, Axis::X),
    AxisPair::new(Axis::X, Axis::Y),
    AxisPair::new(Axis::X, Axis::Z),
    AxisPair::new(Axis::Y, Axis::X),
    AxisPair::new(Axis::Y, Axis::Y),
    AxisPair::new(Axis::Y, Axis::Z),
    AxisPair::new(Axis::Z, Axis::X),
    AxisPair::new(Axis::Z, Axis::Y),
    AxisPair::new(Axis::Z, Axis::Z),
];

// ---------------------------------------------------------------------------
// Magnetization
// ---------------------------------------------------------------------------

/// Per-site magnetization along X, Y, Z. Its row count fixes the lattice
/// size `N` for the whole run.
#[derive(Debug, Clone)]
pub struct MagnetizationTable {
    table: ColumnTable<Complex64>,
}

impl MagnetizationTable {
    /// Wrap a parsed table read from `path`; the three columns are taken as
    /// X, Y, Z in header order.
    pub fn new(path: impl Into<PathBuf>, table: ColumnTable<Complex64>) -> Result<Self> {
        if table.ncols() != Axis::ALL.len() {
            return Err(SpectrumError::DimensionMismatch {
                path: path.into(),
                what: "magnetization columns",
                expected: Axis::ALL.len(),
                actual: table.ncols(),
            });
        }
        Ok(MagnetizationTable { table })
    }

    /// Lattice size `N`.
    pub fn sites(&self) -> usize {
        self.table.nrows()
    }

    pub fn component(&self, axis: Axis) -> &[Complex64] {
        // Three columns are guaranteed by `new`.
        &self.table.columns[axis.index()]
    }
}

// ---------------------------------------------------------------------------
// Correlation files
// ---------------------------------------------------------------------------

/// Metadata carried by a correlation file name such as `corr-xy-r4.out`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationFileName {
    /// Everything before the `-r<n>.out` suffix.
    pub base_name: String,
    /// 0-based lattice distance (the file name is 1-based).
    pub distance: usize,
}

/// One parsed correlation file together with the distance from its name.
#[derive(Debug, Clone)]
pub struct CorrelationRecord {
    pub path: PathBuf,
    pub name: CorrelationFileName,
    pub table: ColumnTable<Complex64>,
}

impl CorrelationRecord {
    pub fn distance(&self) -> usize {
        self.name.distance
    }
}

/// The nine connected correlator sequences at one distance, indexed by
/// target site.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationTensor {
    components: [Vec<Complex64>; 9],
}

impl CorrelationTensor {
    pub fn new(components: [Vec<Complex64>; 9]) -> Self {
        CorrelationTensor { components }
    }

    pub fn get(&self, pair: AxisPair) -> &[Complex64] {
        &self.components[pair.index()]
    }

    /// Length of the shortest component.
    pub fn len(&self) -> usize {
        self.components.iter().map(Vec::len).min().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_uniform(&self, len: usize) -> bool {
        self.components.iter().all(|c| c.len() == len)
    }
}

// ---------------------------------------------------------------------------
// ConnectedCorrelationSet – the assembled dataset
// ---------------------------------------------------------------------------

/// Connected correlators for every distance `0..N`, each holding nine
/// sequences of length `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectedCorrelationSet {
    tensors: Vec<CorrelationTensor>,
}

impl ConnectedCorrelationSet {
    pub fn builder(sites: usize) -> ConnectedCorrelationSetBuilder {
        ConnectedCorrelationSetBuilder {
            sites,
            slots: vec![None; sites],
            duplicated: BTreeSet::new(),
        }
    }

    pub fn sites(&self) -> usize {
        self.tensors.len()
    }

    pub fn tensor(&self, distance: usize) -> Option<&CorrelationTensor> {
        self.tensors.get(distance)
    }

    /// Tensors in distance order.
    pub fn tensors(&self) -> &[CorrelationTensor] {
        &self.tensors
    }
}

/// Collects tensors by distance and checks that each distance arrives
/// exactly once.
#[derive(Debug, Clone)]
pub struct ConnectedCorrelationSetBuilder {
    sites: usize,
    slots: Vec<Option<CorrelationTensor>>,
    duplicated: BTreeSet<usize>,
}

impl ConnectedCorrelationSetBuilder {
    pub fn insert(&mut self, distance: usize, tensor: CorrelationTensor) -> Result<()> {
        if distance >= self.sites {
            return Err(SpectrumError::out_of_range("distance", distance, self.sites));
        }
        if !tensor.is_uniform(self.sites) {
            return Err(SpectrumError::InvalidTable(format!(
                "tensor at distance {distance} does not have {} entries per component",
                self.sites
            )));
        }
        let slot = &mut self.slots[distance];
        if slot.is_some() {
            self.duplicated.insert(distance);
        } else {
            *slot = Some(tensor);
        }
        Ok(())
    }

    pub fn finish(self) -> Result<ConnectedCorrelationSet> {
        let missing: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(r, _)| r)
            .collect();

        if !missing.is_empty() || !self.duplicated.is_empty() {
            return Err(SpectrumError::IncompleteData {
                sites: self.sites,
                missing,
                duplicated: self.duplicated.into_iter().collect(),
            });
        }

        Ok(ConnectedCorrelationSet {
            tensors: self.slots.into_iter().flatten().collect(),
        })
    }
}

// ---------------------------------------------------------------------------
// Spectrum output
// ---------------------------------------------------------------------------

/// Header of every spectrum table, in column order.
pub const SPECTRUM_COLUMNS: [&str; 7] = ["k", "fxx", "fyy", "fzz", "fxy", "fyz", "fzx"];

/// The six independent components of the derived spectrum at momentum `k`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectrumRow {
    pub k: usize,
    pub fxx: f64,
    pub fyy: f64,
    pub fzz: f64,
    pub fxy: f64,
    pub fyz: f64,
    pub fzx: f64,
}

impl SpectrumRow {
    /// `[fxx, fyy, fzz, fxy, fyz, fzx]`.
    pub fn components(&self) -> [f64; 6] {
        [self.fxx, self.fyy, self.fzz, self.fxy, self.fyz, self.fzx]
    }
}

/// Run parameters read from a `key=value` file next to the data.
pub type Parameters = BTreeMap<String, f64>;

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn tensor(n: usize, value: f64) -> CorrelationTensor {
        CorrelationTensor::new(std::array::from_fn(|_| vec![c(value); n]))
    }

    #[test]
    fn axis_pairs_are_row_major() {
        for (position, pair) in AXIS_PAIRS.iter().enumerate() {
            assert_eq!(pair.index(), position);
            assert_eq!(pair.a.index(), position / 3);
            assert_eq!(pair.b.index(), position % 3);
        }
        assert_eq!(AXIS_PAIRS[5].to_string(), "YZ");
    }

    #[test]
    fn column_table_lookup_by_name() {
        let table = ColumnTable::from_columns(vec![
            ("a".to_string(), vec![1.0, 2.0]),
            ("b".to_string(), vec![3.0, 4.0]),
        ])
        .unwrap();
        assert_eq!(table.ncols(), 2);
        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column("b"), Some(&[3.0, 4.0][..]));
        assert_eq!(table.column("a"), Some(&[1.0, 2.0][..]));
        assert!(table.column("c").is_none());
        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn column_table_rejects_ragged_and_duplicate_columns() {
        let ragged = ColumnTable::from_columns(vec![
            ("a".to_string(), vec![1, 2]),
            ("b".to_string(), vec![3]),
        ]);
        assert!(matches!(ragged, Err(SpectrumError::InvalidTable(_))));

        let dup = ColumnTable::from_columns(vec![
            ("a".to_string(), vec![1]),
            ("a".to_string(), vec![2]),
        ]);
        assert!(matches!(dup, Err(SpectrumError::InvalidTable(_))));
    }

    #[test]
    fn magnetization_requires_three_columns() {
        let table = ColumnTable::from_columns(vec![
            ("MagX".to_string(), vec![c(1.0)]),
            ("MagY".to_string(), vec![c(2.0)]),
        ])
        .unwrap();
        let err = MagnetizationTable::new("mag.out", table).unwrap_err();
        assert!(matches!(
            err,
            SpectrumError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn builder_reports_missing_distance() {
        let mut builder = ConnectedCorrelationSet::builder(5);
        for r in [0, 1, 3, 4] {
            builder.insert(r, tensor(5, 1.0)).unwrap();
        }
        match builder.finish() {
            Err(SpectrumError::IncompleteData {
                sites,
                missing,
                duplicated,
            }) => {
                assert_eq!(sites, 5);
                assert_eq!(missing, vec![2]);
                assert!(duplicated.is_empty());
            }
            other => panic!("expected IncompleteData, got {other:?}"),
        }
    }

    #[test]
    fn builder_reports_duplicate_distance() {
        let mut builder = ConnectedCorrelationSet::builder(2);
        builder.insert(0, tensor(2, 1.0)).unwrap();
        builder.insert(1, tensor(2, 1.0)).unwrap();
        builder.insert(1, tensor(2, 2.0)).unwrap();
        match builder.finish() {
            Err(SpectrumError::IncompleteData { duplicated, .. }) => {
                assert_eq!(duplicated, vec![1]);
            }
            other => panic!("expected IncompleteData, got {other:?}"),
        }
    }

    #[test]
    fn builder_rejects_out_of_range_distance() {
        let mut builder = ConnectedCorrelationSet::builder(2);
        let err = builder.insert(2, tensor(2, 1.0)).unwrap_err();
        assert!(matches!(err, SpectrumError::OutOfRange { index: 2, bound: 2, .. }));
    }

    #[test]
    fn complete_builder_keeps_distance_order() {
        let mut builder = ConnectedCorrelationSet::builder(2);
        builder.insert(1, tensor(2, 7.0)).unwrap();
        builder.insert(0, tensor(2, 3.0)).unwrap();
        let set = builder.finish().unwrap();
        assert_eq!(set.sites(), 2);
        assert_eq!(set.tensor(0).unwrap().get(AXIS_PAIRS[0])[0], c(3.0));
        assert_eq!(set.tensor(1).unwrap().get(AXIS_PAIRS[8])[1], c(7.0));
    }
}
