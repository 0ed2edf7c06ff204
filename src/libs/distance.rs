use crate::libs::ats::{Ats, GAP_LABEL};
use crate::libs::error::PrepError;
use indexmap::IndexMap;
use nalgebra::DMatrix;

/// Distance between columns without a structure position
pub const UNREACHABLE: f64 = 1000.0;

/// Pairwise distances between the residues of a structure, indexed by position label.
#[derive(Debug, Clone, PartialEq)]
pub struct StructureDistances {
    index_of: IndexMap<String, usize>,
    matrix: DMatrix<f64>,
}

impl StructureDistances {
    /// A repeated label resolves to its first occurrence.
    pub fn new(labels: &[String], matrix: DMatrix<f64>) -> Result<Self, PrepError> {
        if matrix.nrows() != labels.len() || matrix.ncols() != labels.len() {
            return Err(PrepError::shape(
                "structure distance matrix",
                labels.len(),
                matrix.nrows(),
            ));
        }

        let mut index_of = IndexMap::new();
        for (i, label) in labels.iter().enumerate() {
            index_of.entry(label.clone()).or_insert(i);
        }

        Ok(Self { index_of, matrix })
    }

    pub fn index(&self, label: &str) -> Option<usize> {
        if label == GAP_LABEL {
            return None;
        }
        self.index_of.get(label).copied()
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.matrix[(self.index(a)?, self.index(b)?)])
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }
}

/// Column-by-column distances, following the order of an ATS.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    matrix: DMatrix<f64>,
}

impl DistanceMatrix {
    /// Gathers `raw` distances for the labels of `ats`.
    ///
    /// Pairs involving a `-` column, or a label the structure lacks, get
    /// [`UNREACHABLE`]; the diagonal is zero.
    pub fn remap(raw: &StructureDistances, ats: &Ats) -> Self {
        let rows: Vec<Option<usize>> = ats.iter().map(|label| raw.index(label)).collect();
        let n = rows.len();

        let matrix = DMatrix::from_fn(n, n, |j, k| {
            if j == k {
                return 0.0;
            }
            match (rows[j], rows[k]) {
                (Some(a), Some(b)) => raw.matrix[(a, b)],
                _ => UNREACHABLE,
            }
        });

        Self { matrix }
    }

    /// `D[kept, kept]`
    pub fn select(&self, kept: &[usize]) -> Self {
        let n = kept.len();
        let matrix = DMatrix::from_fn(n, n, |j, k| self.matrix[(kept[j], kept[k])]);

        Self { matrix }
    }

    pub fn len(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.nrows() == 0
    }

    pub fn get(&self, j: usize, k: usize) -> f64 {
        self.matrix[(j, k)]
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.matrix
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}
