use crate::libs::alignment::{Alignment, GAP};
use crate::libs::error::PrepError;
use crate::libs::search::CoAligner;
use serde::Serialize;

/// Label of a column with no structure position
pub const GAP_LABEL: &str = "-";

/// Alignment-to-structure map: one label per alignment column.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct Ats(Vec<String>);

impl Ats {
    pub fn new(labels: Vec<String>) -> Self {
        Self(labels)
    }

    pub fn is_gap(&self, col: usize) -> bool {
        self.0[col] == GAP_LABEL
    }

    /// Keeps the labels of the columns in `cols`
    pub fn select(&self, cols: &[usize]) -> Ats {
        Ats(cols.iter().map(|&c| self.0[c].clone()).collect())
    }

    /// Number of columns mapped onto a structure position
    pub fn n_mapped(&self) -> usize {
        self.0.iter().filter(|l| *l != GAP_LABEL).count()
    }

    /// Errors unless there is exactly one label per column of `aln`
    pub fn check_columns(&self, aln: &Alignment, context: &str) -> Result<(), PrepError> {
        if self.0.len() != aln.npos() {
            return Err(PrepError::shape(context, aln.npos(), self.0.len()));
        }
        Ok(())
    }
}

impl std::ops::Deref for Ats {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Sequential position labels `1..=n`
pub fn sequential_labels(n: usize) -> Vec<String> {
    (1..=n).map(|i| i.to_string()).collect()
}

/// Maps the columns of `aln` onto the position labels of the reference row.
///
/// `labels` belong to the residues of `raw_seq`. With `truncate`, columns where the
/// reference has a gap are dropped; otherwise they are kept and labelled `-`.
pub fn build_ats(
    aln: &Alignment,
    labels: &[String],
    raw_seq: &[u8],
    ref_index: usize,
    truncate: bool,
) -> Result<(Alignment, Ats), PrepError> {
    if ref_index >= aln.len() {
        return Err(PrepError::Resolution(format!(
            "reference index {} out of range for {} sequences",
            ref_index,
            aln.len()
        )));
    }

    let residue_cols: Vec<usize> = aln
        .seq(ref_index)
        .iter()
        .enumerate()
        .filter(|(_, &c)| c != GAP)
        .map(|(i, _)| i)
        .collect();
    let residue_labels = label_residues(&aln.ungapped(ref_index), labels, raw_seq)?;

    let (out, ats) = if truncate {
        (aln.select_columns(&residue_cols), Ats::new(residue_labels))
    } else {
        let mut col_labels = vec![GAP_LABEL.to_string(); aln.npos()];
        for (&col, label) in residue_cols.iter().zip(residue_labels) {
            col_labels[col] = label;
        }
        (aln.clone(), Ats::new(col_labels))
    };
    ats.check_columns(&out, "ATS construction")?;

    Ok((out, ats))
}

// One label per residue of the reference row
fn label_residues(
    residues: &[u8],
    labels: &[String],
    raw_seq: &[u8],
) -> Result<Vec<String>, PrepError> {
    if residues.eq_ignore_ascii_case(raw_seq) {
        if labels.len() < residues.len() {
            return Err(PrepError::shape(
                "position labels",
                residues.len(),
                labels.len(),
            ));
        }
        return Ok(labels[..residues.len()].to_vec());
    }

    // The structure differs from the alignment row: co-align the two
    if labels.len() != raw_seq.len() {
        return Err(PrepError::shape(
            "labels of the reference sequence",
            raw_seq.len(),
            labels.len(),
        ));
    }
    let mut out = vec![GAP_LABEL.to_string(); residues.len()];
    let mut aligner = CoAligner::new();
    for (i_res, i_raw) in aligner.pairs(residues, raw_seq) {
        out[i_res] = labels[i_raw].clone();
    }
    log::debug!(
        "Co-aligned reference row with its structure, {} of {} residues labelled",
        out.iter().filter(|l| *l != GAP_LABEL).count(),
        residues.len()
    );

    Ok(out)
}
