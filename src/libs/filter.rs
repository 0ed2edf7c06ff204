use crate::libs::alignment::{identity, residue_identity, Alignment};
use crate::libs::error::PrepError;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Identity at which two sequences count as redundant when weighting
pub const WEIGHT_IDENTITY: f64 = 0.8;

/// Columns with at least this unweighted gap fraction are trimmed before filtering
pub const INITIAL_TRIM_GAPS: f64 = 0.8;

/// Filtering thresholds, all fractions in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FilterParameters {
    pub max_frac_gaps_pos: f64,
    pub max_frac_gaps_seq: f64,
    pub min_seqid_to_ref: f64,
    pub max_seqid_to_ref: f64,
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            max_frac_gaps_pos: 0.2,
            max_frac_gaps_seq: 0.2,
            min_seqid_to_ref: 0.2,
            max_seqid_to_ref: 0.8,
        }
    }
}

impl FilterParameters {
    /// ```
    /// use msaprep::libs::filter::FilterParameters;
    ///
    /// let params = FilterParameters::from_slice(&[0.3, 0.2, 0.5, 0.9]).unwrap();
    /// assert_eq!(params.min_seqid_to_ref, 0.5);
    ///
    /// assert!(FilterParameters::from_slice(&[0.3, 0.2, 0.5]).is_err());
    /// assert!(FilterParameters::from_slice(&[0.3, 1.2, 0.5, 0.9]).is_err());
    /// ```
    pub fn from_slice(values: &[f64]) -> Result<Self, PrepError> {
        if values.len() != 4 {
            return Err(PrepError::Parse(format!(
                "expected 4 filtering parameters, got {}",
                values.len()
            )));
        }
        if let Some(v) = values.iter().find(|v| !(0.0..=1.0).contains(*v)) {
            return Err(PrepError::Parse(format!(
                "filtering parameter {} is outside [0, 1]",
                v
            )));
        }

        Ok(Self {
            max_frac_gaps_pos: values[0],
            max_frac_gaps_seq: values[1],
            min_seqid_to_ref: values[2],
            max_seqid_to_ref: values[3],
        })
    }

    pub fn to_array(&self) -> [f64; 4] {
        [
            self.max_frac_gaps_pos,
            self.max_frac_gaps_seq,
            self.min_seqid_to_ref,
            self.max_seqid_to_ref,
        ]
    }
}

/// Weight of each sequence: one over the number of sequences, itself included,
/// sharing at least `max_seqid` residue identity with it.
pub fn sequence_weights(aln: &Alignment, max_seqid: f64) -> Vec<f64> {
    let n = aln.len();
    let mut neighbours = vec![1usize; n];
    for i in 0..n {
        for j in (i + 1)..n {
            if residue_identity(aln.seq(i), aln.seq(j)) >= max_seqid {
                neighbours[i] += 1;
                neighbours[j] += 1;
            }
        }
    }

    neighbours.into_iter().map(|c| 1.0 / c as f64).collect()
}

/// Outcome of sequence filtering
#[derive(Debug, Clone)]
pub struct SequenceFilter {
    pub alignment: Alignment,
    pub weights: Vec<f64>,
    /// Indices of the kept rows in the input alignment
    pub kept: Vec<usize>,
}

/// Removes gappy sequences and, given a reference, sequences whose identity to it
/// falls outside `[min_seqid_to_ref, max_seqid_to_ref]`.
///
/// The reference itself is never judged on identity.
pub fn filter_sequences(
    aln: &Alignment,
    ref_index: Option<usize>,
    params: &FilterParameters,
) -> Result<SequenceFilter, PrepError> {
    let kept: Vec<usize> = (0..aln.len())
        .filter(|&s| aln.seq_gap_fraction(s) <= params.max_frac_gaps_seq)
        .filter(|&s| match ref_index {
            Some(r) if s != r => {
                let id = identity(aln.seq(s), aln.seq(r));
                id >= params.min_seqid_to_ref && id <= params.max_seqid_to_ref
            }
            _ => true,
        })
        .collect();

    if kept.is_empty() {
        return Err(PrepError::DegenerateFilter(format!(
            "no sequence passes gap fraction {} and identity [{}, {}]",
            params.max_frac_gaps_seq, params.min_seqid_to_ref, params.max_seqid_to_ref
        )));
    }

    let alignment = aln.select_rows(&kept);
    let weights = sequence_weights(&alignment, WEIGHT_IDENTITY);

    Ok(SequenceFilter {
        alignment,
        weights,
        kept,
    })
}

/// Removes columns whose weighted gap fraction exceeds `max_frac_gaps`.
///
/// Returns the filtered alignment and the kept column indices.
pub fn filter_positions(
    aln: &Alignment,
    weights: &[f64],
    max_frac_gaps: f64,
) -> Result<(Alignment, Vec<usize>), PrepError> {
    if weights.len() != aln.len() {
        return Err(PrepError::shape("sequence weights", aln.len(), weights.len()));
    }

    let kept: Vec<usize> = aln
        .col_gap_fractions(weights)
        .into_iter()
        .enumerate()
        .filter(|&(_, frac)| frac <= max_frac_gaps)
        .map(|(i, _)| i)
        .collect();

    if kept.is_empty() {
        return Err(PrepError::DegenerateFilter(format!(
            "no position has a gap fraction of at most {}",
            max_frac_gaps
        )));
    }

    Ok((aln.select_columns(&kept), kept))
}

/// Removes columns with [`INITIAL_TRIM_GAPS`] or more gaps, every row counting once.
///
/// Returns the trimmed alignment and the kept column indices.
pub fn trim_gappy_columns(aln: &Alignment) -> Result<(Alignment, Vec<usize>), PrepError> {
    let kept: Vec<usize> = aln
        .col_gap_fractions(&vec![1.0; aln.len()])
        .into_iter()
        .enumerate()
        .filter(|&(_, frac)| frac < INITIAL_TRIM_GAPS)
        .map(|(i, _)| i)
        .collect();

    if kept.is_empty() {
        return Err(PrepError::DegenerateFilter(format!(
            "every position has a gap fraction of {} or more",
            INITIAL_TRIM_GAPS
        )));
    }

    Ok((aln.select_columns(&kept), kept))
}

/// Draws `target` of `nseq` sequences uniformly without replacement, always keeping
/// `must_keep`. Returned indices are in alignment order.
pub fn random_subselect<R: Rng + ?Sized>(
    nseq: usize,
    target: usize,
    must_keep: &[usize],
    rng: &mut R,
) -> Vec<usize> {
    if target >= nseq {
        return (0..nseq).collect();
    }

    let mut chosen: Vec<usize> = must_keep.iter().copied().filter(|&i| i < nseq).collect();
    chosen.sort_unstable();
    chosen.dedup();

    let rest: Vec<usize> = (0..nseq)
        .filter(|i| chosen.binary_search(i).is_err())
        .collect();
    let amount = target.saturating_sub(chosen.len());
    chosen.extend(rest.choose_multiple(rng, amount).copied());
    chosen.sort_unstable();

    chosen
}
