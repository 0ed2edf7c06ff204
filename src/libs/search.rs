use crate::libs::alignment::{residue_identity, Alignment};
use crate::libs::error::PrepError;
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;
use bio::scores::blosum62;
use nalgebra::DMatrix;
use rand::SeedableRng;

pub const GAP_OPEN: i32 = -10;
pub const GAP_EXTEND: i32 = -1;

/// Automatic reference selection works on at most this many sequences
pub const MAX_REF_SAMPLE: usize = 1000;

// Letters known to the BLOSUM62 table
const BLOSUM_LETTERS: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX*";

/// Global protein aligner used to relate ungapped sequences.
pub struct CoAligner {
    aligner: Aligner<fn(u8, u8) -> i32>,
}

impl Default for CoAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl CoAligner {
    pub fn new() -> Self {
        Self {
            aligner: Aligner::new(GAP_OPEN, GAP_EXTEND, blosum62 as fn(u8, u8) -> i32),
        }
    }

    /// Index pairs `(i, j)` with `x[i]` aligned against `y[j]`
    pub fn pairs(&mut self, x: &[u8], y: &[u8]) -> Vec<(usize, usize)> {
        if x.is_empty() || y.is_empty() {
            return vec![];
        }
        let x = sanitize(x);
        let y = sanitize(y);
        let alignment = self.aligner.global(&x, &y);

        let mut pairs = vec![];
        let (mut i, mut j) = (alignment.xstart, alignment.ystart);
        for op in &alignment.operations {
            match op {
                AlignmentOperation::Match | AlignmentOperation::Subst => {
                    pairs.push((i, j));
                    i += 1;
                    j += 1;
                }
                AlignmentOperation::Ins => i += 1,
                AlignmentOperation::Del => j += 1,
                AlignmentOperation::Xclip(n) => i += n,
                AlignmentOperation::Yclip(n) => j += n,
            }
        }

        pairs
    }

    /// Identical aligned residues over the length of `target`
    pub fn identity(&mut self, candidate: &[u8], target: &[u8]) -> f64 {
        if target.is_empty() {
            return 0.0;
        }
        let same = self
            .pairs(candidate, target)
            .into_iter()
            .filter(|&(i, j)| candidate[i].eq_ignore_ascii_case(&target[j]))
            .count();
        same as f64 / target.len() as f64
    }
}

fn sanitize(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .map(|c| c.to_ascii_uppercase())
        .map(|c| if BLOSUM_LETTERS.contains(&c) { c } else { b'X' })
        .collect()
}

/// Finds the alignment row most similar to `target`.
///
/// With a species, only rows whose header contains it (case-insensitive) are
/// candidates. Fails when there is no candidate or none shares a residue with the target.
pub fn best_match(
    aln: &Alignment,
    target: &[u8],
    species: Option<&str>,
) -> Result<usize, PrepError> {
    let candidates: Vec<usize> = match species {
        Some(sp) => {
            let sp = sp.to_lowercase();
            (0..aln.len())
                .filter(|&i| aln.header(i).to_lowercase().contains(&sp))
                .collect()
        }
        None => (0..aln.len()).collect(),
    };
    if candidates.is_empty() {
        return Err(PrepError::Resolution(match species {
            Some(sp) => format!("no sequence header mentions species '{}'", sp),
            None => "the alignment is empty".to_string(),
        }));
    }

    let mut aligner = CoAligner::new();
    let mut best: Option<(usize, f64)> = None;
    for i in candidates {
        let id = aligner.identity(&aln.ungapped(i), target);
        if best.map_or(true, |(_, b)| id > b) {
            best = Some((i, id));
        }
    }

    match best {
        Some((i, id)) if id > 0.0 => {
            log::debug!("Best match {} with identity {:.3}", i, id);
            Ok(i)
        }
        _ => Err(PrepError::Resolution(
            "no sequence resembles the target sequence".to_string(),
        )),
    }
}

/// Picks the most typical sequence: the one whose mean identity to the others is
/// closest to the mean pairwise identity of the alignment.
pub fn choose_reference(aln: &Alignment, seed: u64) -> Result<usize, PrepError> {
    if aln.is_empty() {
        return Err(PrepError::Resolution("the alignment is empty".to_string()));
    }
    if aln.len() == 1 {
        return Ok(0);
    }

    let sample: Vec<usize> = if aln.len() > MAX_REF_SAMPLE {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, aln.len(), MAX_REF_SAMPLE).into_vec();
        picked.sort_unstable();
        picked
    } else {
        (0..aln.len()).collect()
    };

    let n = sample.len();
    let mut sim = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let id = residue_identity(aln.seq(sample[i]), aln.seq(sample[j]));
            sim[(i, j)] = id;
            sim[(j, i)] = id;
        }
    }

    let mut upper = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            upper += sim[(i, j)];
        }
    }
    let mean_all = upper / (n * (n - 1) / 2) as f64;

    let mut best = 0;
    let mut best_diff = f64::INFINITY;
    for (k, row) in sim.row_iter().enumerate() {
        let diff = (row.mean() - mean_all).abs();
        if diff < best_diff {
            best = k;
            best_diff = diff;
        }
    }

    Ok(sample[best])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(pairs: &[(&str, &str)]) -> Alignment {
        Alignment::new(
            pairs.iter().map(|(h, _)| h.to_string()).collect(),
            pairs.iter().map(|(_, s)| s.as_bytes().to_vec()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_pairs_identical() {
        let mut aligner = CoAligner::new();
        let pairs = aligner.pairs(b"MKLVW", b"MKLVW");
        assert_eq!(pairs, vec![(0, 0), (1, 1), (2, 2), (3, 3), (4, 4)]);
        assert_eq!(aligner.identity(b"MKLVW", b"MKLVW"), 1.0);
    }

    #[test]
    fn test_pairs_offset() {
        let mut aligner = CoAligner::new();
        let pairs = aligner.pairs(b"WHKLMNPQ", b"GSSWHKLMNPQ");
        assert_eq!(pairs.first(), Some(&(0, 3)));
        assert_eq!(pairs.last(), Some(&(7, 10)));
    }

    #[test]
    fn test_best_match() {
        let aln = named(&[
            ("s0 Mus musculus", "MKV-LWHE"),
            ("s1 Homo sapiens", "MKVCLWHE"),
            ("s2 Danio rerio", "AAPG-GSD"),
        ]);

        assert_eq!(best_match(&aln, b"MKVCLWHE", None).unwrap(), 1);
        assert_eq!(best_match(&aln, b"MKVCLWHE", Some("mus musculus")).unwrap(), 0);
        assert!(matches!(
            best_match(&aln, b"MKVCLWHE", Some("Gallus")),
            Err(PrepError::Resolution(_))
        ));
    }

    #[test]
    fn test_choose_reference() {
        // mean pairwise identity is 0.4; row means are 0.5, 0.52, 0.6, 0.48, 0.5
        let aln = named(&[
            ("a", "AAAAAAAAAA"),
            ("b", "AAAAAAAAAC"),
            ("c", "AAAAACCCCC"),
            ("d", "CCCCCCCCCA"),
            ("e", "CCCCCCCCCC"),
        ]);
        assert_eq!(choose_reference(&aln, 42).unwrap(), 3);

        let single = named(&[("a", "AC-D")]);
        assert_eq!(choose_reference(&single, 42).unwrap(), 0);
    }
}
