use crate::libs::error::PrepError;

/// The twenty standard amino acids, in the order used by the numeric encoding
pub const AMINO_ACIDS: &[u8; 20] = b"ACDEFGHIKLMNPQRSTVWY";

pub const GAP: u8 = b'-';

/// Headers and equal-length sequences of a multiple sequence alignment.
///
/// Rows keep their header attached, so any row selection re-slices both.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alignment {
    headers: Vec<String>,
    seqs: Vec<Vec<u8>>,
}

impl Alignment {
    /// ```
    /// use msaprep::libs::alignment::Alignment;
    ///
    /// let aln = Alignment::new(
    ///     vec!["s1".to_string(), "s2".to_string()],
    ///     vec![b"A-CDE".to_vec(), b"ABCDE".to_vec()],
    /// )
    /// .unwrap();
    /// assert_eq!(aln.len(), 2);
    /// assert_eq!(aln.npos(), 5);
    ///
    /// let res = Alignment::new(
    ///     vec!["s1".to_string(), "s2".to_string()],
    ///     vec![b"A-CDE".to_vec(), b"ABCD".to_vec()],
    /// );
    /// assert!(res.is_err());
    /// ```
    pub fn new(headers: Vec<String>, seqs: Vec<Vec<u8>>) -> Result<Self, PrepError> {
        if headers.len() != seqs.len() {
            return Err(PrepError::shape("alignment headers", seqs.len(), headers.len()));
        }
        if let Some(first) = seqs.first() {
            for seq in &seqs {
                if seq.len() != first.len() {
                    return Err(PrepError::shape(
                        "alignment sequence length",
                        first.len(),
                        seq.len(),
                    ));
                }
            }
        }

        Ok(Self { headers, seqs })
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.seqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seqs.is_empty()
    }

    /// Number of columns
    pub fn npos(&self) -> usize {
        self.seqs.first().map_or(0, |s| s.len())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn seqs(&self) -> &[Vec<u8>] {
        &self.seqs
    }

    pub fn header(&self, i: usize) -> &str {
        &self.headers[i]
    }

    pub fn seq(&self, i: usize) -> &[u8] {
        &self.seqs[i]
    }

    /// Residues of row `i` with gaps removed
    pub fn ungapped(&self, i: usize) -> Vec<u8> {
        self.seqs[i].iter().copied().filter(|&c| c != GAP).collect()
    }

    /// Keeps the rows in `rows`, in that order
    pub fn select_rows(&self, rows: &[usize]) -> Alignment {
        Alignment {
            headers: rows.iter().map(|&i| self.headers[i].clone()).collect(),
            seqs: rows.iter().map(|&i| self.seqs[i].clone()).collect(),
        }
    }

    /// Keeps the columns in `cols`, in that order
    pub fn select_columns(&self, cols: &[usize]) -> Alignment {
        Alignment {
            headers: self.headers.clone(),
            seqs: self
                .seqs
                .iter()
                .map(|s| cols.iter().map(|&c| s[c]).collect())
                .collect(),
        }
    }

    pub fn seq_gap_fraction(&self, i: usize) -> f64 {
        let npos = self.npos();
        if npos == 0 {
            return 0.0;
        }
        let gaps = self.seqs[i].iter().filter(|&&c| c == GAP).count();
        gaps as f64 / npos as f64
    }

    /// Per-column gap fraction, each row counted with its weight
    pub fn col_gap_fractions(&self, weights: &[f64]) -> Vec<f64> {
        let total: f64 = weights.iter().sum();
        let mut fractions = vec![0.0; self.npos()];
        if total <= 0.0 {
            return fractions;
        }

        for (seq, w) in self.seqs.iter().zip(weights) {
            for (frac, &c) in fractions.iter_mut().zip(seq) {
                if c == GAP {
                    *frac += w;
                }
            }
        }
        for frac in fractions.iter_mut() {
            *frac /= total;
        }

        fractions
    }

    /// Drops rows containing anything but the twenty amino acids and gaps.
    ///
    /// Returns the remaining alignment and the original indices of its rows.
    pub fn retain_standard(&self) -> (Alignment, Vec<usize>) {
        let kept: Vec<usize> = (0..self.len())
            .filter(|&i| self.seqs[i].iter().all(|&c| is_standard(c)))
            .collect();

        (self.select_rows(&kept), kept)
    }

    /// Numeric encoding: gap is 0, amino acids are 1..=20
    pub fn to_num(&self) -> Vec<Vec<u8>> {
        self.seqs
            .iter()
            .map(|s| s.iter().map(|&c| aa_code(c)).collect())
            .collect()
    }

    /// Sequences as strings, for output
    pub fn seq_strings(&self) -> Vec<String> {
        self.seqs
            .iter()
            .map(|s| String::from_utf8_lossy(s).to_string())
            .collect()
    }
}

pub fn is_standard(c: u8) -> bool {
    c == GAP || AMINO_ACIDS.contains(&c)
}

fn aa_code(c: u8) -> u8 {
    AMINO_ACIDS
        .iter()
        .position(|&a| a == c)
        .map_or(0, |p| p as u8 + 1)
}

/// Fraction of columns holding the same character in both rows, gaps included
///
/// ```
/// use msaprep::libs::alignment::identity;
///
/// assert_eq!(identity(b"ACDE", b"ACDE"), 1.0);
/// assert_eq!(identity(b"A-DE", b"A-CE"), 0.75);
/// ```
pub fn identity(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    same as f64 / a.len() as f64
}

/// Fraction of columns where both rows share the same residue; gaps never match
///
/// ```
/// use msaprep::libs::alignment::residue_identity;
///
/// assert_eq!(residue_identity(b"A-DE", b"A-DE"), 0.75);
/// assert_eq!(residue_identity(b"ACDE", b"ACDF"), 0.75);
/// ```
pub fn residue_identity(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() {
        return 0.0;
    }
    let same = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x == y && **x != GAP)
        .count();
    same as f64 / a.len() as f64
}

/// Reads a FASTA alignment; headers keep the description after the name.
///
/// Sequences are upper-cased.
pub fn read_alignment(infile: &str) -> Result<Alignment, PrepError> {
    let reader = crate::reader(infile)?;
    let mut fa_in = noodles_fasta::io::Reader::new(reader);

    let mut headers = vec![];
    let mut seqs = vec![];
    for result in fa_in.records() {
        let record = result?;

        let mut header = String::from_utf8_lossy(record.name()).to_string();
        if let Some(desc) = record.description() {
            header.push(' ');
            header.push_str(&String::from_utf8_lossy(desc));
        }
        let seq = record
            .sequence()
            .get(..)
            .unwrap_or_default()
            .to_ascii_uppercase();

        headers.push(header);
        seqs.push(seq);
    }

    if seqs.is_empty() {
        return Err(PrepError::Parse(format!("no sequences in {}", infile)));
    }

    Alignment::new(headers, seqs)
}
