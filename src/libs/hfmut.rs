//! Candidate high-frequency mutations: merges per-position consensus frequencies
//! with secondary structure and keeps positions where the most frequent residue
//! differs from the reference often enough.

use std::io::{BufRead, Write};

/// Secondary structure code of a coil
pub const COIL: &str = "C";

/// Placeholder for a missing secondary structure
pub const NA: &str = "NA";

/// Reference residue of positions the structure does not resolve
pub const UNRESOLVED: &str = "X";

/// One line of a frequency table
#[derive(Debug, Clone, PartialEq)]
pub struct FreqRow {
    pub ref_aa: String,
    pub highest: String,
    /// Fraction in [0, 1]
    pub freq: f64,
}

/// One line of a secondary-structure table
#[derive(Debug, Clone, PartialEq)]
pub struct SsRow {
    pub pos: i64,
    pub ref_aa: String,
    pub ss: String,
}

/// A merged position
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    pub pos: usize,
    pub ref_aa: String,
    pub highest: String,
    pub freq: f64,
    pub ss: String,
}

/// Lines are `ref_aa highest_aa freq%`; a first line containing `Position:` is a header.
///
/// ```
/// use msaprep::libs::hfmut::parse_freq;
///
/// let text = "Position: ref high freq\nA G 67.5%\nK K abc\nshort\n";
/// let rows = parse_freq(text.as_bytes()).unwrap();
/// assert_eq!(rows.len(), 2);
/// assert!((rows[0].freq - 0.675).abs() < 1e-9);
/// assert_eq!(rows[1].freq, 0.0);
/// ```
pub fn parse_freq<R: BufRead>(reader: R) -> std::io::Result<Vec<FreqRow>> {
    let mut rows = vec![];
    let mut first = true;

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if first {
            first = false;
            if line.contains("Position:") {
                continue;
            }
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let freq = fields[2]
            .trim_end_matches('%')
            .parse::<f64>()
            .map(|p| p / 100.0)
            .unwrap_or(0.0);

        rows.push(FreqRow {
            ref_aa: fields[0].to_string(),
            highest: fields[1].to_string(),
            freq,
        });
    }

    Ok(rows)
}

/// Lines are `pos ref_aa ss`; lines without an integer position are skipped
pub fn parse_ss<R: BufRead>(reader: R) -> std::io::Result<Vec<SsRow>> {
    let mut rows = vec![];
    for line in reader.lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            continue;
        }
        let Ok(pos) = fields[0].parse::<i64>() else {
            continue;
        };

        rows.push(SsRow {
            pos,
            ref_aa: fields[1].to_string(),
            ss: fields[2].to_string(),
        });
    }

    Ok(rows)
}

/// Walks the frequency rows, numbering them from 1.
///
/// Unresolved (`X`) rows get no structure row. Every other row takes the next
/// structure row and its residue; once those run out the frequency residue stays
/// and the structure is `NA`.
pub fn merge(freqs: &[FreqRow], ss_rows: &[SsRow]) -> Vec<Site> {
    let mut ss_iter = ss_rows.iter();

    freqs
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let (ref_aa, ss) = if f.ref_aa == UNRESOLVED {
                (UNRESOLVED.to_string(), NA.to_string())
            } else {
                match ss_iter.next() {
                    Some(s) => (s.ref_aa.clone(), s.ss.clone()),
                    None => (f.ref_aa.clone(), NA.to_string()),
                }
            };
            Site {
                pos: i + 1,
                ref_aa,
                highest: f.highest.clone(),
                freq: f.freq,
                ss,
            }
        })
        .collect()
}

/// Sites where another residue dominates: at least `gamma` in coils, `beta` elsewhere
pub fn filter_sites(sites: &[Site], beta: f64, gamma: f64) -> Vec<Site> {
    let mut kept: Vec<Site> = sites
        .iter()
        .filter(|s| s.ref_aa != UNRESOLVED)
        .filter(|s| s.ref_aa != s.highest)
        .filter(|s| {
            let threshold = if s.ss == COIL { gamma } else { beta };
            s.freq >= threshold
        })
        .cloned()
        .collect();
    kept.sort_by_key(|s| s.pos);
    kept.dedup_by_key(|s| s.pos);

    kept
}

pub fn write_table(sites: &[Site], writer: &mut dyn Write) -> std::io::Result<()> {
    writer.write_all(b"pos\tref_aa\thighest_freq_aa\tfrequency\tSS\n")?;
    for s in sites {
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{:.4}\t{}\n",
            s.pos, s.ref_aa, s.highest, s.freq, s.ss
        ))?;
    }
    Ok(())
}
