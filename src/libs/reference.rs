//! Reference resolution.
//!
//! The user may hint at the reference in several overlapping ways. The hints are
//! first reduced to exactly one [`ReferenceSpec`] by a fixed precedence:
//!
//! | hints                 | strategy         |
//! |-----------------------|------------------|
//! | index                 | `ByIndex`        |
//! | refseq                | `BySequenceFile` |
//! | pdb                   | `ByPdb`          |
//! | none of the above     | `Auto`           |
//!
//! Hints that lose are reported back so the caller can warn about them.

use crate::libs::alignment::{read_alignment, Alignment};
use crate::libs::ats::{sequential_labels, GAP_LABEL};
use crate::libs::distance::StructureDistances;
use crate::libs::error::PrepError;
use crate::libs::search::{best_match, choose_reference};
use crate::libs::structure::StructureSource;
use std::io::BufRead;

/// Everything the user said about the reference
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceHints {
    pub pdb: Option<String>,
    pub chain: char,
    pub species: Option<String>,
    pub refseq: Option<String>,
    pub refpos: Option<String>,
    pub index: Option<usize>,
}

impl Default for ReferenceHints {
    fn default() -> Self {
        Self {
            pdb: None,
            chain: 'A',
            species: None,
            refseq: None,
            refpos: None,
            index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSpec {
    ByPdb {
        path: String,
        chain: char,
        species: Option<String>,
    },
    BySequenceFile {
        path: String,
        positions: Option<String>,
    },
    ByIndex {
        index: usize,
        positions: Option<String>,
    },
    Auto,
}

impl ReferenceSpec {
    /// Applies the precedence table. Returns the strategy and one message per ignored hint.
    pub fn from_hints(hints: &ReferenceHints) -> (Self, Vec<String>) {
        let mut ignored = vec![];

        let spec = if let Some(index) = hints.index {
            if hints.pdb.is_some() {
                ignored.push("Reference index given, ignoring the PDB file".to_string());
            }
            if hints.refseq.is_some() {
                ignored.push("Reference index given, ignoring the reference sequence".to_string());
            }
            if hints.species.is_some() {
                ignored.push("Reference index given, ignoring species".to_string());
            }
            ReferenceSpec::ByIndex {
                index,
                positions: hints.refpos.clone(),
            }
        } else if let Some(path) = &hints.refseq {
            if hints.pdb.is_some() {
                ignored.push("Using the reference sequence, ignoring the PDB file".to_string());
            }
            if hints.species.is_some() {
                ignored.push("No PDB file in use, ignoring species".to_string());
            }
            ReferenceSpec::BySequenceFile {
                path: path.clone(),
                positions: hints.refpos.clone(),
            }
        } else if let Some(path) = &hints.pdb {
            if hints.refpos.is_some() {
                ignored.push(
                    "Positions come from the PDB file, ignoring the position list".to_string(),
                );
            }
            ReferenceSpec::ByPdb {
                path: path.clone(),
                chain: hints.chain,
                species: hints.species.clone(),
            }
        } else {
            if hints.species.is_some() {
                ignored.push("No PDB file, ignoring species".to_string());
            }
            if hints.refpos.is_some() {
                ignored.push("No reference sequence, ignoring the position list".to_string());
            }
            ReferenceSpec::Auto
        };

        (spec, ignored)
    }
}

/// A resolved reference: its row, the residues the labels belong to, and the
/// structure distances when a structure was used.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub index: usize,
    pub raw_sequence: Vec<u8>,
    pub labels: Vec<String>,
    pub distances: Option<StructureDistances>,
}

pub fn resolve(
    spec: &ReferenceSpec,
    aln: &Alignment,
    source: &dyn StructureSource,
    seed: u64,
) -> Result<Resolution, PrepError> {
    match spec {
        ReferenceSpec::ByIndex { index, positions } => {
            resolve_index(aln, *index, positions.as_deref())
        }
        ReferenceSpec::ByPdb {
            path,
            chain,
            species,
        } => resolve_pdb(aln, source, path, *chain, species.as_deref()),
        ReferenceSpec::BySequenceFile { path, positions } => {
            resolve_sequence_file(aln, path, positions.as_deref())
        }
        ReferenceSpec::Auto => resolve_auto(aln, seed),
    }
}

fn resolve_index(
    aln: &Alignment,
    index: usize,
    positions: Option<&str>,
) -> Result<Resolution, PrepError> {
    if index >= aln.len() {
        return Err(PrepError::Resolution(format!(
            "reference index {} out of range for {} sequences",
            index,
            aln.len()
        )));
    }
    log::info!("Using provided reference index {}: {}", index, aln.header(index));

    let raw_sequence = aln.ungapped(index);
    let labels = match positions {
        Some(path) => read_positions(path).map_err(|e| {
            PrepError::Resolution(format!("reading position list {}: {}", path, e))
        })?,
        None => sequential_labels(raw_sequence.len()),
    };

    Ok(Resolution {
        index,
        raw_sequence,
        labels,
        distances: None,
    })
}

fn resolve_pdb(
    aln: &Alignment,
    source: &dyn StructureSource,
    path: &str,
    chain: char,
    species: Option<&str>,
) -> Result<Resolution, PrepError> {
    let structure = source
        .fetch(path, chain)
        .map_err(|e| PrepError::Resolution(format!("loading structure {}: {}", path, e)))?;

    let index = match species {
        Some(sp) => {
            log::info!("Finding reference sequence using species-based best match...");
            match best_match(aln, &structure.sequence, Some(sp)) {
                Ok(i) => i,
                Err(e) => {
                    log::warn!("Species-based search failed ({}), using global search", e);
                    best_match(aln, &structure.sequence, None)?
                }
            }
        }
        None => {
            log::info!("Finding reference sequence using global search...");
            best_match(aln, &structure.sequence, None)?
        }
    };
    log::info!("Reference sequence index is {}: {}", index, aln.header(index));

    Ok(Resolution {
        index,
        raw_sequence: structure.sequence,
        labels: structure.labels,
        distances: Some(structure.distances),
    })
}

fn resolve_sequence_file(
    aln: &Alignment,
    path: &str,
    positions: Option<&str>,
) -> Result<Resolution, PrepError> {
    log::info!("Finding reference sequence using provided sequence file...");
    let refs = read_alignment(path).map_err(|e| {
        PrepError::Resolution(format!("reading reference sequence {}: {}", path, e))
    })?;
    let raw_sequence: Vec<u8> = refs.ungapped(0);
    if raw_sequence.is_empty() {
        return Err(PrepError::Resolution(format!(
            "reference sequence in {} is empty",
            path
        )));
    }

    let index = best_match(aln, &raw_sequence, None)?;
    log::info!("Reference sequence index is {}: {}", index, aln.header(index));

    let labels = match positions {
        Some(pos_path) => match read_positions(pos_path) {
            Ok(labels) => labels,
            Err(e) => {
                log::warn!(
                    "Error reading position list {} ({}), using default numbering 1..N",
                    pos_path,
                    e
                );
                sequential_labels(raw_sequence.len())
            }
        },
        None => {
            log::info!("No reference position list provided, using default numbering 1..N");
            sequential_labels(raw_sequence.len())
        }
    };

    Ok(Resolution {
        index,
        raw_sequence,
        labels,
        distances: None,
    })
}

fn resolve_auto(aln: &Alignment, seed: u64) -> Result<Resolution, PrepError> {
    let index = choose_reference(aln, seed)?;
    log::info!(
        "No reference sequence given, chose as default ({}): {}",
        index,
        aln.header(index)
    );
    let raw_sequence = aln.ungapped(index);
    let labels = sequential_labels(raw_sequence.len());

    Ok(Resolution {
        index,
        raw_sequence,
        labels,
        distances: None,
    })
}

/// One position label per non-blank line, in file order
pub fn read_positions(path: &str) -> Result<Vec<String>, PrepError> {
    let reader = crate::reader(path)?;
    let mut labels = vec![];
    for line in reader.lines() {
        let line = line?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    if labels.is_empty() {
        return Err(PrepError::Parse(format!("no positions in {}", path)));
    }
    if labels.iter().any(|l| l == GAP_LABEL) {
        return Err(PrepError::Parse(format!(
            "'-' is reserved for unmapped columns, found in {}",
            path
        )));
    }

    Ok(labels)
}
