//! Reads a protein chain from a PDB file: residue sequence, position labels and
//! residue-residue distances.

use crate::libs::distance::StructureDistances;
use crate::libs::error::PrepError;
use indexmap::IndexMap;
use nalgebra::DMatrix;
use std::io::BufRead;

/// Sequence, labels and distances of one structure chain
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    pub sequence: Vec<u8>,
    pub labels: Vec<String>,
    pub distances: StructureDistances,
}

/// Where structures come from.
pub trait StructureSource {
    fn fetch(&self, id: &str, chain: char) -> Result<Structure, PrepError>;
}

/// Structures stored as local PDB files; the id is the file path
#[derive(Debug, Default, Clone, Copy)]
pub struct PdbFiles;

impl StructureSource for PdbFiles {
    fn fetch(&self, id: &str, chain: char) -> Result<Structure, PrepError> {
        let reader = crate::reader(id)?;
        parse_pdb(reader, chain)
    }
}

#[derive(Debug)]
struct Residue {
    name: String,
    atoms: Vec<[f64; 3]>,
}

// Byte columns of an ATOM record, trimmed
fn field(line: &str, range: std::ops::Range<usize>) -> &str {
    line.get(range).unwrap_or("").trim()
}

/// Parses ATOM/HETATM records of `chain` from the first model.
///
/// HETATM records only count for modified amino acids such as MSE. Only the first
/// alternate location of an atom is used.
pub fn parse_pdb<R: BufRead>(reader: R, chain: char) -> Result<Structure, PrepError> {
    let mut residues: IndexMap<String, Residue> = IndexMap::new();

    for line in reader.lines() {
        let line = line?;

        if line.starts_with("ENDMDL") {
            break;
        }
        let is_atom = line.starts_with("ATOM");
        if !is_atom && !line.starts_with("HETATM") {
            continue;
        }
        if line.len() < 54 || line.get(21..22) != Some(chain.to_string().as_str()) {
            continue;
        }

        let altloc = field(&line, 16..17);
        if !altloc.is_empty() && altloc != "A" {
            continue;
        }

        let res_name = field(&line, 17..20).to_string();
        if !is_atom && three_to_one(&res_name).is_none() {
            continue;
        }

        let label = format!("{}{}", field(&line, 22..26), field(&line, 26..27));
        let coords = match (
            field(&line, 30..38).parse::<f64>(),
            field(&line, 38..46).parse::<f64>(),
            field(&line, 46..54).parse::<f64>(),
        ) {
            (Ok(x), Ok(y), Ok(z)) => [x, y, z],
            _ => continue,
        };

        residues
            .entry(label)
            .or_insert_with(|| Residue {
                name: res_name,
                atoms: vec![],
            })
            .atoms
            .push(coords);
    }

    if residues.is_empty() {
        return Err(PrepError::Parse(format!(
            "no residues found for chain {}",
            chain
        )));
    }

    let sequence: Vec<u8> = residues
        .values()
        .map(|r| three_to_one(&r.name).unwrap_or(b'X'))
        .collect();
    let labels: Vec<String> = residues.keys().cloned().collect();

    let atoms: Vec<&Vec<[f64; 3]>> = residues.values().map(|r| &r.atoms).collect();
    let n = atoms.len();
    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in (i + 1)..n {
            let d = min_distance(atoms[i], atoms[j]);
            matrix[(i, j)] = d;
            matrix[(j, i)] = d;
        }
    }
    log::debug!("Chain {}: {} residues", chain, n);

    let distances = StructureDistances::new(&labels, matrix)?;

    Ok(Structure {
        sequence,
        labels,
        distances,
    })
}

fn min_distance(a: &[[f64; 3]], b: &[[f64; 3]]) -> f64 {
    let mut min = f64::INFINITY;
    for p in a {
        for q in b {
            let d2 = (p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2) + (p[2] - q[2]).powi(2);
            if d2 < min {
                min = d2;
            }
        }
    }
    min.sqrt()
}

pub fn three_to_one(name: &str) -> Option<u8> {
    let aa = match name {
        "ALA" => b'A',
        "CYS" => b'C',
        "ASP" => b'D',
        "GLU" => b'E',
        "PHE" => b'F',
        "GLY" => b'G',
        "HIS" => b'H',
        "ILE" => b'I',
        "LYS" => b'K',
        "LEU" => b'L',
        "MET" | "MSE" => b'M',
        "ASN" => b'N',
        "PRO" => b'P',
        "GLN" => b'Q',
        "ARG" => b'R',
        "SER" => b'S',
        "THR" => b'T',
        "VAL" => b'V',
        "TRP" => b'W',
        "TYR" => b'Y',
        _ => return None,
    };
    Some(aa)
}
