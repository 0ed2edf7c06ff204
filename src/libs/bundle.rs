use crate::libs::alignment::Alignment;
use crate::libs::ats::Ats;
use crate::libs::distance::DistanceMatrix;
use crate::libs::pipeline::{ProcessOptions, Processed};
use serde::Serialize;
use std::io::Write;

/// Everything a downstream analysis needs from one run, serialized as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub alg: Vec<String>,
    pub hd: Vec<String>,
    pub msa_num: Vec<Vec<u8>>,
    pub seqw: Vec<f64>,
    pub nseq: usize,
    pub npos: usize,
    pub ats: Ats,
    pub effseqs: f64,
    pub limitseqs: bool,
    pub nseq_prelimit: usize,
    pub effseqs_prelimit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distmat: Option<Vec<Vec<f64>>>,
    pub pdbid: Option<String>,
    pub pdb_chain: Option<String>,
    pub refseq: Option<String>,
    pub refpos: Option<String>,
    pub i_ref: usize,
    pub i_ref_final: Option<usize>,
    pub trim_parameters: [f64; 4],
    pub truncate_flag: bool,
}

impl Bundle {
    pub fn new(res: &Processed, opts: &ProcessOptions) -> Self {
        let hints = &opts.hints;
        let structure_used = res.distances.is_some();

        Self {
            alg: res.alignment.seq_strings(),
            hd: res.alignment.headers().to_vec(),
            msa_num: res.alignment.to_num(),
            seqw: res.weights.clone(),
            nseq: res.alignment.len(),
            npos: res.alignment.npos(),
            ats: res.ats.clone(),
            effseqs: res.effseqs,
            limitseqs: opts.select,
            nseq_prelimit: res.nseq_prelimit,
            effseqs_prelimit: res.effseqs_prelimit,
            distmat: res.distances.as_ref().map(DistanceMatrix::to_rows),
            pdbid: hints.pdb.clone().filter(|_| structure_used),
            pdb_chain: structure_used.then(|| hints.chain.to_string()),
            refseq: hints.refseq.clone(),
            refpos: hints.refpos.clone(),
            i_ref: res.ref_input,
            i_ref_final: res.ref_final,
            trim_parameters: opts.params.to_array(),
            truncate_flag: opts.truncate,
        }
    }

    pub fn write_json(&self, writer: &mut dyn Write) -> anyhow::Result<()> {
        serde_json::to_writer(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Writes one `>header\nsequence` record per row
pub fn write_fasta(aln: &Alignment, writer: &mut dyn Write) -> std::io::Result<()> {
    for (hd, seq) in aln.headers().iter().zip(aln.seqs()) {
        writer.write_fmt(format_args!(">{}\n", hd))?;
        writer.write_all(seq)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Relaxed PHYLIP square matrix; each column is named `<column>_<label>`
pub fn write_phylip(
    dist: &DistanceMatrix,
    ats: &Ats,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writer.write_fmt(format_args!("{}\n", dist.len()))?;
    for (i, row) in dist.to_rows().iter().enumerate() {
        writer.write_fmt(format_args!(
            "{}_{}\t{}\n",
            i,
            ats[i],
            itertools::join(row, "\t")
        ))?;
    }
    Ok(())
}
