use crate::libs::alignment::Alignment;
use crate::libs::ats::{build_ats, Ats};
use crate::libs::distance::DistanceMatrix;
use crate::libs::error::PrepError;
use crate::libs::filter::*;
use crate::libs::reference::{resolve, ReferenceHints, ReferenceSpec};
use crate::libs::structure::StructureSource;
use rand::SeedableRng;

/// Settings of one preprocessing run
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOptions {
    pub hints: ReferenceHints,
    pub params: FilterParameters,
    /// Subsample to 1.5 times the effective number of sequences
    pub select: bool,
    pub truncate: bool,
    pub seed: u64,
}

impl Default for ProcessOptions {
    fn default() -> Self {
        Self {
            hints: ReferenceHints::default(),
            params: FilterParameters::default(),
            select: false,
            truncate: false,
            seed: 42,
        }
    }
}

/// Final alignment with everything derived from it
#[derive(Debug, Clone)]
pub struct Processed {
    pub alignment: Alignment,
    pub ats: Ats,
    pub distances: Option<DistanceMatrix>,
    pub weights: Vec<f64>,
    pub effseqs: f64,
    pub nseq_prelimit: usize,
    pub effseqs_prelimit: f64,
    /// Reference row in the input alignment
    pub ref_input: usize,
    /// Reference row in the final alignment, if it survived
    pub ref_final: Option<usize>,
}

/// Runs every stage on `input`. Nothing is written here.
pub fn run(
    input: &Alignment,
    opts: &ProcessOptions,
    source: &dyn StructureSource,
) -> Result<Processed, PrepError> {
    log::info!(
        "Loaded alignment of {} sequences, {} positions",
        input.len(),
        input.npos()
    );

    //----------------------------
    // Alphabet
    //----------------------------
    let (standard, standard_rows) = input.retain_standard();
    log::info!(
        "Alignment size after removing sequences with non-standard amino acids: {}",
        standard.len()
    );
    if standard.is_empty() {
        return Err(PrepError::DegenerateFilter(
            "every sequence contains non-standard amino acids".to_string(),
        ));
    }

    //----------------------------
    // Reference and ATS
    //----------------------------
    let (spec, ignored) = ReferenceSpec::from_hints(&opts.hints);
    for msg in &ignored {
        log::warn!("{}", msg);
    }
    let spec = match spec {
        ReferenceSpec::ByIndex { index, positions } => {
            let local = standard_rows
                .iter()
                .position(|&r| r == index)
                .ok_or_else(|| {
                    PrepError::Resolution(format!(
                        "reference index {} is missing or contains non-standard amino acids",
                        index
                    ))
                })?;
            ReferenceSpec::ByIndex {
                index: local,
                positions,
            }
        }
        other => other,
    };

    // Labels follow the full reference row; columns are trimmed afterwards
    let resolution = resolve(&spec, &standard, source, opts.seed)?;
    let (labelled, labelled_ats) = build_ats(
        &standard,
        &resolution.labels,
        &resolution.raw_sequence,
        resolution.index,
        opts.truncate,
    )?;

    let (aligned, trim_kept) = trim_gappy_columns(&labelled)?;
    let ats = labelled_ats.select(&trim_kept);
    ats.check_columns(&aligned, "initial trim")?;
    log::info!(
        "Alignment size post-trimming of highly gapped positions: {} positions",
        aligned.npos()
    );

    let distances = resolution
        .distances
        .as_ref()
        .map(|raw| DistanceMatrix::remap(raw, &ats));

    log::info!(
        "Conducting sequence and position filtering: alignment size is {} seqs, {} pos",
        aligned.len(),
        aligned.npos()
    );
    match &distances {
        Some(d) => log::info!(
            "ATS and distmat size - ATS: {}, distmat: {} x {}",
            ats.len(),
            d.len(),
            d.len()
        ),
        None => log::info!(
            "ATS should also have {} positions - ATS: {}",
            aligned.npos(),
            ats.len()
        ),
    }

    //----------------------------
    // Filtering
    //----------------------------
    let seq_filter = filter_sequences(&aligned, Some(resolution.index), &opts.params)?;
    let ref_kept = seq_filter.kept.iter().position(|&k| k == resolution.index);

    let (filtered, pos_kept) = filter_positions(
        &seq_filter.alignment,
        &seq_filter.weights,
        opts.params.max_frac_gaps_pos,
    )?;
    let ats = ats.select(&pos_kept);
    let distances = distances.map(|d| d.select(&pos_kept));
    ats.check_columns(&filtered, "position filtering")?;

    let effseqs_prelimit: f64 = seq_filter.weights.iter().sum();
    let nseq_prelimit = filtered.len();
    log::info!(
        "After filtering: alignment size is {} seqs, {:.2} effective seqs, {} pos",
        nseq_prelimit,
        effseqs_prelimit,
        filtered.npos()
    );

    //----------------------------
    // Down-selection
    //----------------------------
    let (alignment, ref_final) = if opts.select {
        let target = (1.5 * effseqs_prelimit).floor() as usize;
        let must_keep: Vec<usize> = ref_kept.into_iter().collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(opts.seed);
        let chosen = random_subselect(filtered.len(), target, &must_keep, &mut rng);
        log::info!("Selected {} of {} sequences", chosen.len(), filtered.len());

        let ref_final = ref_kept.and_then(|r| chosen.iter().position(|&c| c == r));
        (filtered.select_rows(&chosen), ref_final)
    } else {
        (filtered, ref_kept)
    };

    //----------------------------
    // Final weights
    //----------------------------
    let weights = sequence_weights(&alignment, WEIGHT_IDENTITY);
    let effseqs: f64 = weights.iter().sum();

    log::info!("Final alignment parameters:");
    log::info!("Number of sequences: M = {}", alignment.len());
    log::info!("Number of effective sequences: M' = {:.2}", effseqs);
    log::info!("Number of alignment positions: L = {}", alignment.npos());
    if let Some(d) = &distances {
        log::info!("Number of positions in the ats: {}", ats.len());
        log::info!("Number of structure positions mapped: {}", ats.n_mapped());
        log::info!("Size of the distance matrix: {} x {}", d.len(), d.len());
    }

    Ok(Processed {
        alignment,
        ats,
        distances,
        weights,
        effseqs,
        nseq_prelimit,
        effseqs_prelimit,
        ref_input: standard_rows[resolution.index],
        ref_final,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::distance::{StructureDistances, UNREACHABLE};
    use crate::libs::structure::Structure;
    use nalgebra::DMatrix;

    struct OneStructure(Structure);

    impl StructureSource for OneStructure {
        fn fetch(&self, _id: &str, _chain: char) -> Result<Structure, PrepError> {
            Ok(self.0.clone())
        }
    }

    fn aln(seqs: &[&str]) -> Alignment {
        Alignment::new(
            (0..seqs.len()).map(|i| format!("s{}", i)).collect(),
            seqs.iter().map(|s| s.as_bytes().to_vec()).collect(),
        )
        .unwrap()
    }

    fn permissive() -> FilterParameters {
        FilterParameters {
            max_frac_gaps_pos: 0.5,
            max_frac_gaps_seq: 0.5,
            min_seqid_to_ref: 0.0,
            max_seqid_to_ref: 1.0,
        }
    }

    #[test]
    fn test_index_keeps_input_numbering() {
        // row 1 is dropped for its X, so input row 2 becomes row 1
        let input = aln(&["ACDEFGHIKL", "ACDXFGHIKL", "ACDEFGHIKM", "ACDEFGWWKL"]);
        let opts = ProcessOptions {
            hints: ReferenceHints {
                index: Some(2),
                ..Default::default()
            },
            params: permissive(),
            ..Default::default()
        };

        let res = run(&input, &opts, &crate::libs::structure::PdbFiles).unwrap();
        assert_eq!(res.ref_input, 2);
        assert_eq!(res.alignment.len(), 3);
        assert_eq!(res.ref_final, Some(1));
        assert_eq!(res.alignment.header(1), "s2");
        assert_eq!(res.ats.len(), res.alignment.npos());
        assert!(res.distances.is_none());

        let opts = ProcessOptions {
            hints: ReferenceHints {
                index: Some(1),
                ..Default::default()
            },
            ..opts
        };
        let res = run(&input, &opts, &crate::libs::structure::PdbFiles);
        assert!(matches!(res, Err(PrepError::Resolution(_))));
    }

    #[test]
    fn test_trimmed_reference_residue_keeps_labels() {
        // column 2 is 5/6 gaps and goes, taking the reference W with it
        let mut seqs = vec!["MKWVL"];
        seqs.extend(["MK-VL"; 5]);
        let input = aln(&seqs);

        let dir = tempfile::tempdir().unwrap();
        let refpos = dir.path().join("ref.pos");
        std::fs::write(&refpos, "10\n11\n12\n13\n14\n").unwrap();

        let opts = ProcessOptions {
            hints: ReferenceHints {
                index: Some(0),
                refpos: Some(refpos.to_str().unwrap().to_string()),
                ..Default::default()
            },
            params: permissive(),
            ..Default::default()
        };
        let res = run(&input, &opts, &crate::libs::structure::PdbFiles).unwrap();
        assert_eq!(res.alignment.seq(0), b"MKVL");
        assert_eq!(res.ats.to_vec(), vec!["10", "11", "13", "14"]);

        // sequential numbering follows the full reference row as well
        let opts = ProcessOptions {
            hints: ReferenceHints {
                index: Some(0),
                ..Default::default()
            },
            params: permissive(),
            ..Default::default()
        };
        let res = run(&input, &opts, &crate::libs::structure::PdbFiles).unwrap();
        assert_eq!(res.ats.to_vec(), vec!["1", "2", "4", "5"]);
    }

    #[test]
    fn test_structure_run() {
        let input = aln(&[
            "MKV-LWHE-",
            "MKVCLWHEA",
            "MKACLWHE-",
            "MRVCLYHE-",
        ]);
        let seq = b"MKVCLWHE";
        let labels: Vec<String> = (1..=seq.len()).map(|i| (i + 20).to_string()).collect();
        let matrix = DMatrix::from_fn(8, 8, |i, j| (i as f64 - j as f64).abs());
        let structure = Structure {
            sequence: seq.to_vec(),
            labels: labels.clone(),
            distances: StructureDistances::new(&labels, matrix).unwrap(),
        };

        let opts = ProcessOptions {
            hints: ReferenceHints {
                pdb: Some("1abc.pdb".to_string()),
                ..Default::default()
            },
            params: permissive(),
            ..Default::default()
        };
        let res = run(&input, &opts, &OneStructure(structure)).unwrap();

        assert_eq!(res.ref_input, 1);
        // the last column is 75% gaps and goes
        assert_eq!(res.alignment.npos(), 8);
        assert_eq!(res.ats.to_vec(), labels);
        let d = res.distances.unwrap();
        assert_eq!(d.len(), 8);
        assert_eq!(d.get(0, 7), 7.0);
        assert_eq!(d.get(2, 5), 3.0);
    }

    #[test]
    fn test_gap_columns_unreachable() {
        let input = aln(&["MKVCLWHE-", "MKV-LWHEA", "MKV-LWHEA", "MKVCLWHEA"]);
        let seq = b"MKVLWHEA";
        let labels: Vec<String> = (1..=seq.len()).map(|i| i.to_string()).collect();
        let matrix = DMatrix::from_fn(8, 8, |i, j| (i as f64 - j as f64).abs());
        let structure = Structure {
            sequence: seq.to_vec(),
            labels: labels.clone(),
            distances: StructureDistances::new(&labels, matrix).unwrap(),
        };

        let opts = ProcessOptions {
            hints: ReferenceHints {
                pdb: Some("1abc.pdb".to_string()),
                ..Default::default()
            },
            params: permissive(),
            ..Default::default()
        };
        let res = run(&input, &opts, &OneStructure(structure)).unwrap();

        assert_eq!(res.ref_input, 1);
        assert_eq!(res.ats.len(), res.alignment.npos());
        assert_eq!(res.ats[3], "-");
        let d = res.distances.unwrap();
        for k in 0..d.len() {
            if k != 3 {
                assert_eq!(d.get(3, k), UNREACHABLE);
            }
        }
        assert_eq!(d.get(0, 4), 3.0);
    }

    #[test]
    fn test_select_floor() {
        // six copies of one sequence weigh 1 together; three distinct ones weigh 1 each
        let mut seqs = vec!["ACDEFGHIKL"; 6];
        seqs.extend(["ACDEWWWWKL", "WWDEFGHWWL", "ACWWWGHIWW"]);
        let input = aln(&seqs);

        let opts = ProcessOptions {
            hints: ReferenceHints {
                index: Some(7),
                ..Default::default()
            },
            params: permissive(),
            select: true,
            ..Default::default()
        };
        let res = run(&input, &opts, &crate::libs::structure::PdbFiles).unwrap();

        assert_eq!(res.nseq_prelimit, 9);
        approx::assert_relative_eq!(res.effseqs_prelimit, 4.0);
        assert_eq!(res.alignment.len(), 6);
        let ref_final = res.ref_final.unwrap();
        assert_eq!(res.alignment.header(ref_final), "s7");
        assert_eq!(res.weights.len(), 6);
        approx::assert_relative_eq!(res.effseqs, res.weights.iter().sum::<f64>());
    }

    #[test]
    fn test_degenerate_input() {
        let input = aln(&["XXXX", "BBBB"]);
        let res = run(&input, &ProcessOptions::default(), &crate::libs::structure::PdbFiles);
        assert!(matches!(res, Err(PrepError::DegenerateFilter(_))));
    }
}
