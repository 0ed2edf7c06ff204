use anyhow::Context;
use clap::*;
use msaprep::libs::bundle::{write_fasta, write_phylip, Bundle};
use msaprep::libs::filter::FilterParameters;
use msaprep::libs::pipeline::{run, ProcessOptions};
use msaprep::libs::reference::ReferenceHints;
use msaprep::libs::structure::PdbFiles;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("process")
        .about("Filters a protein alignment and maps its columns onto a reference")
        .after_help(
            r###"
This command prepares a multiple sequence alignment for coevolution analysis.

Steps:
1. Drop sequences with non-standard amino acids, and columns with >80% gaps
2. Resolve the reference sequence (first match wins):
   --refindex > --refseq > --pdb > automatic choice of a typical sequence
3. Map alignment columns onto reference positions (ATS), '-' for unmapped columns
4. Filter sequences by gap fraction and identity to the reference
5. Filter positions by weighted gap fraction
6. Optionally subsample to 1.5x the effective number of sequences

Parameters (-p), all fractions in [0, 1]:
* max gap fraction per position      [0.2]
* max gap fraction per sequence      [0.2]
* min identity to the reference      [0.2]
* max identity to the reference      [0.8]

Outputs, written to --outdir only when every step succeeds:
* <name>_processed.fasta  filtered alignment
* <name>.json             alignment, weights, ATS, distances and run settings
* <name>.phy              distance matrix in PHYLIP format (--phylip, needs --pdb)

Examples:
1. Use a structure to pick the reference and compute distances:
   msaprep process PF00071.fasta --pdb 5P21.pdb --chain A

2. Restrict the structure search to one species:
   msaprep process PF00071.fasta -s 5P21.pdb -f "Homo sapiens"

3. Use a known reference sequence and its numbering:
   msaprep process PF00071.fasta -r ref.fasta -o ref.pos

4. Use the third sequence as reference and subsample:
   msaprep process PF00071.fasta -i 2 -n

5. Custom thresholds, drop columns gapped in the reference:
   msaprep process PF00071.fasta -p 0.3 0.2 0.15 0.85 -t

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input alignment in FASTA format"),
        )
        .arg(
            Arg::new("pdb")
                .long("pdb")
                .short('s')
                .num_args(1)
                .help("PDB file of the reference structure"),
        )
        .arg(
            Arg::new("chain")
                .long("chain")
                .short('c')
                .num_args(1)
                .default_value("A")
                .value_parser(parse_chain)
                .help("Chain of the PDB structure"),
        )
        .arg(
            Arg::new("species")
                .long("species")
                .short('f')
                .num_args(1)
                .help("Species of the reference; headers are searched for it"),
        )
        .arg(
            Arg::new("refseq")
                .long("refseq")
                .short('r')
                .num_args(1)
                .help("FASTA file with the reference sequence"),
        )
        .arg(
            Arg::new("refpos")
                .long("refpos")
                .short('o')
                .num_args(1)
                .help("Position labels of the reference, one per line"),
        )
        .arg(
            Arg::new("refindex")
                .long("refindex")
                .short('i')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help("0-based index of the reference in the alignment"),
        )
        .arg(
            Arg::new("parameters")
                .long("parameters")
                .short('p')
                .num_args(4)
                .value_parser(value_parser!(f64))
                .help("Filtering thresholds, see below"),
        )
        .arg(
            Arg::new("select")
                .long("select")
                .short('n')
                .action(ArgAction::SetTrue)
                .help("Subsample to 1.5 times the effective number of sequences"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(value_parser!(u64))
                .default_value("42")
                .help("Random seed for subsampling and reference choice"),
        )
        .arg(
            Arg::new("truncate")
                .long("truncate")
                .short('t')
                .action(ArgAction::SetTrue)
                .help("Drop columns where the reference has a gap"),
        )
        .arg(
            Arg::new("phylip")
                .long("phylip")
                .short('m')
                .action(ArgAction::SetTrue)
                .help("Also write the distance matrix in PHYLIP format"),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .num_args(1)
                .help("Base name of the outputs. Default is the input name up to the first '.'"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('d')
                .num_args(1)
                .default_value("Outputs")
                .help("Output directory"),
        )
}

fn parse_chain(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Ok(c),
        _ => Err(format!("chain must be a single letter or digit, got '{}'", s)),
    }
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let is_phylip = args.get_flag("phylip");

    let params = match args.get_many::<f64>("parameters") {
        Some(values) => FilterParameters::from_slice(&values.copied().collect::<Vec<_>>())?,
        None => FilterParameters::default(),
    };

    let opts = ProcessOptions {
        hints: ReferenceHints {
            pdb: args.get_one::<String>("pdb").cloned(),
            chain: *args.get_one::<char>("chain").unwrap(),
            species: args.get_one::<String>("species").cloned(),
            refseq: args.get_one::<String>("refseq").cloned(),
            refpos: args.get_one::<String>("refpos").cloned(),
            index: args.get_one::<usize>("refindex").copied(),
        },
        params,
        select: args.get_flag("select"),
        truncate: args.get_flag("truncate"),
        seed: *args.get_one::<u64>("seed").unwrap(),
    };

    let stem = match args.get_one::<String>("output") {
        Some(name) => name.clone(),
        None => output_stem(infile),
    };

    //----------------------------
    // Ops
    //----------------------------
    let aln = msaprep::libs::alignment::read_alignment(infile)
        .with_context(|| format!("Failed to read alignment {}", infile))?;
    let res = run(&aln, &opts, &PdbFiles)?;
    let bundle = Bundle::new(&res, &opts);

    //----------------------------
    // Output
    //----------------------------
    std::fs::create_dir_all(outdir)
        .with_context(|| format!("Failed to create output directory {}", outdir))?;
    let dir = Path::new(outdir);

    let fasta_path = dir.join(format!("{}_processed.fasta", stem));
    let mut writer = msaprep::writer(&fasta_path.to_string_lossy())
        .with_context(|| format!("Failed to create {}", fasta_path.display()))?;
    write_fasta(&res.alignment, &mut writer)?;
    log::info!("Processed alignment saved to {}", fasta_path.display());

    let json_path = dir.join(format!("{}.json", stem));
    let mut writer = msaprep::writer(&json_path.to_string_lossy())
        .with_context(|| format!("Failed to create {}", json_path.display()))?;
    bundle.write_json(&mut writer)?;
    log::info!("Results saved to {}", json_path.display());

    if is_phylip {
        match &res.distances {
            Some(dist) => {
                let phy_path = dir.join(format!("{}.phy", stem));
                let mut writer = msaprep::writer(&phy_path.to_string_lossy())
                    .with_context(|| format!("Failed to create {}", phy_path.display()))?;
                write_phylip(dist, &res.ats, &mut writer)?;
                log::info!("Distance matrix saved to {}", phy_path.display());
            }
            None => log::warn!("No structure in use, skipping the PHYLIP distance matrix"),
        }
    }

    Ok(())
}

// "dir/PF00071.full.fasta" -> "PF00071"
fn output_stem(infile: &str) -> String {
    let name = Path::new(infile)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| infile.to_string());
    match name.split('.').next() {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => name,
    }
}
