use anyhow::Context;
use clap::*;
use msaprep::libs::hfmut::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("hf-mut")
        .about("Predicts single high-frequency mutations")
        .after_help(
            r###"
This command merges a per-position consensus table with secondary structure
assignments and lists the positions where another residue dominates the reference.

Input formats:
* --freq: `ref_aa highest_freq_aa freq%` per position; an optional first line
  containing `Position:` is a header. Reference `X` marks unresolved positions.
* --dssp: `pos ref_aa ss` per resolved position, in order.

A position is reported when its most frequent residue differs from the reference
and the frequency reaches --gamma in coils (ss `C`) or --beta elsewhere.

Both outputs are TSV with the header:
    pos  ref_aa  highest_freq_aa  frequency  SS

Examples:
1. Report mutations above 50% (40% in coils):
   msaprep hf-mut --freq out.freq --dssp out.txt --beta 0.5 --gamma 0.4 \
       --comb combined.tsv --mut mutations.tsv

"###,
        )
        .arg(
            Arg::new("freq")
                .long("freq")
                .required(true)
                .num_args(1)
                .help("Consensus frequency table"),
        )
        .arg(
            Arg::new("dssp")
                .long("dssp")
                .required(true)
                .num_args(1)
                .help("Secondary structure table"),
        )
        .arg(
            Arg::new("beta")
                .long("beta")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Frequency threshold outside coils"),
        )
        .arg(
            Arg::new("gamma")
                .long("gamma")
                .required(true)
                .value_parser(value_parser!(f64))
                .help("Frequency threshold in coils"),
        )
        .arg(
            Arg::new("comb")
                .long("comb")
                .required(true)
                .num_args(1)
                .help("Output of all merged positions. [stdout] for screen"),
        )
        .arg(
            Arg::new("mut")
                .long("mut")
                .required(true)
                .num_args(1)
                .help("Output of the reported mutations. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let freq_file = args.get_one::<String>("freq").unwrap();
    let ss_file = args.get_one::<String>("dssp").unwrap();
    let beta = *args.get_one::<f64>("beta").unwrap();
    let gamma = *args.get_one::<f64>("gamma").unwrap();
    let comb_file = args.get_one::<String>("comb").unwrap();
    let mut_file = args.get_one::<String>("mut").unwrap();

    //----------------------------
    // Ops
    //----------------------------
    let reader =
        msaprep::reader(freq_file).with_context(|| format!("Failed to open {}", freq_file))?;
    let freqs = parse_freq(reader)?;
    let reader = msaprep::reader(ss_file).with_context(|| format!("Failed to open {}", ss_file))?;
    let ss_rows = parse_ss(reader)?;

    let sites = merge(&freqs, &ss_rows);
    let kept = filter_sites(&sites, beta, gamma);

    //----------------------------
    // Output
    //----------------------------
    let mut writer =
        msaprep::writer(comb_file).with_context(|| format!("Failed to create {}", comb_file))?;
    write_table(&sites, &mut writer)?;
    log::info!("Combined file saved to {}", comb_file);

    let mut writer =
        msaprep::writer(mut_file).with_context(|| format!("Failed to create {}", mut_file))?;
    write_table(&kept, &mut writer)?;
    log::info!("Filtered mutations saved to {}", mut_file);

    Ok(())
}
