extern crate clap;
use clap::*;

mod cmd_msaprep;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let app = Command::new("msaprep")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`msaprep` - Protein MSA preprocessing for coevolution analysis")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_msaprep::process::make_subcommand())
        .subcommand(cmd_msaprep::hf_mut::make_subcommand())
        .after_help(
            r###"Subcommands:

* process - Filter an alignment and map its columns onto a reference
* hf-mut  - Candidate mutations from consensus frequencies and secondary structure

Set RUST_LOG=debug for more detail, RUST_LOG=warn to silence progress.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("process", sub_matches)) => cmd_msaprep::process::execute(sub_matches),
        Some(("hf-mut", sub_matches)) => cmd_msaprep::hf_mut::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
