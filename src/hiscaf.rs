extern crate clap;
use clap::*;

mod cmd_hiscaf;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = Command::new("hiscaf")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`hiscaf` - Hi-C Iterative SCAFfolding")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_hiscaf::size::make_subcommand())
        .subcommand(cmd_hiscaf::digest::make_subcommand())
        .subcommand(cmd_hiscaf::links::make_subcommand())
        .subcommand(cmd_hiscaf::scaled::make_subcommand())
        .subcommand(cmd_hiscaf::ng50::make_subcommand())
        .subcommand(cmd_hiscaf::correct::make_subcommand())
        .subcommand(cmd_hiscaf::emit::make_subcommand())
        .subcommand(cmd_hiscaf::run::make_subcommand())
        .after_help(
            r###"Subcommand groups:

* Single steps:
    * size    - Sequence lengths of a FASTA file
    * digest  - Restriction sites per sequence half
    * links   - Junction scores from Hi-C read pairs
    * scaled  - Best-alternative rescaling of junction scores
    * ng50    - NG50 of a length table

* Assemblies:
    * correct - Split contigs at given breakpoints
    * emit    - Scaffold FASTA and AGP from a path file

* Pipeline:
    * run     - Iterate scoring, layout and breaking until convergence

Set RUST_LOG=debug for more detailed progress messages.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("size", sub_matches)) => cmd_hiscaf::size::execute(sub_matches),
        Some(("digest", sub_matches)) => cmd_hiscaf::digest::execute(sub_matches),
        Some(("links", sub_matches)) => cmd_hiscaf::links::execute(sub_matches),
        Some(("scaled", sub_matches)) => cmd_hiscaf::scaled::execute(sub_matches),
        Some(("ng50", sub_matches)) => cmd_hiscaf::ng50::execute(sub_matches),
        Some(("correct", sub_matches)) => cmd_hiscaf::correct::execute(sub_matches),
        Some(("emit", sub_matches)) => cmd_hiscaf::emit::execute(sub_matches),
        Some(("run", sub_matches)) => cmd_hiscaf::run::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
