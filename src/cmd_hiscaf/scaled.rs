use clap::*;
use hiscaf::libs::junction::read_scores;
use hiscaf::libs::rescale::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("scaled")
        .about("Rescales junction scores against their best alternative")
        .after_help(
            r###"
This command reads a link-score file and measures each link against the strongest
competing link touching either of its two sequences:

    scaled = raw / bestAlt

A link with no competitor is divided by 1. Output rows are sorted by the scaled
score, descending:

    contigEndA  contigEndB  raw  bestAlt  scaled  support  orientation  confident

`confident` is True when the scaled score is at least 1.0. When one sequence
pair was seen in several orientations, only the strongest is kept.

Examples:
1. Rescale the links of one iteration:
   hiscaf scaled contig_links_iteration_1 -o contig_links_scaled_sorted_iteration_1

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Link-score file"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let scores = read_scores(hiscaf::reader(args.get_one::<String>("infile").unwrap())?)?;

    let graph = ContigGraph::from_scores(&scores);
    log::info!(
        "{} sequences, {} links",
        graph.node_count(),
        graph.edge_count()
    );
    let rows = graph.scaled_links();

    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;
    write_scaled(&mut writer, &rows)?;

    Ok(())
}
