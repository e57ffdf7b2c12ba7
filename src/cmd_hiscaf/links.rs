use clap::*;
use hiscaf::libs::alignment::{AlignReader, MatePairs};
use hiscaf::libs::junction::*;
use hiscaf::libs::table::*;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("links")
        .about("Scores sequence junctions from Hi-C read pairs")
        .after_help(
            r###"
This command streams an alignment file whose mates are adjacent and scores every
junction between two sequence ends:

    contigEndA  contigEndB  rawScore  rawCount

Input alignment records are `seqId start end readId[/mate] ...`. Two adjacent
records with the same read id (text after `/` ignored) on different sequences
form a chimeric pair. Each read's midpoint decides whether it sits at the begin
(B) or the end (E) of its sequence.

The raw score is the pair count divided by the restriction-site density of the
two touched halves, so long or heavily digested sequences are not favoured.

Exclusions:
* --dup is honoured on the first iteration
* --avoid is honoured on later iterations

Examples:
1. Score the first iteration:
   hiscaf links alignment.bed --counts re_counts --lengths contigs.sizes

2. A later iteration with avoided links:
   hiscaf links alignment_iteration_2.bed --counts re_counts_iteration_2 \
       --lengths scaffold_length_iteration_2 --iteration 2 --avoid avoid_links_iteration_2

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Alignment file, mates adjacent"),
        )
        .arg(
            Arg::new("counts")
                .long("counts")
                .required(true)
                .num_args(1)
                .help("Restriction-count file"),
        )
        .arg(
            Arg::new("lengths")
                .long("lengths")
                .required(true)
                .num_args(1)
                .help("Length file"),
        )
        .arg(
            Arg::new("iteration")
                .long("iteration")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Iteration number, selects --dup or --avoid"),
        )
        .arg(
            Arg::new("dup")
                .long("dup")
                .num_args(1)
                .help("Duplicate-link file"),
        )
        .arg(
            Arg::new("avoid")
                .long("avoid")
                .num_args(1)
                .help("Avoid-link file"),
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
    //----------------------------
    // Args
    //----------------------------
    let lengths = read_lengths(hiscaf::reader(args.get_one::<String>("lengths").unwrap())?)?;
    let counts = read_counts(hiscaf::reader(args.get_one::<String>("counts").unwrap())?)?;
    let iteration = *args.get_one::<usize>("iteration").unwrap();

    let exclude_file = if iteration <= 1 {
        args.get_one::<String>("dup")
    } else {
        args.get_one::<String>("avoid")
    };
    let pairs = match exclude_file {
        Some(file) => read_pairs(hiscaf::reader(file)?)?,
        None => vec![],
    };

    //----------------------------
    // Process
    //----------------------------
    let table = SeqTable::new(&lengths, &counts)?;
    let exclude = LinkSet::resolve(&pairs, &table);

    let reader = hiscaf::reader(args.get_one::<String>("infile").unwrap())?;
    let mut aggregator = JunctionAggregator::new(&table, &exclude);
    aggregator.consume(MatePairs::new(AlignReader::new(reader)))?;
    let scores = aggregator.scores();
    log::info!(
        "{} junctions, {} excluded pairs",
        scores.len(),
        aggregator.discarded()
    );

    //----------------------------
    // Output
    //----------------------------
    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;
    write_scores(&mut writer, &scores)?;

    Ok(())
}
