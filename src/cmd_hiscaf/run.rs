use clap::*;
use hiscaf::libs::digest::parse_enzymes;
use hiscaf::libs::pipeline::*;
use std::path::PathBuf;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("run")
        .about("Iterative Hi-C scaffolding")
        .after_help(
            r###"
This command runs the whole pipeline:

    digest -> { count -> links -> scale -> layout -> break -> check }* -> final

Each iteration scores sequence junctions from Hi-C pairs, joins the confident
ones into scaffolds, splits junctions that too few pairs span, and compares the
NG50 with the previous iteration.

The loop stops when:
* no scaled score reaches 1.0; the previous iteration's scaffolds are kept
* the NG50 did not change; the previous iteration's scaffolds are kept
* --iter iterations are done

Every step writes its own file into --outdir. A step whose output already exists
is skipped, so rerunning the same command resumes an interrupted run.
`steps.log` records what was done and what was skipped.

Misassembly detection:
* --break-cmd runs an external command; {alignment}, {lengths} and {iteration}
  are substituted, stdout must list `seqId offset` breakpoints
* otherwise junctions spanned by fewer than --min-span pairs within
  --break-window bases are split; --min-span 0 disables this

Examples:
1. Three iterations on an Arima library:
   hiscaf run -a contigs.fa -b alignment.bed -e arima

2. More iterations, a known genome size, drop alignments on unknown sequences:
   hiscaf run -a contigs.fa -b alignment.bed -e GATC -i 10 -s 1200000000 --filter

3. Clean the input first and write FASTA for every iteration:
   hiscaf run -a contigs.fa -b alignment.bed -e MboI --breaks misasm.tsv --each -o out

"###,
        )
        .arg(
            Arg::new("assembly")
                .long("assembly")
                .short('a')
                .required(true)
                .num_args(1)
                .help("Contig FASTA file"),
        )
        .arg(
            Arg::new("bed")
                .long("bed")
                .short('b')
                .required(true)
                .num_args(1)
                .help("Hi-C alignments, mates adjacent"),
        )
        .arg(
            Arg::new("enzyme")
                .long("enzyme")
                .short('e')
                .required(true)
                .num_args(1)
                .help("Enzyme names or motifs, comma-separated"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value("hiscaf_output")
                .help("Output directory"),
        )
        .arg(
            Arg::new("iter")
                .long("iter")
                .short('i')
                .num_args(1)
                .default_value("3")
                .value_parser(value_parser!(u64).range(1..))
                .help("Maximum number of iterations"),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .short('c')
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(u64))
                .help("Sequences shorter than this are never joined"),
        )
        .arg(
            Arg::new("genome_size")
                .long("genome-size")
                .short('s')
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(u64))
                .help("Expected genome size for NG50, 0 for the sum of lengths"),
        )
        .arg(
            Arg::new("dup")
                .long("dup")
                .short('x')
                .num_args(1)
                .help("Duplicate-link file, ignored links on the first iteration"),
        )
        .arg(
            Arg::new("breaks")
                .long("breaks")
                .num_args(1)
                .help("Breakpoints applied to the contigs before anything else"),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .action(ArgAction::SetTrue)
                .help("Drop alignments on sequences absent from the assembly"),
        )
        .arg(
            Arg::new("each")
                .long("each")
                .action(ArgAction::SetTrue)
                .help("Write FASTA and AGP for every iteration"),
        )
        .arg(
            Arg::new("break_cmd")
                .long("break-cmd")
                .num_args(1)
                .help("External misassembly detector"),
        )
        .arg(
            Arg::new("break_window")
                .long("break-window")
                .num_args(1)
                .default_value("50000")
                .value_parser(value_parser!(u64))
                .help("Distance from a junction that spanning mates may lie"),
        )
        .arg(
            Arg::new("min_span")
                .long("min-span")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(u64))
                .help("Junctions spanned by fewer pairs are split"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let motifs = parse_enzymes(args.get_one::<String>("enzyme").unwrap())?;
    let mut opt = RunOptions::new(
        &PathBuf::from(args.get_one::<String>("assembly").unwrap()),
        &PathBuf::from(args.get_one::<String>("bed").unwrap()),
        motifs,
        &PathBuf::from(args.get_one::<String>("outdir").unwrap()),
    );
    opt.max_iterations = *args.get_one::<u64>("iter").unwrap() as usize;
    opt.cutoff = *args.get_one::<u64>("cutoff").unwrap();
    opt.genome_size = *args.get_one::<u64>("genome_size").unwrap();
    opt.dup = args.get_one::<String>("dup").map(PathBuf::from);
    opt.breaks = args.get_one::<String>("breaks").map(PathBuf::from);
    opt.filter = args.get_flag("filter");
    opt.each = args.get_flag("each");
    opt.break_cmd = args.get_one::<String>("break_cmd").cloned();
    opt.break_window = *args.get_one::<u64>("break_window").unwrap();
    opt.min_span = *args.get_one::<u64>("min_span").unwrap();

    //----------------------------
    // Process
    //----------------------------
    let summary = Controller::new(opt).run()?;
    for snap in &summary.snapshots {
        log::info!("Iteration {}: NG50 {}", snap.iteration, snap.ng50);
    }
    log::info!(
        "Done after {} iterations ({}), final scaffolds in {}.fa",
        summary.iterations,
        summary.stop.reason,
        summary.final_prefix.display()
    );

    Ok(())
}
