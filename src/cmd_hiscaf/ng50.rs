use clap::*;
use hiscaf::libs::stat::ng50;
use hiscaf::libs::table::read_lengths;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("ng50")
        .about("Reports the NG50 of a length table")
        .after_help(
            r###"
Lengths are sorted descending and summed until the sum reaches half of the genome
size. The length that crosses the threshold is printed; 0 if it is never reached.

Without --genome-size the sum of all lengths is used, which gives the N50.

Examples:
1. N50:
   hiscaf ng50 scaffold_length_iteration_2

2. NG50 for a 2.3 Gbp genome:
   hiscaf ng50 scaffold_length_iteration_2 -s 2300000000

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Length file"),
        )
        .arg(
            Arg::new("genome_size")
                .long("genome-size")
                .short('s')
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(u64))
                .help("Expected genome size, 0 for the sum of lengths"),
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
    let lengths = read_lengths(hiscaf::reader(args.get_one::<String>("infile").unwrap())?)?;
    let genome_size = *args.get_one::<u64>("genome_size").unwrap();

    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;
    writer.write_fmt(format_args!("{}\n", ng50(&lengths, genome_size)))?;

    Ok(())
}
