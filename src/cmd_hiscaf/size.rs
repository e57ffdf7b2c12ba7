use clap::*;
use hiscaf::libs::digest::fasta_lengths;
use hiscaf::libs::table::write_lengths;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("size")
        .about("Writes the length table of FASTA file(s)")
        .after_help(
            r###"
This command writes the name and length of every sequence, tab-separated.
The output is the length table consumed by `hiscaf links` and `hiscaf ng50`.

Notes:
* Supports both plain text and gzipped (.gz) files
* Reads from stdin if input file is 'stdin'

Examples:
1. Lengths of an assembly:
   hiscaf size contigs.fa

2. Save the output to a file:
   hiscaf size contigs.fa -o contigs.sizes

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Input FASTA file(s) to process"),
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
    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;

    for infile in args.get_many::<String>("infiles").unwrap() {
        let lengths = fasta_lengths(hiscaf::reader(infile)?)?;
        write_lengths(&mut writer, &lengths)?;
    }

    Ok(())
}
