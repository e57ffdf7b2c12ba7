use clap::*;
use hiscaf::libs::digest::*;
use hiscaf::libs::table::{write_counts, write_sites};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("digest")
        .about("Counts restriction sites in each half of every sequence")
        .after_help(
            r###"
This command locates the cut sites of the given enzymes and writes, per sequence,
the number of sites in the left and the right half:

    seqId  leftHalfCount  rightHalfCount

A site exactly at the midpoint (length / 2) belongs to the right half.

Enzymes:
* Names are case-insensitive: MboI, DpnII, Sau3AI, HindIII, NcoI, DdeI, HinfI, MseI, Arima
* Anything else is taken as a motif; N matches any nucleotide
* Several enzymes or motifs are separated by commas

Examples:
1. Counts for an Arima library:
   hiscaf digest contigs.fa -e arima

2. Raw motifs, keeping the site positions:
   hiscaf digest contigs.fa -e GATC,GANTC --sites re_sites -o re_counts

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input FASTA file to digest"),
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
            Arg::new("sites")
                .long("sites")
                .num_args(1)
                .help("Also write the cut positions to this file"),
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
    let reader = hiscaf::reader(args.get_one::<String>("infile").unwrap())?;
    let motifs = parse_enzymes(args.get_one::<String>("enzyme").unwrap())?;
    let finder = MotifFinder::new(&motifs)?;
    log::info!("Motifs: {}", motifs.join(","));

    //----------------------------
    // Process
    //----------------------------
    let (lengths, sites) = digest_fasta(reader, &finder)?;
    let counts = count_table(&lengths, &sites);

    //----------------------------
    // Output
    //----------------------------
    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;
    write_counts(&mut writer, &counts)?;

    if let Some(file) = args.get_one::<String>("sites") {
        let mut site_writer = hiscaf::writer(file)?;
        write_sites(&mut site_writer, &sites)?;
    }

    Ok(())
}
