use clap::*;
use hiscaf::libs::breaks::*;
use hiscaf::libs::emit::load_fasta;
use hiscaf::libs::table::{write_lengths, LengthTable};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("correct")
        .about("Splits contigs at known misassembly breakpoints")
        .after_help(
            r###"
This command cuts contigs at the offsets of a breakpoint file:

    contigId  offset

A contig with k breakpoints becomes `id_1` .. `id_{k+1}`. Offsets at 0 or at
the contig end are ignored.

With --bed, the alignment file is rewritten onto the pieces: records are renamed
and shifted, records crossing a breakpoint are dropped.

Examples:
1. Split an assembly:
   hiscaf correct contigs.fa breaks.tsv -o cleaned.fa

2. Also rewrite the alignments and write the new lengths:
   hiscaf correct contigs.fa breaks.tsv -o cleaned.fa --bed hic.bed --bed-out cleaned.bed --lengths cleaned.sizes

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input FASTA file"),
        )
        .arg(
            Arg::new("breaks")
                .required(true)
                .index(2)
                .help("Breakpoint file"),
        )
        .arg(
            Arg::new("bed")
                .long("bed")
                .num_args(1)
                .requires("bed_out")
                .help("Alignment file to rewrite"),
        )
        .arg(
            Arg::new("bed_out")
                .long("bed-out")
                .num_args(1)
                .help("Where the rewritten alignments go"),
        )
        .arg(
            Arg::new("lengths")
                .long("lengths")
                .num_args(1)
                .help("Write the new length table to this file"),
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
    let seqs = load_fasta(hiscaf::reader(args.get_one::<String>("infile").unwrap())?)?;
    let points = read_breakpoints(hiscaf::reader(args.get_one::<String>("breaks").unwrap())?)?;

    let lengths: LengthTable = seqs
        .iter()
        .map(|(k, v)| (k.clone(), v.len() as u64))
        .collect();
    let splitter = Splitter::new(&points, &lengths);
    log::info!("{} cuts on {} sequences", splitter.cut_count(), lengths.len());

    //----------------------------
    // Output
    //----------------------------
    let mut writer = hiscaf::writer(args.get_one::<String>("outfile").unwrap())?;
    let split = split_fasta(&seqs, &splitter, &mut writer)?;

    if let Some(file) = args.get_one::<String>("lengths") {
        let mut len_writer = hiscaf::writer(file)?;
        write_lengths(&mut len_writer, &split)?;
    }

    if let (Some(bed), Some(bed_out)) = (
        args.get_one::<String>("bed"),
        args.get_one::<String>("bed_out"),
    ) {
        let mut bed_writer = hiscaf::writer(bed_out)?;
        let (kept, dropped) = splitter.rewrite_alignments(hiscaf::reader(bed)?, &mut bed_writer)?;
        log::info!("{} alignments kept, {} dropped", kept, dropped);
    }

    Ok(())
}
