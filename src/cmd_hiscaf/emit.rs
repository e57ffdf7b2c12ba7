use clap::*;
use hiscaf::libs::emit::*;
use hiscaf::libs::scaffold::ScaffoldSet;
use hiscaf::libs::table::LengthTable;
use std::path::Path;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("emit")
        .about("Builds scaffold sequences and AGP from a path file")
        .after_help(
            r###"
This command turns a path file into scaffold sequences. Path lines list the
component ends in traversal order:

    name  c1:B c1:E c2:E c2:B  c1+ c2-

Outputs, for a prefix `out`:
* out.fa    - scaffolds renamed scaffold_1..n by decreasing length, 80 columns
* out.agp   - component and gap rows
* out.paths - the path file under the new names

Components are separated by 500 Ns; `-` components are reverse-complemented.

Examples:
1. Final scaffolds:
   hiscaf emit contigs.fa units_iteration_3.paths -o scaffolds_FINAL

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("FASTA file of the contigs"),
        )
        .arg(
            Arg::new("paths")
                .required(true)
                .index(2)
                .help("Path file"),
        )
        .arg(
            Arg::new("outprefix")
                .long("outprefix")
                .short('o')
                .num_args(1)
                .default_value("scaffolds")
                .help("Prefix of the output files"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let seqs = load_fasta(hiscaf::reader(args.get_one::<String>("infile").unwrap())?)?;
    let scaffolds = ScaffoldSet::read_from(hiscaf::reader(args.get_one::<String>("paths").unwrap())?)?;
    let lengths: LengthTable = seqs
        .iter()
        .map(|(k, v)| (k.clone(), v.len() as u64))
        .collect();

    let prefix = Path::new(args.get_one::<String>("outprefix").unwrap());
    emit_files(prefix, &scaffolds, &lengths, &seqs, true)?;

    Ok(())
}
