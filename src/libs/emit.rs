//! Writing scaffold sequences and their AGP description.

use crate::libs::error::InputError;
use crate::libs::scaffold::{Component, ScaffoldSet, Strand};
use crate::libs::table::LengthTable;
use bio::alphabets::dna::revcomp;
use indexmap::IndexMap;
use itertools::Itertools;
use std::io::{BufRead, Write};
use std::path::Path;

/// Ns between two components of a scaffold.
pub const GAP_LENGTH: usize = 500;
pub const LINE_WIDTH: usize = 80;

pub fn load_fasta<R: BufRead>(reader: R) -> anyhow::Result<IndexMap<String, Vec<u8>>> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut seqs = IndexMap::new();
    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let seq: &[u8] = record.sequence().as_ref();
        seqs.insert(name, seq.to_vec());
    }
    Ok(seqs)
}

/// A scaffold under its published name.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<'a> {
    pub name: String,
    pub path: &'a [Component],
    /// Sum of component lengths, gaps excluded
    pub length: u64,
}

/// Renames scaffolds `scaffold_1..n` by decreasing length. Equal lengths keep
/// their path order.
pub fn rank<'a>(scaffolds: &'a ScaffoldSet, contig_lengths: &LengthTable) -> anyhow::Result<Vec<Ranked<'a>>> {
    let mut sized = Vec::with_capacity(scaffolds.len());
    for path in scaffolds.paths.values() {
        let mut length = 0;
        for c in path {
            length += contig_lengths
                .get(&c.name)
                .ok_or_else(|| InputError::missing("length", &c.name))?;
        }
        sized.push((path.as_slice(), length));
    }

    Ok(sized
        .into_iter()
        .sorted_by(|a, b| b.1.cmp(&a.1))
        .enumerate()
        .map(|(i, (path, length))| Ranked {
            name: format!("scaffold_{}", i + 1),
            path,
            length,
        })
        .collect())
}

/// Concatenates the oriented components with [`GAP_LENGTH`] Ns in between.
pub fn assemble(path: &[Component], seqs: &IndexMap<String, Vec<u8>>) -> anyhow::Result<Vec<u8>> {
    let mut out = vec![];
    for (i, c) in path.iter().enumerate() {
        let seq = seqs
            .get(&c.name)
            .ok_or_else(|| InputError::missing("FASTA", &c.name))?;
        if i > 0 {
            out.extend(std::iter::repeat(b'N').take(GAP_LENGTH));
        }
        match c.strand {
            Strand::Forward => out.extend_from_slice(seq),
            Strand::Reverse => out.extend(revcomp(seq)),
        }
    }
    Ok(out)
}

pub fn write_fasta<W: Write + ?Sized>(
    writer: &mut W,
    ranked: &[Ranked],
    seqs: &IndexMap<String, Vec<u8>>,
) -> anyhow::Result<()> {
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(LINE_WIDTH)
        .build_from_writer(writer);

    for scaffold in ranked {
        let seq = assemble(scaffold.path, seqs)?;
        let definition = noodles_fasta::record::Definition::new(scaffold.name.as_str(), None);
        let record = noodles_fasta::Record::new(definition, noodles_fasta::record::Sequence::from(seq));
        fa_out.write_record(&record)?;
    }
    Ok(())
}

/// AGP 2.0 rows: one `W` line per component and one `N` line per gap.
pub fn write_agp<W: Write + ?Sized>(
    writer: &mut W,
    ranked: &[Ranked],
    contig_lengths: &LengthTable,
) -> anyhow::Result<()> {
    for scaffold in ranked {
        let mut pos = 0u64;
        let mut part = 0;
        for (i, c) in scaffold.path.iter().enumerate() {
            if i > 0 {
                part += 1;
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\tN\t{}\tscaffold\tyes\tna",
                    scaffold.name,
                    pos + 1,
                    pos + GAP_LENGTH as u64,
                    part,
                    GAP_LENGTH
                )?;
                pos += GAP_LENGTH as u64;
            }
            let len = *contig_lengths
                .get(&c.name)
                .ok_or_else(|| InputError::missing("length", &c.name))?;
            part += 1;
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\tW\t{}\t1\t{}\t{}",
                scaffold.name,
                pos + 1,
                pos + len,
                part,
                c.name,
                len,
                c.strand.symbol()
            )?;
            pos += len;
        }
    }
    Ok(())
}

/// The paths of the published scaffolds, under their new names.
pub fn renamed(ranked: &[Ranked]) -> ScaffoldSet {
    ScaffoldSet {
        paths: ranked
            .iter()
            .map(|r| (r.name.clone(), r.path.to_vec()))
            .collect(),
    }
}

/// Writes `<prefix>.fa` and `<prefix>.agp`, plus `<prefix>.paths` when asked.
pub fn emit_files(
    prefix: &Path,
    scaffolds: &ScaffoldSet,
    contig_lengths: &LengthTable,
    seqs: &IndexMap<String, Vec<u8>>,
    with_paths: bool,
) -> anyhow::Result<()> {
    let ranked = rank(scaffolds, contig_lengths)?;
    let path_of = |ext: &str| prefix.with_extension(ext);

    crate::persist(path_of("fa"), |w| write_fasta(w, &ranked, seqs))?;
    crate::persist(path_of("agp"), |w| write_agp(w, &ranked, contig_lengths))?;
    if with_paths {
        crate::persist(path_of("paths"), |w| Ok(renamed(&ranked).write_to(w)?))?;
    }
    log::info!(
        "Write {} scaffolds to {}.fa",
        ranked.len(),
        prefix.display()
    );
    Ok(())
}
