//! Misassembly breakpoints: detection and splitting.
//!
//! The same [`Splitter`] serves two places. Before the first iteration it cuts
//! input contigs at arbitrary offsets. After each layout it cuts scaffolds at
//! internal junctions that detectors flagged, which also produces the avoid
//! links of the next iteration.

use crate::libs::alignment::{AlignReader, MatePairs};
use crate::libs::error::InputError;
use crate::libs::scaffold::ScaffoldSet;
use crate::libs::table::{LengthTable, SiteTable};
use cmd_lib::run_fun;
use indexmap::IndexMap;
use std::io::{BufRead, Write};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    pub seq: String,
    pub offset: u64,
}

pub fn read_breakpoints<R: BufRead>(reader: R) -> anyhow::Result<Vec<Breakpoint>> {
    let mut points = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            return Err(InputError::malformed("breakpoint", i + 1, "expected 2 columns").into());
        }
        let offset = fields[1].parse::<u64>().map_err(|_| {
            InputError::malformed("breakpoint", i + 1, format!("invalid offset {}", fields[1]))
        })?;
        points.push(Breakpoint {
            seq: fields[0].to_string(),
            offset,
        });
    }
    Ok(points)
}

pub fn write_breakpoints<W: Write + ?Sized>(writer: &mut W, points: &[Breakpoint]) -> std::io::Result<()> {
    for p in points {
        writeln!(writer, "{}\t{}", p.seq, p.offset)?;
    }
    Ok(())
}

/// Where a half-open interval lands after splitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Located {
    /// The sequence is not cut
    Untouched,
    /// The interval crosses a cut
    Straddles,
    Piece { name: String, start: u64, end: u64 },
}

/// Cut offsets per sequence, sorted and strictly inside the sequence.
#[derive(Debug, Clone, Default)]
pub struct Splitter {
    cuts: IndexMap<String, Vec<u64>>,
}

impl Splitter {
    /// Offsets at 0, at or beyond the sequence end, or on unknown sequences
    /// are ignored.
    pub fn new(points: &[Breakpoint], lengths: &LengthTable) -> Self {
        let mut cuts: IndexMap<String, Vec<u64>> = IndexMap::new();
        for p in points {
            match lengths.get(&p.seq) {
                Some(&len) if p.offset > 0 && p.offset < len => {
                    cuts.entry(p.seq.clone()).or_default().push(p.offset);
                }
                _ => log::warn!("Ignore breakpoint {} at {}", p.seq, p.offset),
            }
        }
        for list in cuts.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        Self { cuts }
    }

    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    pub fn cut_count(&self) -> usize {
        self.cuts.values().map(|v| v.len()).sum()
    }

    pub fn piece_name(seq: &str, idx: usize) -> String {
        format!("{}_{}", seq, idx + 1)
    }

    /// Piece boundaries `[start, end)` of a sequence, or `None` if it is not cut.
    fn pieces(&self, seq: &str, len: u64) -> Option<Vec<(u64, u64)>> {
        let cuts = self.cuts.get(seq)?;
        let mut bounds = Vec::with_capacity(cuts.len() + 1);
        let mut prev = 0;
        for &c in cuts {
            bounds.push((prev, c));
            prev = c;
        }
        bounds.push((prev, len));
        Some(bounds)
    }

    pub fn locate(&self, seq: &str, start: u64, end: u64) -> Located {
        let cuts = match self.cuts.get(seq) {
            Some(cuts) => cuts,
            None => return Located::Untouched,
        };
        // index of the piece containing `start`
        let idx = cuts.partition_point(|&c| c <= start);
        let piece_start = if idx == 0 { 0 } else { cuts[idx - 1] };
        if let Some(&next_cut) = cuts.get(idx) {
            if end > next_cut {
                return Located::Straddles;
            }
        }
        Located::Piece {
            name: Self::piece_name(seq, idx),
            start: start - piece_start,
            end: end - piece_start,
        }
    }

    /// The cut pieces replace their parent, in place.
    pub fn split_lengths(&self, lengths: &LengthTable) -> LengthTable {
        let mut out = LengthTable::with_capacity(lengths.len() + self.cut_count());
        for (name, &len) in lengths {
            match self.pieces(name, len) {
                None => {
                    out.insert(name.clone(), len);
                }
                Some(bounds) => {
                    for (i, (s, e)) in bounds.into_iter().enumerate() {
                        out.insert(Self::piece_name(name, i), e - s);
                    }
                }
            }
        }
        out
    }

    pub fn split_sites(&self, sites: &SiteTable, lengths: &LengthTable) -> SiteTable {
        let mut out = SiteTable::with_capacity(sites.len() + self.cut_count());
        for (name, positions) in sites {
            let len = lengths.get(name).copied().unwrap_or(u64::MAX);
            match self.pieces(name, len) {
                None => {
                    out.insert(name.clone(), positions.clone());
                }
                Some(bounds) => {
                    for (i, (s, e)) in bounds.into_iter().enumerate() {
                        let inside = positions
                            .iter()
                            .filter(|&&p| p >= s && p < e)
                            .map(|&p| p - s)
                            .collect();
                        out.insert(Self::piece_name(name, i), inside);
                    }
                }
            }
        }
        out
    }

    /// Returns the named pieces of one sequence.
    pub fn split_sequence<'a>(&self, name: &str, seq: &'a [u8]) -> Vec<(String, &'a [u8])> {
        match self.pieces(name, seq.len() as u64) {
            None => vec![(name.to_string(), seq)],
            Some(bounds) => bounds
                .into_iter()
                .enumerate()
                .map(|(i, (s, e))| (Self::piece_name(name, i), &seq[s as usize..e as usize]))
                .collect(),
        }
    }

    /// Streams alignments onto the pieces. Records crossing a cut are
    /// dropped. Returns (kept, dropped).
    pub fn rewrite_alignments<R: BufRead, W: Write + ?Sized>(
        &self,
        reader: R,
        writer: &mut W,
    ) -> anyhow::Result<(u64, u64)> {
        let (mut kept, mut dropped) = (0, 0);
        for rec in AlignReader::new(reader) {
            let mut rec = rec?;
            match self.locate(&rec.contig, rec.start, rec.end) {
                Located::Untouched => {}
                Located::Straddles => {
                    dropped += 1;
                    continue;
                }
                Located::Piece { name, start, end } => {
                    rec.contig = name;
                    rec.start = start;
                    rec.end = end;
                }
            }
            rec.write_to(writer)?;
            kept += 1;
        }
        Ok((kept, dropped))
    }
}

/// Writes every sequence, cut into its pieces, and returns the new lengths.
pub fn split_fasta<W: Write + ?Sized>(
    seqs: &IndexMap<String, Vec<u8>>,
    splitter: &Splitter,
    writer: &mut W,
) -> anyhow::Result<LengthTable> {
    let mut fa_out = noodles_fasta::io::writer::Builder::default()
        .set_line_base_count(crate::libs::emit::LINE_WIDTH)
        .build_from_writer(writer);
    let mut lengths = LengthTable::new();
    for (name, seq) in seqs {
        for (piece, slice) in splitter.split_sequence(name, seq) {
            lengths.insert(piece.clone(), slice.len() as u64);
            let definition = noodles_fasta::record::Definition::new(piece, None);
            let record = noodles_fasta::Record::new(definition, noodles_fasta::record::Sequence::from(slice.to_vec()));
            fa_out.write_record(&record)?;
        }
    }
    Ok(lengths)
}

/// Internal junction offsets of every multi-component scaffold, in scaffold
/// coordinates without gaps.
pub fn junctions(scaffolds: &ScaffoldSet, contig_lengths: &LengthTable) -> anyhow::Result<IndexMap<String, Vec<u64>>> {
    let mut out = IndexMap::new();
    for (name, path) in &scaffolds.paths {
        if path.len() < 2 {
            continue;
        }
        let mut offset = 0;
        let mut bounds = vec![];
        for c in &path[..path.len() - 1] {
            offset += contig_lengths
                .get(&c.name)
                .ok_or_else(|| InputError::missing("length", &c.name))?;
            bounds.push(offset);
        }
        out.insert(name.clone(), bounds);
    }
    Ok(out)
}

/// Scaffolds after breaking, with the file rewrites and avoid links it implies.
pub struct BrokenScaffolds {
    pub scaffolds: ScaffoldSet,
    pub splitter: Splitter,
    pub avoid: Vec<(String, String)>,
}

/// Snaps each breakpoint to the nearest internal junction of its scaffold and
/// splits there. Breakpoints on single-component scaffolds are ignored.
pub fn apply_breaks(
    points: &[Breakpoint],
    scaffolds: &ScaffoldSet,
    contig_lengths: &LengthTable,
    lengths: &LengthTable,
) -> anyhow::Result<BrokenScaffolds> {
    let bounds = junctions(scaffolds, contig_lengths)?;

    let mut snapped = vec![];
    for p in points {
        let candidates = match bounds.get(&p.seq) {
            Some(b) => b,
            None => {
                log::warn!("No junction to break on {} at {}", p.seq, p.offset);
                continue;
            }
        };
        if let Some(&j) = candidates.iter().min_by_key(|&&j| j.abs_diff(p.offset)) {
            snapped.push(Breakpoint {
                seq: p.seq.clone(),
                offset: j,
            });
        }
    }

    let splitter = Splitter::new(&snapped, lengths);
    let mut paths = IndexMap::new();
    let mut avoid = vec![];
    for (name, path) in &scaffolds.paths {
        let cuts = match (splitter.cuts.get(name), bounds.get(name)) {
            (Some(c), Some(b)) => c
                .iter()
                .filter_map(|cut| b.iter().position(|j| j == cut))
                .collect::<Vec<_>>(),
            _ => {
                paths.insert(name.clone(), path.clone());
                continue;
            }
        };

        // junction k sits between component k and k + 1
        let mut first = 0;
        for (i, &k) in cuts.iter().enumerate() {
            paths.insert(Splitter::piece_name(name, i), path[first..=k].to_vec());
            avoid.push((Splitter::piece_name(name, i), Splitter::piece_name(name, i + 1)));
            first = k + 1;
        }
        paths.insert(Splitter::piece_name(name, cuts.len()), path[first..].to_vec());
    }

    Ok(BrokenScaffolds {
        scaffolds: ScaffoldSet { paths },
        splitter,
        avoid,
    })
}

/// What a detector gets to look at after a layout round.
pub struct BreakContext<'a> {
    pub iteration: usize,
    /// Alignments in scaffold coordinates
    pub alignment: &'a Path,
    /// Scaffold lengths
    pub lengths: &'a LengthTable,
    pub lengths_file: &'a Path,
    pub scaffolds: &'a ScaffoldSet,
    pub contig_lengths: &'a LengthTable,
}

/// Misassembly detection step.
pub trait BreakDetector {
    fn detect(&self, ctx: &BreakContext) -> anyhow::Result<Vec<Breakpoint>>;
}

/// Never reports anything.
pub struct NoBreaks;

impl BreakDetector for NoBreaks {
    fn detect(&self, _ctx: &BreakContext) -> anyhow::Result<Vec<Breakpoint>> {
        Ok(vec![])
    }
}

/// Flags junctions that too few read pairs span. A pair spans a junction
/// when its mates lie on opposite sides, each within `window` bases.
pub struct SpanningPairDetector {
    pub window: u64,
    pub min_span: u64,
}

impl BreakDetector for SpanningPairDetector {
    fn detect(&self, ctx: &BreakContext) -> anyhow::Result<Vec<Breakpoint>> {
        let bounds = junctions(ctx.scaffolds, ctx.contig_lengths)?;
        if bounds.is_empty() || self.min_span == 0 {
            return Ok(vec![]);
        }
        let mut support: IndexMap<&str, Vec<u64>> = bounds
            .iter()
            .map(|(k, v)| (k.as_str(), vec![0; v.len()]))
            .collect();

        let reader = crate::reader(&ctx.alignment.to_string_lossy())?;
        for pair in MatePairs::new(AlignReader::new(reader)) {
            let pair = pair?;
            if pair.is_chimeric() {
                continue;
            }
            let js = match bounds.get(&pair.first.contig) {
                Some(js) => js,
                None => continue,
            };
            let (p, q) = {
                let (x, y) = (pair.first.midpoint(), pair.second.midpoint());
                if x <= y {
                    (x, y)
                } else {
                    (y, x)
                }
            };
            // junctions j with p < j <= q
            let lo = js.partition_point(|&j| j <= p);
            let hi = js.partition_point(|&j| j <= q);
            for k in lo..hi {
                let j = js[k];
                if j - p <= self.window && q - j < self.window {
                    if let Some(counts) = support.get_mut(pair.first.contig.as_str()) {
                        counts[k] += 1;
                    }
                }
            }
        }

        let mut points = vec![];
        for (name, counts) in &support {
            for (k, &n) in counts.iter().enumerate() {
                if n < self.min_span {
                    log::info!("Junction {} of {} spanned by {} pairs", k + 1, name, n);
                    points.push(Breakpoint {
                        seq: name.to_string(),
                        offset: bounds[*name][k],
                    });
                }
            }
        }
        Ok(points)
    }
}

/// Runs an external detector through `sh -c`. `{alignment}`, `{lengths}` and
/// `{iteration}` in the template are substituted; stdout must be a
/// breakpoint file.
pub struct CommandDetector {
    pub template: String,
}

impl BreakDetector for CommandDetector {
    fn detect(&self, ctx: &BreakContext) -> anyhow::Result<Vec<Breakpoint>> {
        let cmd = self
            .template
            .replace("{alignment}", &ctx.alignment.to_string_lossy())
            .replace("{lengths}", &ctx.lengths_file.to_string_lossy())
            .replace("{iteration}", &ctx.iteration.to_string());
        log::info!("Run {}", cmd);
        let stdout = run_fun!(sh -c $cmd)
            .map_err(|e| anyhow::anyhow!("Misassembly detector failed: {}", e))?;
        read_breakpoints(stdout.as_bytes())
    }
}
