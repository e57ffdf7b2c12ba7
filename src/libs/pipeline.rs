//! The iterative scaffolding loop.
//!
//! ```text
//! DIGEST_ONCE -> { SCORE -> LAYOUT -> BREAK -> CHECK }* -> DONE
//! ```
//!
//! Every step talks to the next through files in the output directory. A
//! step whose output already exists is skipped, so an interrupted run picks up
//! where it stopped. Files are persisted atomically, so an existing file is a
//! complete one.

use crate::libs::alignment::{retain_known, AlignReader, MatePairs};
use crate::libs::breaks::{
    apply_breaks, read_breakpoints, split_fasta, write_breakpoints, BreakContext, BreakDetector, CommandDetector,
    NoBreaks, SpanningPairDetector, Splitter,
};
use crate::libs::digest::{count_table, digest_fasta, MotifFinder};
use crate::libs::emit::{emit_files, load_fasta};
use crate::libs::junction::{read_scores, write_scores, JunctionAggregator, LinkSet, SeqTable};
use crate::libs::layout::{GreedyLayout, Layout, LayoutInput};
use crate::libs::rescale::{has_confident, read_scaled, write_scaled, ContigGraph};
use crate::libs::scaffold::{Placement, ScaffoldSet};
use crate::libs::stat::IterationSnapshot;
use crate::libs::table::*;
use crate::persist;
use std::fmt;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Everything `hiscaf run` is told on the command line.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub assembly: PathBuf,
    pub alignment: PathBuf,
    /// Concrete motifs, wildcards already expanded
    pub motifs: Vec<String>,
    pub outdir: PathBuf,
    pub max_iterations: usize,
    /// Units shorter than this are never joined
    pub cutoff: u64,
    /// 0 means the sum of all lengths
    pub genome_size: u64,
    pub dup: Option<PathBuf>,
    /// Breakpoints applied to the input contigs before digestion
    pub breaks: Option<PathBuf>,
    pub filter: bool,
    pub each: bool,
    pub break_cmd: Option<String>,
    pub break_window: u64,
    pub min_span: u64,
}

impl RunOptions {
    pub fn new(assembly: &Path, alignment: &Path, motifs: Vec<String>, outdir: &Path) -> Self {
        Self {
            assembly: assembly.to_path_buf(),
            alignment: alignment.to_path_buf(),
            motifs,
            outdir: outdir.to_path_buf(),
            max_iterations: 3,
            cutoff: 1000,
            genome_size: 0,
            dup: None,
            breaks: None,
            filter: false,
            each: false,
            break_cmd: None,
            break_window: 50_000,
            min_span: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No scaled score reached 1.0
    NoConfidentLinks,
    /// NG50 did not change between two iterations
    Converged,
    MaxIterations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::NoConfidentLinks => "no confident links left",
            StopReason::Converged => "NG50 unchanged",
            StopReason::MaxIterations => "maximum number of iterations reached",
        };
        write!(f, "{}", text)
    }
}

/// Why the loop ended and whose scaffolds are published. `result_of` is the
/// iteration that produced them, 0 for the input assembly itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub reason: StopReason,
    pub result_of: usize,
}

/// The CHECK state. `history` ends with the iteration just finished.
pub fn convergence(history: &[IterationSnapshot], max_iterations: usize) -> Option<Stop> {
    let last = history.last()?;
    if history.len() >= 2 && history[history.len() - 2].ng50 == last.ng50 {
        return Some(Stop {
            reason: StopReason::Converged,
            result_of: last.iteration - 1,
        });
    }
    if last.iteration >= max_iterations {
        return Some(Stop {
            reason: StopReason::MaxIterations,
            result_of: last.iteration,
        });
    }
    None
}

/// File names inside the output directory.
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn cleaned_fasta(&self) -> PathBuf {
        self.file("assembly.cleaned.fa")
    }

    pub fn cleaned_alignment(&self) -> PathBuf {
        self.file("alignment.cleaned.bed")
    }

    /// Site table of iteration `i`; the first one is the digest itself.
    pub fn sites(&self, i: usize) -> PathBuf {
        if i == 1 {
            self.file("re_sites")
        } else {
            self.file(&format!("re_sites_iteration_{}", i))
        }
    }

    pub fn lengths(&self, i: usize) -> PathBuf {
        self.file(&format!("scaffold_length_iteration_{}", i))
    }

    pub fn alignment(&self, i: usize) -> PathBuf {
        self.file(&format!("alignment_iteration_{}.bed", i))
    }

    pub fn counts(&self, i: usize) -> PathBuf {
        self.file(&format!("re_counts_iteration_{}", i))
    }

    pub fn links(&self, i: usize) -> PathBuf {
        self.file(&format!("contig_links_iteration_{}", i))
    }

    pub fn scaled(&self, i: usize) -> PathBuf {
        self.file(&format!("contig_links_scaled_sorted_iteration_{}", i))
    }

    /// Contig-level paths of the units entering iteration `i`.
    pub fn units(&self, i: usize) -> PathBuf {
        self.file(&format!("units_iteration_{}.paths", i))
    }

    /// Layout of iteration `i` before breaking, with its lifted companions.
    pub fn layout(&self, i: usize, ext: &str) -> PathBuf {
        self.file(&format!("scaffolds_iteration_{}.{}", i, ext))
    }

    pub fn breakpoints(&self, i: usize) -> PathBuf {
        self.file(&format!("breakpoints_iteration_{}", i))
    }

    pub fn avoid(&self, i: usize) -> PathBuf {
        self.file(&format!("avoid_links_iteration_{}", i))
    }

    pub fn marker(&self, i: usize) -> PathBuf {
        self.file(&format!("misasm_iteration_{}.done", i))
    }

    pub fn each_prefix(&self, i: usize) -> PathBuf {
        self.file(&format!("scaffolds_ITERATION_{}", i))
    }

    pub fn final_prefix(&self) -> PathBuf {
        self.file("scaffolds_FINAL")
    }

    pub fn steps_log(&self) -> PathBuf {
        self.file("steps.log")
    }
}

fn open(path: &Path) -> anyhow::Result<Box<dyn BufRead>> {
    crate::reader(&path.to_string_lossy())
}

/// Appends one line per step to `steps.log`.
struct StepLog {
    path: PathBuf,
}

impl StepLog {
    fn record(&self, iteration: usize, step: &str, status: &str, output: &Path) -> anyhow::Result<()> {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}\t{}\t{}\t{}", iteration, step, status, output.display())?;
        Ok(())
    }
}

/// What a finished run reports.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub stop: Stop,
    pub iterations: usize,
    /// The two most recent snapshots
    pub snapshots: Vec<IterationSnapshot>,
    pub final_prefix: PathBuf,
}

pub struct Controller {
    opt: RunOptions,
    dir: WorkDir,
    layout: Box<dyn Layout>,
    detector: Box<dyn BreakDetector>,
    steps: StepLog,
}

impl Controller {
    /// Greedy layout, and the break detector the options ask for.
    pub fn new(opt: RunOptions) -> Self {
        let layout: Box<dyn Layout> = Box::new(GreedyLayout::new(opt.cutoff));
        let detector: Box<dyn BreakDetector> = match &opt.break_cmd {
            Some(cmd) => Box::new(CommandDetector {
                template: cmd.clone(),
            }),
            None if opt.min_span > 0 => Box::new(SpanningPairDetector {
                window: opt.break_window,
                min_span: opt.min_span,
            }),
            None => Box::new(NoBreaks),
        };
        Self::with_strategies(opt, layout, detector)
    }

    pub fn with_strategies(opt: RunOptions, layout: Box<dyn Layout>, detector: Box<dyn BreakDetector>) -> Self {
        let dir = WorkDir::new(&opt.outdir);
        let steps = StepLog {
            path: dir.steps_log(),
        };
        Self {
            opt,
            dir,
            layout,
            detector,
            steps,
        }
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.dir
    }

    fn step<F>(&self, iteration: usize, name: &str, output: &Path, work: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<()>,
    {
        if output.exists() {
            log::info!("Skip {}: {} exists", name, output.display());
            return self.steps.record(iteration, name, "skipped", output);
        }
        log::info!("Run {} of iteration {}", name, iteration);
        work()?;
        self.steps.record(iteration, name, "done", output)
    }

    pub fn run(&self) -> anyhow::Result<RunSummary> {
        std::fs::create_dir_all(&self.opt.outdir)?;

        let assembly = self.prepare()?;
        let mut history: Vec<IterationSnapshot> = vec![];
        let mut i = 1;
        let stop = loop {
            log::info!("==> Iteration {}", i);
            if let Some(stop) = self.iterate(i, &mut history)? {
                break stop;
            }
            i += 1;
        };

        log::info!(
            "Stop after iteration {}: {}, publish the result of iteration {}",
            i,
            stop.reason,
            stop.result_of
        );
        self.finish(&assembly, &stop)?;

        Ok(RunSummary {
            stop,
            iterations: i,
            snapshots: history,
            final_prefix: self.dir.final_prefix(),
        })
    }

    /// DIGEST_ONCE, with input cleaning and filtering in front of it.
    /// Returns the assembly the contig names refer to.
    fn prepare(&self) -> anyhow::Result<PathBuf> {
        let assembly = match &self.opt.breaks {
            Some(breaks) => {
                let fasta = self.dir.cleaned_fasta();
                self.step(0, "correct", &fasta, || {
                    let points = read_breakpoints(open(breaks)?)?;
                    let seqs = load_fasta(open(&self.opt.assembly)?)?;
                    let lengths: LengthTable = seqs.iter().map(|(k, v)| (k.clone(), v.len() as u64)).collect();
                    let splitter = Splitter::new(&points, &lengths);
                    log::info!("Split input contigs at {} breakpoints", splitter.cut_count());

                    persist(self.dir.cleaned_alignment(), |w| {
                        let (kept, dropped) = splitter.rewrite_alignments(open(&self.opt.alignment)?, w)?;
                        log::info!("{} alignments kept, {} across breakpoints dropped", kept, dropped);
                        Ok(())
                    })?;
                    persist(&fasta, |w| split_fasta(&seqs, &splitter, w).map(|_| ()))
                })?;
                fasta
            }
            None => self.opt.assembly.clone(),
        };

        self.step(0, "digest", &self.dir.lengths(1), || {
            let finder = MotifFinder::new(&self.opt.motifs)?;
            let (lengths, sites) = digest_fasta(open(&assembly)?, &finder)?;
            log::info!(
                "{} sequences, {} cut sites",
                lengths.len(),
                sites.values().map(|v| v.len()).sum::<usize>()
            );
            persist(self.dir.sites(1), |w| Ok(write_sites(w, &sites)?))?;
            persist(self.dir.units(1), |w| Ok(ScaffoldSet::identity(&lengths).write_to(w)?))?;
            persist(self.dir.lengths(1), |w| Ok(write_lengths(w, &lengths)?))
        })?;

        if self.opt.filter {
            self.step(0, "filter", &self.dir.alignment(1), || {
                let lengths = read_lengths(open(&self.dir.lengths(1))?)?;
                persist(self.dir.alignment(1), |w| {
                    let (kept, dropped) = retain_known(open(&self.first_alignment())?, w, &lengths)?;
                    log::info!("{} alignments kept, {} on unknown sequences dropped", kept, dropped);
                    Ok(())
                })
            })?;
        }

        Ok(assembly)
    }

    /// Alignments before any filtering.
    fn first_alignment(&self) -> PathBuf {
        if self.opt.breaks.is_some() {
            self.dir.cleaned_alignment()
        } else {
            self.opt.alignment.clone()
        }
    }

    fn alignment_of(&self, i: usize) -> PathBuf {
        if i == 1 && !self.opt.filter {
            self.first_alignment()
        } else {
            self.dir.alignment(i)
        }
    }

    /// Duplicate links on the first iteration, avoid links afterwards.
    fn exclusions(&self, i: usize) -> anyhow::Result<Vec<(String, String)>> {
        if i == 1 {
            return match &self.opt.dup {
                Some(p) => read_pairs(open(p)?),
                None => Ok(vec![]),
            };
        }
        let path = self.dir.avoid(i);
        if !path.exists() {
            return Ok(vec![]);
        }
        read_pairs(open(&path)?)
    }

    /// One SCORE, LAYOUT, BREAK and CHECK round.
    fn iterate(&self, i: usize, history: &mut Vec<IterationSnapshot>) -> anyhow::Result<Option<Stop>> {
        let lengths = read_lengths(open(&self.dir.lengths(i))?)?;

        // SCORE
        let counts_file = self.dir.counts(i);
        self.step(i, "count", &counts_file, || {
            let sites = read_sites(open(&self.dir.sites(i))?)?;
            let counts = count_table(&lengths, &sites);
            persist(&counts_file, |w| Ok(write_counts(w, &counts)?))
        })?;

        let links_file = self.dir.links(i);
        self.step(i, "links", &links_file, || {
            let counts = read_counts(open(&counts_file)?)?;
            let table = SeqTable::new(&lengths, &counts)?;
            let exclude = LinkSet::resolve(&self.exclusions(i)?, &table);

            let mut aggregator = JunctionAggregator::new(&table, &exclude);
            aggregator.consume(MatePairs::new(AlignReader::new(open(&self.alignment_of(i))?)))?;
            let scores = aggregator.scores();
            log::info!(
                "{} junctions, {} excluded pairs",
                scores.len(),
                aggregator.discarded()
            );
            persist(&links_file, |w| Ok(write_scores(w, &scores)?))
        })?;

        let scaled_file = self.dir.scaled(i);
        self.step(i, "scale", &scaled_file, || {
            let scores = read_scores(open(&links_file)?)?;
            let rows = ContigGraph::from_scores(&scores).scaled_links();
            persist(&scaled_file, |w| Ok(write_scaled(w, &rows)?))
        })?;

        let rows = read_scaled(open(&scaled_file)?)?;
        if !has_confident(&rows) {
            return Ok(Some(Stop {
                reason: StopReason::NoConfidentLinks,
                result_of: i - 1,
            }));
        }

        // LAYOUT
        let layout_file = self.dir.layout(i, "paths");
        self.step(i, "layout", &layout_file, || {
            let units = self.layout.layout(&LayoutInput {
                iteration: i,
                links: &rows,
                lengths: &lengths,
            })?;
            let placement = Placement::new(&units, &lengths)?;
            let scaffolds = ScaffoldSet::read_from(open(&self.dir.units(i))?)?.compose(&units)?;
            log::info!(
                "{} units laid out into {} scaffolds, {} with joins",
                lengths.len(),
                scaffolds.len(),
                scaffolds.multi_component()
            );

            let sites = read_sites(open(&self.dir.sites(i))?)?;
            persist(self.dir.layout(i, "sites"), |w| {
                Ok(write_sites(w, &placement.lift_sites(&sites))?)
            })?;
            persist(self.dir.layout(i, "bed"), |w| {
                placement.lift_alignments(open(&self.alignment_of(i))?, w)?;
                Ok(())
            })?;
            persist(self.dir.layout(i, "lengths"), |w| {
                Ok(write_lengths(w, &placement.lengths)?)
            })?;
            persist(&layout_file, |w| Ok(scaffolds.write_to(w)?))
        })?;

        // BREAK
        self.step(i, "break", &self.dir.marker(i + 1), || self.break_step(i))?;

        // CHECK
        let next = read_lengths(open(&self.dir.lengths(i + 1))?)?;
        let snapshot = IterationSnapshot::new(i, &next, self.opt.genome_size);
        log::info!(
            "Iteration {}: {} sequences, {} bp, NG50 {}",
            i,
            snapshot.sequences,
            snapshot.total,
            snapshot.ng50
        );
        history.push(snapshot);
        if history.len() > 2 {
            history.remove(0);
        }

        if self.opt.each {
            let prefix = self.dir.each_prefix(i);
            self.step(i, "emit", &prefix.with_extension("agp"), || {
                self.publish(&prefix, i, &self.assembly_for_emission(), false)
            })?;
        }

        Ok(convergence(history, self.opt.max_iterations))
    }

    fn break_step(&self, i: usize) -> anyhow::Result<()> {
        let contig_lengths = read_lengths(open(&self.dir.lengths(1))?)?;
        let scaffolds = ScaffoldSet::read_from(open(&self.dir.layout(i, "paths"))?)?;
        let lengths_file = self.dir.layout(i, "lengths");
        let lifted_lengths = read_lengths(open(&lengths_file)?)?;
        let lifted_bed = self.dir.layout(i, "bed");

        let points = self.detector.detect(&BreakContext {
            iteration: i,
            alignment: &lifted_bed,
            lengths: &lifted_lengths,
            lengths_file: &lengths_file,
            scaffolds: &scaffolds,
            contig_lengths: &contig_lengths,
        })?;
        persist(self.dir.breakpoints(i), |w| Ok(write_breakpoints(w, &points)?))?;

        let broken = apply_breaks(&points, &scaffolds, &contig_lengths, &lifted_lengths)?;
        log::info!("{} misassembly breaks applied", broken.avoid.len());

        let sites = read_sites(open(&self.dir.layout(i, "sites"))?)?;
        persist(self.dir.sites(i + 1), |w| {
            Ok(write_sites(w, &broken.splitter.split_sites(&sites, &lifted_lengths))?)
        })?;
        persist(self.dir.alignment(i + 1), |w| {
            let (_, dropped) = broken.splitter.rewrite_alignments(open(&lifted_bed)?, w)?;
            log::debug!("{} alignments across breaks dropped", dropped);
            Ok(())
        })?;
        persist(self.dir.avoid(i + 1), |w| Ok(write_pairs(w, &broken.avoid)?))?;
        persist(self.dir.units(i + 1), |w| Ok(broken.scaffolds.write_to(w)?))?;
        persist(self.dir.lengths(i + 1), |w| {
            Ok(write_lengths(w, &broken.splitter.split_lengths(&lifted_lengths))?)
        })?;
        persist(self.dir.marker(i + 1), |w| Ok(writeln!(w, "{}", points.len())?))
    }

    fn assembly_for_emission(&self) -> PathBuf {
        if self.opt.breaks.is_some() {
            self.dir.cleaned_fasta()
        } else {
            self.opt.assembly.clone()
        }
    }

    /// Writes FASTA and AGP for the scaffolds produced by iteration `result_of`.
    fn publish(&self, prefix: &Path, result_of: usize, assembly: &Path, with_paths: bool) -> anyhow::Result<()> {
        let contig_lengths = read_lengths(open(&self.dir.lengths(1))?)?;
        let scaffolds = ScaffoldSet::read_from(open(&self.dir.units(result_of + 1))?)?;
        let seqs = load_fasta(open(assembly)?)?;
        emit_files(prefix, &scaffolds, &contig_lengths, &seqs, with_paths)
    }

    /// DONE
    fn finish(&self, assembly: &Path, stop: &Stop) -> anyhow::Result<()> {
        let prefix = self.dir.final_prefix();
        self.step(stop.result_of, "final", &prefix.with_extension("paths"), || {
            self.publish(&prefix, stop.result_of, assembly, true)
        })
    }
}
