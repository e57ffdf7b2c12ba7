//! Aggregating chimeric read pairs into oriented junction links.

use crate::libs::alignment::MatePair;
use crate::libs::error::InputError;
use crate::libs::table::{CountTable, LengthTable, RestrictionCount};
use fxhash::{FxBuildHasher, FxHashSet};
use indexmap::IndexMap;
use std::fmt;
use std::io::{BufRead, Write};

/// Which end of a sequence a link attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum End {
    Begin,
    End,
}

impl End {
    pub fn other(self) -> Self {
        match self {
            End::Begin => End::End,
            End::End => End::Begin,
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "B" => Some(End::Begin),
            "E" => Some(End::End),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            End::Begin => 'B',
            End::End => 'E',
        }
    }
}

impl fmt::Display for End {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// A sequence name tagged with one of its ends, written `name:B` or `name:E`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContigEnd {
    pub contig: String,
    pub end: End,
}

impl ContigEnd {
    pub fn new(contig: &str, end: End) -> Self {
        Self {
            contig: contig.to_string(),
            end,
        }
    }
}

impl fmt::Display for ContigEnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.contig, self.end)
    }
}

impl std::str::FromStr for ContigEnd {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (contig, tag) = s
            .rsplit_once(':')
            .ok_or_else(|| anyhow::anyhow!("Invalid sequence end: {}", s))?;
        let end = End::from_tag(tag).ok_or_else(|| anyhow::anyhow!("Invalid end tag in {}", s))?;
        if contig.is_empty() {
            anyhow::bail!("Invalid sequence end: {}", s);
        }
        Ok(ContigEnd::new(contig, end))
    }
}

/// Per-iteration immutable lookup of sequence lengths and restriction counts,
/// addressed by interned handles.
#[derive(Debug, Default)]
pub struct SeqTable {
    entries: IndexMap<String, (u64, RestrictionCount)>,
}

impl SeqTable {
    pub fn new(lengths: &LengthTable, counts: &CountTable) -> anyhow::Result<Self> {
        let mut entries = IndexMap::with_capacity(lengths.len());
        for (name, &len) in lengths {
            if len == 0 {
                return Err(InputError::malformed("length", 0, format!("{} has length 0", name)).into());
            }
            let count = counts
                .get(name)
                .copied()
                .ok_or_else(|| InputError::missing("restriction-count", name))?;
            entries.insert(name.clone(), (len, count));
        }
        Ok(Self { entries })
    }

    pub fn handle(&self, name: &str) -> Option<usize> {
        self.entries.get_index_of(name)
    }

    pub fn name(&self, handle: usize) -> &str {
        self.entries
            .get_index(handle)
            .map(|(k, _)| k.as_str())
            .unwrap_or_default()
    }

    pub fn length(&self, handle: usize) -> u64 {
        self.entries.get_index(handle).map(|(_, v)| v.0).unwrap_or_default()
    }

    pub fn count(&self, handle: usize) -> RestrictionCount {
        self.entries.get_index(handle).map(|(_, v)| v.1).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Unordered sequence pairs whose read pairs must be discarded.
#[derive(Debug, Default, Clone)]
pub struct LinkSet {
    pairs: FxHashSet<(usize, usize)>,
}

impl LinkSet {
    /// Pairs naming sequences absent from `table` can never match and are dropped.
    pub fn resolve(pairs: &[(String, String)], table: &SeqTable) -> Self {
        let pairs = pairs
            .iter()
            .filter_map(|(a, b)| Some(Self::ordered(table.handle(a)?, table.handle(b)?)))
            .collect();
        Self { pairs }
    }

    fn ordered(a: usize, b: usize) -> (usize, usize) {
        if b < a {
            (b, a)
        } else {
            (a, b)
        }
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.pairs.contains(&Self::ordered(a, b))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Canonical junction between two sequence ends. `a` sorts before `b` by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JunctionKey {
    pub a: usize,
    pub a_end: End,
    pub b: usize,
    pub b_end: End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkRecord {
    pub count: u64,
    pub denominator: f64,
}

impl LinkRecord {
    pub fn raw_score(&self) -> f64 {
        if self.denominator == 0.0 {
            0.0
        } else {
            self.count as f64 / self.denominator
        }
    }
}

/// One row of the link-score file.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkScore {
    pub a: ContigEnd,
    pub b: ContigEnd,
    pub score: f64,
    pub count: u64,
}

/// Streaming accumulator of junction evidence. Holds only the output map.
pub struct JunctionAggregator<'a> {
    table: &'a SeqTable,
    exclude: &'a LinkSet,
    links: IndexMap<JunctionKey, LinkRecord, FxBuildHasher>,
    discarded: u64,
}

impl<'a> JunctionAggregator<'a> {
    /// `exclude` holds the duplicate links on the first iteration and the
    /// avoid links afterwards.
    pub fn new(table: &'a SeqTable, exclude: &'a LinkSet) -> Self {
        Self {
            table,
            exclude,
            links: IndexMap::default(),
            discarded: 0,
        }
    }

    fn classify(&self, handle: usize, pos: u64, read: &str) -> Result<End, InputError> {
        let len = self.table.length(handle);
        if pos > len {
            return Err(InputError::Orientation {
                read: read.to_string(),
                contig: self.table.name(handle).to_string(),
                position: pos,
                length: len,
            });
        }
        if pos <= len / 2 {
            Ok(End::Begin)
        } else {
            Ok(End::End)
        }
    }

    fn half_count(&self, handle: usize, end: End) -> u64 {
        let count = self.table.count(handle);
        match end {
            End::Begin => count.left,
            End::End => count.right,
        }
    }

    /// Adds one mate pair. Returns whether it contributed to a junction.
    pub fn add(&mut self, pair: &MatePair) -> anyhow::Result<bool> {
        if !pair.is_chimeric() {
            return Ok(false);
        }

        let h1 = self
            .table
            .handle(&pair.first.contig)
            .ok_or_else(|| InputError::missing("length", &pair.first.contig))?;
        let h2 = self
            .table
            .handle(&pair.second.contig)
            .ok_or_else(|| InputError::missing("length", &pair.second.contig))?;

        if self.exclude.contains(h1, h2) {
            self.discarded += 1;
            log::trace!("discard {} between {} and {}", pair.first.read, pair.first.contig, pair.second.contig);
            return Ok(false);
        }

        let (mut rec1, mut rec2) = (&pair.first, &pair.second);
        let (mut a, mut b) = (h1, h2);
        if pair.second.contig < pair.first.contig {
            std::mem::swap(&mut rec1, &mut rec2);
            std::mem::swap(&mut a, &mut b);
        }

        let a_end = self.classify(a, rec1.midpoint(), &rec1.read)?;
        let b_end = self.classify(b, rec2.midpoint(), &rec2.read)?;

        let denominator = self.half_count(a, a_end) as f64 * (0.5 / self.table.length(a) as f64)
            + self.half_count(b, b_end) as f64 * (0.5 / self.table.length(b) as f64);

        let key = JunctionKey {
            a,
            a_end,
            b,
            b_end,
        };
        let link = self.links.entry(key).or_insert(LinkRecord {
            count: 0,
            denominator,
        });
        link.count += 1;
        // the latest value wins, it is not accumulated
        link.denominator = denominator;

        Ok(true)
    }

    /// Consumes a whole mate-pair stream.
    pub fn consume<I>(&mut self, pairs: I) -> anyhow::Result<()>
    where
        I: Iterator<Item = anyhow::Result<MatePair>>,
    {
        for pair in pairs {
            self.add(&pair?)?;
        }
        Ok(())
    }

    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn get(&self, key: &JunctionKey) -> Option<&LinkRecord> {
        self.links.get(key)
    }

    /// Link-score rows in first-seen order. Junctions with a zero
    /// denominator carry no usable score and are left out.
    pub fn scores(&self) -> Vec<LinkScore> {
        self.links
            .iter()
            .filter(|(_, link)| link.denominator != 0.0)
            .map(|(key, link)| LinkScore {
                a: ContigEnd::new(self.table.name(key.a), key.a_end),
                b: ContigEnd::new(self.table.name(key.b), key.b_end),
                score: link.raw_score(),
                count: link.count,
            })
            .collect()
    }
}

pub fn write_scores<W: Write + ?Sized>(writer: &mut W, scores: &[LinkScore]) -> std::io::Result<()> {
    for s in scores {
        writeln!(writer, "{}\t{}\t{}\t{}", s.a, s.b, s.score, s.count)?;
    }
    Ok(())
}

pub fn read_scores<R: BufRead>(reader: R) -> anyhow::Result<Vec<LinkScore>> {
    let mut scores = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(InputError::malformed("link-score", i + 1, "expected 4 columns").into());
        }
        let score = fields[2]
            .parse::<f64>()
            .map_err(|_| InputError::malformed("link-score", i + 1, format!("invalid score {}", fields[2])))?;
        let count = fields[3]
            .parse::<u64>()
            .map_err(|_| InputError::malformed("link-score", i + 1, format!("invalid count {}", fields[3])))?;
        scores.push(LinkScore {
            a: fields[0].parse()?,
            b: fields[1].parse()?,
            score,
            count,
        });
    }
    Ok(scores)
}
