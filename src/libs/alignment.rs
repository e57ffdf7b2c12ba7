//! Streaming access to BED-like alignment records.
//!
//! Records are `seqId  start  end  readId[/mate]  ...`, sorted so that the two
//! mates of a read pair are adjacent. Files can be far larger than memory, so
//! everything here works on a lazy iterator and never holds more than two
//! records at a time.

use crate::libs::error::InputError;
use crate::libs::table::LengthTable;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignRecord {
    pub contig: String,
    pub start: u64,
    pub end: u64,
    /// The read identifier, mate suffix included
    pub read: String,
    /// Any trailing columns, tab-joined, carried through rewrites untouched
    pub rest: String,
}

impl AlignRecord {
    /// The read identifier without its mate suffix (text after `/`).
    pub fn read_name(&self) -> &str {
        match self.read.find('/') {
            Some(i) => &self.read[..i],
            None => &self.read,
        }
    }

    /// Position of the read, the integer midpoint of its aligned span.
    pub fn midpoint(&self) -> u64 {
        (self.start + self.end) / 2
    }

    pub fn parse(line: &str, line_no: usize) -> Result<Self, InputError> {
        let mut fields = line.split('\t');
        let mut next = |what: &str| {
            fields
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| InputError::malformed("alignment", line_no, format!("missing {}", what)))
        };
        let contig = next("sequence id")?.to_string();
        let start = next("start")?;
        let end = next("end")?;
        let read = next("read id")?.to_string();

        let parse = |s: &str| {
            s.trim().parse::<u64>().map_err(|_| {
                InputError::malformed("alignment", line_no, format!("invalid coordinate {}", s))
            })
        };
        let start = parse(start)?;
        let end = parse(end)?;
        if end < start {
            return Err(InputError::malformed(
                "alignment",
                line_no,
                format!("end {} before start {}", end, start),
            ));
        }

        let rest = fields.collect::<Vec<_>>().join("\t");

        Ok(AlignRecord {
            contig,
            start,
            end,
            read: read.trim_end().to_string(),
            rest: rest.trim_end().to_string(),
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        if self.rest.is_empty() {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}",
                self.contig, self.start, self.end, self.read
            )
        } else {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}",
                self.contig, self.start, self.end, self.read, self.rest
            )
        }
    }
}

/// Lazy, non-restartable sequence of records read line by line.
pub struct AlignReader<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> AlignReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for AlignReader<R> {
    type Item = anyhow::Result<AlignRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_no += 1;
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            return Some(AlignRecord::parse(&line, self.line_no).map_err(Into::into));
        }
    }
}

/// Two adjacent records sharing a read name.
#[derive(Debug, Clone)]
pub struct MatePair {
    pub first: AlignRecord,
    pub second: AlignRecord,
}

impl MatePair {
    pub fn is_chimeric(&self) -> bool {
        self.first.contig != self.second.contig
    }
}

/// A two-slot sliding window over a record stream. Every adjacent pair of
/// records whose read names match is yielded; the later record then becomes
/// the window's left slot, so runs of three mates yield two pairs.
pub struct MatePairs<I> {
    inner: I,
    prev: Option<AlignRecord>,
}

impl<I> MatePairs<I>
where
    I: Iterator<Item = anyhow::Result<AlignRecord>>,
{
    pub fn new(inner: I) -> Self {
        Self { inner, prev: None }
    }
}

impl<I> Iterator for MatePairs<I>
where
    I: Iterator<Item = anyhow::Result<AlignRecord>>,
{
    type Item = anyhow::Result<MatePair>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let curr = match self.inner.next()? {
                Ok(rec) => rec,
                Err(e) => return Some(Err(e)),
            };

            match self.prev.take() {
                Some(prev) if prev.read_name() == curr.read_name() => {
                    self.prev = Some(curr.clone());
                    return Some(Ok(MatePair {
                        first: prev,
                        second: curr,
                    }));
                }
                _ => self.prev = Some(curr),
            }
        }
    }
}

/// Streams records through, dropping those on sequences absent from
/// `lengths`. Returns (kept, dropped).
pub fn retain_known<R: BufRead, W: Write + ?Sized>(
    reader: R,
    writer: &mut W,
    lengths: &LengthTable,
) -> anyhow::Result<(u64, u64)> {
    let (mut kept, mut dropped) = (0, 0);
    for rec in AlignReader::new(reader) {
        let rec = rec?;
        if lengths.contains_key(&rec.contig) {
            rec.write_to(writer)?;
            kept += 1;
        } else {
            dropped += 1;
        }
    }
    Ok((kept, dropped))
}
