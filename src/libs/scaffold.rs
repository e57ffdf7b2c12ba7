//! Oriented scaffold paths and the coordinate lifting that goes with them.
//!
//! A scaffold is an ordered list of oriented components. In the path artifact
//! each component is written as its two ends in traversal order, so `c1:B c1:E`
//! is `c1` forward and `c2:E c2:B` is `c2` reverse-complemented:
//!
//! ```text
//! scaffold_1_1	c1:B c1:E c2:E c2:B	c1+ c2-
//! ```

use crate::libs::alignment::{AlignReader, AlignRecord};
use crate::libs::error::InputError;
use crate::libs::junction::{ContigEnd, End};
use crate::libs::table::{LengthTable, SiteTable};
use indexmap::IndexMap;
use std::io::{BufRead, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn flip(self) -> Self {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }

    /// Strand of a component entered through `end`.
    pub fn entering(end: End) -> Self {
        match end {
            End::Begin => Strand::Forward,
            End::End => Strand::Reverse,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub strand: Strand,
}

impl Component {
    pub fn new(name: &str, strand: Strand) -> Self {
        Self {
            name: name.to_string(),
            strand,
        }
    }

    /// The ends in traversal order.
    pub fn ends(&self) -> (ContigEnd, ContigEnd) {
        let (first, second) = match self.strand {
            Strand::Forward => (End::Begin, End::End),
            Strand::Reverse => (End::End, End::Begin),
        };
        (
            ContigEnd::new(&self.name, first),
            ContigEnd::new(&self.name, second),
        )
    }
}

/// Scaffold name to contig-level path, in output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScaffoldSet {
    pub paths: IndexMap<String, Vec<Component>>,
}

impl ScaffoldSet {
    /// Every sequence on its own, forward.
    pub fn identity(lengths: &LengthTable) -> Self {
        let paths = lengths
            .keys()
            .map(|name| (name.clone(), vec![Component::new(name, Strand::Forward)]))
            .collect();
        Self { paths }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn multi_component(&self) -> usize {
        self.paths.values().filter(|p| p.len() > 1).count()
    }

    /// Expands unit-level scaffolds into contig-level ones, where each unit
    /// is itself a scaffold of `self`.
    pub fn compose(&self, units: &IndexMap<String, Vec<Component>>) -> anyhow::Result<ScaffoldSet> {
        let mut paths = IndexMap::with_capacity(units.len());
        for (name, path) in units {
            let mut flat = vec![];
            for unit in path {
                let inner = self
                    .paths
                    .get(&unit.name)
                    .ok_or_else(|| InputError::missing("scaffold path", &unit.name))?;
                match unit.strand {
                    Strand::Forward => flat.extend(inner.iter().cloned()),
                    Strand::Reverse => flat.extend(
                        inner
                            .iter()
                            .rev()
                            .map(|c| Component::new(&c.name, c.strand.flip())),
                    ),
                }
            }
            paths.insert(name.clone(), flat);
        }
        Ok(ScaffoldSet { paths })
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        for (name, path) in &self.paths {
            let ends = path
                .iter()
                .map(|c| {
                    let (x, y) = c.ends();
                    format!("{} {}", x, y)
                })
                .collect::<Vec<_>>()
                .join(" ");
            let strands = path
                .iter()
                .map(|c| format!("{}{}", c.name, c.strand.symbol()))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(writer, "{}\t{}\t{}", name, ends, strands)?;
        }
        Ok(())
    }

    pub fn read_from<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut paths = IndexMap::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 {
                return Err(InputError::malformed("path", i + 1, "expected a name and a path").into());
            }

            let ends = fields[1]
                .split_whitespace()
                .map(|s| s.parse::<ContigEnd>())
                .collect::<anyhow::Result<Vec<_>>>()?;
            if ends.is_empty() || ends.len() % 2 != 0 {
                return Err(InputError::malformed("path", i + 1, "odd number of sequence ends").into());
            }

            let mut path = vec![];
            for pair in ends.chunks(2) {
                if pair[0].contig != pair[1].contig || pair[0].end == pair[1].end {
                    return Err(InputError::malformed(
                        "path",
                        i + 1,
                        format!("{} and {} are not two ends of one sequence", pair[0], pair[1]),
                    )
                    .into());
                }
                path.push(Component::new(&pair[0].contig, Strand::entering(pair[0].end)));
            }
            paths.insert(fields[0].to_string(), path);
        }
        Ok(ScaffoldSet { paths })
    }
}

/// Where one unit lands inside its scaffold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub scaffold: String,
    pub offset: u64,
    pub length: u64,
    pub strand: Strand,
}

impl Slot {
    /// Maps a half-open interval of the unit into scaffold coordinates.
    pub fn lift(&self, start: u64, end: u64) -> (u64, u64) {
        match self.strand {
            Strand::Forward => (self.offset + start, self.offset + end),
            Strand::Reverse => (
                self.offset + self.length.saturating_sub(end),
                self.offset + self.length.saturating_sub(start),
            ),
        }
    }
}

/// Unit name to its slot, plus the resulting scaffold lengths.
/// Components are concatenated without gaps in these coordinates.
#[derive(Debug, Clone, Default)]
pub struct Placement {
    pub slots: IndexMap<String, Slot>,
    pub lengths: LengthTable,
}

impl Placement {
    pub fn new(units: &IndexMap<String, Vec<Component>>, unit_lengths: &LengthTable) -> anyhow::Result<Self> {
        let mut slots = IndexMap::new();
        let mut lengths = LengthTable::new();
        for (name, path) in units {
            let mut offset = 0;
            for c in path {
                let length = *unit_lengths
                    .get(&c.name)
                    .ok_or_else(|| InputError::missing("length", &c.name))?;
                slots.insert(
                    c.name.clone(),
                    Slot {
                        scaffold: name.clone(),
                        offset,
                        length,
                        strand: c.strand,
                    },
                );
                offset += length;
            }
            lengths.insert(name.clone(), offset);
        }
        Ok(Self { slots, lengths })
    }

    pub fn lift_sites(&self, sites: &SiteTable) -> SiteTable {
        let mut lifted: SiteTable = self.lengths.keys().map(|k| (k.clone(), vec![])).collect();
        for (unit, positions) in sites {
            let slot = match self.slots.get(unit) {
                Some(slot) => slot,
                None => continue,
            };
            if let Some(list) = lifted.get_mut(&slot.scaffold) {
                list.extend(positions.iter().map(|&p| slot.lift(p, p + 1).0));
            }
        }
        for list in lifted.values_mut() {
            list.sort_unstable();
            list.dedup();
        }
        lifted
    }

    pub fn lift_record(&self, rec: &mut AlignRecord) -> Result<(), InputError> {
        let slot = self
            .slots
            .get(&rec.contig)
            .ok_or_else(|| InputError::missing("placement", &rec.contig))?;
        let (start, end) = slot.lift(rec.start, rec.end);
        rec.contig = slot.scaffold.clone();
        rec.start = start;
        rec.end = end;
        Ok(())
    }

    /// Streams an alignment file into scaffold coordinates, keeping the order
    /// of records so mates stay adjacent. Returns the number of records.
    pub fn lift_alignments<R: BufRead, W: Write + ?Sized>(
        &self,
        reader: R,
        writer: &mut W,
    ) -> anyhow::Result<u64> {
        let mut n = 0;
        for rec in AlignReader::new(reader) {
            let mut rec = rec?;
            self.lift_record(&mut rec)?;
            rec.write_to(writer)?;
            n += 1;
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lengths(items: &[(&str, u64)]) -> LengthTable {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn path_artifact_round_trip() {
        let text = "scaffold_1_1\tc1:B c1:E c2:E c2:B\tc1+ c2-\nc3\tc3:B c3:E\tc3+\n";
        let set = ScaffoldSet::read_from(text.as_bytes()).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.paths["scaffold_1_1"][1], Component::new("c2", Strand::Reverse));

        let mut out = vec![];
        set.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), text);
    }

    #[test]
    fn path_artifact_rejects_mixed_pairs() {
        assert!(ScaffoldSet::read_from("s\tc1:B c2:E\n".as_bytes()).is_err());
        assert!(ScaffoldSet::read_from("s\tc1:B c1:B\n".as_bytes()).is_err());
        assert!(ScaffoldSet::read_from("s\tc1:B\n".as_bytes()).is_err());
    }

    #[test]
    fn compose_reverses_inner_paths() {
        let prev = ScaffoldSet::read_from("s1\tc1:B c1:E c2:E c2:B\nc3\tc3:B c3:E\n".as_bytes()).unwrap();
        let mut units = IndexMap::new();
        units.insert(
            "t".to_string(),
            vec![
                Component::new("c3", Strand::Forward),
                Component::new("s1", Strand::Reverse),
            ],
        );

        let next = prev.compose(&units).unwrap();
        assert_eq!(
            next.paths["t"],
            vec![
                Component::new("c3", Strand::Forward),
                Component::new("c2", Strand::Forward),
                Component::new("c1", Strand::Reverse),
            ]
        );

        units.insert("bad".to_string(), vec![Component::new("zz", Strand::Forward)]);
        assert!(prev.compose(&units).is_err());
    }

    #[test]
    fn placement_lifts_both_strands() {
        let mut units = IndexMap::new();
        units.insert(
            "s".to_string(),
            vec![
                Component::new("a", Strand::Forward),
                Component::new("b", Strand::Reverse),
            ],
        );
        let placement = Placement::new(&units, &lengths(&[("a", 100), ("b", 50)])).unwrap();
        assert_eq!(placement.lengths["s"], 150);

        let mut rec = AlignRecord::parse("b\t0\t10\tr1/1", 1).unwrap();
        placement.lift_record(&mut rec).unwrap();
        assert_eq!((rec.contig.as_str(), rec.start, rec.end), ("s", 140, 150));

        let mut sites = SiteTable::new();
        sites.insert("a".to_string(), vec![5]);
        sites.insert("b".to_string(), vec![0, 49]);
        let lifted = placement.lift_sites(&sites);
        assert_eq!(lifted["s"], vec![5, 100, 149]);
    }

    #[test]
    fn lift_alignments_keeps_order() {
        let mut units = IndexMap::new();
        units.insert("s".to_string(), vec![Component::new("a", Strand::Reverse)]);
        let placement = Placement::new(&units, &lengths(&[("a", 100)])).unwrap();

        let mut out = vec![];
        let n = placement
            .lift_alignments("a\t0\t10\tr1/1\na\t90\t100\tr1/2\tx\n".as_bytes(), &mut out)
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "s\t90\t100\tr1/1\ns\t0\t10\tr1/2\tx\n");

        let mut out = vec![];
        assert!(placement.lift_alignments("zz\t0\t1\tr\n".as_bytes(), &mut out).is_err());
    }
}
