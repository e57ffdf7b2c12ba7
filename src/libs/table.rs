//! Small positional tab-separated tables exchanged between pipeline steps.
//!
//! * length file: `seqId  length`
//! * restriction-count file: `seqId  leftHalfCount  rightHalfCount`
//! * site table: `seqId  pos,pos,...`
//! * duplicate/avoid-link file: `seqA  seqB`
//!
//! All of them are small (one line per sequence) and are loaded whole.

use crate::libs::error::InputError;
use indexmap::IndexMap;
use std::io::{BufRead, Write};

pub type LengthTable = IndexMap<String, u64>;
pub type SiteTable = IndexMap<String, Vec<u64>>;
pub type CountTable = IndexMap<String, RestrictionCount>;

/// Restriction cut sites falling into each half of a sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestrictionCount {
    pub left: u64,
    pub right: u64,
}

impl RestrictionCount {
    pub fn total(&self) -> u64 {
        self.left + self.right
    }
}

fn fields_of<'a>(
    line: &'a str,
    kind: &str,
    line_no: usize,
    min: usize,
) -> Result<Vec<&'a str>, InputError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < min {
        return Err(InputError::malformed(
            kind,
            line_no,
            format!("expected at least {} columns, found {}", min, fields.len()),
        ));
    }
    Ok(fields)
}

fn parse_u64(s: &str, kind: &str, line_no: usize) -> Result<u64, InputError> {
    s.parse::<u64>()
        .map_err(|_| InputError::malformed(kind, line_no, format!("invalid integer {}", s)))
}

/// Iterates non-empty, non-comment lines together with their 1-based numbers.
fn data_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = std::io::Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| line.map(|l| (i + 1, l)))
        .filter(|res| match res {
            Ok((_, l)) => !l.trim().is_empty() && !l.starts_with('#'),
            Err(_) => true,
        })
}

pub fn read_lengths<R: BufRead>(reader: R) -> anyhow::Result<LengthTable> {
    let mut table = LengthTable::new();
    for res in data_lines(reader) {
        let (no, line) = res?;
        let fields = fields_of(&line, "length", no, 2)?;
        table.insert(fields[0].to_string(), parse_u64(fields[1], "length", no)?);
    }
    Ok(table)
}

pub fn write_lengths<W: Write + ?Sized>(writer: &mut W, table: &LengthTable) -> std::io::Result<()> {
    for (name, len) in table {
        writeln!(writer, "{}\t{}", name, len)?;
    }
    Ok(())
}

pub fn read_counts<R: BufRead>(reader: R) -> anyhow::Result<CountTable> {
    let mut table = CountTable::new();
    for res in data_lines(reader) {
        let (no, line) = res?;
        let fields = fields_of(&line, "restriction-count", no, 3)?;
        let count = RestrictionCount {
            left: parse_u64(fields[1], "restriction-count", no)?,
            right: parse_u64(fields[2], "restriction-count", no)?,
        };
        table.insert(fields[0].to_string(), count);
    }
    Ok(table)
}

pub fn write_counts<W: Write + ?Sized>(writer: &mut W, table: &CountTable) -> std::io::Result<()> {
    for (name, count) in table {
        writeln!(writer, "{}\t{}\t{}", name, count.left, count.right)?;
    }
    Ok(())
}

/// Reads a site table. A sequence without any site has an empty second column.
pub fn read_sites<R: BufRead>(reader: R) -> anyhow::Result<SiteTable> {
    let mut table = SiteTable::new();
    for res in data_lines(reader) {
        let (no, line) = res?;
        let fields = fields_of(&line, "site", no, 1)?;
        let sites = match fields.get(1) {
            Some(col) => col
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| parse_u64(s, "site", no))
                .collect::<Result<Vec<_>, _>>()?,
            None => vec![],
        };
        table.insert(fields[0].to_string(), sites);
    }
    Ok(table)
}

pub fn write_sites<W: Write + ?Sized>(writer: &mut W, table: &SiteTable) -> std::io::Result<()> {
    for (name, sites) in table {
        let joined = sites
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}\t{}", name, joined)?;
    }
    Ok(())
}

/// Reads an unordered pair file. Order inside a line is not significant.
pub fn read_pairs<R: BufRead>(reader: R) -> anyhow::Result<Vec<(String, String)>> {
    let mut pairs = vec![];
    for res in data_lines(reader) {
        let (no, line) = res?;
        let fields = fields_of(&line, "link-pair", no, 2)?;
        pairs.push((fields[0].to_string(), fields[1].to_string()));
    }
    Ok(pairs)
}

pub fn write_pairs<W: Write + ?Sized>(
    writer: &mut W,
    pairs: &[(String, String)],
) -> std::io::Result<()> {
    for (a, b) in pairs {
        writeln!(writer, "{}\t{}", a, b)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_keep_file_order() {
        let table = read_lengths("b\t20\na\t10\n\n#c\t3\n".as_bytes()).unwrap();
        assert_eq!(table.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table["a"], 10);

        let mut out = vec![];
        write_lengths(&mut out, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "b\t20\na\t10\n");
    }

    #[test]
    fn malformed_count_reports_line() {
        let err = read_counts("ctg1\t1\t2\nctg2\tx\t3\n".as_bytes()).unwrap_err();
        let err = err.downcast::<InputError>().unwrap();
        match err {
            InputError::Malformed { line, .. } => assert_eq!(line, 2),
            _ => panic!("unexpected error {:?}", err),
        }
    }

    #[test]
    fn sites_allow_empty_sequences() {
        let table = read_sites("c1\t3,10,40\nc2\n".as_bytes()).unwrap();
        assert_eq!(table["c1"], vec![3, 10, 40]);
        assert!(table["c2"].is_empty());

        let mut out = vec![];
        write_sites(&mut out, &table).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "c1\t3,10,40\nc2\t\n");
    }
}
