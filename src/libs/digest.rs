//! Restriction digestion: locating cut sites and counting them per sequence half.

use crate::libs::table::{LengthTable, RestrictionCount, SiteTable};
use lazy_static::lazy_static;
use regex::bytes::{Regex, RegexBuilder};
use std::collections::HashMap;

lazy_static! {
    /// Recognition motifs of enzymes commonly used in Hi-C library preparation.
    static ref ENZYMES: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("mboi", vec!["GATC"]);
        m.insert("dpnii", vec!["GATC"]);
        m.insert("sau3ai", vec!["GATC"]);
        m.insert("hindiii", vec!["AAGCTT"]);
        m.insert("ncoi", vec!["CCATGG"]);
        m.insert("ddei", vec!["CTNAG"]);
        m.insert("hinfi", vec!["GANTC"]);
        m.insert("msei", vec!["TTAA"]);
        m.insert("arima", vec!["GATC", "GANTC"]);
        m
    };
}

/// Turns an `--enzyme` argument into concrete motifs. Known enzyme names are
/// looked up, anything else is taken as a motif. Every `N` is expanded to its
/// four nucleotide variants.
///
/// ```
/// let motifs = hiscaf::libs::digest::parse_enzymes("HindIII,GANTC").unwrap();
/// assert_eq!(motifs, vec!["AAGCTT", "GAGTC", "GAATC", "GATTC", "GACTC"]);
/// ```
pub fn parse_enzymes(input: &str) -> anyhow::Result<Vec<String>> {
    let mut motifs: Vec<String> = vec![];
    for item in input.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let raw: Vec<String> = match ENZYMES.get(item.to_ascii_lowercase().as_str()) {
            Some(list) => list.iter().map(|s| s.to_string()).collect(),
            None => {
                let upper = item.to_ascii_uppercase();
                if !upper.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T' | b'N')) {
                    anyhow::bail!("Unknown enzyme or invalid motif: {}", item);
                }
                vec![upper]
            }
        };
        for motif in raw {
            for expanded in expand_wildcards(&motif) {
                if !motifs.contains(&expanded) {
                    motifs.push(expanded);
                }
            }
        }
    }

    if motifs.is_empty() {
        anyhow::bail!("No restriction motif given");
    }
    Ok(motifs)
}

fn expand_wildcards(motif: &str) -> Vec<String> {
    match motif.find('N') {
        None => vec![motif.to_string()],
        Some(i) => ["G", "A", "T", "C"]
            .iter()
            .flat_map(|nt| {
                let mut m = motif.to_string();
                m.replace_range(i..i + 1, nt);
                expand_wildcards(&m)
            })
            .collect(),
    }
}

/// Locates cut positions of a motif set on one sequence.
pub trait SiteFinder {
    /// Sorted, distinct 0-based positions.
    fn find(&self, seq: &[u8]) -> Vec<u64>;
}

/// Case-insensitive literal motif search. Matches of one motif do not overlap
/// each other; matches of different motifs may.
pub struct MotifFinder {
    patterns: Vec<Regex>,
}

impl MotifFinder {
    pub fn new(motifs: &[String]) -> anyhow::Result<Self> {
        if motifs.is_empty() {
            anyhow::bail!("No restriction motif given");
        }
        let patterns = motifs
            .iter()
            .map(|m| {
                RegexBuilder::new(&regex::escape(m))
                    .case_insensitive(true)
                    .unicode(false)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl SiteFinder for MotifFinder {
    fn find(&self, seq: &[u8]) -> Vec<u64> {
        let mut sites: Vec<u64> = self
            .patterns
            .iter()
            .flat_map(|re| re.find_iter(seq).map(|m| m.start() as u64))
            .collect();
        sites.sort_unstable();
        sites.dedup();
        sites
    }
}

/// Splits sorted cut positions at the midpoint `length / 2`.
/// A site exactly on the midpoint belongs to the right half.
pub fn count_halves(sites: &[u64], length: u64) -> RestrictionCount {
    let mid = length / 2;
    let left = sites.partition_point(|&p| p < mid) as u64;
    RestrictionCount {
        left,
        right: sites.len() as u64 - left,
    }
}

/// Recomputes every sequence's half counts from a site table and its lengths.
/// Sequences without an entry in `sites` get zero counts.
pub fn count_table(lengths: &LengthTable, sites: &SiteTable) -> crate::libs::table::CountTable {
    lengths
        .iter()
        .map(|(name, &len)| {
            let count = match sites.get(name) {
                Some(s) => count_halves(s, len),
                None => RestrictionCount::default(),
            };
            (name.clone(), count)
        })
        .collect()
}

/// Name and length of every record of a FASTA stream.
pub fn fasta_lengths<R: std::io::BufRead>(reader: R) -> anyhow::Result<LengthTable> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut lengths = LengthTable::new();
    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        lengths.insert(name, record.sequence().len() as u64);
    }
    Ok(lengths)
}

/// Digests every record of a FASTA stream.
pub fn digest_fasta<R: std::io::BufRead, F: SiteFinder>(
    reader: R,
    finder: &F,
) -> anyhow::Result<(LengthTable, SiteTable)> {
    let mut fa_in = noodles_fasta::io::Reader::new(reader);
    let mut lengths = LengthTable::new();
    let mut sites = SiteTable::new();

    for result in fa_in.records() {
        let record = result?;
        let name = String::from_utf8(record.name().into())?;
        let seq: &[u8] = record.sequence().as_ref();
        if seq.is_empty() {
            anyhow::bail!("Sequence {} is empty", name);
        }

        let found = finder.find(seq);
        log::debug!("{}: {} cut sites", name, found.len());
        lengths.insert(name.clone(), seq.len() as u64);
        sites.insert(name, found);
    }

    Ok((lengths, sites))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_of_records() {
        let lengths = fasta_lengths(">a\nACGT\nAC\n>b\nNNN\n".as_bytes()).unwrap();
        assert_eq!(lengths.len(), 2);
        assert_eq!(lengths["a"], 6);
        assert_eq!(lengths["b"], 3);
    }

    #[test]
    fn wildcard_expands_to_four() {
        let motifs = parse_enzymes("GANTC").unwrap();
        assert_eq!(motifs.len(), 4);
        assert!(motifs.contains(&"GACTC".to_string()));
    }

    #[test]
    fn enzyme_names_are_case_insensitive() {
        assert_eq!(parse_enzymes("mboi").unwrap(), vec!["GATC"]);
        assert_eq!(parse_enzymes("MboI, DpnII").unwrap(), vec!["GATC"]);
        assert_eq!(parse_enzymes("Arima").unwrap().len(), 5);
        assert!(parse_enzymes("EcoXYZ").is_err());
        assert!(parse_enzymes(" , ").is_err());
    }

    #[test]
    fn sites_are_sorted_and_distinct() {
        let finder = MotifFinder::new(&["GATC".to_string(), "ATC".to_string()]).unwrap();
        let sites = finder.find(b"GATCaaaaGATCgatc");
        assert_eq!(sites, vec![0, 1, 8, 9, 12, 13]);
    }

    #[test]
    fn midpoint_site_goes_right() {
        let count = count_halves(&[0, 10, 49, 50, 99], 100);
        assert_eq!(count, RestrictionCount { left: 3, right: 2 });
    }

    #[test]
    fn halves_sum_to_distinct_sites() {
        let finder = MotifFinder::new(&parse_enzymes("GATC,AAGCTT").unwrap()).unwrap();
        let seq = b"GATCAAGCTTGATCTTTTTTTTAAGCTTGGGATCCC";
        let sites = finder.find(seq);
        let count = count_halves(&sites, seq.len() as u64);
        assert_eq!(count.total(), sites.len() as u64);
    }

    #[test]
    fn digest_reads_fasta() {
        let fa = ">c1 desc\nGATCAAAAAA\nAAAAAAGATC\n>c2\nTTTTTTTT\n";
        let finder = MotifFinder::new(&parse_enzymes("MboI").unwrap()).unwrap();
        let (lengths, sites) = digest_fasta(fa.as_bytes(), &finder).unwrap();

        assert_eq!(lengths["c1"], 20);
        assert_eq!(sites["c1"], vec![0, 16]);
        assert!(sites["c2"].is_empty());

        let counts = count_table(&lengths, &sites);
        assert_eq!(counts["c1"], RestrictionCount { left: 1, right: 1 });
        assert_eq!(counts["c2"].total(), 0);
    }
}
