//! Turning scaled links into oriented scaffold paths.

use crate::libs::error::InputError;
use crate::libs::junction::{ContigEnd, End};
use crate::libs::rescale::{ScaledLink, CONFIDENT_SCORE};
use crate::libs::scaffold::{Component, Strand};
use crate::libs::table::LengthTable;
use indexmap::IndexMap;
use petgraph::unionfind::UnionFind;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Inputs of one layout round. Units are the sequences of the current
/// iteration, i.e. the scaffolds produced by the previous one.
pub struct LayoutInput<'a> {
    pub iteration: usize,
    /// Sorted by descending scaled score
    pub links: &'a [ScaledLink],
    pub lengths: &'a LengthTable,
}

/// Path construction step. Every unit of `lengths` must appear exactly once
/// in the returned scaffolds, joined or on its own.
pub trait Layout {
    fn layout(&self, input: &LayoutInput) -> anyhow::Result<IndexMap<String, Vec<Component>>>;
}

/// Accepts links greedily from the strongest down. A link is taken when it
/// is confident, both units reach `min_length`, both ends are still free and
/// the units are not already in one scaffold.
#[derive(Debug, Clone)]
pub struct GreedyLayout {
    pub min_length: u64,
    pub min_score: f64,
}

impl Default for GreedyLayout {
    fn default() -> Self {
        Self {
            min_length: 1000,
            min_score: CONFIDENT_SCORE,
        }
    }
}

impl GreedyLayout {
    pub fn new(min_length: u64) -> Self {
        Self {
            min_length,
            ..Default::default()
        }
    }

    /// Accepted end-to-end adjacencies, keyed by both of their ends.
    fn accept(&self, input: &LayoutInput) -> anyhow::Result<HashMap<(usize, End), (usize, End)>> {
        let mut joins: HashMap<(usize, End), (usize, End)> = HashMap::new();
        let mut uf = UnionFind::<usize>::new(input.lengths.len());

        let mut links: Vec<&ScaledLink> = input.links.iter().collect();
        links.sort_by(|x, y| y.scaled.partial_cmp(&x.scaled).unwrap_or(Ordering::Equal));

        let handle = |end: &ContigEnd| -> Result<(usize, u64), InputError> {
            input
                .lengths
                .get_full(&end.contig)
                .map(|(i, _, &len)| (i, len))
                .ok_or_else(|| InputError::missing("length", &end.contig))
        };

        for link in links {
            if link.scaled < self.min_score {
                break;
            }
            let (a, a_len) = handle(&link.a)?;
            let (b, b_len) = handle(&link.b)?;
            if a == b || a_len < self.min_length || b_len < self.min_length {
                continue;
            }
            if joins.contains_key(&(a, link.a.end)) || joins.contains_key(&(b, link.b.end)) {
                continue;
            }
            if uf.equiv(a, b) {
                continue;
            }

            uf.union(a, b);
            joins.insert((a, link.a.end), (b, link.b.end));
            joins.insert((b, link.b.end), (a, link.a.end));
            log::debug!("join {} - {} ({})", link.a, link.b, link.scaled);
        }

        Ok(joins)
    }
}

impl Layout for GreedyLayout {
    fn layout(&self, input: &LayoutInput) -> anyhow::Result<IndexMap<String, Vec<Component>>> {
        let joins = self.accept(input)?;

        let mut visited = vec![false; input.lengths.len()];
        let mut scaffolds = IndexMap::new();
        let mut serial = 0;

        for (start, name) in input.lengths.keys().enumerate() {
            if visited[start] {
                continue;
            }
            // walk only from a chain extremity
            let entry = if !joins.contains_key(&(start, End::Begin)) {
                End::Begin
            } else if !joins.contains_key(&(start, End::End)) {
                End::End
            } else {
                continue;
            };

            let mut path = vec![];
            let mut current = (start, entry);
            loop {
                let (unit, enter) = current;
                visited[unit] = true;
                let unit_name = input
                    .lengths
                    .get_index(unit)
                    .map(|(k, _)| k.as_str())
                    .unwrap_or_default();
                path.push(Component::new(unit_name, Strand::entering(enter)));

                match joins.get(&(unit, enter.other())) {
                    Some(&next) => current = next,
                    None => break,
                }
            }

            let scaffold_name = if path.len() == 1 {
                name.clone()
            } else {
                serial += 1;
                format!("scaffold_{}_{}", input.iteration, serial)
            };
            scaffolds.insert(scaffold_name, path);
        }

        // cycles cannot form, so every unit was reached from an extremity
        if let Some(i) = visited.iter().position(|v| !v) {
            anyhow::bail!(
                "Layout left {} unplaced",
                input.lengths.get_index(i).map(|(k, _)| k.as_str()).unwrap_or_default()
            );
        }

        Ok(scaffolds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(a: &str, ae: End, b: &str, be: End, scaled: f64) -> ScaledLink {
        ScaledLink {
            a: ContigEnd::new(a, ae),
            b: ContigEnd::new(b, be),
            raw: scaled,
            best_alt: 1.0,
            scaled,
            support: 1,
        }
    }

    fn lengths(items: &[(&str, u64)]) -> LengthTable {
        items.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn run(links: &[ScaledLink], lengths: &LengthTable, min_length: u64) -> IndexMap<String, Vec<Component>> {
        GreedyLayout::new(min_length)
            .layout(&LayoutInput {
                iteration: 1,
                links,
                lengths,
            })
            .unwrap()
    }

    #[test]
    fn joins_end_to_begin_forward() {
        let lens = lengths(&[("c1", 2000), ("c2", 2000), ("c3", 2000)]);
        let scaffolds = run(&[link("c1", End::End, "c2", End::Begin, 5.0)], &lens, 1000);

        assert_eq!(scaffolds.len(), 2);
        assert_eq!(
            scaffolds["scaffold_1_1"],
            vec![
                Component::new("c1", Strand::Forward),
                Component::new("c2", Strand::Forward)
            ]
        );
        assert_eq!(scaffolds["c3"], vec![Component::new("c3", Strand::Forward)]);
    }

    #[test]
    fn end_end_join_reverses_second() {
        let lens = lengths(&[("c1", 2000), ("c2", 2000)]);
        let scaffolds = run(&[link("c1", End::End, "c2", End::End, 5.0)], &lens, 1000);
        assert_eq!(
            scaffolds["scaffold_1_1"],
            vec![
                Component::new("c1", Strand::Forward),
                Component::new("c2", Strand::Reverse)
            ]
        );
    }

    #[test]
    fn used_ends_and_cycles_are_refused() {
        let lens = lengths(&[("a", 5000), ("b", 5000), ("c", 5000)]);
        let links = vec![
            link("a", End::End, "b", End::Begin, 9.0),
            // a:E already taken
            link("a", End::End, "c", End::Begin, 8.0),
            link("b", End::End, "c", End::Begin, 7.0),
            // would close a cycle
            link("a", End::Begin, "c", End::End, 6.0),
        ];
        let scaffolds = run(&links, &lens, 1000);
        assert_eq!(scaffolds.len(), 1);
        let names: Vec<&str> = scaffolds["scaffold_1_1"].iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn weak_or_short_units_stay_alone() {
        let lens = lengths(&[("a", 5000), ("b", 500), ("c", 5000)]);
        let links = vec![
            link("a", End::End, "b", End::Begin, 9.0),
            link("a", End::Begin, "c", End::End, 0.8),
        ];
        let scaffolds = run(&links, &lens, 1000);
        assert_eq!(scaffolds.len(), 3);
        assert!(scaffolds.values().all(|p| p.len() == 1));
    }

    #[test]
    fn chain_found_from_middle_unit_first() {
        let lens = lengths(&[("m", 5000), ("x", 5000), ("y", 5000)]);
        let links = vec![
            link("m", End::Begin, "x", End::Begin, 4.0),
            link("m", End::End, "y", End::Begin, 3.0),
        ];
        let scaffolds = run(&links, &lens, 1000);
        assert_eq!(scaffolds.len(), 1);
        let path = &scaffolds["scaffold_1_1"];
        assert_eq!(
            path,
            &vec![
                Component::new("x", Strand::Reverse),
                Component::new("m", Strand::Forward),
                Component::new("y", Strand::Forward),
            ]
        );
    }

    #[test]
    fn unknown_unit_is_an_error() {
        let lens = lengths(&[("a", 5000)]);
        let res = GreedyLayout::new(0).layout(&LayoutInput {
            iteration: 1,
            links: &[link("a", End::End, "zz", End::Begin, 2.0)],
            lengths: &lens,
        });
        assert!(res.is_err());
    }
}
