//! Best-alternative rescaling of junction scores.
//!
//! Links become edges of an undirected graph whose nodes are sequences (not
//! sequence ends). Each edge is then compared with the strongest competing
//! edge touching either of its sequences.

use crate::libs::error::InputError;
use crate::libs::junction::{ContigEnd, LinkScore};
use indexmap::IndexMap;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::io::{BufRead, Write};

/// Scaled scores at or above this value are confident joins.
pub const CONFIDENT_SCORE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeData {
    pub a: ContigEnd,
    pub b: ContigEnd,
    pub weight: f64,
    pub support: u64,
}

/// One row of the scaled-score file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledLink {
    pub a: ContigEnd,
    pub b: ContigEnd,
    pub raw: f64,
    pub best_alt: f64,
    pub scaled: f64,
    pub support: u64,
}

impl ScaledLink {
    /// Orientation class of the junction, e.g. `BE`.
    pub fn orientation(&self) -> String {
        format!("{}{}", self.a.end, self.b.end)
    }

    pub fn is_confident(&self) -> bool {
        self.scaled >= CONFIDENT_SCORE
    }
}

pub struct ContigGraph {
    graph: UnGraph<String, EdgeData>,
    index_of: IndexMap<String, NodeIndex>,
}

impl ContigGraph {
    /// Builds the graph from link-score rows. Several orientation classes of
    /// one sequence pair collapse into a single edge; the strongest one is
    /// kept, the first seen on ties.
    pub fn from_scores(scores: &[LinkScore]) -> Self {
        let mut g = ContigGraph {
            graph: UnGraph::default(),
            index_of: IndexMap::new(),
        };

        for s in scores {
            let u = g.node(&s.a.contig);
            let v = g.node(&s.b.contig);
            let data = EdgeData {
                a: s.a.clone(),
                b: s.b.clone(),
                weight: s.score,
                support: s.count,
            };
            match g.graph.find_edge(u, v) {
                Some(e) => {
                    if data.weight > g.graph[e].weight {
                        log::debug!(
                            "{}-{} replaces {}-{}",
                            data.a,
                            data.b,
                            g.graph[e].a,
                            g.graph[e].b
                        );
                        g.graph[e] = data;
                    }
                }
                None => {
                    g.graph.add_edge(u, v, data);
                }
            }
        }

        g
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index_of.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index_of.insert(name.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Largest weight among `x`'s incident edges other than the one to `except`.
    fn max_incident(&self, x: NodeIndex, except: NodeIndex) -> f64 {
        self.graph
            .edges(x)
            .filter(|e| e.target() != except)
            .map(|e| e.weight().weight)
            .fold(0.0, f64::max)
    }

    fn best_alternative(&self, e: EdgeIndex, node_max: &[f64]) -> f64 {
        let (u, v) = match self.graph.edge_endpoints(e) {
            Some(ends) => ends,
            None => return 1.0,
        };
        let w = self.graph[e].weight;

        let mut best = node_max[u.index()].max(node_max[v.index()]);
        if best == w {
            // this edge is the strongest at its endpoints, look past it
            best = self.max_incident(u, v).max(self.max_incident(v, u));
        }
        if best == 0.0 {
            best = 1.0;
        }
        best
    }

    /// Scaled rows sorted by descending scaled score, ties in input order.
    pub fn scaled_links(&self) -> Vec<ScaledLink> {
        let mut node_max = vec![0.0f64; self.graph.node_count()];
        for e in self.graph.edge_references() {
            let w = e.weight().weight;
            for n in [e.source(), e.target()] {
                if w >= node_max[n.index()] {
                    node_max[n.index()] = w;
                }
            }
        }

        let mut rows: Vec<ScaledLink> = self
            .graph
            .edge_indices()
            .map(|e| {
                let data = &self.graph[e];
                let best_alt = self.best_alternative(e, &node_max);
                ScaledLink {
                    a: data.a.clone(),
                    b: data.b.clone(),
                    raw: data.weight,
                    best_alt,
                    scaled: data.weight / best_alt,
                    support: data.support,
                }
            })
            .collect();

        rows.sort_by(|x, y| y.scaled.partial_cmp(&x.scaled).unwrap_or(Ordering::Equal));
        rows
    }
}

pub fn write_scaled<W: Write + ?Sized>(writer: &mut W, rows: &[ScaledLink]) -> std::io::Result<()> {
    for r in rows {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.a,
            r.b,
            r.raw,
            r.best_alt,
            r.scaled,
            r.support,
            r.orientation(),
            if r.is_confident() { "True" } else { "False" }
        )?;
    }
    Ok(())
}

pub fn read_scaled<R: BufRead>(reader: R) -> anyhow::Result<Vec<ScaledLink>> {
    let mut rows = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(InputError::malformed("scaled-score", i + 1, "expected at least 6 columns").into());
        }
        let float = |s: &str| {
            s.parse::<f64>()
                .map_err(|_| InputError::malformed("scaled-score", i + 1, format!("invalid number {}", s)))
        };
        rows.push(ScaledLink {
            a: fields[0].parse()?,
            b: fields[1].parse()?,
            raw: float(fields[2])?,
            best_alt: float(fields[3])?,
            scaled: float(fields[4])?,
            support: fields[5].parse::<u64>().map_err(|_| {
                InputError::malformed("scaled-score", i + 1, format!("invalid count {}", fields[5]))
            })?,
        });
    }
    Ok(rows)
}

/// True when any row reaches the confidence threshold.
pub fn has_confident(rows: &[ScaledLink]) -> bool {
    rows.iter().any(|r| r.is_confident())
}
