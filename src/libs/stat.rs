use crate::libs::table::LengthTable;

/// NG50 of a length table. With `genome_size == 0` the total of all lengths
/// is used instead, which makes it the N50.
///
/// Lengths are sorted descending and summed until the running sum reaches
/// half the genome size; the length that crosses the threshold is returned.
/// Returns 0 if the threshold is never reached.
///
/// ```
/// let mut lengths = indexmap::IndexMap::new();
/// for (i, len) in [100u64, 90, 80, 70, 60].iter().enumerate() {
///     lengths.insert(format!("ctg{}", i), *len);
/// }
/// assert_eq!(hiscaf::libs::stat::ng50(&lengths, 400), 80);
/// assert_eq!(hiscaf::libs::stat::ng50(&lengths, 0), 80);
/// ```
pub fn ng50(lengths: &LengthTable, genome_size: u64) -> u64 {
    let mut sorted: Vec<u64> = lengths.values().copied().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    let genome_size = if genome_size == 0 {
        sorted.iter().sum()
    } else {
        genome_size
    };

    // compare 2 * sum against the size to stay exact for odd sizes
    let mut sum = 0u64;
    for len in sorted {
        sum += len;
        if 2 * sum >= genome_size {
            return len;
        }
    }
    0
}

/// What the convergence check keeps from one finished iteration. The length
/// table itself is not kept, only its NG50, sequence count and total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationSnapshot {
    pub iteration: usize,
    pub ng50: u64,
    pub sequences: usize,
    pub total: u64,
}

impl IterationSnapshot {
    pub fn new(iteration: usize, lengths: &LengthTable, genome_size: u64) -> Self {
        Self {
            iteration,
            ng50: ng50(lengths, genome_size),
            sequences: lengths.len(),
            total: lengths.values().sum(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(lens: &[u64]) -> LengthTable {
        lens.iter()
            .enumerate()
            .map(|(i, &l)| (format!("s{}", i), l))
            .collect()
    }

    #[test]
    fn ng50_crossing_element() {
        // 100 + 90 = 190 < 200, 100 + 90 + 80 = 270 >= 200
        assert_eq!(ng50(&table(&[60, 100, 70, 90, 80]), 400), 80);
    }

    #[test]
    fn ng50_exact_threshold() {
        // 100 + 100 reaches exactly half of 400
        assert_eq!(ng50(&table(&[100, 100, 50, 50, 100]), 400), 100);
        assert_eq!(ng50(&table(&[5, 4]), 9), 5);
    }

    #[test]
    fn ng50_unreachable() {
        assert_eq!(ng50(&table(&[10, 10]), 1000), 0);
        assert_eq!(ng50(&LengthTable::new(), 0), 0);
    }

    #[test]
    fn snapshot_totals() {
        let snap = IterationSnapshot::new(2, &table(&[10, 30, 20]), 0);
        assert_eq!(snap.ng50, 30);
        assert_eq!(snap.sequences, 3);
        assert_eq!(snap.total, 60);
    }
}
