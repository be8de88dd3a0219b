//! Weighted operation selection.
use kvload_core::{ConfigError, OperationKind, OperationWeights};

/// Cumulative weight table, e.g. `[0, 0.7) -> get, [0.7, 0.9) -> put, [0.9, 1.0) -> delete`.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    /// Upper (exclusive) bound of each interval, ascending.
    entries: Vec<(f64, OperationKind)>,
}

impl WeightTable {
    pub fn new(weights: &OperationWeights) -> Result<Self, ConfigError> {
        weights.validate()?;

        let mut upper = 0.;
        let entries = OperationKind::ALL
            .into_iter()
            .filter(|op| weights.weight(*op) > 0.)
            .map(|op| {
                upper += weights.weight(op);
                (upper, op)
            })
            .collect();

        Ok(Self { entries })
    }

    /// Picks the operation whose half-open interval contains `draw`.
    ///
    /// `draw` is expected in `[0, 1)`. Anything at or past the last bound falls into the last
    /// interval so rounding in the cumulative sum never leaves a gap.
    pub fn select(&self, draw: f64) -> OperationKind {
        self.entries
            .iter()
            .find(|(upper, _)| draw < *upper)
            .or_else(|| self.entries.last())
            .map(|(_, op)| *op)
            .unwrap_or(OperationKind::Get)
    }

    pub fn operations(&self) -> impl Iterator<Item = OperationKind> + '_ {
        self.entries.iter().map(|(_, op)| *op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kvload_core::Exec;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashMap;

    fn mixed() -> WeightTable {
        WeightTable::new(&Exec::Mixed.weights()).unwrap()
    }

    #[test]
    fn draw_selects_interval() {
        let table = mixed();
        assert_eq!(table.select(0.75), OperationKind::Put);
        assert_eq!(table.select(0.), OperationKind::Get);
        assert_eq!(table.select(0.69), OperationKind::Get);
        assert_eq!(table.select(0.95), OperationKind::Delete);
        assert_eq!(table.select(0.999_999), OperationKind::Delete);
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let table = WeightTable::new(&OperationWeights::new(0.5, 0.25, 0.25)).unwrap();
        assert_eq!(table.select(0.5), OperationKind::Put);
        assert_eq!(table.select(0.75), OperationKind::Delete);
    }

    #[test]
    fn draw_past_last_bound() {
        let table = mixed();
        assert_eq!(table.select(1.), OperationKind::Delete);
    }

    #[test]
    fn zero_weights_are_skipped() {
        let table = WeightTable::new(&Exec::ReadHeavy.weights()).unwrap();
        assert_eq!(table.operations().collect::<Vec<_>>(), vec![OperationKind::Get]);
        assert_eq!(table.select(0.99), OperationKind::Get);

        let table = WeightTable::new(&OperationWeights::new(0., 0.5, 0.5)).unwrap();
        assert_eq!(table.select(0.), OperationKind::Put);
        assert_eq!(table.select(0.5), OperationKind::Delete);
    }

    #[test]
    fn rejects_invalid_weights() {
        assert!(WeightTable::new(&OperationWeights::new(0.5, 0.2, 0.)).is_err());
        assert!(WeightTable::new(&OperationWeights::new(0., 0., 0.)).is_err());
    }

    #[test]
    fn distribution_converges_to_weights() {
        let weights = OperationWeights::new(0.7, 0.2, 0.1);
        let table = WeightTable::new(&weights).unwrap();
        let mut rng = SmallRng::seed_from_u64(0xC0FFEE);

        const N: usize = 200_000;
        let mut counts: HashMap<OperationKind, usize> = HashMap::new();
        for _ in 0..N {
            *counts.entry(table.select(rng.gen())).or_default() += 1;
        }

        for op in OperationKind::ALL {
            let observed = counts.get(&op).copied().unwrap_or(0) as f64 / N as f64;
            assert!(
                (observed - weights.weight(op)).abs() < 0.01,
                "{op}: observed {observed}, expected {}",
                weights.weight(op)
            );
        }
    }
}
