//! K-Fold cross-validation splitter

/// K-Fold splitter with a seeded, reproducible shuffle.
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    seed: u64,
}

impl KFold {
    pub fn new(n_splits: usize, seed: u64) -> Self {
        Self { n_splits, seed }
    }

    /// Train/test indices for every fold. Earlier folds absorb the remainder.
    pub fn split(&self, n_samples: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
        let mut indices: Vec<usize> = (0..n_samples).collect();

        // Fisher-Yates driven by an LCG
        let mut state = self.seed;
        for i in (1..n_samples).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let j = (state >> 33) as usize % (i + 1);
            indices.swap(i, j);
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let end = start + fold_size + usize::from(i < remainder);
            let test = indices[start..end].to_vec();
            let train = indices[..start].iter().chain(&indices[end..]).copied().collect();
            folds.push((train, test));
            start = end;
        }
        folds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_folds_partition_samples() {
        let folds = KFold::new(5, 42).split(23);
        assert_eq!(folds.len(), 5);

        let mut seen = HashSet::new();
        for (train, test) in &folds {
            assert_eq!(train.len() + test.len(), 23);
            for idx in test {
                assert!(seen.insert(*idx), "index {} in two test folds", idx);
                assert!(!train.contains(idx));
            }
        }
        assert_eq!(seen.len(), 23);
    }

    #[test]
    fn test_remainder_goes_to_first_folds() {
        let sizes: Vec<_> = KFold::new(5, 0).split(12).iter().map(|(_, t)| t.len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2, 2]);
    }

    #[test]
    fn test_seed_is_deterministic() {
        assert_eq!(KFold::new(5, 7).split(40), KFold::new(5, 7).split(40));
        assert_ne!(KFold::new(5, 7).split(40), KFold::new(5, 8).split(40));
    }
}
