use rand::Rng;

use crate::catalog::Catalog;
use crate::module_set::ModuleSet;

/// Weighted sample over a candidate set, per spec.md §4.3 `collapse_random`:
/// draw `u ∈ [0, Σp_i)`, walk candidates in ascending-index order
/// accumulating `p`, and return the first whose running sum is `>= u`. If
/// floating-point drift leaves nothing selected, fall back to the first
/// candidate. Returns `None` only if `modules` is empty.
///
/// Not implemented via `rand::distr::weighted::WeightedIndex` (what the
/// teacher's algorithms use, e.g. `src/algorithm/backtracking.rs`) because
/// that type doesn't expose this exact "first partial sum >= roll, with a
/// deterministic first-candidate fallback" tie-break spec.md requires.
pub fn sample_module(modules: &ModuleSet, catalog: &Catalog, rng: &mut impl Rng) -> Option<usize> {
    let total: f64 = modules.iter().map(|m| catalog.probability(m)).sum();
    if total <= 0.0 {
        return modules.iter().next();
    }

    let roll = rng.random::<f64>() * total;
    let mut running = 0.0;
    for module in modules.iter() {
        running += catalog.probability(module);
        if running >= roll {
            return Some(module);
        }
    }

    modules.iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::uniform_catalog;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn empty_set_samples_to_none() {
        let catalog = uniform_catalog(3);
        let set = ModuleSet::empty(3);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(sample_module(&set, &catalog, &mut rng), None);
    }

    #[test]
    fn singleton_always_wins() {
        let catalog = uniform_catalog(3);
        let set = ModuleSet::singleton(3, 1);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(sample_module(&set, &catalog, &mut rng), Some(1));
        }
    }

    #[test]
    fn sample_is_always_within_the_candidate_set() {
        let catalog = uniform_catalog(5);
        let mut set = ModuleSet::empty(5);
        set.add(0);
        set.add(2);
        set.add(4);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let m = sample_module(&set, &catalog, &mut rng).unwrap();
            assert!(set.contains(m));
        }
    }
}
