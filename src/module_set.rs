use std::cell::Cell;
use std::fmt;

use fixedbitset::FixedBitSet;

use crate::catalog::Catalog;

/// A dense bitset over module indices `[0, N)`, per spec.md §4.1.
///
/// Bulk operations run in `O(N/64)`. Entropy is a lazily recomputed scalar:
/// any mutator that actually flips a bit invalidates the cache, mirroring
/// the "dirty flag" described in the spec. Caching is implemented with
/// `Cell` rather than a plain field so `entropy()` can stay a `&self`
/// method, matching how callers read it during the min-entropy scan.
#[derive(Clone)]
pub struct ModuleSet {
    bits: FixedBitSet,
    entropy_cache: Cell<Option<f64>>,
}

impl ModuleSet {
    /// An empty candidate set over `num_modules` modules.
    pub fn empty(num_modules: usize) -> Self {
        Self {
            bits: FixedBitSet::with_capacity(num_modules),
            entropy_cache: Cell::new(Some(f64::INFINITY)),
        }
    }

    /// A candidate set with every module present.
    pub fn full(num_modules: usize) -> Self {
        let mut bits = FixedBitSet::with_capacity(num_modules);
        bits.insert_range(..);
        Self {
            bits,
            entropy_cache: Cell::new(None),
        }
    }

    /// A candidate set containing exactly one module.
    pub fn singleton(num_modules: usize, module: usize) -> Self {
        let mut bits = FixedBitSet::with_capacity(num_modules);
        bits.insert(module);
        Self {
            bits,
            entropy_cache: Cell::new(None),
        }
    }

    pub fn num_modules(&self) -> usize {
        self.bits.len()
    }

    pub fn contains(&self, module: usize) -> bool {
        self.bits.contains(module)
    }

    /// Returns whether the set actually changed.
    pub fn add(&mut self, module: usize) -> bool {
        if self.bits.contains(module) {
            false
        } else {
            self.bits.insert(module);
            self.mark_dirty();
            true
        }
    }

    /// Returns whether the set actually changed.
    pub fn remove(&mut self, module: usize) -> bool {
        if self.bits.contains(module) {
            self.bits.remove(module);
            self.mark_dirty();
            true
        } else {
            false
        }
    }

    /// In-place union; returns whether any word changed.
    pub fn union(&mut self, other: &ModuleSet) -> bool {
        let before = self.bits.clone();
        self.bits.union_with(&other.bits);
        let changed = before != self.bits;
        if changed {
            self.mark_dirty();
        }
        changed
    }

    /// In-place intersection; returns whether any word changed.
    pub fn intersect(&mut self, other: &ModuleSet) -> bool {
        let before = self.bits.clone();
        self.bits.intersect_with(&other.bits);
        let changed = before != self.bits;
        if changed {
            self.mark_dirty();
        }
        changed
    }

    /// In-place set difference (`self \ other`); returns whether any word changed.
    pub fn difference(&mut self, other: &ModuleSet) -> bool {
        let before = self.bits.clone();
        self.bits.difference_with(&other.bits);
        let changed = before != self.bits;
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub fn count(&self) -> usize {
        self.bits.count_ones(..)
    }

    pub fn is_empty(&self) -> bool {
        self.bits.count_ones(..) == 0
    }

    pub fn is_full(&self) -> bool {
        self.bits.count_ones(..) == self.bits.len()
    }

    /// Modules in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.ones()
    }

    fn mark_dirty(&self) {
        self.entropy_cache.set(None);
    }

    /// `H = ln(Σp_i) − (Σ p_i·ln p_i) / Σp_i` over the modules still in the set.
    /// An empty set has entropy `+∞` so it is never picked by min-entropy
    /// selection (spec.md §4.1).
    pub fn entropy(&self, catalog: &Catalog) -> f64 {
        if let Some(cached) = self.entropy_cache.get() {
            return cached;
        }

        let mut sum_p = 0.0;
        let mut sum_plogp = 0.0;
        for module in self.iter() {
            sum_p += catalog.probability(module);
            sum_plogp += catalog.plogp(module);
        }

        let entropy = if sum_p <= 0.0 {
            f64::INFINITY
        } else {
            sum_p.ln() - sum_plogp / sum_p
        };

        self.entropy_cache.set(Some(entropy));
        entropy
    }
}

impl fmt::Debug for ModuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl PartialEq for ModuleSet {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}
impl Eq for ModuleSet {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::uniform_catalog;

    #[test]
    fn count_matches_iter_len() {
        let mut set = ModuleSet::empty(8);
        set.add(1);
        set.add(3);
        set.add(6);
        assert_eq!(set.count(), set.iter().count());
        assert_eq!(set.count(), 3);
    }

    #[test]
    fn intersect_with_full_is_identity() {
        let full = ModuleSet::full(5);
        let mut set = ModuleSet::empty(5);
        set.add(0);
        set.add(4);
        let before = set.clone();
        set.intersect(&full);
        assert_eq!(set, before);
    }

    #[test]
    fn union_with_empty_is_identity() {
        let empty = ModuleSet::empty(5);
        let mut set = ModuleSet::empty(5);
        set.add(2);
        let before = set.clone();
        set.union(&empty);
        assert_eq!(set, before);
    }

    #[test]
    fn empty_set_has_infinite_entropy() {
        let catalog = uniform_catalog(4);
        let set = ModuleSet::empty(4);
        assert_eq!(set.entropy(&catalog), f64::INFINITY);
    }

    #[test]
    fn removing_a_candidate_never_increases_entropy() {
        let catalog = uniform_catalog(6);
        let mut set = ModuleSet::full(6);
        let before = set.entropy(&catalog);
        set.remove(2);
        let after = set.entropy(&catalog);
        assert!(after <= before);
    }

    #[test]
    fn adding_a_candidate_never_decreases_entropy() {
        let catalog = uniform_catalog(6);
        let mut set = ModuleSet::empty(6);
        set.add(0);
        set.add(1);
        let before = set.entropy(&catalog);
        set.add(2);
        let after = set.entropy(&catalog);
        assert!(after >= before);
    }

    #[test]
    fn tail_bits_are_masked_out_of_count() {
        // 5 modules packed into one 64-bit word: only the low 5 bits are real.
        let set = ModuleSet::full(5);
        assert_eq!(set.count(), 5);
        assert!(set.is_full());
    }
}
