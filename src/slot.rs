use crate::catalog::Catalog;
use crate::module_set::ModuleSet;
use crate::position::{Direction, Position, ALL_DIRECTIONS, NUM_DIRECTIONS};

/// One lattice cell (spec.md §3). `Slot` only ever touches its own state;
/// the multi-slot propagation algorithm that used to live here in the
/// source material lives on `Collapser` instead, since a `Slot` cannot
/// safely hold mutable references to its siblings inside the same `Map`
/// (spec.md §9 "cyclic neighbor graph" is resolved the same way: position-
/// indexed lookup through the Map, never slot-to-slot pointers).
pub struct Slot {
    position: Position,
    modules: Option<ModuleSet>,
    /// `health[module][direction]`, transposed from the spec's `health[d][i]`
    /// for cache-friendlier per-module removal bookkeeping; the contract is
    /// identical.
    health: Option<Vec<[i16; NUM_DIRECTIONS]>>,
    chosen: Option<usize>,
    forgotten: bool,
}

impl Slot {
    /// A freshly created slot with every module possible and full health,
    /// per spec.md §4.2.
    pub fn full(position: Position, catalog: &Catalog) -> Self {
        let n = catalog.num_modules();
        let health = (0..n)
            .map(|module| std::array::from_fn(|d| catalog.init_health(module, Direction::from_index(d))))
            .collect();
        Self {
            position,
            modules: Some(ModuleSet::full(n)),
            health: Some(health),
            chosen: None,
            forgotten: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn is_collapsed(&self) -> bool {
        self.chosen.is_some()
    }

    pub fn is_forgotten(&self) -> bool {
        self.forgotten
    }

    pub fn chosen(&self) -> Option<usize> {
        self.chosen
    }

    /// Panics if called on a forgotten slot; callers must check
    /// `is_forgotten` first (forgotten slots are no-ops to propagation).
    pub fn modules(&self) -> &ModuleSet {
        self.modules.as_ref().expect("slot has been forgotten")
    }

    pub fn modules_mut(&mut self) -> &mut ModuleSet {
        self.modules.as_mut().expect("slot has been forgotten")
    }

    pub fn set_chosen(&mut self, module: Option<usize>) {
        self.chosen = module;
    }

    pub fn health(&self, module: usize, dir: Direction) -> i16 {
        self.health.as_ref().expect("slot has been forgotten")[module][dir.index()]
    }

    pub fn health_mut(&mut self, module: usize, dir: Direction) -> &mut i16 {
        &mut self.health.as_mut().expect("slot has been forgotten")[module][dir.index()]
    }

    /// Releases `modules` and `health` permanently (spec.md §4.6). The slot
    /// becomes an inert no-op to both propagation and undo.
    pub fn forget(&mut self) {
        self.modules = None;
        self.health = None;
        self.forgotten = true;
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slot")
            .field("position", &self.position)
            .field("forgotten", &self.forgotten)
            .field("chosen", &self.chosen)
            .field("modules", &self.modules)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::uniform_catalog;

    #[test]
    fn fresh_slot_has_full_modules_and_init_health() {
        let catalog = uniform_catalog(3);
        let slot = Slot::full(Position::origin(), &catalog);
        assert!(slot.modules().is_full());
        assert!(!slot.is_collapsed());
        for dir in ALL_DIRECTIONS {
            assert_eq!(slot.health(0, dir), 3);
        }
    }

    #[test]
    fn forgotten_slot_reports_forgotten() {
        let catalog = uniform_catalog(2);
        let mut slot = Slot::full(Position::origin(), &catalog);
        slot.forget();
        assert!(slot.is_forgotten());
    }
}
