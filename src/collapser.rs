use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use log::{debug, trace, warn};
use rand::Rng;

use crate::catalog::{Catalog, ConnectorId};
use crate::config::EngineConfig;
use crate::error::{Result, WfcError};
use crate::history::{History, HistoryItem};
use crate::map::Map;
use crate::module_set::ModuleSet;
use crate::observer::Observer;
use crate::position::{Direction, Position, ALL_DIRECTIONS};
use crate::removal_queue::RemovalQueue;
use crate::sampling::sample_module;

/// Whether a boundary constraint keeps or discards matching modules
/// (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintMode {
    Enforce,
    Exclude,
}

/// One entry of an `apply_boundary_constraints` batch (spec.md §6).
#[derive(Debug, Clone)]
pub struct BoundaryConstraint {
    pub position: Position,
    pub direction: Direction,
    pub connector: ConnectorId,
    pub mode: ConstraintMode,
}

/// Top-level driver (spec.md §4.7): picks the minimum-entropy slot in the
/// work area, collapses it, propagates, and backtracks on failure. Owns
/// everything the propagation algorithm touches across slots, since a
/// `Slot` cannot hold mutable references into its own container.
pub struct Collapser<M: Map, R: Rng> {
    map: M,
    catalog: Arc<Catalog>,
    queue: RemovalQueue,
    history: History,
    rng: R,
    config: EngineConfig,
    work_area: HashSet<Position>,
    build_queue: VecDeque<Position>,
    barrier: u64,
    amount: u64,
}

impl<M: Map, R: Rng> Collapser<M, R> {
    pub fn new(map: M, catalog: Arc<Catalog>, rng: R, config: EngineConfig) -> Self {
        let history = History::new(config.history_capacity);
        Self {
            map,
            catalog,
            queue: RemovalQueue::new(),
            history,
            rng,
            config,
            work_area: HashSet::new(),
            build_queue: VecDeque::new(),
            barrier: 0,
            amount: 0,
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_total_pushes(&self) -> u64 {
        self.history.total_pushes()
    }

    /// Drains the build queue, handing each ready position to the observer.
    pub fn drain_build_queue(&mut self, observer: &mut dyn Observer) {
        while let Some(position) = self.build_queue.pop_front() {
            observer.on_build_ready(position);
        }
    }

    /// `collapse(targets, ...)` — spec.md §4.7.
    pub fn collapse(
        &mut self,
        targets: impl IntoIterator<Item = Position>,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        self.queue.clear();
        self.work_area.clear();
        for position in targets {
            if let Some(slot) = self.map.get_slot(position) {
                if !slot.is_collapsed() && !slot.is_forgotten() {
                    self.work_area.insert(position);
                }
            }
        }

        let total = self.work_area.len();
        let mut since_progress = 0usize;
        debug!("collapse starting over {total} slots");

        while !self.work_area.is_empty() {
            since_progress += 1;
            if since_progress >= self.config.progress_cadence.max(1) {
                since_progress = 0;
                self.drain_build_queue(observer);
                if observer.on_progress(self.work_area.len(), total) {
                    self.queue.clear();
                    warn!("collapse cancelled by observer");
                    return Err(WfcError::Cancelled);
                }
            }

            let selected = self.select_min_entropy();
            match self.collapse_at(selected, observer) {
                Ok(()) => {}
                Err(WfcError::CollapseFailed { position }) => {
                    warn!("collapse failed at {position:?}, backtracking");
                    self.queue.clear();
                    if self.history.is_empty() {
                        // Nothing left to undo: this dead end is permanent.
                        return Err(WfcError::GenerationFailed);
                    }
                    self.on_collapse_failure();
                }
                Err(other) => return Err(other),
            }
        }

        self.drain_build_queue(observer);
        Ok(())
    }

    /// Convenience overload expanding a box of positions (spec.md §4.7).
    pub fn collapse_box(
        &mut self,
        origin: Position,
        size: (i64, i64, i64),
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let (sx, sy, sz) = size;
        let targets: Vec<Position> = (0..sx)
            .flat_map(|x| {
                (0..sy).flat_map(move |y| {
                    (0..sz).map(move |z| Position::new(origin.x + x, origin.y + y, origin.z + z))
                })
            })
            .collect();
        self.collapse(targets, observer)
    }

    /// Scan the work area for the slot with minimum entropy. Ties go to
    /// whichever slot the scan visits first (spec.md §4.7 step 3a); the
    /// scan itself doesn't mutate `work_area`, so iteration order is stable
    /// for the duration of one call even though `HashSet` order is
    /// unspecified across runs.
    fn select_min_entropy(&self) -> Position {
        let mut best: Option<(Position, f64)> = None;
        for &position in &self.work_area {
            let slot = self
                .map
                .get_slot(position)
                .expect("work_area position has no backing slot");
            let entropy = slot.modules().entropy(&self.catalog);
            best = match best {
                Some((_, best_entropy)) if entropy >= best_entropy => best,
                _ => Some((position, entropy)),
            };
        }
        best.expect("select_min_entropy called on an empty work area").0
    }

    fn collapse_at(&mut self, position: Position, observer: &mut dyn Observer) -> Result<()> {
        let is_empty = self
            .map
            .get_slot(position)
            .expect("work_area position has no backing slot")
            .modules()
            .is_empty();
        if is_empty {
            return Err(WfcError::CollapseFailed { position });
        }

        let chosen = {
            let slot = self.map.get_slot(position).unwrap();
            sample_module(slot.modules(), &self.catalog, &mut self.rng)
                .expect("non-empty candidate set always yields a sample")
        };

        self.do_collapse(position, chosen, observer)
    }

    /// `Slot::collapse(m)` (spec.md §4.3), relocated here since it mutates
    /// neighbor slots via the Map.
    fn do_collapse(
        &mut self,
        position: Position,
        chosen: usize,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        {
            let slot = self
                .map
                .get_slot(position)
                .expect("work_area position has no backing slot");
            if slot.is_collapsed() {
                return Err(WfcError::IllegalCollapse {
                    reason: format!("slot at {position:?} is already collapsed"),
                });
            }
            if !slot.modules().contains(chosen) {
                return Err(WfcError::IllegalCollapse {
                    reason: format!("module {chosen} is not a candidate at {position:?}"),
                });
            }
        }

        if let Some(evicted) = self.history.push(HistoryItem::new(position)) {
            self.forget_slot(evicted.position);
        }

        let mut to_remove = self
            .map
            .get_slot(position)
            .expect("checked above")
            .modules()
            .clone();
        to_remove.remove(chosen);

        {
            let slot = self.map.get_slot_mut(position).expect("checked above");
            slot.set_chosen(Some(chosen));
        }

        trace!("collapsed {position:?} to module {chosen}");
        self.remove_modules_at(position, to_remove, true, observer)?;

        self.work_area.remove(&position);
        self.build_queue.push_back(position);
        Ok(())
    }

    /// `Slot::remove_modules` (spec.md §4.3), operating through the Map
    /// since it must reach into neighbor slots.
    fn remove_modules_at(
        &mut self,
        position: Position,
        to_remove: ModuleSet,
        recursive: bool,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let mut effective = to_remove;
        {
            let slot = match self.map.get_slot(position) {
                Some(s) if !s.is_forgotten() => s,
                _ => return Ok(()),
            };
            effective.intersect(slot.modules());
        }
        if effective.is_empty() {
            return Ok(());
        }

        if let Some(top) = self.history.top_mut() {
            top.record_removal(position, &effective);
        }

        for dir in ALL_DIRECTIONS {
            let neighbor_pos = position.neighbor(dir);
            let inv = dir.inverse();

            if self.map.is_beyond_range(neighbor_pos) {
                observer.on_hit_range_limit(neighbor_pos, &effective);
                continue;
            }
            let neighbor_live =
                matches!(self.map.get_slot(neighbor_pos), Some(s) if !s.is_forgotten());
            if !neighbor_live {
                continue;
            }

            let mut newly_zeroed: Option<ModuleSet> = None;
            {
                let neighbor = self.map.get_slot_mut(neighbor_pos).expect("checked above");
                for m in effective.iter() {
                    for j in self.catalog.possible_neighbors(m, dir).iter_ones() {
                        let current = neighbor.health(j, inv);
                        if current == 1 && neighbor.modules().contains(j) {
                            newly_zeroed
                                .get_or_insert_with(|| ModuleSet::empty(self.catalog.num_modules()))
                                .add(j);
                        }
                        let counter = neighbor.health_mut(j, inv);
                        *counter -= 1;
                        assert!(
                            *counter >= 0,
                            "health counter went negative for module {j} at {neighbor_pos:?}"
                        );
                    }
                }
            }
            if let Some(set) = newly_zeroed {
                trace!("enqueuing {} modules at {neighbor_pos:?}", set.count());
                self.queue.enqueue(neighbor_pos, set);
            }
        }

        {
            let slot = self.map.get_slot_mut(position).expect("checked above");
            slot.modules_mut().difference(&effective);
            if slot.modules().is_empty() {
                return Err(WfcError::CollapseFailed { position });
            }
        }

        if recursive {
            self.drain_removal_queue(observer)?;
        }
        Ok(())
    }

    /// Drains the RemovalQueue (spec.md §4.4), non-recursively removing
    /// from each dequeued slot in turn.
    fn drain_removal_queue(&mut self, observer: &mut dyn Observer) -> Result<()> {
        let mut iterations = 0usize;
        while let Some((position, modules)) = self.queue.dequeue() {
            iterations += 1;
            if iterations > self.config.max_propagation_iterations {
                return Err(WfcError::IllegalCollapse {
                    reason: "propagation exceeded max_propagation_iterations".to_string(),
                });
            }

            let skip = match self.map.get_slot(position) {
                Some(s) if !s.is_forgotten() => s.is_collapsed(),
                _ => true,
            };
            if skip {
                continue;
            }
            self.remove_modules_at(position, modules, false, observer)?;
        }
        Ok(())
    }

    /// `Slot::add_modules` (spec.md §4.3), the reverse of removal; used only
    /// by `undo`.
    fn add_modules_at(&mut self, position: Position, to_add: ModuleSet) {
        let (chosen, already_present) = match self.map.get_slot(position) {
            Some(s) if !s.is_forgotten() => (s.chosen(), s.modules().clone()),
            _ => return,
        };

        let mut newly_added = ModuleSet::empty(self.catalog.num_modules());
        for m in to_add.iter() {
            if already_present.contains(m) || Some(m) == chosen {
                continue;
            }
            newly_added.add(m);
        }
        if newly_added.is_empty() {
            return;
        }

        for dir in ALL_DIRECTIONS {
            let neighbor_pos = position.neighbor(dir);
            let inv = dir.inverse();
            if self.map.is_beyond_range(neighbor_pos) {
                continue;
            }
            let neighbor_live =
                matches!(self.map.get_slot(neighbor_pos), Some(s) if !s.is_forgotten());
            if !neighbor_live {
                continue;
            }
            let neighbor = self.map.get_slot_mut(neighbor_pos).expect("checked above");
            for m in newly_added.iter() {
                for j in self.catalog.possible_neighbors(m, dir).iter_ones() {
                    *neighbor.health_mut(j, inv) += 1;
                }
            }
        }

        let slot = self.map.get_slot_mut(position).expect("checked above");
        slot.modules_mut().union(&newly_added);
        if slot.chosen().is_some() && !slot.modules().is_empty() {
            slot.set_chosen(None);
            self.work_area.insert(position);
        }
    }

    /// `Collapser.undo(steps)` (spec.md §4.7). The explicit clear-and-
    /// reinsert for `it.position` happens unconditionally, even when
    /// `it.removed` has no entry for that position (e.g. a single-module
    /// catalog where the collapse removed nothing) — `add_modules_at`'s own
    /// generic clear only fires when that position appears in `removed`.
    pub fn undo(&mut self, mut steps: u64) {
        while steps > 0 {
            let item = match self.history.pop() {
                Some(item) => item,
                None => break,
            };
            for (pos, modules) in item.removed {
                self.add_modules_at(pos, modules);
            }
            if let Some(slot) = self.map.get_slot_mut(item.position) {
                if !slot.is_forgotten() {
                    slot.set_chosen(None);
                    self.work_area.insert(item.position);
                }
            }
            steps -= 1;
        }
        if self.history.is_empty() {
            self.barrier = 0;
        }
    }

    fn forget_slot(&mut self, position: Position) {
        if let Some(slot) = self.map.get_slot_mut(position) {
            slot.forget();
        }
        self.work_area.remove(&position);
    }

    /// Backtrack policy (spec.md §4.8).
    fn on_collapse_failure(&mut self) {
        if self.history.total_pushes() > self.barrier {
            self.barrier = self.history.total_pushes();
            self.amount = 2;
        } else {
            self.amount = (self.amount * 2).max(2);
        }
        self.undo(self.amount);
    }

    /// Retain only modules whose `direction` face matches `connector`.
    pub fn enforce_connector(
        &mut self,
        position: Position,
        direction: Direction,
        connector: ConnectorId,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let to_remove = self.mismatching_connector_modules(position, direction, connector, true);
        self.remove_modules_at(position, to_remove, true, observer)
    }

    /// Discard modules whose `direction` face matches `connector`.
    pub fn exclude_connector(
        &mut self,
        position: Position,
        direction: Direction,
        connector: ConnectorId,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let to_remove = self.mismatching_connector_modules(position, direction, connector, false);
        self.remove_modules_at(position, to_remove, true, observer)
    }

    fn mismatching_connector_modules(
        &self,
        position: Position,
        direction: Direction,
        connector: ConnectorId,
        keep_matching: bool,
    ) -> ModuleSet {
        let mut to_remove = ModuleSet::empty(self.catalog.num_modules());
        if let Some(slot) = self.map.get_slot(position) {
            for m in slot.modules().iter() {
                let matches = self.catalog.connector(m, direction) == Some(connector);
                if matches != keep_matching {
                    to_remove.add(m);
                }
            }
        }
        to_remove
    }

    /// Drops modules whose face `direction` is not walkable (spec.md §6).
    pub fn enforce_walkway(
        &mut self,
        position: Position,
        direction: Direction,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let mut to_remove = ModuleSet::empty(self.catalog.num_modules());
        if let Some(slot) = self.map.get_slot(position) {
            for m in slot.modules().iter() {
                if !self.catalog.is_walkable(m, direction) {
                    to_remove.add(m);
                }
            }
        }
        self.remove_modules_at(position, to_remove, true, observer)
    }

    /// Applies `enforce_walkway` on both sides of the axis connecting `a`
    /// and `b` (spec.md §6's "pair form").
    pub fn enforce_walkway_pair(
        &mut self,
        a: Position,
        b: Position,
        observer: &mut dyn Observer,
    ) -> Result<()> {
        let direction = Direction::between(a, b).ok_or_else(|| WfcError::IllegalCollapse {
            reason: format!("{a:?} and {b:?} are not axis-adjacent"),
        })?;
        self.enforce_walkway(a, direction, observer)?;
        self.enforce_walkway(b, direction.inverse(), observer)
    }

    /// Batch driver over `enforce_connector`/`exclude_connector` (spec.md §6).
    pub fn apply_boundary_constraints(
        &mut self,
        constraints: &[BoundaryConstraint],
        observer: &mut dyn Observer,
    ) -> Result<()> {
        for constraint in constraints {
            match constraint.mode {
                ConstraintMode::Enforce => self.enforce_connector(
                    constraint.position,
                    constraint.direction,
                    constraint.connector,
                    observer,
                )?,
                ConstraintMode::Exclude => self.exclude_connector(
                    constraint.position,
                    constraint.direction,
                    constraint.connector,
                    observer,
                )?,
            }
        }
        Ok(())
    }
}
