use std::collections::{HashMap, VecDeque};

use crate::module_set::ModuleSet;
use crate::position::Position;

/// FIFO worklist mapping position → pending removal set, per spec.md §4.4.
/// Re-enqueuing an already-queued position unions into the existing entry
/// instead of duplicating the position in the FIFO order.
#[derive(Default)]
pub struct RemovalQueue {
    order: VecDeque<Position>,
    pending: HashMap<Position, ModuleSet>,
}

impl RemovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `modules` into the pending set at `position`, enqueuing the
    /// position on first write.
    pub fn enqueue(&mut self, position: Position, modules: ModuleSet) {
        match self.pending.get_mut(&position) {
            Some(existing) => {
                existing.union(&modules);
            }
            None => {
                self.pending.insert(position, modules);
                self.order.push_back(position);
            }
        }
    }

    pub fn dequeue(&mut self) -> Option<(Position, ModuleSet)> {
        let position = self.order.pop_front()?;
        let modules = self.pending.remove(&position).expect("order/pending desync");
        Some((position, modules))
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Invalidates all pending propagations (spec.md §4.4: cleared whenever
    /// the Collapser starts a new area or catches a `CollapseFailed`).
    pub fn clear(&mut self) {
        self.order.clear();
        self.pending.clear();
    }
}
