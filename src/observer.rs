use crate::module_set::ModuleSet;
use crate::position::Position;

/// Host-injected hooks the Collapser calls back into at safe points
/// (spec.md §6). All methods have no-op defaults; a host only overrides the
/// ones it cares about.
pub trait Observer {
    /// Called at `progress_cadence` (§5). Returning `true` requests
    /// cancellation; the Collapser checks this only before a collapse
    /// selection, never mid-propagation.
    fn on_progress(&mut self, _remaining: usize, _total: usize) -> bool {
        false
    }

    /// Propagation would have crossed into a cell outside the map's
    /// addressable range limit.
    fn on_hit_range_limit(&mut self, _position: Position, _modules: &ModuleSet) {}

    /// A slot has just collapsed and is ready for downstream consumption
    /// (e.g. asset instantiation), draining the Collapser's build queue.
    fn on_build_ready(&mut self, _position: Position) {}
}

/// The default observer: never cancels, never reports.
pub struct NullObserver;

impl Observer for NullObserver {}
