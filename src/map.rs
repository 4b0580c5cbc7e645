use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array3;

use crate::catalog::Catalog;
use crate::position::Position;
use crate::slot::Slot;

/// Abstract addressing layer (spec.md §4.5). The Map owns slots, but it does
/// **not** enforce candidate-set invariants itself — those are the
/// Collapser's job. Two concrete variants ship in this crate: [`BoxMap`]
/// (bounded) and [`InfiniteMap`] (streaming, lazily-created slots).
pub trait Map {
    fn get_slot(&self, position: Position) -> Option<&Slot>;

    /// Returns a mutable slot at `position`, lazily creating one if the
    /// variant streams and `position` is addressable.
    fn get_slot_mut(&mut self, position: Position) -> Option<&mut Slot>;

    /// True if `position` lies outside this map's addressable range, e.g.
    /// past a streaming map's configured horizon (spec.md §4.5/§6).
    fn is_beyond_range(&self, position: Position) -> bool {
        self.get_slot(position).is_none()
    }
}

/// A bounded box of eagerly allocated slots, generalizing the teacher's
/// `Map` (which wraps a 2D `Array2<Cell>`) to three dimensions and to
/// WFC `Slot`s instead of fixed/wildcard image cells.
pub struct BoxMap {
    origin: Position,
    size: (i64, i64, i64),
    slots: Array3<Slot>,
}

impl BoxMap {
    pub fn new(origin: Position, size: (i64, i64, i64), catalog: &Catalog) -> Self {
        let (sx, sy, sz) = size;
        assert!(sx > 0 && sy > 0 && sz > 0, "box dimensions must be positive");
        let slots = Array3::from_shape_fn(
            (sx as usize, sy as usize, sz as usize),
            |(x, y, z)| {
                let position = Position::new(origin.x + x as i64, origin.y + y as i64, origin.z + z as i64);
                Slot::full(position, catalog)
            },
        );
        Self { origin, size, slots }
    }

    fn index_of(&self, position: Position) -> Option<(usize, usize, usize)> {
        let dx = position.x - self.origin.x;
        let dy = position.y - self.origin.y;
        let dz = position.z - self.origin.z;
        if dx < 0 || dy < 0 || dz < 0 || dx >= self.size.0 || dy >= self.size.1 || dz >= self.size.2 {
            None
        } else {
            Some((dx as usize, dy as usize, dz as usize))
        }
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn size(&self) -> (i64, i64, i64) {
        self.size
    }

    /// All addressable positions, in scan order; the natural default
    /// `targets` sequence for `Collapser::collapse_box`.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let origin = self.origin;
        let (sx, sy, sz) = self.size;
        (0..sx).flat_map(move |x| {
            (0..sy).flat_map(move |y| {
                (0..sz).map(move |z| Position::new(origin.x + x, origin.y + y, origin.z + z))
            })
        })
    }
}

impl Map for BoxMap {
    fn get_slot(&self, position: Position) -> Option<&Slot> {
        self.index_of(position).map(|idx| &self.slots[idx])
    }

    fn get_slot_mut(&mut self, position: Position) -> Option<&mut Slot> {
        self.index_of(position).map(move |idx| &mut self.slots[idx])
    }
}

/// A streaming lattice that lazily creates slots on first access and
/// optionally enforces a Chebyshev-distance range limit from its origin
/// (spec.md §4.5). Beyond the limit, `get_slot`/`get_slot_mut` return
/// `None`, matching a bounded box's out-of-box behavior.
pub struct InfiniteMap {
    slots: HashMap<Position, Slot>,
    catalog: Arc<Catalog>,
    origin: Position,
    range_limit: Option<i64>,
}

impl InfiniteMap {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            slots: HashMap::new(),
            catalog,
            origin: Position::origin(),
            range_limit: None,
        }
    }

    pub fn with_range_limit(catalog: Arc<Catalog>, origin: Position, range_limit: i64) -> Self {
        Self {
            slots: HashMap::new(),
            catalog,
            origin,
            range_limit: Some(range_limit),
        }
    }

    fn within_range(&self, position: Position) -> bool {
        match self.range_limit {
            None => true,
            Some(limit) => {
                let dx = (position.x - self.origin.x).abs();
                let dy = (position.y - self.origin.y).abs();
                let dz = (position.z - self.origin.z).abs();
                dx.max(dy).max(dz) <= limit
            }
        }
    }
}

impl Map for InfiniteMap {
    fn get_slot(&self, position: Position) -> Option<&Slot> {
        if !self.within_range(position) {
            return None;
        }
        self.slots.get(&position)
    }

    fn get_slot_mut(&mut self, position: Position) -> Option<&mut Slot> {
        if !self.within_range(position) {
            return None;
        }
        let catalog = &self.catalog;
        Some(
            self.slots
                .entry(position)
                .or_insert_with(|| Slot::full(position, catalog)),
        )
    }

    fn is_beyond_range(&self, position: Position) -> bool {
        !self.within_range(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::uniform_catalog;

    #[test]
    fn box_map_returns_none_outside_bounds() {
        let catalog = uniform_catalog(2);
        let mut map = BoxMap::new(Position::origin(), (2, 2, 2), &catalog);
        assert!(map.get_slot(Position::new(2, 0, 0)).is_none());
        assert!(map.get_slot_mut(Position::new(-1, 0, 0)).is_none());
        assert!(map.get_slot(Position::new(1, 1, 1)).is_some());
    }

    #[test]
    fn infinite_map_lazily_creates_slots() {
        let catalog = Arc::new(uniform_catalog(2));
        let mut map = InfiniteMap::new(catalog);
        assert!(map.get_slot(Position::new(5, 5, 5)).is_none());
        assert!(map.get_slot_mut(Position::new(5, 5, 5)).is_some());
        assert!(map.get_slot(Position::new(5, 5, 5)).is_some());
    }

    #[test]
    fn infinite_map_respects_range_limit() {
        let catalog = Arc::new(uniform_catalog(2));
        let mut map = InfiniteMap::with_range_limit(catalog, Position::origin(), 1);
        assert!(map.get_slot_mut(Position::new(1, 1, 0)).is_some());
        assert!(map.get_slot_mut(Position::new(2, 0, 0)).is_none());
        assert!(map.is_beyond_range(Position::new(2, 0, 0)));
    }
}
