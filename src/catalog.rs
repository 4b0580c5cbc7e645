use std::path::Path;

use bitvec::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WfcError};
use crate::position::{Direction, ALL_DIRECTIONS, NUM_DIRECTIONS};

/// Opaque identifier for a face "connector" type, consumed by
/// `enforce_connector`/`exclude_connector` (spec.md §6). Computing connector
/// assignments from geometry is a module-catalog-authoring concern and out
/// of scope here (spec.md §1); the catalog only stores whatever the host
/// already assigned.
pub type ConnectorId = u32;

/// Serde-facing definition of a single module, generalizing the teacher's
/// `Rule` (4 named directions, bare index lists) to 6 directions plus the
/// probability and optional connector/walkable tags spec.md §6 needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub probability: f64,
    #[serde(default)]
    pub neighbors: [Vec<usize>; NUM_DIRECTIONS],
    #[serde(default)]
    pub connector: [Option<ConnectorId>; NUM_DIRECTIONS],
    #[serde(default = "default_walkable")]
    pub walkable: [bool; NUM_DIRECTIONS],
}

fn default_walkable() -> [bool; NUM_DIRECTIONS] {
    [true; NUM_DIRECTIONS]
}

/// Serde-facing catalog document, generalizing the teacher's `RuleSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    pub modules: Vec<ModuleDef>,
}

/// Immutable, shared module table: per module, a probability and
/// `possible_neighbors[direction]` (spec.md §3). Loaded once at startup and
/// never mutated by a `Slot` (spec.md §5 ownership model).
pub struct Catalog {
    probabilities: Vec<f64>,
    plogp: Vec<f64>,
    possible_neighbors: Vec<[BitVec; NUM_DIRECTIONS]>,
    connector: Vec<[Option<ConnectorId>; NUM_DIRECTIONS]>,
    walkable: Vec<[bool; NUM_DIRECTIONS]>,
    /// `init_health[i][d] = |PN[i][d]|`: the number of modules `i` itself
    /// admits as a neighbor on `d`, which is exactly how many modules a
    /// full neighbor slot on `d` contributes to `i`'s support count
    /// (matches the decrement in `Collapser::remove_modules_at`, which
    /// walks `possible_neighbors(m, dir)` for the modules `m` being removed
    /// from the slot on the *same* side as `dir`, not its inverse).
    init_health: Vec<[i16; NUM_DIRECTIONS]>,
}

impl Catalog {
    /// Build and validate a catalog from module definitions.
    ///
    /// Checks, in order: every listed neighbor index is in range; the
    /// adjacency relation is symmetric (`j ∈ PN[i][d] ⇔ i ∈ PN[j][d']`,
    /// generalizing `RuleSet::new`'s 4-direction symmetry check); and no
    /// module is unreachable (`init_health[i][d] == 0` for some `d`,
    /// spec.md §4.2/§7 `CatalogInvalid`).
    pub fn new(defs: Vec<ModuleDef>) -> Result<Self> {
        let num_modules = defs.len();

        let mut possible_neighbors: Vec<[BitVec; NUM_DIRECTIONS]> = Vec::with_capacity(num_modules);
        for def in &defs {
            let mut per_direction: [BitVec; NUM_DIRECTIONS] = std::array::from_fn(|_| BitVec::new());
            for dir in ALL_DIRECTIONS {
                let mut bits = bitvec![0; num_modules];
                for &neighbor in &def.neighbors[dir.index()] {
                    if neighbor >= num_modules {
                        return Err(WfcError::IllegalCollapse {
                            reason: format!(
                                "module neighbor index {neighbor} out of range (catalog has {num_modules} modules)"
                            ),
                        });
                    }
                    bits.set(neighbor, true);
                }
                per_direction[dir.index()] = bits;
            }
            possible_neighbors.push(per_direction);
        }

        for i in 0..num_modules {
            for dir in ALL_DIRECTIONS {
                let inv = dir.inverse();
                for j in possible_neighbors[i][dir.index()].iter_ones() {
                    if !possible_neighbors[j][inv.index()][i] {
                        return Err(WfcError::IllegalCollapse {
                            reason: format!(
                                "adjacency is not symmetric: {j} admits {i} on {dir:?} but {i} does not admit {j} on {inv:?}"
                            ),
                        });
                    }
                }
            }
        }

        let probabilities: Vec<f64> = defs.iter().map(|d| d.probability).collect();
        let plogp: Vec<f64> = probabilities
            .iter()
            .map(|&p| if p > 0.0 { p * p.ln() } else { 0.0 })
            .collect();
        let connector: Vec<_> = defs.iter().map(|d| d.connector).collect();
        let walkable: Vec<_> = defs.iter().map(|d| d.walkable).collect();

        let mut init_health = vec![[0i16; NUM_DIRECTIONS]; num_modules];
        for i in 0..num_modules {
            for dir in ALL_DIRECTIONS {
                let count = possible_neighbors[i][dir.index()].count_ones();
                init_health[i][dir.index()] = count as i16;
                if count == 0 {
                    return Err(WfcError::CatalogInvalid { module: i, direction: dir });
                }
            }
        }

        Ok(Self {
            probabilities,
            plogp,
            possible_neighbors,
            connector,
            walkable,
            init_health,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        let def: CatalogDef = serde_yaml::from_str(&yaml)?;
        Self::new(def.modules)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let modules = (0..self.num_modules())
            .map(|i| ModuleDef {
                probability: self.probabilities[i],
                neighbors: std::array::from_fn(|d| {
                    self.possible_neighbors[i][d].iter_ones().collect()
                }),
                connector: self.connector[i],
                walkable: self.walkable[i],
            })
            .collect();
        let yaml = serde_yaml::to_string(&CatalogDef { modules })?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn num_modules(&self) -> usize {
        self.probabilities.len()
    }

    pub fn probability(&self, module: usize) -> f64 {
        self.probabilities[module]
    }

    pub fn plogp(&self, module: usize) -> f64 {
        self.plogp[module]
    }

    pub fn possible_neighbors(&self, module: usize, dir: Direction) -> &BitSlice {
        &self.possible_neighbors[module][dir.index()]
    }

    pub fn admits_as_neighbor(&self, module: usize, dir: Direction, neighbor_module: usize) -> bool {
        self.possible_neighbors[module][dir.index()][neighbor_module]
    }

    pub fn connector(&self, module: usize, dir: Direction) -> Option<ConnectorId> {
        self.connector[module][dir.index()]
    }

    pub fn is_walkable(&self, module: usize, dir: Direction) -> bool {
        self.walkable[module][dir.index()]
    }

    /// The base support count every fresh `Slot` starts with.
    pub fn init_health(&self, module: usize, dir: Direction) -> i16 {
        self.init_health[module][dir.index()]
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A catalog where every module admits every module (including itself)
    /// as a neighbor on every direction, all with equal probability. Handy
    /// for tests that only care about `ModuleSet`/entropy behaviour.
    pub fn uniform_catalog(num_modules: usize) -> Catalog {
        let defs = (0..num_modules)
            .map(|_| ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| (0..num_modules).collect()),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            })
            .collect();
        Catalog::new(defs).expect("uniform catalog is always valid")
    }

    /// N=2 checkerboard catalog: module 0 only neighbors module 1 and vice
    /// versa, on every direction (spec.md §8 scenario E2).
    pub fn checkerboard_catalog() -> Catalog {
        let defs = vec![
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![0]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
        ];
        Catalog::new(defs).expect("checkerboard catalog is always valid")
    }

    /// Same adjacency as [`checkerboard_catalog`], but module 0 carries
    /// connector `1` on its `+x` face and module 1 carries connector `2`,
    /// for exercising `enforce_connector`/`exclude_connector` (spec.md §8
    /// scenario E6).
    pub fn checkerboard_with_connectors() -> Catalog {
        let mut connector0 = [None; NUM_DIRECTIONS];
        connector0[Direction::PosX.index()] = Some(1);
        let mut connector1 = [None; NUM_DIRECTIONS];
        connector1[Direction::PosX.index()] = Some(2);

        let defs = vec![
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: connector0,
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![0]),
                connector: connector1,
                walkable: [true; NUM_DIRECTIONS],
            },
        ];
        Catalog::new(defs).expect("checkerboard catalog is always valid")
    }

    /// N=2 catalog that is direction-unbalanced: module 0 admits both
    /// modules as a `+x` neighbor but only module 0 as a `-x` neighbor,
    /// while module 1 is the mirror image. Every other direction admits
    /// both modules both ways. Regression fixture for the
    /// `init_health`/health-decrement direction mismatch.
    pub fn asymmetric_catalog() -> Catalog {
        let mut neighbors0: [Vec<usize>; NUM_DIRECTIONS] = std::array::from_fn(|_| vec![0, 1]);
        neighbors0[Direction::NegX.index()] = vec![0];
        let mut neighbors1: [Vec<usize>; NUM_DIRECTIONS] = std::array::from_fn(|_| vec![0, 1]);
        neighbors1[Direction::PosX.index()] = vec![1];

        let defs = vec![
            ModuleDef {
                probability: 1.0,
                neighbors: neighbors0,
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: neighbors1,
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
        ];
        Catalog::new(defs).expect("asymmetric catalog is always valid")
    }

    /// N=3 path catalog: module 0 only neighbors module 1, module 2 only
    /// neighbors module 1, module 1 neighbors either — on every direction.
    /// A chain of these cells is always solvable (it's a tree-shaped
    /// constraint, not a cycle), useful for exercising backtrack machinery
    /// deterministically without depending on the random draw (spec.md §8
    /// scenario E3).
    pub fn path_catalog() -> Catalog {
        let defs = vec![
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![0, 2]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
        ];
        Catalog::new(defs).expect("path catalog is always valid")
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn uniform_catalog_has_full_init_health() {
        let catalog = uniform_catalog(4);
        for module in 0..4 {
            for dir in ALL_DIRECTIONS {
                assert_eq!(catalog.init_health(module, dir), 4);
            }
        }
    }

    #[test]
    fn checkerboard_catalog_init_health_is_one() {
        let catalog = checkerboard_catalog();
        for module in 0..2 {
            for dir in ALL_DIRECTIONS {
                assert_eq!(catalog.init_health(module, dir), 1);
            }
        }
    }

    /// `init_health` must count the same-direction neighbor list, not the
    /// inverse-direction one: a direction-unbalanced catalog tells the two
    /// readings apart (module 0 admits 2 modules on `+x` but only 1 on
    /// `-x`, module 1 is the mirror image).
    #[test]
    fn asymmetric_catalog_init_health_matches_same_direction_neighbor_count() {
        let catalog = asymmetric_catalog();
        assert_eq!(catalog.init_health(0, Direction::PosX), 2);
        assert_eq!(catalog.init_health(0, Direction::NegX), 1);
        assert_eq!(catalog.init_health(1, Direction::PosX), 1);
        assert_eq!(catalog.init_health(1, Direction::NegX), 2);
        for module in 0..2 {
            for dir in [
                Direction::PosY,
                Direction::NegY,
                Direction::PosZ,
                Direction::NegZ,
            ] {
                assert_eq!(catalog.init_health(module, dir), 2);
            }
        }
    }

    #[test]
    fn unreachable_module_is_rejected() {
        // Module 0 allows module 1 as a neighbor everywhere, but nothing
        // allows module 0 back: module 0 is unreachable.
        let defs = vec![
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
            ModuleDef {
                probability: 1.0,
                neighbors: std::array::from_fn(|_| vec![1]),
                connector: [None; NUM_DIRECTIONS],
                walkable: [true; NUM_DIRECTIONS],
            },
        ];
        let err = Catalog::new(defs).unwrap_err();
        assert!(matches!(err, WfcError::IllegalCollapse { .. }));
    }

    #[test]
    fn module_with_no_supporters_direction_is_catalog_invalid() {
        // Single module whose neighbor lists are all empty: init_health is
        // zero on every direction.
        let defs = vec![ModuleDef {
            probability: 1.0,
            neighbors: std::array::from_fn(|_| Vec::new()),
            connector: [None; NUM_DIRECTIONS],
            walkable: [true; NUM_DIRECTIONS],
        }];
        let err = Catalog::new(defs).unwrap_err();
        assert!(matches!(
            err,
            WfcError::CatalogInvalid { module: 0, .. }
        ));
    }
}
