//! A three-dimensional Wave Function Collapse constraint-satisfaction
//! engine: assigns one module per lattice cell from a finite catalog,
//! subject to per-direction adjacency rules, via entropy-guided collapse,
//! worklist propagation, and history-based backtracking.
//!
//! Module catalog authoring, asset instantiation/rendering, and map
//! storage variants beyond the two shipped here ([`BoxMap`],
//! [`InfiniteMap`]) are host concerns; this crate consumes a precomputed
//! [`Catalog`] and a [`Map`] implementation, it does not own them.

// #![deny(warnings)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

mod catalog;
mod collapser;
mod config;
mod error;
mod history;
mod map;
mod module_set;
mod observer;
#[cfg(feature = "indicatif")]
mod progress;
mod removal_queue;
mod sampling;
mod slot;

/// Lattice coordinates and the six axis-aligned directions between cells.
pub mod position;

pub use catalog::{Catalog, CatalogDef, ConnectorId, ModuleDef};
pub use collapser::{BoundaryConstraint, Collapser, ConstraintMode};
pub use config::EngineConfig;
pub use error::{Result, WfcError};
pub use map::{BoxMap, InfiniteMap, Map};
pub use module_set::ModuleSet;
pub use observer::{NullObserver, Observer};
#[cfg(feature = "indicatif")]
pub use progress::IndicatifObserver;
pub use position::{Direction, Position, ALL_DIRECTIONS, NUM_DIRECTIONS};
pub use slot::Slot;
