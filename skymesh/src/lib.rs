//! Hierarchical triangular mesh over the celestial sphere.
//!
//! The mesh recursively splits 8 root triangles into 4 children each, so a
//! cell at level L is one of `8 * 4^(L-1)` triangles ("trixels") and its
//! integer id encodes the whole subdivision path. This crate provides the
//! id arithmetic (levels, ancestors, descendant ranges), the spherical
//! geometry of individual trixels, and cap-versus-trixel classification.
//! Everything here is pure math with no I/O, shared by the partitioner and
//! the catalog range queries built on top of it.

pub mod coords;
pub mod halfspace;
pub mod trixel;

pub use coords::{Equatorial, ARCSEC_PER_RADIAN};
pub use halfspace::{Containment, HalfSpace};
pub use trixel::{
    ancestor_id, descendant_range, leaf_trixels, level_of, Trixel, TrixelId, CATALOG_LEVEL,
};
