#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pure decision functions over zones and poles.
//!
//! - [`overlap`] rejects poles whose restricted circles would intersect.
//! - [`classify`] decides whether an agent may market at a position.
//! - [`line_of_sight`] compares pole-top and agent elevations.
//!
//! Nothing here performs I/O. Callers load zones, poles, and elevations
//! and pass them in.

pub mod classify;
pub mod line_of_sight;
pub mod overlap;

pub use classify::{classify, rank_nearby};
pub use line_of_sight::evaluate;
pub use overlap::{OverlapCandidate, find_overlap, find_overlap_conflict};
