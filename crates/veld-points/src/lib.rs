//! Host-side point-cloud model
//!
//! This crate holds the columnar data structures a pipeline stage operates
//! on: the dimension registry ([`PointLayout`]), the per-buffer storage
//! ([`PointView`]), and the JSON-backed documents that travel alongside the
//! points ([`Metadata`], [`SpatialReference`]).
//!
//! Nothing in here touches the embedded interpreter; the bridge crate
//! (`veld-python`) consumes these types at its boundary.

pub mod dimension;
pub mod errors;
pub mod layout;
pub mod metadata;
pub mod srs;
pub mod view;

pub use dimension::{BaseKind, DimType, Scalar};
pub use errors::PointError;
pub use layout::{Dimension, PointLayout};
pub use metadata::Metadata;
pub use srs::SpatialReference;
pub use view::PointView;
