//! Watershed boundary loading.
//!
//! Reads a polygon boundary from a GeoJSON file, explodes multi-part
//! geometries, checks validity and selects either the first polygon or the
//! union of all of them. The resulting [`Watershed`] is what the dataset
//! clipper masks against and what the renderer outlines on every frame.

mod boundary;

pub use boundary::{load_boundary, parse_boundary, square, Watershed};
