//! Core types and numeric utilities for dot-grid lens calibration.
//!
//! This crate is purely geometric: dots and grid coordinates, an owned 2D
//! grid container, polygon and line helpers, polynomial regression and plain
//! image buffers. It does not depend on any concrete dot detector or image
//! codec.

mod dot;
mod geometry;
mod grid;
mod image;
mod logger;
mod polynomial;

pub use dot::{Direction, Dot, GridCoords, SearchState};
pub use geometry::{line_intersection, point_line_distance, Bounds, Polygon2D};
pub use grid::Grid2D;
pub use image::{GrayImage, GrayImageView, RgbImage};
pub use polynomial::{FittedPolynomial, Polynomial, PolynomialFit};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_for_crates;
