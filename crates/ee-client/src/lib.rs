//! Client for a remote earth-observation processing backend.
//!
//! The backend is treated as a black box exposing:
//! - geometry constructors ([`Geometry`])
//! - filtered and mapped image-collection operations ([`CollectionQuery`],
//!   [`ImageExpr`], [`EarthEngine::scene_cloud_coverage`])
//! - region-reduction statistics ([`EarthEngine::reduce_region`])
//! - tile-URL generation ([`EarthEngine::tile_url`])
//!
//! All pixel work happens on the backend; this crate only builds expressions
//! and moves JSON.

pub mod client;
pub mod error;
pub mod expr;
pub mod geometry;
pub mod http;

pub use client::{EarthEngine, ProjectInfo, ProjectSource, SceneCoverage, MAX_PIXELS};
pub use error::{EeError, Result};
pub use expr::{
    Aggregate, CloudEstimator, CollectionQuery, ImageExpr, PixelMask, Reducer, StretchValue,
    VisParams,
};
pub use geometry::{Geometry, Position};
pub use http::{HttpConfig, HttpEarthEngine};
