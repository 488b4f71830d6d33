//! NDVI API Service Library
//!
//! HTTP façade that turns multi-period requests over a polygon or a point
//! into vegetation and climate statistics computed by a remote
//! earth-observation backend.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod periods;
pub mod products;
pub mod request;
pub mod response;
pub mod selector;
pub mod sources;
pub mod state;
pub mod tasks;
