//! Derived products computed by the backend.

pub mod climate;
pub mod vegetation;
