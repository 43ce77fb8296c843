//! # dm-core
//!
//! Core types, traits, and utilities for Datamap RS.
//!
//! This crate provides the foundational building blocks used by the query
//! compiler and the collection layer:
//! - Scalar bind values and raw rows
//! - The shared error taxonomy
//! - Reflection (`Record`) and collaborator (`Persistence`, `Hydrator`) traits
//! - Configuration and tracing bootstrap

pub mod error;
pub mod value;
pub mod traits;
pub mod config;
pub mod telemetry;

pub use error::*;
pub use traits::*;
pub use value::{Row, Value};
