//! Core types and Web Mercator coordinate math for building tile pyramids.

pub mod progress;
pub mod types;

pub use types::*;
