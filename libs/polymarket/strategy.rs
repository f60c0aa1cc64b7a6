//! Strategy module - Re-exported from application layer
//!
//! This maintains backward compatibility while following Clean Architecture.

pub use crate::application::strategy::*;
