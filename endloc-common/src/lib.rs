//! # endloc Common Library
//!
//! Shared code for the endloc services including:
//! - Error taxonomy and result type
//! - Configuration loading (ENV → TOML resolution)
//! - Text normalization for comparison keys

pub mod config;
pub mod error;
pub mod normalize;

pub use error::{Error, Result};
pub use normalize::normalize;
