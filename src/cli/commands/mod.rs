//! Command implementations.

pub mod completions;
pub mod manifest;
pub mod sync;
pub mod version;
