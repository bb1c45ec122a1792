//! Utility modules for common operations

pub mod color;

pub use color::ColorParser;
