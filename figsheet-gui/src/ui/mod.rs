//! Shared UI pieces: theme and texture conversion.

pub mod texture;
pub mod theme;
