//! Core data types shared across the conversion and template subsystems.

pub mod counts;
pub mod fid;

pub use counts::ConvertCounts;
pub use fid::Fid;
