//! contains utils used in parsing lists, parameters and dumps

pub mod dumpload;
pub mod files;
pub mod parameters;

pub use files::*;
pub use parameters::*;
