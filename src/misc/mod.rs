//! Random utilities
mod func;

pub use func::*;
