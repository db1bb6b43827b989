//! Numerical building blocks: root finding, simplex minimisation and sample statistics.

pub mod brent;
pub mod errors;
pub mod nelder_mead;
pub mod stats;

pub use brent::*;
pub use errors::*;
pub use nelder_mead::*;
pub use stats::*;
