//! Distribution family implementations.
//!
//! Families are evaluated through small, pure functions keyed on the family tag
//! so that fitting/scoring code can stay generic.

pub mod distribution;

pub use distribution::*;
