//! Builders for synthetic test inputs.

pub mod biff;
pub mod cfb;
