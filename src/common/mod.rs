//! Low-level helpers shared by the container and workbook layers.

pub mod binary;
pub mod diagnostics;

pub use binary::{BinaryError, BinaryResult};
pub use diagnostics::{DiagnosticSink, Diagnostics};
