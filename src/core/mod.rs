//! Core protocol state shared across subsystems
//!
//! Resource id arithmetic, the atom registry, and the X11 error taxonomy.

pub mod atoms;
pub mod errors;
pub mod ids;

pub use atoms::AtomTable;
pub use errors::{ErrorCode, X11Error};
pub use ids::*;
