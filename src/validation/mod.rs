//! Static checks of a risk definition before it is stored.
//!
//! Conformance problems (matrix cells that are not risk values of the
//! definition, matrix dimensions that do not match the level lists) are errors.
//! Matrices that decrease along an axis, and matrices touched by the pending
//! change set, produce warnings.

pub use self::error::{Severity, ValidationKind, ValidationMessage};
pub use self::validator::Validator;

// --- MODULE DECLARATIONS ---
mod error;
mod validator;
mod rules {
    pub mod conformance;
    pub mod monotonic;
}
