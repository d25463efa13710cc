//! SVM solver implementations
//!
//! Sequential Minimal Optimization for the C-SVC dual with an optional
//! shrinking heuristic, plus Platt's sigmoid fit for probability outputs.

pub mod platt;
pub mod shrinking;
pub mod smo;

pub use self::platt::*;
pub use self::shrinking::*;
pub use self::smo::*;
