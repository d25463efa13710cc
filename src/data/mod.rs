//! Training data: labeled image sets and their solver encoding

pub mod images;
pub mod problem;

pub use self::images::*;
pub use self::problem::*;
