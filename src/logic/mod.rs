pub mod merge;
pub mod validate;

pub use merge::*;
pub use validate::*;
