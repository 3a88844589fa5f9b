pub mod client;
pub mod common;
pub mod department;
pub mod directory;
pub mod document;
pub mod office;
pub mod organization;
pub mod user_context;

pub use client::*;
pub use common::*;
pub use department::*;
pub use directory::*;
pub use document::*;
pub use office::*;
pub use organization::*;
pub use user_context::*;
