pub mod document_handlers;
pub mod entity_handlers;
pub mod error;
pub mod handlers;
pub mod org_extractor;
pub mod routes;
pub mod sync_handlers;
pub mod user_extractor;
pub mod validation;

pub use error::ApiError;
pub use handlers::*;
pub use routes::*;
