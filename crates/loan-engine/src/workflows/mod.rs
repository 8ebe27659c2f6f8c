pub mod decisioning;
pub mod lifecycle;
pub mod repository;

pub use repository::{OperationContext, RepositoryError};
