pub mod codec;
pub mod file_store;
pub mod store;

pub use file_store::FileStore;
pub use store::Store;

use thiserror::Error;

/// Errors raised by the record store. Validation failures carry enough
/// context to report to a caller without the offending line at hand.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity} id: {id}")]
    Duplicate { entity: String, id: String },

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}
