pub mod association;
pub mod index;
pub mod keywords;
pub mod persist;
pub mod tokenizer;
pub mod topk;

pub use association::{Association, AssociationConfig, AssociationEngine, AssociationTable, Measure};
pub use index::InvertedIndex;
pub use keywords::ClassIndex;
pub use topk::BoundedTopK;

pub type DocId = u32;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A persisted corpus file could not be read back.
    #[error("corpus parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("term {0:?} cannot be written to the corpus file")]
    UnencodableTerm(String),
    #[error("index is frozen; no more documents can be added")]
    IndexFrozen,
    #[error("index must be frozen before associations are computed")]
    IndexNotFrozen,
    #[error("association tables are already built; call reset() first")]
    AlreadyBuilt,
    #[error("invalid association config: {0}")]
    InvalidConfig(&'static str),
    #[error("association snapshot: {0}")]
    Snapshot(#[from] bincode::Error),
    #[error("meta file: {0}")]
    Meta(#[from] serde_json::Error),
}
