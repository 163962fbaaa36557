//! Manual retrieval: the search seam, its backends and the seed corpus.

pub mod memory;
pub mod qdrant;
pub mod seed;
pub mod store;

pub use memory::InMemoryManualStore;
pub use qdrant::QdrantManualStore;
pub use store::{ManualIndex, ManualSearch, SearchError};
