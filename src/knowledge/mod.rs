//! Knowledge core: normalization, the persisted question→answer store, and
//! fuzzy matching against it.

mod error;
mod matcher;
mod normalize;
mod store;

pub use error::KnowledgeError;
pub use matcher::*;
pub use normalize::*;
pub use store::*;
