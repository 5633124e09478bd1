//! The central domain logic and interface definitions for the forum service.
//!
//! Nothing in this crate performs I/O: it holds the entity models, the error
//! taxonomy, the repository ports and the post pagination engine
//! (materialized paths, cursor predicates and the three sort strategies).

pub mod cursor;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod path;
pub mod ports;

// Re-exporting for easier access in other crates
pub use cursor::*;
pub use errors::*;
pub use models::*;
pub use pagination::*;
pub use path::*;
pub use ports::*;
