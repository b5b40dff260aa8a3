//! Source mesh -> unique-vertex mesh (dedupe or raw corners)

mod dedup;
pub mod obj;
mod types;

// Re-export public API
pub use dedup::{build_unique_mesh, deduplicate, expand_raw};
pub use types::{Corner, SourceMesh, UniqueMesh, UniqueVertex};
