//! `ToolSpec` catalogue, JSON schema gate, and retry-hint construction.

pub mod catalogue;
pub mod schema;
pub mod spec;

pub use catalogue::ToolCatalogue;
pub use spec::{extract_bounded_result, BoundedResultMeta, ConfirmationSpec, PagingSpec, ToolSpec, TypeSpec};
