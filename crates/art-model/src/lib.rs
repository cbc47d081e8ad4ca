//! Model contract: provider-agnostic `Request`/`Response`/`Stream`/`Chunk`
//! abstraction, plus the `Message`/`Part` types the ledger projects to.

pub mod client;
pub mod message;

pub use client::{
    CacheCheckpoint, CachePolicy, Chunk, Client, ModelError, Request, Response, ToolDefinition,
    Usage,
};
pub use message::{Message, Part, Role};
